//! Thermal printer simulator: entry point.
//!
//! Listens for raw ESC/POS print jobs over TCP, renders each receipt to the
//! terminal, and replies to process-identifier requests the way a real
//! printer does.
//!
//! # Usage
//!
//! ```text
//! tpsim [OPTIONS]
//!
//! Options:
//!   --license          Print third-party license notices and exit
//!   --host <HOST>      Host to listen on [default: localhost]
//!   --port <PORT>      TCP port to listen on [default: 9100]
//!   --config <PATH>    TOML configuration file
//!   --no-probe         Skip the terminal capability probe
//!   --ansi <MODE>      auto, always or never
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable       | Description                 |
//! |----------------|-----------------------------|
//! | `TPSIM_HOST`   | Host to listen on           |
//! | `TPSIM_PORT`   | TCP port to listen on       |
//! | `TPSIM_CONFIG` | Path of the TOML file       |
//! | `RUST_LOG`     | `tracing` filter (stderr)   |
//!
//! Precedence, lowest to highest: built-in defaults, config file,
//! environment, command line.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tpsim::application::StdoutSessionFactory;
use tpsim::domain::{AnsiMode, ServerConfig};
use tpsim::infrastructure::license::print_licenses;
use tpsim::infrastructure::network::{run_server, start};
use tpsim::infrastructure::storage::load_config;
use tpsim::infrastructure::terminal::probe_stdio;
use tpsim_core::Capabilities;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Thermal printer simulator.
///
/// Accepts ESC/POS data over TCP and renders receipts in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tpsim",
    about = "Thermal printer simulator: ESC/POS over TCP, rendered in the terminal",
    version
)]
struct Cli {
    /// Print third-party license notices and exit.
    #[arg(long)]
    license: bool,

    /// Host name or IP address to listen on.
    #[arg(long, env = "TPSIM_HOST")]
    host: Option<String>,

    /// TCP port to listen on (0 picks a free port).
    #[arg(long, env = "TPSIM_PORT")]
    port: Option<u16>,

    /// TOML configuration file.  A missing file is not an error.
    #[arg(long, env = "TPSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Skip the Sixel and cell-size terminal queries.
    #[arg(long)]
    no_probe: bool,

    /// ANSI styling of control-byte markers: auto, always or never.
    #[arg(long)]
    ansi: Option<AnsiMode>,
}

impl Cli {
    /// Overlays the command-line values on `base`.
    fn apply_to(&self, mut base: ServerConfig) -> ServerConfig {
        if let Some(host) = &self.host {
            base.host = host.clone();
        }
        if let Some(port) = self.port {
            base.port = port;
        }
        if self.no_probe {
            base.probe = false;
        }
        if let Some(ansi) = self.ansi {
            base.ansi = ansi;
        }
        base
    }

    /// Loads the config file (if any) and applies the CLI on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
                .to_server_config(),
            None => ServerConfig::default(),
        };
        Ok(self.apply_to(base))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed; `--license` prints and exits before anything
///    else happens.
/// 2. The configuration is assembled and `tracing` is initialised on stderr.
/// 3. The terminal is probed once for Sixel and cell-size support.
/// 4. The listener is bound and the status lines are printed.
/// 5. [`run_server`] accepts connections until Ctrl+C or SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.license {
        print_licenses(&mut io::stdout().lock()).context("failed to print licenses")?;
        return Ok(());
    }

    let config = cli.into_server_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins over the configured level.  Logs go to stderr so they
    // never interleave with the rendered receipt on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    debug!("configuration: {config:?}");

    // Registered before the terminal queries: once their raw-mode signal
    // hook is removed, SIGINT/SIGTERM are only handled if something else
    // listens.
    let shutdown = shutdown_signal().context("failed to install signal handlers")?;

    // ── Terminal probe ────────────────────────────────────────────────────────
    let capabilities = if config.probe {
        tokio::task::spawn_blocking(probe_stdio)
            .await
            .context("terminal probe task failed")?
    } else {
        Capabilities::default()
    };
    let ansi_style = config.ansi.resolve(io::stdout().is_terminal());

    // ── Listener ──────────────────────────────────────────────────────────────
    let (bound_port, connections) = start(&config.host, config.port)
        .await
        .with_context(|| format!("failed to listen on {}:{}", config.host, config.port))?;

    info!("tpsim listening on {}:{bound_port}", config.host);
    print_banner(bound_port, &capabilities);

    // ── Main server loop ───────────────────────────────────────────────────────
    let factory = Arc::new(StdoutSessionFactory::new(&capabilities, ansi_style));
    run_server(connections, factory, shutdown)
        .await
        .context("accept loop failed")?;

    info!("tpsim stopped");
    Ok(())
}

fn print_banner(port: u16, capabilities: &Capabilities) {
    println!("Thermal Printer Simulator listening on port {port}...");
    if capabilities.sixel {
        println!("Sixel graphics: enabled");
    } else {
        println!("Sixel graphics: disabled (terminal does not support Sixel)");
    }
    println!("Send ESC/POS data via TCP (e.g., nc localhost {port})");
    println!("Press Ctrl+C to stop.\n");
}

/// Registers the shutdown signals now and returns a future that resolves on
/// the first of SIGINT or SIGTERM.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("received Ctrl+C, shutting down"),
            _ = terminate.recv() => info!("received SIGTERM, shutting down"),
        }
    })
}

/// Resolves on Ctrl+C.  Never resolves if the handler cannot be installed.
#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        // Arrange: parse with no arguments
        let cli = Cli::parse_from(["tpsim"]);

        // Act
        let config = cli.apply_to(ServerConfig::default());

        // Assert
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_license_flag() {
        let cli = Cli::parse_from(["tpsim", "--license"]);
        assert!(cli.license);
    }

    #[test]
    fn test_cli_host_and_port_override() {
        let cli = Cli::parse_from(["tpsim", "--host", "0.0.0.0", "--port", "9200"]);

        let config = cli.apply_to(ServerConfig::default());

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9200);
    }

    #[test]
    fn test_cli_no_probe_disables_probe() {
        let cli = Cli::parse_from(["tpsim", "--no-probe"]);
        assert!(!cli.apply_to(ServerConfig::default()).probe);
    }

    #[test]
    fn test_cli_ansi_override() {
        let cli = Cli::parse_from(["tpsim", "--ansi", "never"]);
        assert_eq!(cli.apply_to(ServerConfig::default()).ansi, AnsiMode::Never);
    }

    #[test]
    fn test_cli_rejects_invalid_ansi_mode() {
        let result = Cli::try_parse_from(["tpsim", "--ansi", "sometimes"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_out_of_range_port() {
        let result = Cli::try_parse_from(["tpsim", "--port", "70000"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_config_file_values() {
        // Arrange: a base that did not come from defaults
        let base = ServerConfig {
            host: "10.0.0.5".to_string(),
            port: 9300,
            probe: true,
            ansi: AnsiMode::Always,
            log_level: "debug".to_string(),
        };
        let cli = Cli::parse_from(["tpsim", "--port", "9400"]);

        // Act
        let config = cli.apply_to(base);

        // Assert: only the port changes
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 9400);
        assert_eq!(config.ansi, AnsiMode::Always);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_into_server_config_with_missing_file_uses_defaults() {
        let missing = std::env::temp_dir().join("tpsim-no-such-config.toml");
        let cli = Cli::parse_from(["tpsim", "--config", missing.to_str().unwrap()]);

        let config = cli.into_server_config().unwrap();

        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_into_server_config_with_bad_file_returns_error() {
        // Arrange
        let path = std::env::temp_dir().join(format!("tpsim-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\n").unwrap();
        let cli = Cli::parse_from(["tpsim", "--config", path.to_str().unwrap()]);

        // Act
        let result = cli.into_server_config();
        let _ = std::fs::remove_file(&path);

        // Assert
        assert!(result.is_err());
    }
}
