//! Receipt rendering.
//!
//! A renderer consumes the ordered command batch decoded from one inbound
//! chunk and turns it into terminal output.  [`TextRenderer`] is the plain
//! text stand-in used by the binary; it accepts the Sixel and cell-geometry
//! options so a graphics-capable renderer can be swapped in behind
//! [`ReceiptRenderer`] without touching the session dispatcher.

use std::io::Write;

use tracing::warn;

use crate::caps::Capabilities;
use crate::escpos::command::Command;

/// Consumes decoded command batches.  Output is a side effect only.
pub trait ReceiptRenderer: Send {
    fn render(&mut self, commands: &[Command]);
}

/// Renderer configuration derived from the capability probe and stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererOptions {
    /// Emit ANSI SGR styling.
    pub ansi_style: bool,
    /// Terminal can display Sixel graphics.
    pub sixel: bool,
    /// Cell width in device pixels, if known.
    pub cell_pixel_width: Option<u32>,
    /// Display scale factor, if known.
    pub display_scale: Option<u32>,
}

impl RendererOptions {
    /// Builds options from the probe result and the ANSI decision.
    pub fn from_capabilities(caps: &Capabilities, ansi_style: bool) -> Self {
        Self {
            ansi_style,
            sixel: caps.sixel,
            cell_pixel_width: caps.cell_size.map(|c| c.cell_pixel_width),
            display_scale: caps.cell_size.map(|c| c.display_scale),
        }
    }
}

const SGR_DIM: &str = "\x1b[2m";
const SGR_RESET: &str = "\x1b[0m";

/// Writes receipt text to any [`Write`] sink.
///
/// Each batch is assembled in memory and written with a single `write_all`,
/// so output from concurrent sessions interleaves only at batch boundaries.
pub struct TextRenderer<W: Write + Send> {
    out: W,
    options: RendererOptions,
}

impl<W: Write + Send> TextRenderer<W> {
    pub fn new(out: W, options: RendererOptions) -> Self {
        Self { out, options }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Consumes the renderer and returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn format_batch(&self, commands: &[Command]) -> Vec<u8> {
        let mut buf = Vec::new();
        for cmd in commands {
            match cmd {
                Command::Text(bytes) => {
                    buf.extend_from_slice(String::from_utf8_lossy(bytes).as_bytes());
                }
                Command::LineFeed => buf.push(b'\n'),
                Command::Control(byte) if self.options.ansi_style => {
                    buf.extend_from_slice(format!("{SGR_DIM}<{byte:02X}>{SGR_RESET}").as_bytes());
                }
                Command::Control(_) | Command::RequestProcessId { .. } => {}
            }
        }
        buf
    }
}

impl<W: Write + Send> ReceiptRenderer for TextRenderer<W> {
    fn render(&mut self, commands: &[Command]) {
        let buf = self.format_batch(commands);
        if buf.is_empty() {
            return;
        }
        if let Err(e) = self.out.write_all(&buf).and_then(|()| self.out.flush()) {
            warn!("receipt output failed: {e}");
        }
    }
}
