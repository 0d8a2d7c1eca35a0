//! Session dispatch: decode, render, and decide which replies to send.
//!
//! [`SessionDispatcher`] owns one decoder and one renderer for the lifetime
//! of a connection.  It is transport-agnostic: the network layer feeds it
//! inbound chunks and writes the returned [`Reply`] values to the socket.
//!
//! [`SessionFactory`] builds a fresh decoder/renderer pair per session,
//! seeded with the process-wide capability snapshot.

use std::io;

use tpsim_core::{
    Capabilities, Command, CommandDecoder, MinimalDecoder, ReceiptRenderer, RendererOptions,
    TextRenderer, PROCESS_ID_RESPONSE_LEN,
};
use tracing::trace;

/// A reply the printer must send for a decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// The four data bytes of the originating process-id request.
    pub process_id: [u8; 4],
    /// Bytes to write to the wire.
    pub bytes: [u8; PROCESS_ID_RESPONSE_LEN],
}

/// Per-connection decode/render state.
pub struct SessionDispatcher<D, R> {
    decoder: D,
    renderer: R,
}

impl<D: CommandDecoder, R: ReceiptRenderer> SessionDispatcher<D, R> {
    pub fn new(decoder: D, renderer: R) -> Self {
        Self { decoder, renderer }
    }

    /// Decodes one inbound chunk, renders the resulting commands, and
    /// returns the replies they require, in decode order.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<Reply> {
        let commands = self.decoder.decode(chunk);
        trace!("decoded {} command(s) from {} byte(s)", commands.len(), chunk.len());
        if commands.is_empty() {
            return Vec::new();
        }

        self.renderer.render(&commands);

        commands.iter().filter_map(reply_for).collect()
    }
}

fn reply_for(command: &Command) -> Option<Reply> {
    let bytes = command.acknowledgement()?;
    match *command {
        Command::RequestProcessId { d1, d2, d3, d4 } => Some(Reply {
            process_id: [d1, d2, d3, d4],
            bytes,
        }),
        _ => None,
    }
}

/// Builds the decoder and renderer for each new session.
pub trait SessionFactory: Send + Sync + 'static {
    type Decoder: CommandDecoder;
    type Renderer: ReceiptRenderer;

    fn decoder(&self) -> Self::Decoder;
    fn renderer(&self) -> Self::Renderer;

    fn dispatcher(&self) -> SessionDispatcher<Self::Decoder, Self::Renderer> {
        SessionDispatcher::new(self.decoder(), self.renderer())
    }
}

/// Factory used by the binary: [`MinimalDecoder`] plus a [`TextRenderer`]
/// writing to stdout.
#[derive(Debug, Clone, Copy)]
pub struct StdoutSessionFactory {
    options: RendererOptions,
}

impl StdoutSessionFactory {
    pub fn new(capabilities: &Capabilities, ansi_style: bool) -> Self {
        Self {
            options: RendererOptions::from_capabilities(capabilities, ansi_style),
        }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }
}

impl SessionFactory for StdoutSessionFactory {
    type Decoder = MinimalDecoder;
    type Renderer = TextRenderer<io::Stdout>;

    fn decoder(&self) -> MinimalDecoder {
        MinimalDecoder::new()
    }

    fn renderer(&self) -> TextRenderer<io::Stdout> {
        TextRenderer::new(io::stdout(), self.options)
    }
}
