use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::handlers::dispatch;
use crate::protocol::{decode_request, encode_reply};
use crate::response::{BAD_REQUEST, Reply};
use crate::state::AppState;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument as _, info_span};

/// The bookshelf server: one shared store, one task per client connection.
pub struct BookshelfServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl BookshelfServer {
    /// Server with an empty store
    #[must_use]
    #[inline]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_state(config, Arc::new(AppState::new()))
    }

    #[must_use]
    #[inline]
    pub const fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Handle to the shared state, e.g. to inspect the store while the server runs
    #[must_use]
    #[inline]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Binds the configured address and serves clients until accepting fails.
    /// # Errors
    /// Fails if the address cannot be bound or the listener stops accepting connections.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at start of program"
    )]
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Bookshelf server listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Serves clients on an already bound listener.
    /// # Errors
    /// Fails if accepting a connection fails.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once at start of program"
    )]
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::info!(%peer, "client connected");

            let state = Arc::clone(&self.state);
            let max_line_bytes = self.config.max_line_bytes;
            let span = info_span!("connection", %peer);
            tokio::spawn(
                async move {
                    if let Err(err) = handle_connection(stream, &state, max_line_bytes).await {
                        tracing::warn!("Connection ended with error: {err}");
                    } else {
                        tracing::info!("client disconnected");
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Answers every request line of one client, in order, until the client closes the connection.
async fn handle_connection(
    stream: TcpStream,
    state: &AppState,
    max_line_bytes: usize,
) -> Result<(), ServerError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    while let Some(frame) = read_frame(&mut reader, max_line_bytes, &mut line).await? {
        let reply = match frame {
            Frame::TooLong => {
                tracing::warn!(max_line_bytes, "Request line too long");
                Reply::fail(BAD_REQUEST, "Invalid request: line too long")
            }
            Frame::Line => match std::str::from_utf8(&line) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => handle_frame(state, text.trim()).await,
                Err(err) => {
                    tracing::warn!("Request line is not UTF-8: {err}");
                    Reply::fail(BAD_REQUEST, format!("Invalid request: {err}"))
                }
            },
        };
        writer.write_all(encode_reply(&reply)?.as_bytes()).await?;
    }

    writer.shutdown().await?;
    Ok(())
}

/// What [`read_frame`] left in the line buffer.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    /// The buffer holds one complete line as raw bytes
    Line,
    /// The line exceeded the limit and was skipped up to its newline
    TooLong,
}

/// Reads the next line into `line`, never buffering more than `max_line_bytes` plus the newline.
/// Returns `None` once the client has closed the connection.
async fn read_frame<R>(
    reader: &mut R,
    max_line_bytes: usize,
    line: &mut Vec<u8>,
) -> std::io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let limit = u64::try_from(max_line_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    if (&mut *reader).take(limit).read_until(b'\n', line).await? == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') && line.len() > max_line_bytes {
        line.clear();
        discard_line(reader).await?;
        return Ok(Some(Frame::TooLong));
    }
    Ok(Some(Frame::Line))
}

/// Skips input up to and including the next newline, or to the end of the stream.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|byte| *byte == b'\n') {
                Some(newline) => (newline.saturating_add(1), true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}

/// Decodes one request line and runs it against the store. Lines that are not a valid request
/// are answered with a `fail` reply instead of closing the connection.
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn handle_frame(state: &AppState, line: &str) -> Reply {
    match decode_request(line) {
        Ok(request) => {
            tracing::debug!(op = request.op(), "request received");
            dispatch(state, request).await
        }
        Err(err) => {
            tracing::warn!("Malformed request: {err}");
            Reply::fail(BAD_REQUEST, format!("Invalid request: {err}"))
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use crate::response::{CREATED, NOT_FOUND};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn malformed_frame_fails_with_bad_request() {
        let state = AppState::new();
        let reply = handle_frame(&state, "{\"op\":").await;
        assert_eq!(reply.code, BAD_REQUEST);
        assert!(reply.message().unwrap().starts_with("Invalid request"));
    }

    #[tokio::test]
    async fn lines_within_limit_are_read_whole() {
        let mut input: &[u8] = b"12345\n\nabc";
        let mut line = Vec::new();

        let frame = read_frame(&mut input, 5, &mut line).await.unwrap();
        assert_eq!(frame, Some(Frame::Line));
        assert_eq!(line, b"12345\n");

        let frame = read_frame(&mut input, 5, &mut line).await.unwrap();
        assert_eq!(frame, Some(Frame::Line));
        assert_eq!(line, b"\n");

        // A last line without a newline still counts
        let frame = read_frame(&mut input, 5, &mut line).await.unwrap();
        assert_eq!(frame, Some(Frame::Line));
        assert_eq!(line, b"abc");

        assert_eq!(read_frame(&mut input, 5, &mut line).await.unwrap(), None);
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_up_to_its_newline() {
        let mut input: &[u8] = b"123456789\nok\n";
        let mut line = Vec::new();

        let frame = read_frame(&mut input, 5, &mut line).await.unwrap();
        assert_eq!(frame, Some(Frame::TooLong));
        assert!(line.is_empty());

        let frame = read_frame(&mut input, 5, &mut line).await.unwrap();
        assert_eq!(frame, Some(Frame::Line));
        assert_eq!(line, b"ok\n");
    }

    #[tokio::test]
    async fn frames_run_against_shared_store() {
        let state = AppState::new();
        let reply = handle_frame(
            &state,
            r#"{"op":"add_book","payload":{"name":"Go","pageCount":100,"readPage":100}}"#,
        )
        .await;
        assert_eq!(reply.code, CREATED);
        assert_eq!(state.book_count().await, 1);

        let reply = handle_frame(&state, r#"{"op":"delete_book","bookId":"nope"}"#).await;
        assert_eq!(reply.code, NOT_FOUND);
        assert_eq!(state.book_count().await, 1);
    }
}
