//! JSON-lines stdio transport.
//!
//! Reads one request per line, dispatches it to the router and writes one
//! response per line. Requests are answered in the order they were read.
//! The loop ends on EOF, on the shutdown signal, or after an oversized
//! line.

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::config::Config;
use crate::error::{ErrorCode, RouterError};
use crate::protocol::{Request, Response};
use crate::router::{Router, RouterHandle};

/// Error type for the transport loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write response: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("router error: {0}")]
    Router(#[from] RouterError),
}

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    /// Responses written.
    pub responses: u64,
    /// Responses that carried an error.
    pub failures: u64,
}

/// Decode one request line.
///
/// On failure returns the error response to send back, carrying the `id`
/// when the line was a JSON object that had one.
pub fn decode_request(line: &str) -> Result<Request, Response> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        Response::error(Value::Null, ErrorCode::InvalidRequest, format!("invalid JSON: {e}"))
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    Request::deserialize(value).map_err(|e| {
        Response::error(id, ErrorCode::InvalidRequest, format!("invalid request: {e}"))
    })
}

/// Serve requests from `reader`, writing responses to `writer`.
///
/// # Arguments
///
/// * `reader` - Source of newline-delimited JSON requests
/// * `writer` - Sink for newline-delimited JSON responses
/// * `router` - Handle of the router executing the requests
/// * `max_line_bytes` - Longest accepted request line
/// * `shutdown_rx` - Receiver for shutdown signal
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    router: RouterHandle,
    max_line_bytes: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<ServeStats, ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut requests = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_bytes));
    let mut responses = FramedWrite::new(writer, LinesCodec::new());
    let mut stats = ServeStats::default();

    loop {
        let response = tokio::select! {
            _ = shutdown_rx.changed() => {
                tracing::info!("Shutdown signal received, stopping transport");
                break;
            }
            next = requests.next() => match next {
                None => {
                    tracing::debug!("Input closed");
                    break;
                }
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_request(&line) {
                        Ok(request) => router.dispatch(request).await,
                        Err(response) => response,
                    }
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    tracing::warn!(max_line_bytes, "Request line too long, closing input");
                    let response = Response::error(
                        Value::Null,
                        ErrorCode::InvalidRequest,
                        format!("request line exceeds {max_line_bytes} bytes"),
                    );
                    write_response(&mut responses, &response, &mut stats).await?;
                    break;
                }
                Some(Err(LinesCodecError::Io(e))) => return Err(e.into()),
            }
        };

        write_response(&mut responses, &response, &mut stats).await?;
    }

    tracing::info!(
        responses = stats.responses,
        failures = stats.failures,
        "Transport stopped"
    );
    Ok(stats)
}

async fn write_response<W>(
    sink: &mut FramedWrite<W, LinesCodec>,
    response: &Response,
    stats: &mut ServeStats,
) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(response)?;
    sink.send(line).await?;
    stats.responses += 1;
    if !response.is_success() {
        stats.failures += 1;
    }
    Ok(())
}

/// Run the relay over stdin/stdout.
///
/// # Arguments
///
/// * `config` - Relay configuration
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when input is exhausted or shutdown was requested, after the
/// router thread has exited.
pub async fn run_server(
    config: Config,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<ServeStats, ServerError> {
    let router = Router::spawn(config.channel_size)?;
    let handle = router.handle();

    tracing::info!(channel_size = config.channel_size, "Serving requests on stdio");

    let stats = serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        handle.clone(),
        config.max_line_bytes,
        shutdown_rx,
    )
    .await?;

    // Shutdown router
    tracing::info!("Shutting down router thread");
    handle.shutdown().await?;
    drop(handle);
    tokio::task::spawn_blocking(move || router.join())
        .await
        .map_err(|_| RouterError::ThreadPanic)??;

    tracing::info!("Relay stopped");
    Ok(stats)
}
