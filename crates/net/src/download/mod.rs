//! Streaming payload downloads
//!
//! Payloads are written straight to disk while the leading bytes are kept
//! to tell a zip archive from a raw entry file. A transfer that ends short
//! of its declared length fails and leaves no file behind.

mod stream;
mod throttle;
mod validation;

pub use throttle::{ProgressThrottle, DEFAULT_FRAME_INTERVAL};
pub(crate) use validation::validate_url;

use crate::client::NetClient;
use hotswap_errors::{Error, NetworkError};
use hotswap_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext};
use hotswap_types::PayloadKind;
use std::path::Path;
use stream::{PayloadWriter, StreamParams};
use url::Url;

/// Result of a completed payload download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub payload: PayloadKind,
    pub received_bytes: u64,
    /// Declared length, or the received length when none was declared
    pub total_bytes: u64,
}

/// Download `source_url` into `dest`, reporting progress through `progress`.
///
/// # Errors
///
/// Returns `MalformedSource` for an unusable URL before any I/O, an HTTP
/// error for a non-success status, `DownloadIncomplete` when fewer or more
/// bytes arrive than declared or no length is declared at all, or an I/O
/// error writing `dest`.
pub async fn download_payload(
    client: &NetClient,
    source_url: &str,
    dest: &Path,
    progress: &mut ProgressThrottle<'_>,
    tx: Option<&EventSender>,
) -> Result<DownloadOutcome, Error> {
    let url = validate_url(source_url)?;

    let mut params = StreamParams {
        url: source_url,
        total_bytes: None,
        progress,
        tx,
    };

    let mut writer = None;
    let result = transfer(client, &url, dest, &mut params, &mut writer).await;
    let received = writer.as_ref().map_or(0, PayloadWriter::received);

    match result {
        Ok(()) => {
            let Some(writer) = writer else {
                return Err(Error::internal("download produced no payload file"));
            };
            let payload = writer.finish().await?;
            let total_bytes = params.total_bytes.unwrap_or(received);
            tracing::debug!(url = source_url, received, ?payload, "download finished");
            if let Some(tx) = tx {
                tx.emit_download_completed(source_url, received);
            }
            Ok(DownloadOutcome {
                payload,
                received_bytes: received,
                total_bytes,
            })
        }
        Err(e) => {
            // Dropping the writer removes the partial file
            drop(writer);
            tracing::warn!(url = source_url, received, error = %e, "download failed");
            if let Some(tx) = tx {
                tx.emit(AppEvent::Download(DownloadEvent::Failed {
                    url: source_url.to_string(),
                    received_bytes: received,
                    failure: FailureContext::from_error(&e),
                }));
            }
            Err(e)
        }
    }
}

async fn transfer(
    client: &NetClient,
    url: &Url,
    dest: &Path,
    params: &mut StreamParams<'_, '_>,
    writer: &mut Option<PayloadWriter>,
) -> Result<(), Error> {
    if url.scheme() == "file" {
        let source = url
            .to_file_path()
            .map_err(|()| NetworkError::MalformedSource {
                url: url.to_string(),
                message: "not a local file path".to_string(),
            })?;
        let len = tokio::fs::metadata(&source)
            .await
            .map_err(|e| Error::io_with_path(&e, &source))?
            .len();
        params.total_bytes = Some(len);
        emit_started(params);

        let writer = writer.insert(PayloadWriter::create(dest).await?);
        return stream::stream_file(&source, writer, params).await;
    }

    let response = client.get_identity(url.as_str()).await?;
    validation::validate_response(&response)?;
    params.total_bytes = response.content_length();
    emit_started(params);

    let writer = writer.insert(PayloadWriter::create(dest).await?);
    stream::stream_response(response, writer, params).await
}

fn emit_started(params: &StreamParams<'_, '_>) {
    tracing::debug!(url = params.url, total = ?params.total_bytes, "download started");
    if let Some(tx) = params.tx {
        tx.emit_download_started(params.url, params.total_bytes);
    }
}

/// Download `url` into `dest` without progress reporting
///
/// # Errors
///
/// Returns the same failures as [`download_payload`].
pub async fn download_to_file(client: &NetClient, url: &str, dest: &Path) -> Result<u64, Error> {
    let mut progress = ProgressThrottle::disabled();
    let outcome = download_payload(client, url, dest, &mut progress, None).await?;
    Ok(outcome.received_bytes)
}
