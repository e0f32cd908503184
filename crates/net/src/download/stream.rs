//! Low-level streaming download mechanics

use super::throttle::ProgressThrottle;
use futures::StreamExt;
use hotswap_errors::{Error, NetworkError};
use hotswap_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use hotswap_types::{DownloadProgress, PayloadKind};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const HEADER_LEN: usize = PayloadKind::ZIP_MAGIC.len();
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Destination file for a payload; removed on drop unless finished
pub(super) struct PayloadWriter {
    path: PathBuf,
    file: Option<File>,
    header: Vec<u8>,
    received: u64,
}

impl PayloadWriter {
    pub(super) async fn create(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let file = File::create(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            header: Vec::with_capacity(HEADER_LEN),
            received: 0,
        })
    }

    pub(super) fn received(&self) -> u64 {
        self.received
    }

    pub(super) async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), Error> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::internal("payload writer already finished"));
        };

        if self.header.len() < HEADER_LEN {
            let take = (HEADER_LEN - self.header.len()).min(chunk.len());
            self.header.extend_from_slice(&chunk[..take]);
        }
        file.write_all(chunk)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.path))?;
        self.received += chunk.len() as u64;
        Ok(())
    }

    /// Flush and keep the file
    pub(super) async fn finish(mut self) -> Result<PayloadKind, Error> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| Error::io_with_path(&e, &self.path))?;
        }
        Ok(PayloadKind::from_header(&self.header))
    }
}

impl Drop for PayloadWriter {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            // Best-effort cleanup - ignore errors
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Everything the streaming loop reports through
pub(super) struct StreamParams<'p, 'a> {
    pub url: &'p str,
    pub total_bytes: Option<u64>,
    pub progress: &'p mut ProgressThrottle<'a>,
    pub tx: Option<&'p EventSender>,
}

impl StreamParams<'_, '_> {
    fn report(&mut self, received: u64) {
        let total = self.total_bytes.unwrap_or(0);
        self.deliver(DownloadProgress::new(total, received));
    }

    /// Final report once the body is complete
    fn report_final(&mut self, received: u64) {
        let total = self.total_bytes.unwrap_or(received);
        self.deliver(DownloadProgress::new(total, received));
    }

    fn deliver(&mut self, progress: DownloadProgress) {
        if !self.progress.report(progress) {
            return;
        }
        if let Some(tx) = self.tx {
            tx.emit(AppEvent::Download(DownloadEvent::Progress {
                url: self.url.to_string(),
                received_bytes: progress.received_bytes,
                total_bytes: progress.total_bytes,
            }));
        }
    }
}

/// A body without a declared length is never complete
fn check_length(received: u64, expected: Option<u64>) -> Result<(), Error> {
    match expected {
        Some(expected) if expected == received => Ok(()),
        _ => Err(NetworkError::DownloadIncomplete {
            received,
            expected: expected.unwrap_or(0),
        }
        .into()),
    }
}

/// Stream an HTTP response body into `writer`
pub(super) async fn stream_response(
    response: reqwest::Response,
    writer: &mut PayloadWriter,
    params: &mut StreamParams<'_, '_>,
) -> Result<(), Error> {
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                // A body cut short surfaces as a stream error
                return Err(match params.total_bytes {
                    Some(expected) if writer.received() < expected => {
                        NetworkError::DownloadIncomplete {
                            received: writer.received(),
                            expected,
                        }
                        .into()
                    }
                    _ => NetworkError::DownloadFailed(e.to_string()).into(),
                });
            }
        };

        writer.write_chunk(&chunk).await?;
        if params.total_bytes != Some(writer.received()) {
            params.report(writer.received());
        }
    }

    check_length(writer.received(), params.total_bytes)?;
    params.report_final(writer.received());
    Ok(())
}

/// Copy a local file into `writer`
pub(super) async fn stream_file(
    source: &Path,
    writer: &mut PayloadWriter,
    params: &mut StreamParams<'_, '_>,
) -> Result<(), Error> {
    let mut file = File::open(source)
        .await
        .map_err(|e| Error::io_with_path(&e, source))?;
    let mut buf = vec![0u8; FILE_CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::io_with_path(&e, source))?;
        if read == 0 {
            break;
        }
        writer.write_chunk(&buf[..read]).await?;
        if params.total_bytes != Some(writer.received()) {
            params.report(writer.received());
        }
    }

    check_length(writer.received(), params.total_bytes)?;
    params.report_final(writer.received());
    Ok(())
}
