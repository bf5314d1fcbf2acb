//! Request-scoped temporary storage for uploaded images.
//!
//! A [`TempUpload`] owns its file: it is deleted by [`TempUpload::release`] on
//! the normal path and by `Drop` on every other path. Deletion failures are
//! logged and otherwise ignored.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};

/// An uploaded image stored on disk for the duration of one request.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    content_type: String,
    size_bytes: usize,
    released: bool,
}

impl TempUpload {
    /// Write `bytes` to a new, randomly named file under `dir`.
    pub async fn persist(dir: &Path, bytes: &[u8], content_type: &str) -> io::Result<Self> {
        Self::persist_from(dir, bytes, content_type).await
    }

    /// Stream `reader` into a new, randomly named file under `dir`.
    ///
    /// The guard exists before the first byte is written, so a failed or
    /// partial write leaves nothing behind.
    pub async fn persist_from<R>(dir: &Path, mut reader: R, content_type: &str) -> io::Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        tokio::fs::create_dir_all(dir).await?;
        let mut upload = Self {
            path: dir.join(format!("upload-{}", uuid::Uuid::new_v4())),
            content_type: content_type.to_string(),
            size_bytes: 0,
            released: false,
        };

        let mut file = tokio::fs::File::create(&upload.path).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        upload.size_bytes = usize::try_from(written).unwrap_or(usize::MAX);

        tracing::debug!(
            path = %upload.path.display(),
            size_bytes = upload.size_bytes,
            "Stored upload"
        );
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Read the stored bytes back.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Delete the file now.
    ///
    /// Failures are logged here. The guard is disarmed either way, so `Drop`
    /// does not try again.
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        let result = tokio::fs::remove_file(&self.path).await;
        if let Err(e) = &result {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to delete upload");
        }
        result
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Deleted upload on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to delete upload")
            }
        }
    }
}
