// crates/server/src/storage.rs
//! Raw media storage under the upload directory.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use transcribe_core::{stored_path, JobId, OwnerId};

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the media for a job to `<root>/user_<owner>/<job_id><ext>` and
    /// return that path. The bytes land under a `.part` name first, so a
    /// failed write leaves nothing at either path.
    pub async fn save(
        &self,
        owner_id: OwnerId,
        job_id: JobId,
        ext: &str,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let path = stored_path(&self.root, owner_id, job_id, ext);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut partial = path.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let written = async {
            tokio::fs::write(&partial, bytes).await?;
            tokio::fs::rename(&partial, &path).await
        }
        .await;
        if let Err(e) = written {
            if let Err(cleanup) = self.remove(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "failed to remove partial upload");
            }
            return Err(e);
        }
        Ok(path)
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
