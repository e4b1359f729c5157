// crates/core/src/upload.rs
//! Upload acceptance rules and the storage layout for accepted media.

use std::path::{Path, PathBuf};

use crate::error::UploadError;
use crate::job::{JobId, OwnerId};

/// Media extensions the transcription engine accepts (lowercase, with dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".mp3", ".wav", ".m4a", ".ogg", ".flac", ".mp4", ".avi", ".mov",
];

/// Default upload ceiling: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Return the lowercased extension of `file_name` if it is on the allow-list.
///
/// The extension is everything from the last `.` onward, so `clip.WAV`
/// yields `.wav` and `archive.tar.mp3` yields `.mp3`.
pub fn validate_extension(file_name: &str) -> Result<String, UploadError> {
    let ext = file_name
        .rfind('.')
        .map(|i| file_name[i..].to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(UploadError::InvalidType {
            file_name: file_name.to_string(),
        })
    }
}

/// Reject uploads strictly larger than `limit` bytes.
pub fn check_size(size: u64, limit: u64) -> Result<(), UploadError> {
    if size > limit {
        Err(UploadError::TooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// Per-owner upload directory: `<upload_dir>/user_<owner_id>`.
pub fn owner_dir(upload_dir: &Path, owner_id: OwnerId) -> PathBuf {
    upload_dir.join(format!("user_{owner_id}"))
}

/// Where the media for a job is stored: `<upload_dir>/user_<owner>/<job_id><ext>`.
pub fn stored_path(upload_dir: &Path, owner_id: OwnerId, job_id: JobId, ext: &str) -> PathBuf {
    owner_dir(upload_dir, owner_id).join(format!("{job_id}{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_allowed_extensions_accepted_case_insensitively() {
        assert_eq!(validate_extension("talk.wav").unwrap(), ".wav");
        assert_eq!(validate_extension("TALK.MP3").unwrap(), ".mp3");
        assert_eq!(validate_extension("clip.final.Mov").unwrap(), ".mov");
    }

    #[test]
    fn test_disallowed_extensions_rejected() {
        for name in ["report.pdf", "noext", "song.wav.exe", "trailing."] {
            assert!(
                matches!(validate_extension(name), Err(UploadError::InvalidType { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        assert!(check_size(DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        assert_eq!(
            check_size(DEFAULT_MAX_UPLOAD_BYTES + 1, DEFAULT_MAX_UPLOAD_BYTES),
            Err(UploadError::TooLarge {
                size: DEFAULT_MAX_UPLOAD_BYTES + 1,
                limit: DEFAULT_MAX_UPLOAD_BYTES
            })
        );
    }

    #[test]
    fn test_stored_path_layout() {
        let id = Uuid::parse_str("6f1c1d1e-8a0b-4c53-9a43-2b8d3f0e9a10").unwrap();
        let path = stored_path(Path::new("/data/uploads"), 42, id, ".wav");
        assert_eq!(
            path,
            PathBuf::from("/data/uploads/user_42/6f1c1d1e-8a0b-4c53-9a43-2b8d3f0e9a10.wav")
        );
    }
}
