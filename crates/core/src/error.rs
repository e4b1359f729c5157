// crates/core/src/error.rs
use thiserror::Error;

/// Rejections produced while validating an upload.
///
/// The `Display` strings are the machine-stable messages returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("audio file is required")]
    Missing,

    #[error("invalid file type. Allowed: mp3, wav, m4a, ogg, flac, mp4, avi, mov")]
    InvalidType { file_name: String },

    #[error("file size exceeds {}mb limit", .limit / (1024 * 1024))]
    TooLarge { size: u64, limit: u64 },
}

/// A status string that is not one of the five wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0}")]
pub struct StatusParseError(pub String);

/// A segment list that breaks the ordering rules for transcript segments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("segment {index} ends before it starts ({start} > {end})")]
    Inverted { index: i64, start: f64, end: f64 },

    #[error("segment {index} starts at {start}, before the previous segment ({previous})")]
    OutOfOrder { index: i64, start: f64, previous: f64 },

    #[error("segment index {index} does not follow {previous}")]
    IndexNotAscending { index: i64, previous: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_messages_are_stable() {
        assert_eq!(UploadError::Missing.to_string(), "audio file is required");
        assert_eq!(
            UploadError::InvalidType {
                file_name: "notes.pdf".into()
            }
            .to_string(),
            "invalid file type. Allowed: mp3, wav, m4a, ogg, flac, mp4, avi, mov"
        );
        assert_eq!(
            UploadError::TooLarge {
                size: 200 * 1024 * 1024,
                limit: 100 * 1024 * 1024
            }
            .to_string(),
            "file size exceeds 100mb limit"
        );
    }

    #[test]
    fn test_status_parse_error_display() {
        let err = StatusParseError("running".into());
        assert_eq!(err.to_string(), "unknown job status: running");
    }
}
