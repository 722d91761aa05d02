use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::media::MediaId;
use crate::sequence::ClipId;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and sequence loading.
///
/// Edit gestures that have nothing to do are refusals, not errors: they
/// return `None` and leave the sequence untouched.
#[derive(Debug)]
pub enum EngineError {
    InvalidRational {
        num: i32,
        den: i32,
    },
    InvalidClipRange {
        clip: ClipId,
        timeline_in: i64,
        timeline_out: i64,
    },
    DuplicateClipId {
        clip: ClipId,
    },
    ClipNotFound {
        clip: ClipId,
    },
    MediaNotFound {
        media: MediaId,
    },
    MissingStream {
        media: MediaId,
    },
    InvalidLink {
        clip: ClipId,
        target: ClipId,
    },
    SequenceIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    SequenceSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidSequenceFile {
        reason: String,
    },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRational { num, den } => write!(f, "invalid rational {num}/{den}"),
            Self::InvalidClipRange {
                clip,
                timeline_in,
                timeline_out,
            } => write!(
                f,
                "invalid timeline range in clip {clip}: {timeline_in}..{timeline_out}"
            ),
            Self::DuplicateClipId { clip } => write!(f, "clip id used twice: {clip}"),
            Self::ClipNotFound { clip } => write!(f, "clip not found: {clip}"),
            Self::MediaNotFound { media } => write!(f, "media not found: {media}"),
            Self::MissingStream { media } => {
                write!(f, "media {media} has no video or audio stream to place")
            }
            Self::InvalidLink { clip, target } => {
                write!(f, "clip {clip} links to missing clip {target}")
            }
            Self::SequenceIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::SequenceSerialization { path, source } => write!(
                f,
                "sequence serialization/deserialization failed at {} ({source})",
                path.display()
            ),
            Self::InvalidSequenceFile { reason } => write!(f, "invalid sequence file: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SequenceIo { source, .. } => Some(source),
            Self::SequenceSerialization { source, .. } => Some(source),
            _ => None,
        }
    }
}
