//! Sequence, settings and media library files.
//!
//! Everything is stored as JSON. Sequences are written through a temporary
//! file and renamed into place.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::link::DanglingLink;
use crate::media::MediaLibrary;
use crate::sequence::Sequence;
use crate::settings::EditorSettings;

/// What to do with links that point at clips missing from a loaded sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Refuse the file.
    Strict,
    /// Drop the links and report them.
    #[default]
    Prune,
}

/// Loads a sequence file.
///
/// Returns the dangling links that were dropped under [`LinkPolicy::Prune`].
pub fn load_sequence(path: &Path, policy: LinkPolicy) -> Result<(Sequence, Vec<DanglingLink>)> {
    let mut sequence: Sequence = read_json(path, "failed to read sequence file")?;
    let dangling = sequence.dangling_links();

    if let Some(first) = dangling.first() {
        match policy {
            LinkPolicy::Strict => {
                return Err(EngineError::InvalidLink {
                    clip: first.clip,
                    target: first.target,
                });
            }
            LinkPolicy::Prune => {
                warn!(
                    path = %path.display(),
                    dropped = dangling.len(),
                    "pruning links to missing clips"
                );
                sequence.prune_links(&dangling);
            }
        }
    }

    info!(
        path = %path.display(),
        clips = sequence.clip_count(),
        "sequence loaded"
    );
    Ok((sequence, dangling))
}

/// Writes `sequence` as pretty JSON.
pub fn save_sequence(sequence: &Sequence, path: &Path) -> Result<()> {
    let json = to_json(sequence, path)?;
    let temp_path = path.with_extension("json.tmp");

    std::fs::write(&temp_path, json.as_bytes()).map_err(|source| EngineError::SequenceIo {
        context: "failed to write sequence file",
        path: temp_path.clone(),
        source,
    })?;
    if let Err(source) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(EngineError::SequenceIo {
            context: "failed to move sequence file into place",
            path: path.to_path_buf(),
            source,
        });
    }

    info!(
        path = %path.display(),
        clips = sequence.clip_count(),
        "sequence saved"
    );
    Ok(())
}

/// Serializes `sequence` to pretty JSON without touching the filesystem.
pub fn sequence_to_json(sequence: &Sequence) -> Result<String> {
    to_json(sequence, Path::new("<memory>"))
}

pub fn load_settings(path: &Path) -> Result<EditorSettings> {
    read_json(path, "failed to read settings file")
}

pub fn load_media_library(path: &Path) -> Result<MediaLibrary> {
    read_json(path, "failed to read media library file")
}

fn read_json<T: DeserializeOwned>(path: &Path, context: &'static str) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| EngineError::SequenceIo {
        context,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::SequenceSerialization {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json<T: Serialize>(value: &T, path: &Path) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|source| EngineError::SequenceSerialization {
        path: path.to_path_buf(),
        source,
    })
}
