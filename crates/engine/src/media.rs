use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::{Gesture, StagedEdit, commit};
use crate::area::delete_areas_and_relink;
use crate::error::{EngineError, Result};
use crate::selection::Selection;
use crate::sequence::{Clip, Sequence, Track};

/// Opaque identifier for imported media.
pub type MediaId = u64;

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Stream metadata supplied by the media prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    pub file_index: usize,
    pub kind: StreamKind,
    /// Duration in sequence frames.
    pub duration: i64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub channels: u16,
}

/// Imported source file. Shared read-only by every clip that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub name: String,
    pub path: PathBuf,
    pub streams: Vec<MediaStream>,
}

impl Media {
    pub fn stream(&self, file_index: usize) -> Option<&MediaStream> {
        self.streams
            .iter()
            .find(|stream| stream.file_index == file_index)
    }
}

/// Reference from a clip to one stream of one media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_id: MediaId,
    pub stream_index: usize,
}

/// Media known to an editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaLibrary {
    media: Vec<Arc<Media>>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces media with the same id.
    pub fn add(&mut self, media: Media) -> Arc<Media> {
        let media = Arc::new(media);
        self.media.retain(|existing| existing.id != media.id);
        self.media.push(Arc::clone(&media));
        media
    }

    pub fn get(&self, id: MediaId) -> Result<Arc<Media>> {
        self.media
            .iter()
            .find(|media| media.id == id)
            .cloned()
            .ok_or(EngineError::MediaNotFound { media: id })
    }

    /// Resolves the stream behind a clip's media reference.
    pub fn stream(&self, media: &MediaRef) -> Option<&MediaStream> {
        self.media
            .iter()
            .find(|candidate| candidate.id == media.media_id)
            .and_then(|candidate| candidate.stream(media.stream_index))
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }
}

/// Places one clip per video/audio stream of `media` starting at frame `at`.
///
/// Video streams land on consecutive video tracks and audio streams on
/// consecutive audio tracks, both starting `track_offset` tracks away from
/// the video/audio divide. All placed clips are linked to each other.
/// Whatever occupied the destination ranges is cleared first.
pub fn import_media(
    sequence: &mut Sequence,
    media: &Media,
    at: i64,
    track_offset: u16,
) -> Result<Option<StagedEdit>> {
    let at = at.max(0);
    let mut gesture = Gesture::begin(sequence, "Import");

    let mut placed = Vec::<Clip>::new();
    let mut areas = Vec::<Selection>::new();
    let (mut video_index, mut audio_index) = (track_offset, track_offset);
    for stream in media.streams.iter().filter(|stream| stream.duration > 0) {
        let track = match stream.kind {
            StreamKind::Video => {
                video_index += 1;
                Track::video(video_index - 1)
            }
            StreamKind::Audio => {
                audio_index += 1;
                Track::audio(audio_index - 1)
            }
        };
        let id = gesture.working.allocate_clip_id();
        let mut clip = Clip::new(id, track, at, at + stream.duration);
        clip.name = media.name.clone();
        clip.media = Some(MediaRef {
            media_id: media.id,
            stream_index: stream.file_index,
        });
        areas.push(Selection::new(clip.timeline_in, clip.timeline_out, track));
        placed.push(clip);
    }

    if placed.is_empty() {
        return Err(EngineError::MissingStream { media: media.id });
    }

    let ids: Vec<_> = placed.iter().map(|clip| clip.id).collect();
    for clip in &mut placed {
        clip.linked = ids.iter().copied().filter(|id| *id != clip.id).collect();
    }

    delete_areas_and_relink(&mut gesture, &mut areas);
    for clip in placed {
        gesture.action.add_clip(&mut gesture.working, clip);
    }

    debug!(media_id = media.id, at, clips = ids.len(), "media placed");
    Ok(commit(sequence, gesture.finish()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Media, MediaLibrary, MediaRef, MediaStream, StreamKind, import_media};
    use crate::error::EngineError;
    use crate::sequence::{Clip, Sequence, SequenceSettings, Track};

    #[test]
    fn import_places_linked_video_and_audio_clips() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        let staged = import_media(&mut sequence, &sample_media(), 12, 0)
            .expect("import should succeed")
            .expect("import should stage clips");

        assert_eq!(staged.action.len(), 2);
        let clips: Vec<&Clip> = sequence.clips().collect();
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].track, Track(-1));
        assert_eq!(clips[1].track, Track(0));
        assert_eq!((clips[0].timeline_in, clips[0].timeline_out), (12, 112));
        assert_eq!(clips[0].linked, vec![clips[1].id]);
        assert_eq!(clips[1].linked, vec![clips[0].id]);
    }

    #[test]
    fn import_overwrites_destination_range() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        sequence
            .insert_clip(Clip::new(1, Track(-1), 0, 50))
            .expect("insert should succeed");

        import_media(&mut sequence, &sample_media(), 20, 0)
            .expect("import should succeed")
            .expect("import should stage clips");

        let existing = sequence.clip(1).expect("existing clip survives trimmed");
        assert_eq!(existing.timeline_out, 20);
    }

    #[test]
    fn track_offset_moves_clips_away_from_the_divide() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        import_media(&mut sequence, &sample_media(), 0, 2)
            .expect("import should succeed")
            .expect("import should stage clips");

        let tracks: Vec<Track> = sequence.clips().map(|clip| clip.track).collect();
        assert_eq!(tracks, vec![Track::video(2), Track::audio(2)]);
    }

    #[test]
    fn import_without_streams_is_an_error() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        let media = Media {
            streams: Vec::new(),
            ..sample_media()
        };
        assert!(matches!(
            import_media(&mut sequence, &media, 0, 0),
            Err(EngineError::MissingStream { media: 7 })
        ));
        assert_eq!(sequence.clip_count(), 0);
    }

    #[test]
    fn library_add_replaces_media_with_same_id() {
        let mut library = MediaLibrary::new();
        library.add(sample_media());
        library.add(Media {
            name: "renamed".to_string(),
            ..sample_media()
        });
        assert_eq!(library.len(), 1);
        assert_eq!(library.get(7).expect("media exists").name, "renamed");
        assert!(library.get(8).is_err());

        let audio = library.stream(&MediaRef {
            media_id: 7,
            stream_index: 1,
        });
        assert_eq!(audio.map(|stream| stream.kind), Some(StreamKind::Audio));
    }

    fn sample_media() -> Media {
        Media {
            id: 7,
            name: "demo.mp4".to_string(),
            path: PathBuf::from("demo.mp4"),
            streams: vec![
                MediaStream {
                    file_index: 0,
                    kind: StreamKind::Video,
                    duration: 100,
                    width: 160,
                    height: 90,
                    channels: 0,
                },
                MediaStream {
                    file_index: 1,
                    kind: StreamKind::Audio,
                    duration: 100,
                    width: 0,
                    height: 0,
                    channels: 2,
                },
            ],
        }
    }
}
