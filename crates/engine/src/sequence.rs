use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::link::DanglingLink;
use crate::media::MediaRef;
use crate::time::Rational;

/// Stable clip identifier. Allocated by the owning [`Sequence`] and never reused.
pub type ClipId = u64;

/// Track number. Negative tracks hold video, non-negative tracks hold audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track(pub i32);

impl Track {
    /// Video track `index`, counted upward from `-1`.
    pub fn video(index: u16) -> Self {
        Self(-i32::from(index) - 1)
    }

    /// Audio track `index`, counted downward from `0`.
    pub fn audio(index: u16) -> Self {
        Self(i32::from(index))
    }

    pub fn is_video(self) -> bool {
        self.0 < 0
    }

    pub fn is_audio(self) -> bool {
        !self.is_video()
    }

    /// Zero-based index within the video or audio partition.
    pub fn index(self) -> usize {
        if self.is_video() {
            (-(self.0 + 1)) as usize
        } else {
            self.0 as usize
        }
    }
}

/// Display color of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 192,
        }
    }
}

/// Effect kind of a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    #[default]
    CrossDissolve,
    LinearFade,
}

/// Edge of a clip a transition is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionEdge {
    Opening,
    Closing,
}

/// Bounded-length effect owned by one clip edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub length: i64,
}

impl Transition {
    pub fn new(kind: TransitionKind, length: i64) -> Self {
        Self { kind, length }
    }

    /// Returns a copy whose length does not exceed `max_length`.
    pub fn clamped(self, max_length: i64) -> Self {
        Self {
            length: self.length.min(max_length),
            ..self
        }
    }
}

/// A placed instance of media on the timeline with its own trim window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub media: Option<MediaRef>,
    pub track: Track,
    pub timeline_in: i64,
    pub timeline_out: i64,
    #[serde(default)]
    pub clip_in: i64,
    #[serde(default)]
    pub linked: Vec<ClipId>,
    #[serde(default)]
    pub opening_transition: Option<Transition>,
    #[serde(default)]
    pub closing_transition: Option<Transition>,
    #[serde(default)]
    pub undeletable: bool,
    #[serde(default)]
    pub color: Color,
}

impl Clip {
    /// Creates an unlinked clip without media covering `[timeline_in, timeline_out)`.
    pub fn new(id: ClipId, track: Track, timeline_in: i64, timeline_out: i64) -> Self {
        Self {
            id,
            name: String::new(),
            media: None,
            track,
            timeline_in,
            timeline_out,
            clip_in: 0,
            linked: Vec::new(),
            opening_transition: None,
            closing_transition: None,
            undeletable: false,
            color: Color::default(),
        }
    }

    pub fn length(&self) -> i64 {
        self.timeline_out - self.timeline_in
    }

    /// Deep copy under a new id. Links are not copied; the caller re-resolves them.
    pub fn duplicate(&self, id: ClipId) -> Self {
        Self {
            id,
            linked: Vec::new(),
            ..self.clone()
        }
    }

    pub fn transition(&self, edge: TransitionEdge) -> Option<Transition> {
        match edge {
            TransitionEdge::Opening => self.opening_transition,
            TransitionEdge::Closing => self.closing_transition,
        }
    }

    pub(crate) fn transition_mut(&mut self, edge: TransitionEdge) -> &mut Option<Transition> {
        match edge {
            TransitionEdge::Opening => &mut self.opening_transition,
            TransitionEdge::Closing => &mut self.closing_transition,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeline_in < 0 || self.timeline_in >= self.timeline_out {
            return Err(EngineError::InvalidClipRange {
                clip: self.id,
                timeline_in: self.timeline_in,
                timeline_out: self.timeline_out,
            });
        }
        Ok(())
    }
}

/// Audio channel layout of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
    Surround51,
}

impl ChannelLayout {
    pub fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround51 => 6,
        }
    }
}

/// Output format of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub audio_sample_rate: u32,
    pub audio_layout: ChannelLayout,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: Rational::FPS_30,
            audio_sample_rate: 48_000,
            audio_layout: ChannelLayout::Stereo,
        }
    }
}

/// Parallel tracks of clips.
///
/// Clips live in slots; a slot is tombstoned when its clip is deleted so the
/// slot positions of other clips never move during an edit. Clips are
/// addressed by [`ClipId`] through an id-to-slot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SequenceData", into = "SequenceData")]
pub struct Sequence {
    pub name: String,
    pub settings: SequenceSettings,
    slots: Vec<Option<Clip>>,
    slot_by_id: HashMap<ClipId, usize>,
    next_clip_id: ClipId,
}

impl Sequence {
    pub fn new(name: impl Into<String>, settings: SequenceSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            slots: Vec::new(),
            slot_by_id: HashMap::new(),
            next_clip_id: 1,
        }
    }

    /// Number of slots, including tombstones.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the clip in `slot`, or `None` for tombstones and out-of-range slots.
    pub fn clip_at(&self, slot: usize) -> Option<&Clip> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.slot_of(id).and_then(|slot| self.clip_at(slot))
    }

    pub(crate) fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        let slot = self.slot_of(id)?;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn slot_of(&self, id: ClipId) -> Option<usize> {
        self.slot_by_id.get(&id).copied()
    }

    /// Live clips in slot order.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.slots.iter().flatten()
    }

    /// Ids of live clips in slot order.
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.clips().map(|clip| clip.id).collect()
    }

    pub fn clip_count(&self) -> usize {
        self.slot_by_id.len()
    }

    /// Last frame covered by any clip.
    pub fn end_frame(&self) -> i64 {
        self.clips()
            .map(|clip| clip.timeline_out)
            .max()
            .unwrap_or(0)
    }

    /// Nearest clip edge before `frame`, or 0.
    pub fn previous_cut(&self, frame: i64) -> i64 {
        self.clips()
            .flat_map(|clip| [clip.timeline_in, clip.timeline_out])
            .filter(|edge| *edge < frame)
            .max()
            .unwrap_or(0)
    }

    /// Nearest clip edge after `frame`.
    pub fn next_cut(&self, frame: i64) -> Option<i64> {
        self.clips()
            .flat_map(|clip| [clip.timeline_in, clip.timeline_out])
            .filter(|edge| *edge > frame)
            .min()
    }

    /// Reserves a fresh clip id.
    pub fn allocate_clip_id(&mut self) -> ClipId {
        let id = self.next_clip_id;
        self.next_clip_id += 1;
        id
    }

    /// Validates and appends a clip in a new slot.
    ///
    /// This is a direct mutation for building and loading sequences; edit
    /// gestures go through [`crate::TimelineAction`] instead.
    pub fn insert_clip(&mut self, clip: Clip) -> Result<ClipId> {
        clip.validate()?;
        if self.slot_by_id.contains_key(&clip.id) {
            return Err(EngineError::DuplicateClipId { clip: clip.id });
        }
        let id = clip.id;
        self.next_clip_id = self.next_clip_id.max(id + 1);
        self.place(self.slots.len(), clip);
        Ok(id)
    }

    /// Tracks of every clip linked to `id` that still exists.
    pub fn tracks_of_linked_clips(&self, id: ClipId) -> Vec<Track> {
        self.clip(id)
            .map(|clip| {
                clip.linked
                    .iter()
                    .filter_map(|target| self.clip(*target))
                    .map(|linked| linked.track)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Link ids that do not resolve to any clip.
    pub fn dangling_links(&self) -> Vec<DanglingLink> {
        self.clips()
            .flat_map(|clip| {
                clip.linked
                    .iter()
                    .filter(|target| !self.slot_by_id.contains_key(target))
                    .map(|target| DanglingLink {
                        clip: clip.id,
                        target: *target,
                    })
            })
            .collect()
    }

    pub(crate) fn prune_links(&mut self, dangling: &[DanglingLink]) {
        for link in dangling {
            if let Some(clip) = self.clip_mut(link.clip) {
                clip.linked.retain(|target| *target != link.target);
            }
        }
    }

    /// Puts `clip` into `slot`, growing the slot list when needed.
    pub(crate) fn place(&mut self, slot: usize, clip: Clip) {
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        self.next_clip_id = self.next_clip_id.max(clip.id + 1);
        self.slot_by_id.insert(clip.id, slot);
        self.slots[slot] = Some(clip);
    }

    /// Empties `slot`. Trailing tombstones are dropped so adding then
    /// removing a clip restores the original slot list.
    pub(crate) fn vacate(&mut self, slot: usize) -> Option<Clip> {
        let clip = self.slots.get_mut(slot)?.take()?;
        self.slot_by_id.remove(&clip.id);
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Some(clip)
    }
}

/// Serialized form of a [`Sequence`]: the id table is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SequenceData {
    name: String,
    settings: SequenceSettings,
    clips: Vec<Option<Clip>>,
}

impl TryFrom<SequenceData> for Sequence {
    type Error = EngineError;

    fn try_from(value: SequenceData) -> Result<Self> {
        let frame_rate = value.settings.frame_rate;
        Rational::new(frame_rate.num, frame_rate.den)?;
        if value.settings.width == 0 || value.settings.height == 0 {
            return Err(EngineError::InvalidSequenceFile {
                reason: format!(
                    "frame size {}x{} is empty",
                    value.settings.width, value.settings.height
                ),
            });
        }
        if value.settings.audio_sample_rate == 0 {
            return Err(EngineError::InvalidSequenceFile {
                reason: "audio sample rate is zero".to_string(),
            });
        }

        let mut sequence = Sequence::new(value.name, value.settings);
        for (slot, clip) in value.clips.into_iter().enumerate() {
            let Some(clip) = clip else {
                continue;
            };
            clip.validate()?;
            if sequence.slot_by_id.contains_key(&clip.id) {
                return Err(EngineError::DuplicateClipId { clip: clip.id });
            }
            sequence.place(slot, clip);
        }
        Ok(sequence)
    }
}

impl From<Sequence> for SequenceData {
    fn from(value: Sequence) -> Self {
        Self {
            name: value.name,
            settings: value.settings,
            clips: value.slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Clip, Sequence, SequenceSettings, Track};
    use crate::error::EngineError;

    #[test]
    fn track_sign_partitions_video_and_audio() {
        assert!(Track::video(0).is_video());
        assert_eq!(Track::video(0), Track(-1));
        assert_eq!(Track::video(2).index(), 2);
        assert!(Track::audio(0).is_audio());
        assert_eq!(Track::audio(3).index(), 3);
    }

    #[test]
    fn insert_rejects_empty_and_negative_ranges() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        let result = sequence.insert_clip(Clip::new(1, Track(-1), 10, 10));
        assert!(matches!(
            result,
            Err(EngineError::InvalidClipRange { clip: 1, .. })
        ));
        assert!(
            sequence
                .insert_clip(Clip::new(2, Track(-1), -5, 10))
                .is_err()
        );
        assert_eq!(sequence.clip_count(), 0);
    }

    #[test]
    fn insert_keeps_id_allocation_ahead_of_loaded_ids() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        sequence
            .insert_clip(Clip::new(41, Track(-1), 0, 10))
            .expect("insert should succeed");
        assert_eq!(sequence.allocate_clip_id(), 42);
    }

    #[test]
    fn vacate_tombstones_inner_slots_and_trims_trailing_ones() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        for id in 1..=3 {
            sequence
                .insert_clip(Clip::new(id, Track(-1), id as i64 * 10, id as i64 * 10 + 5))
                .expect("insert should succeed");
        }

        sequence.vacate(1).expect("slot 1 holds a clip");
        assert_eq!(sequence.slot_count(), 3);
        assert!(sequence.clip(2).is_none());
        assert_eq!(sequence.slot_of(3), Some(2));

        sequence.vacate(2).expect("slot 2 holds a clip");
        assert_eq!(sequence.slot_count(), 1);
    }

    #[test]
    fn zero_frame_size_is_rejected_on_deserialize() {
        let mut settings = SequenceSettings::default();
        settings.width = 0;
        let json = serde_json::to_string(&Sequence::new("bad", settings))
            .expect("serialize should succeed");
        let error = serde_json::from_str::<Sequence>(&json).expect_err("load should fail");
        assert!(error.to_string().contains("frame size 0x1080"));
    }

    #[test]
    fn cut_navigation_walks_clip_edges() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        sequence
            .insert_clip(Clip::new(1, Track(-1), 10, 40))
            .expect("insert should succeed");
        sequence
            .insert_clip(Clip::new(2, Track(0), 25, 60))
            .expect("insert should succeed");

        assert_eq!(sequence.next_cut(10), Some(25));
        assert_eq!(sequence.next_cut(60), None);
        assert_eq!(sequence.previous_cut(25), 10);
        assert_eq!(sequence.previous_cut(5), 0);
        assert_eq!(sequence.end_frame(), 60);
    }

    #[test]
    fn dangling_links_lists_unresolved_targets() {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        let mut clip = Clip::new(1, Track(-1), 0, 10);
        clip.linked = vec![2, 9];
        sequence.insert_clip(clip).expect("insert should succeed");
        sequence
            .insert_clip(Clip::new(2, Track(0), 0, 10))
            .expect("insert should succeed");

        let dangling = sequence.dangling_links();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].target, 9);
        assert_eq!(sequence.tracks_of_linked_clips(1), vec![Track(0)]);
    }
}
