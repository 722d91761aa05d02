use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action::{Gesture, StagedEdit, commit};
use crate::area::delete_areas_and_relink;
use crate::link::choose_fragments;
use crate::selection::{Selection, clean_up_selections};
use crate::sequence::{Clip, ClipId, Sequence, TransitionEdge};

/// One copied clip, tagged with the id of the clip it was copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub load_id: ClipId,
    /// Copy positioned relative to the start of the copied material. Its
    /// `linked` list still holds the source ids.
    pub clip: Clip,
}

/// Copied timeline material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipboard {
    entries: Vec<ClipboardEntry>,
}

impl Clipboard {
    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames spanned by the copied material.
    pub fn length(&self) -> i64 {
        self.entries
            .iter()
            .map(|entry| entry.clip.timeline_out)
            .max()
            .unwrap_or(0)
    }
}

/// Copies the selected parts of every clip.
///
/// Each clip overlapping a selection on its track is copied and trimmed to
/// the selection, advancing `clip_in` when its head is cut off. The copies
/// are shifted so the earliest one starts at frame 0.
pub fn copy(sequence: &Sequence, selections: &[Selection]) -> Clipboard {
    let mut areas: Vec<Selection> = selections.to_vec();
    clean_up_selections(&mut areas);

    let mut entries = Vec::new();
    for area in areas.iter().filter(|area| !area.is_empty()) {
        for clip in sequence.clips().filter(|clip| area.overlaps_clip(clip)) {
            let mut copied = clip.clone();
            if copied.timeline_in < area.in_point {
                copied.clip_in += area.in_point - copied.timeline_in;
                copied.timeline_in = area.in_point;
            }
            copied.timeline_out = copied.timeline_out.min(area.out_point);
            let length = copied.length();
            for edge in [TransitionEdge::Opening, TransitionEdge::Closing] {
                let slot = copied.transition_mut(edge);
                *slot = slot.map(|transition| transition.clamped(length));
            }
            entries.push(ClipboardEntry {
                load_id: clip.id,
                clip: copied,
            });
        }
    }

    if let Some(start) = entries.iter().map(|entry| entry.clip.timeline_in).min() {
        for entry in &mut entries {
            entry.clip.timeline_in -= start;
            entry.clip.timeline_out -= start;
        }
    }

    debug!(clips = entries.len(), "selection copied");
    Clipboard { entries }
}

/// Pastes `clipboard` at `playhead`, overwriting whatever is underneath. A
/// playhead before frame 0 pastes at frame 0.
///
/// Pasted clips get fresh ids. Links between copied clips are rebuilt among
/// the pasted clips; links to anything outside the clipboard are dropped.
/// With `seek_after`, the edit asks for the playhead to move to the end of
/// the pasted material.
pub fn paste(
    sequence: &mut Sequence,
    clipboard: &Clipboard,
    playhead: i64,
    seek_after: bool,
) -> Option<StagedEdit> {
    if clipboard.is_empty() {
        debug!("paste rejected: clipboard empty");
        return None;
    }

    let playhead = playhead.max(0);
    let mut gesture = Gesture::begin(sequence, "Paste");
    let mut pasted = Vec::<Clip>::with_capacity(clipboard.len());
    let mut areas = Vec::<Selection>::with_capacity(clipboard.len());
    for entry in &clipboard.entries {
        let id = gesture.working.allocate_clip_id();
        let mut clip = entry.clip.duplicate(id);
        clip.timeline_in += playhead;
        clip.timeline_out += playhead;
        areas.push(Selection::of_clip(&clip));
        pasted.push(clip);
    }

    delete_areas_and_relink(&mut gesture, &mut areas);

    let starts: Vec<(ClipId, ClipId, i64)> = clipboard
        .entries
        .iter()
        .zip(&pasted)
        .map(|(entry, clip)| (entry.load_id, clip.id, clip.timeline_in))
        .collect();
    for (entry, clip) in clipboard.entries.iter().zip(pasted.iter_mut()) {
        for partner in &entry.clip.linked {
            let candidates: Vec<(ClipId, i64)> = starts
                .iter()
                .filter(|(load_id, id, _)| load_id == partner && *id != clip.id)
                .map(|(_, id, start)| (*id, *start))
                .collect();
            for id in choose_fragments(clip.timeline_in, &candidates) {
                if !clip.linked.contains(&id) {
                    clip.linked.push(id);
                }
            }
        }
    }

    let paste_end = pasted
        .iter()
        .map(|clip| clip.timeline_out)
        .max()
        .unwrap_or(playhead);
    for clip in pasted {
        gesture.action.add_clip(&mut gesture.working, clip);
    }
    if seek_after {
        gesture.seek_to = Some(paste_end);
    }

    let staged = commit(sequence, gesture.finish());
    if let Some(staged) = &staged {
        info!(playhead, paste_end, ops = staged.action.len(), "paste applied");
    }
    staged
}
