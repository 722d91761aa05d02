use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::link::DanglingLink;
use crate::sequence::{Clip, ClipId, Sequence, Transition, TransitionEdge};

/// One reversible primitive edit.
///
/// Every variant carries both sides of the change so it can be replayed
/// forward or inverted without consulting any other state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    SetTimelineIn {
        clip: ClipId,
        old: i64,
        new: i64,
    },
    SetTimelineOut {
        clip: ClipId,
        old: i64,
        new: i64,
    },
    IncreaseClipIn {
        clip: ClipId,
        amount: i64,
    },
    AddClip {
        slot: usize,
        clip: Clip,
    },
    DeleteClip {
        slot: usize,
        clip: Clip,
    },
    SetLinks {
        clip: ClipId,
        old: Vec<ClipId>,
        new: Vec<ClipId>,
    },
    SetTransition {
        clip: ClipId,
        edge: TransitionEdge,
        old: Option<Transition>,
        new: Option<Transition>,
    },
}

impl EditOp {
    /// Clip the op touches.
    pub fn clip_id(&self) -> ClipId {
        match self {
            Self::SetTimelineIn { clip, .. }
            | Self::SetTimelineOut { clip, .. }
            | Self::IncreaseClipIn { clip, .. }
            | Self::SetLinks { clip, .. }
            | Self::SetTransition { clip, .. } => *clip,
            Self::AddClip { clip, .. } | Self::DeleteClip { clip, .. } => clip.id,
        }
    }

    fn redo(&self, sequence: &mut Sequence) {
        match self {
            Self::AddClip { slot, clip } => sequence.place(*slot, clip.clone()),
            Self::DeleteClip { slot, .. } => {
                let _ = sequence.vacate(*slot);
            }
            _ => self.update(sequence, true),
        }
    }

    fn undo(&self, sequence: &mut Sequence) {
        match self {
            Self::AddClip { slot, .. } => {
                let _ = sequence.vacate(*slot);
            }
            Self::DeleteClip { slot, clip } => sequence.place(*slot, clip.clone()),
            _ => self.update(sequence, false),
        }
    }

    fn update(&self, sequence: &mut Sequence, forward: bool) {
        let id = self.clip_id();
        let Some(clip) = sequence.clip_mut(id) else {
            warn!(clip_id = id, op = ?self, "edit op targets a missing clip");
            return;
        };
        let pick = |old: i64, new: i64| if forward { new } else { old };
        match self {
            Self::SetTimelineIn { old, new, .. } => clip.timeline_in = pick(*old, *new),
            Self::SetTimelineOut { old, new, .. } => clip.timeline_out = pick(*old, *new),
            Self::IncreaseClipIn { amount, .. } => {
                clip.clip_in += if forward { *amount } else { -*amount };
            }
            Self::SetLinks { old, new, .. } => {
                clip.linked = if forward { new.clone() } else { old.clone() };
            }
            Self::SetTransition { edge, old, new, .. } => {
                *clip.transition_mut(*edge) = if forward { *new } else { *old };
            }
            Self::AddClip { .. } | Self::DeleteClip { .. } => {}
        }
    }
}

/// Write-ahead batch of primitive edits produced by one user gesture.
///
/// The recording methods apply each primitive to the sequence they are given
/// and log it. Engine gestures record against a working copy, so a gesture
/// that is abandoned leaves the real sequence untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineAction {
    pub label: String,
    ops: Vec<EditOp>,
}

impl TimelineAction {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Clips touched by the action, in first-touch order.
    pub fn touched_clips(&self) -> Vec<ClipId> {
        let mut touched = Vec::new();
        for op in &self.ops {
            let id = op.clip_id();
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
        touched
    }

    /// Replays the action onto the state it was recorded against.
    pub fn redo(&self, sequence: &mut Sequence) {
        for op in &self.ops {
            op.redo(sequence);
        }
    }

    /// Restores the state the action was recorded against.
    pub fn undo(&self, sequence: &mut Sequence) {
        for op in self.ops.iter().rev() {
            op.undo(sequence);
        }
    }

    pub fn set_timeline_in(&mut self, sequence: &mut Sequence, id: ClipId, frame: i64) {
        let Some(clip) = sequence.clip(id) else {
            return;
        };
        if clip.timeline_in == frame {
            return;
        }
        let old = clip.timeline_in;
        self.record(
            sequence,
            EditOp::SetTimelineIn {
                clip: id,
                old,
                new: frame,
            },
        );
    }

    pub fn set_timeline_out(&mut self, sequence: &mut Sequence, id: ClipId, frame: i64) {
        let Some(clip) = sequence.clip(id) else {
            return;
        };
        if clip.timeline_out == frame {
            return;
        }
        let old = clip.timeline_out;
        self.record(
            sequence,
            EditOp::SetTimelineOut {
                clip: id,
                old,
                new: frame,
            },
        );
    }

    pub fn increase_clip_in(&mut self, sequence: &mut Sequence, id: ClipId, amount: i64) {
        if amount == 0 || sequence.clip(id).is_none() {
            return;
        }
        self.record(sequence, EditOp::IncreaseClipIn { clip: id, amount });
    }

    /// Appends `clip` in a new slot and returns the slot.
    pub fn add_clip(&mut self, sequence: &mut Sequence, clip: Clip) -> usize {
        let slot = sequence.slot_count();
        self.record(sequence, EditOp::AddClip { slot, clip });
        slot
    }

    pub fn delete_clip(&mut self, sequence: &mut Sequence, id: ClipId) {
        let Some(slot) = sequence.slot_of(id) else {
            return;
        };
        let Some(clip) = sequence.clip_at(slot).cloned() else {
            return;
        };
        self.record(sequence, EditOp::DeleteClip { slot, clip });
    }

    pub fn set_links(&mut self, sequence: &mut Sequence, id: ClipId, links: Vec<ClipId>) {
        let Some(clip) = sequence.clip(id) else {
            return;
        };
        if clip.linked == links {
            return;
        }
        let old = clip.linked.clone();
        self.record(
            sequence,
            EditOp::SetLinks {
                clip: id,
                old,
                new: links,
            },
        );
    }

    pub fn set_transition(
        &mut self,
        sequence: &mut Sequence,
        id: ClipId,
        edge: TransitionEdge,
        transition: Option<Transition>,
    ) {
        let Some(clip) = sequence.clip(id) else {
            return;
        };
        let old = clip.transition(edge);
        if old == transition {
            return;
        }
        self.record(
            sequence,
            EditOp::SetTransition {
                clip: id,
                edge,
                old,
                new: transition,
            },
        );
    }

    /// Shortens transitions of `id` that outgrew the clip.
    pub(crate) fn clamp_transitions(&mut self, sequence: &mut Sequence, id: ClipId) {
        let Some(clip) = sequence.clip(id) else {
            return;
        };
        let length = clip.length();
        let clamped: Vec<_> = [TransitionEdge::Opening, TransitionEdge::Closing]
            .into_iter()
            .filter_map(|edge| {
                clip.transition(edge)
                    .filter(|transition| transition.length > length)
                    .map(|transition| (edge, transition.clamped(length)))
            })
            .collect();
        for (edge, transition) in clamped {
            self.set_transition(sequence, id, edge, Some(transition));
        }
    }

    fn record(&mut self, sequence: &mut Sequence, op: EditOp) {
        op.redo(sequence);
        self.ops.push(op);
    }
}

/// Receiver of committed actions, typically an undo stack.
pub trait ActionSink {
    fn push(&mut self, action: TimelineAction);
}

impl ActionSink for Vec<TimelineAction> {
    fn push(&mut self, action: TimelineAction) {
        Vec::push(self, action);
    }
}

/// Result of a committed gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedEdit {
    pub action: TimelineAction,
    /// Clips that must be redrawn.
    pub redraw: Vec<ClipId>,
    /// Link ids that no longer resolved and were dropped.
    pub dangling: Vec<DanglingLink>,
    /// Playhead position requested by the gesture.
    pub seek_to: Option<i64>,
}

/// Working state of one gesture: the untouched base sequence, a working copy
/// that primitives are applied to, and the action recording them.
pub(crate) struct Gesture<'a> {
    pub base: &'a Sequence,
    pub working: Sequence,
    pub action: TimelineAction,
    pub dangling: Vec<DanglingLink>,
    pub seek_to: Option<i64>,
}

impl<'a> Gesture<'a> {
    pub fn begin(base: &'a Sequence, label: &str) -> Self {
        Self {
            base,
            working: base.clone(),
            action: TimelineAction::new(label),
            dangling: Vec::new(),
            seek_to: None,
        }
    }

    /// Returns the working copy to swap in, or `None` when nothing was recorded.
    pub fn finish(self) -> Option<(Sequence, StagedEdit)> {
        if self.action.is_empty() {
            return None;
        }
        let redraw = self.action.touched_clips();
        Some((
            self.working,
            StagedEdit {
                action: self.action,
                redraw,
                dangling: self.dangling,
                seek_to: self.seek_to,
            },
        ))
    }

    pub fn note_dangling(&mut self, link: DanglingLink) {
        if !self.dangling.contains(&link) {
            self.dangling.push(link);
        }
    }
}

/// Swaps a finished gesture into `sequence`.
pub(crate) fn commit(
    sequence: &mut Sequence,
    outcome: Option<(Sequence, StagedEdit)>,
) -> Option<StagedEdit> {
    let (working, staged) = outcome?;
    *sequence = working;
    Some(staged)
}
