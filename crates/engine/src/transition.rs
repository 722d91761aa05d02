use tracing::info;

use crate::action::{Gesture, StagedEdit, commit};
use crate::selection::{Selection, is_clip_selected};
use crate::sequence::{Sequence, Transition, TransitionEdge, TransitionKind};

/// Gives every fully selected clip an opening and a closing transition where
/// it has none. Video clips get a cross dissolve, audio clips a linear fade,
/// each `default_length` frames long or the clip's length if shorter.
pub fn add_transition(
    sequence: &mut Sequence,
    selections: &[Selection],
    default_length: i64,
) -> Option<StagedEdit> {
    if default_length <= 0 {
        return None;
    }
    let mut gesture = Gesture::begin(sequence, "Add Transition");

    for id in gesture.working.clip_ids() {
        let Some(clip) = gesture.working.clip(id) else {
            continue;
        };
        if !is_clip_selected(clip, selections, true) {
            continue;
        }
        let kind = if clip.track.is_video() {
            TransitionKind::CrossDissolve
        } else {
            TransitionKind::LinearFade
        };
        let transition = Transition::new(kind, default_length).clamped(clip.length());
        let missing: Vec<TransitionEdge> = [TransitionEdge::Opening, TransitionEdge::Closing]
            .into_iter()
            .filter(|edge| clip.transition(*edge).is_none())
            .collect();
        for edge in missing {
            gesture
                .action
                .set_transition(&mut gesture.working, id, edge, Some(transition));
        }
    }

    let staged = commit(sequence, gesture.finish());
    match &staged {
        Some(staged) => info!(clips = staged.redraw.len(), "transitions added"),
        None => info!("add transition rejected: no selected clip without transitions"),
    }
    staged
}
