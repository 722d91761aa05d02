use tracing::{debug, info};

use crate::action::{Gesture, StagedEdit, TimelineAction, commit};
use crate::link::{RelinkBatch, apply_relink};
use crate::selection::{Selection, clean_up_selections};
use crate::sequence::Sequence;
use crate::split::bisect;

/// Removes or trims every deletable clip intersecting `areas`.
///
/// `areas` is normalized first. Per clip and same-track selection: a clip
/// inside the selection is deleted, a clip spanning it is bisected, and a
/// clip crossing one edge is trimmed back to that edge. Right remainders of
/// bisected clips are relinked among themselves. Nothing is rippled.
pub(crate) fn delete_areas_and_relink(gesture: &mut Gesture<'_>, areas: &mut Vec<Selection>) {
    clean_up_selections(areas);
    let mut batch = RelinkBatch::new();

    for area in areas.iter().filter(|area| !area.is_empty()) {
        for id in gesture.working.clip_ids() {
            let Some(clip) = gesture.working.clip(id) else {
                continue;
            };
            if clip.track != area.track || clip.undeletable {
                continue;
            }
            let (clip_in, clip_out) = (clip.timeline_in, clip.timeline_out);

            if clip_in >= area.in_point && clip_out <= area.out_point {
                gesture.action.delete_clip(&mut gesture.working, id);
            } else if clip_in < area.in_point && clip_out > area.out_point {
                if let Some(post) = bisect(gesture, id, area.in_point, area.out_point) {
                    batch.push(id, post);
                }
            } else if clip_in < area.in_point && clip_out > area.in_point {
                gesture
                    .action
                    .set_timeline_out(&mut gesture.working, id, area.in_point);
                gesture.action.clamp_transitions(&mut gesture.working, id);
            } else if clip_in < area.out_point && clip_out > area.out_point {
                gesture
                    .action
                    .increase_clip_in(&mut gesture.working, id, area.out_point - clip_in);
                gesture
                    .action
                    .set_timeline_in(&mut gesture.working, id, area.out_point);
                gesture.action.clamp_transitions(&mut gesture.working, id);
            }
        }
    }

    debug!(areas = areas.len(), bisected = batch.len(), "areas deleted");
    apply_relink(gesture, &batch);
}

/// Shifts every clip starting at or after `ripple_point` by `ripple_length`,
/// along with every selection whose pre-ripple in point is at or after it.
pub fn ripple(
    action: &mut TimelineAction,
    sequence: &mut Sequence,
    selections: &mut [Selection],
    ripple_point: i64,
    ripple_length: i64,
) {
    for id in sequence.clip_ids() {
        let Some(clip) = sequence.clip(id) else {
            continue;
        };
        if clip.timeline_in < ripple_point {
            continue;
        }
        let (clip_in, clip_out) = (clip.timeline_in, clip.timeline_out);
        action.set_timeline_in(sequence, id, clip_in + ripple_length);
        action.set_timeline_out(sequence, id, clip_out + ripple_length);
    }

    for selection in selections
        .iter_mut()
        .filter(|selection| selection.old_in_point >= ripple_point)
    {
        selection.in_point += ripple_length;
        selection.out_point += ripple_length;
    }
}

/// Largest contraction not exceeding `candidate` that keeps clips at or after
/// `ripple_point` clear of every clip starting before it, on any track, and
/// at frame 0 or later. Returns 0 when no contraction is possible.
pub fn ripple_length(sequence: &Sequence, ripple_point: i64, candidate: i64) -> i64 {
    let mut length = candidate;
    for clip in sequence.clips().filter(|clip| clip.timeline_in >= ripple_point) {
        length = length.min(clip.timeline_in);
        for earlier in sequence.clips().filter(|earlier| earlier.timeline_in < ripple_point) {
            let gap = clip.timeline_in - length - earlier.timeline_out;
            if gap < 0 {
                length += gap;
            }
            if length <= 0 {
                return 0;
            }
        }
    }
    length.max(0)
}

/// Deletes the selected areas, optionally closing the gap they leave.
///
/// With `ripple_delete`, clips after the earliest selection move back by the
/// narrowest selection's width, reduced until no moved clip collides with a
/// clip starting before the earliest selection. Selections are cleared when
/// the delete commits.
pub fn delete_selection(
    sequence: &mut Sequence,
    selections: &mut Vec<Selection>,
    ripple_delete: bool,
) -> Option<StagedEdit> {
    let mut areas: Vec<Selection> = selections
        .iter()
        .copied()
        .filter(|selection| !selection.is_empty())
        .collect();
    let ripple_point = areas.iter().map(|area| area.in_point).min()?;
    let candidate = areas.iter().map(Selection::length).min()?;

    let label = if ripple_delete { "Ripple Delete" } else { "Delete" };
    let mut gesture = Gesture::begin(sequence, label);
    delete_areas_and_relink(&mut gesture, &mut areas);

    if ripple_delete {
        let length = ripple_length(&gesture.working, ripple_point, candidate);
        debug!(ripple_point, candidate, length, "ripple length resolved");
        if length > 0 {
            ripple(
                &mut gesture.action,
                &mut gesture.working,
                &mut [],
                ripple_point,
                -length,
            );
        }
    }

    let staged = commit(sequence, gesture.finish());
    match &staged {
        Some(staged) => {
            selections.clear();
            info!(ops = staged.action.len(), ripple_delete, "delete applied");
        }
        None => info!(ripple_delete, "delete rejected: nothing to remove"),
    }
    staged
}
