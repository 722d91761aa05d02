use std::collections::{HashSet, VecDeque};

use tracing::{debug, info};

use crate::action::{Gesture, StagedEdit, commit};
use crate::link::{DanglingLink, RelinkBatch, apply_relink};
use crate::selection::{Selection, is_clip_selected};
use crate::sequence::{ClipId, Sequence, TransitionEdge};

/// Cuts clip `id` into a left part ending at `left_out` and a new right part
/// starting at `right_in`; the frames in between are dropped.
///
/// Requires `timeline_in < left_out <= right_in < timeline_out`. The right
/// part takes over the closing transition and never gets an opening one.
/// Returns the id of the right part, which is already added to the gesture.
pub(crate) fn bisect(
    gesture: &mut Gesture<'_>,
    id: ClipId,
    left_out: i64,
    right_in: i64,
) -> Option<ClipId> {
    let pre = gesture.working.clip(id)?;
    if !(pre.timeline_in < left_out && left_out <= right_in && right_in < pre.timeline_out) {
        return None;
    }

    let post_id = gesture.working.allocate_clip_id();
    let pre = gesture.working.clip(id)?;
    let mut post = pre.duplicate(post_id);
    post.timeline_in = right_in;
    post.clip_in = pre.clip_in + (right_in - pre.timeline_in);
    post.opening_transition = None;
    post.closing_transition = pre
        .closing_transition
        .map(|transition| transition.clamped(post.length()));
    let had_closing = pre.closing_transition.is_some();

    gesture.action.set_timeline_out(&mut gesture.working, id, left_out);
    if had_closing {
        gesture
            .action
            .set_transition(&mut gesture.working, id, TransitionEdge::Closing, None);
    }
    gesture.action.clamp_transitions(&mut gesture.working, id);
    gesture.action.add_clip(&mut gesture.working, post);

    Some(post_id)
}

/// Splits clip `id` at `frame`. Refuses frames on or outside the clip's bounds.
pub(crate) fn split_clip(gesture: &mut Gesture<'_>, id: ClipId, frame: i64) -> Option<ClipId> {
    let post = bisect(gesture, id, frame, frame);
    match post {
        Some(post_id) => debug!(clip_id = id, frame, post_id, "split accepted"),
        None => debug!(clip_id = id, frame, "split rejected: boundary point"),
    }
    post
}

/// Splits clip `id` at `frame` and, when `relink` is set, every clip reachable
/// through its links, relinking the new right parts among themselves.
///
/// Clips already in `split_cache` are never split again within the gesture.
/// When the originating clip lies inside the selection, only linked clips that
/// are also fully selected are followed.
pub(crate) fn split_clip_and_relink(
    gesture: &mut Gesture<'_>,
    id: ClipId,
    frame: i64,
    relink: bool,
    selections: &[Selection],
    split_cache: &mut HashSet<ClipId>,
) -> bool {
    if !split_cache.insert(id) {
        return false;
    }
    let Some(origin) = gesture.working.clip(id).cloned() else {
        return false;
    };
    let Some(post) = split_clip(gesture, id, frame) else {
        return false;
    };

    let mut batch = RelinkBatch::new();
    batch.push(id, post);
    if relink {
        let origin_selected = is_clip_selected(&origin, selections, true);
        let mut pending: VecDeque<(ClipId, ClipId)> =
            origin.linked.iter().map(|target| (id, *target)).collect();

        while let Some((from, target)) = pending.pop_front() {
            if split_cache.contains(&target) {
                continue;
            }
            let Some(linked) = gesture.working.clip(target).cloned() else {
                gesture.note_dangling(DanglingLink { clip: from, target });
                continue;
            };
            if origin_selected && !is_clip_selected(&linked, selections, true) {
                continue;
            }
            split_cache.insert(target);
            if let Some(linked_post) = split_clip(gesture, target, frame) {
                batch.push(target, linked_post);
                pending.extend(linked.linked.iter().map(|next| (target, *next)));
            }
        }

        apply_relink(gesture, &batch);
    }
    true
}

/// Splits clips at the edges of every selection.
///
/// A clip spanning a whole selection is cut into outer remainders and an
/// inside-selection middle; a clip crossing only one edge is cut at that edge.
fn split_selection(gesture: &mut Gesture<'_>, selections: &[Selection]) -> bool {
    let mut batch = RelinkBatch::new();

    for selection in selections.iter().filter(|selection| !selection.is_empty()) {
        for id in gesture.working.clip_ids() {
            let Some(clip) = gesture.working.clip(id) else {
                continue;
            };
            if clip.track != selection.track {
                continue;
            }
            let spans =
                clip.timeline_in < selection.in_point && clip.timeline_out > selection.out_point;

            if spans {
                let Some(middle) = split_clip(gesture, id, selection.in_point) else {
                    continue;
                };
                batch.push(id, middle);
                if let Some(right) = split_clip(gesture, middle, selection.out_point) {
                    batch.push(middle, right);
                }
            } else if let Some(post) = split_clip(gesture, id, selection.in_point)
                .or_else(|| split_clip(gesture, id, selection.out_point))
            {
                batch.push(id, post);
            }
        }
    }

    if batch.is_empty() {
        return false;
    }
    apply_relink(gesture, &batch);
    true
}

/// Splits at the playhead.
///
/// With a selection, clips fully inside it are split at `playhead`; if none
/// qualify, clips crossing the selection edges are split there instead. If
/// that also finds nothing (or nothing is selected), every clip under the
/// playhead is split together with its links.
pub fn split_at_playhead(
    sequence: &mut Sequence,
    playhead: i64,
    selections: &[Selection],
) -> Option<StagedEdit> {
    let mut gesture = Gesture::begin(sequence, "Split");
    let mut split = false;

    if !selections.is_empty() {
        let mut batch = RelinkBatch::new();
        for id in gesture.working.clip_ids() {
            let selected = gesture
                .working
                .clip(id)
                .is_some_and(|clip| is_clip_selected(clip, selections, true));
            if !selected {
                continue;
            }
            if let Some(post) = split_clip(&mut gesture, id, playhead) {
                batch.push(id, post);
            }
        }

        if batch.is_empty() {
            split = split_selection(&mut gesture, selections);
        } else {
            apply_relink(&mut gesture, &batch);
            split = true;
        }
    }

    if !split {
        let mut split_cache = HashSet::new();
        for id in gesture.base.clip_ids() {
            split |= split_clip_and_relink(
                &mut gesture,
                id,
                playhead,
                true,
                selections,
                &mut split_cache,
            );
        }
    }

    let staged = commit(sequence, gesture.finish());
    match &staged {
        Some(staged) => info!(playhead, ops = staged.action.len(), "split applied"),
        None => info!(playhead, "split rejected: no clip under playhead"),
    }
    staged
}

/// Razor split of one clip, following its links when `relink` is set.
pub fn split_clip_at(
    sequence: &mut Sequence,
    id: ClipId,
    frame: i64,
    relink: bool,
    selections: &[Selection],
) -> Option<StagedEdit> {
    let mut gesture = Gesture::begin(sequence, "Split");
    let mut split_cache = HashSet::new();
    split_clip_and_relink(&mut gesture, id, frame, relink, selections, &mut split_cache);
    commit(sequence, gesture.finish())
}

#[cfg(test)]
mod tests {
    use super::{split_at_playhead, split_clip_at};
    use crate::selection::Selection;
    use crate::sequence::{Clip, Sequence, SequenceSettings, Track, Transition, TransitionKind};

    #[test]
    fn split_at_playhead_cuts_clip_in_two() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 0, 100)]);

        let staged = split_at_playhead(&mut sequence, 40, &[]).expect("split should stage");

        assert_eq!(spans(&sequence), vec![(0, 40, 0), (40, 100, 40)]);
        assert_eq!(staged.redraw, vec![1, 2]);
    }

    #[test]
    fn split_at_clip_boundary_is_refused_without_side_effects() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 0, 100)]);
        let before = sequence.clone();

        assert!(split_at_playhead(&mut sequence, 0, &[]).is_none());
        assert!(split_at_playhead(&mut sequence, 100, &[]).is_none());
        assert!(split_at_playhead(&mut sequence, 150, &[]).is_none());
        assert_eq!(sequence, before);
    }

    #[test]
    fn failed_split_does_not_consume_clip_ids() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 0, 100)]);
        assert!(split_at_playhead(&mut sequence, 100, &[]).is_none());
        split_at_playhead(&mut sequence, 50, &[]).expect("split should stage");
        assert!(sequence.clip(2).is_some());
    }

    #[test]
    fn split_follows_links_and_relinks_right_parts() {
        let mut video = Clip::new(1, Track(-1), 0, 100);
        video.linked = vec![2];
        let mut audio = Clip::new(2, Track(0), 0, 100);
        audio.linked = vec![1];
        let mut sequence = sequence_with(vec![video, audio]);

        split_clip_at(&mut sequence, 1, 30, true, &[]).expect("split should stage");

        let video_right = sequence.clip(3).expect("video right part");
        let audio_right = sequence.clip(4).expect("audio right part");
        assert_eq!(video_right.track, Track(-1));
        assert_eq!(audio_right.track, Track(0));
        assert_eq!(video_right.linked, vec![4]);
        assert_eq!(audio_right.linked, vec![3]);
        assert_eq!(sequence.clip(1).expect("left").linked, vec![2]);
    }

    #[test]
    fn selection_away_from_clips_falls_back_to_playhead_split() {
        let mut video = Clip::new(1, Track(-1), 0, 100);
        video.linked = vec![2];
        let mut audio = Clip::new(2, Track(0), 0, 100);
        audio.linked = vec![1];
        let mut sequence = sequence_with(vec![video, audio]);
        let selections = [Selection::new(0, 100, Track(-2))];

        split_at_playhead(&mut sequence, 40, &selections).expect("split should stage");

        assert_eq!(sequence.clip_count(), 4);
        assert_eq!(
            spans(&sequence),
            vec![(0, 40, 0), (0, 40, 0), (40, 100, 40), (40, 100, 40)]
        );
        assert_eq!(sequence.clip(3).expect("video right part").linked, vec![4]);
        assert_eq!(sequence.clip(4).expect("audio right part").linked, vec![3]);
        assert_eq!(sequence.clip(1).expect("video left part").linked, vec![2]);
    }

    #[test]
    fn razor_without_relink_leaves_linked_clip_whole() {
        let mut video = Clip::new(1, Track(-1), 0, 100);
        video.linked = vec![2];
        let mut audio = Clip::new(2, Track(0), 0, 100);
        audio.linked = vec![1];
        let mut sequence = sequence_with(vec![video, audio]);

        split_clip_at(&mut sequence, 1, 30, false, &[]).expect("split should stage");

        assert_eq!(sequence.clip_count(), 3);
        assert_eq!(sequence.clip(2).expect("audio").timeline_out, 100);
        assert!(sequence.clip(3).expect("right part").linked.is_empty());
    }

    #[test]
    fn selected_clip_does_not_split_unselected_link() {
        let mut video = Clip::new(1, Track(-1), 0, 100);
        video.linked = vec![2];
        let mut audio = Clip::new(2, Track(0), 0, 100);
        audio.linked = vec![1];
        let mut sequence = sequence_with(vec![video, audio]);
        let selections = [Selection::new(0, 100, Track(-1))];

        split_at_playhead(&mut sequence, 50, &selections).expect("split should stage");

        assert_eq!(sequence.clip_count(), 3);
        assert_eq!(sequence.clip(2).expect("audio").timeline_out, 100);
    }

    #[test]
    fn selection_inside_clip_cuts_three_parts() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 0, 100)]);
        let selections = [Selection::new(30, 70, Track(-1))];

        split_at_playhead(&mut sequence, 90, &selections).expect("split should stage");

        assert_eq!(spans(&sequence), vec![(0, 30, 0), (30, 70, 30), (70, 100, 70)]);
    }

    #[test]
    fn selection_crossing_one_edge_cuts_at_that_edge() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 40, 100)]);
        let selections = [Selection::new(30, 70, Track(-1))];

        split_at_playhead(&mut sequence, 90, &selections).expect("split should stage");

        assert_eq!(spans(&sequence), vec![(40, 70, 0), (70, 100, 30)]);
    }

    #[test]
    fn closing_transition_moves_to_right_part_and_is_clamped() {
        let mut clip = Clip::new(1, Track(-1), 0, 100);
        clip.opening_transition = Some(Transition::new(TransitionKind::CrossDissolve, 50));
        clip.closing_transition = Some(Transition::new(TransitionKind::LinearFade, 30));
        let mut sequence = sequence_with(vec![clip]);

        split_at_playhead(&mut sequence, 80, &[]).expect("split should stage");

        let left = sequence.clip(1).expect("left part");
        let right = sequence.clip(2).expect("right part");
        assert_eq!(left.opening_transition.map(|t| t.length), Some(50));
        assert!(left.closing_transition.is_none());
        assert!(right.opening_transition.is_none());
        assert_eq!(right.closing_transition.map(|t| t.length), Some(20));

        let mut sequence = sequence_with(vec![Clip {
            opening_transition: Some(Transition::new(TransitionKind::CrossDissolve, 50)),
            ..Clip::new(1, Track(-1), 0, 100)
        }]);
        split_at_playhead(&mut sequence, 20, &[]).expect("split should stage");
        let left = sequence.clip(1).expect("left part");
        assert_eq!(left.opening_transition.map(|t| t.length), Some(20));
    }

    #[test]
    fn undo_of_split_restores_original_clip() {
        let mut sequence = sequence_with(vec![Clip::new(1, Track(-1), 0, 100)]);
        let before = sequence.clone();
        let staged = split_at_playhead(&mut sequence, 40, &[]).expect("split should stage");

        staged.action.undo(&mut sequence);
        assert_eq!(
            sequence.clips().collect::<Vec<_>>(),
            before.clips().collect::<Vec<_>>()
        );
    }

    fn sequence_with(clips: Vec<Clip>) -> Sequence {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        for clip in clips {
            sequence.insert_clip(clip).expect("insert should succeed");
        }
        sequence
    }

    fn spans(sequence: &Sequence) -> Vec<(i64, i64, i64)> {
        let mut spans: Vec<_> = sequence
            .clips()
            .map(|clip| (clip.timeline_in, clip.timeline_out, clip.clip_in))
            .collect();
        spans.sort();
        spans
    }
}
