//! Link continuity across clips created by one edit gesture.
//!
//! Links are weak: a clip stores the ids of the clips it moves with, and
//! every lookup goes through the sequence's id table. A gesture that splits,
//! bisects or pastes clips collects the new clips into a `RelinkBatch`,
//! each tagged with the pre-existing clip it was cut from. Resolving the
//! batch links new fragments to the fragments of their origin's partners.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::action::Gesture;
use crate::sequence::{ClipId, Sequence};

/// A link id that does not resolve to any clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DanglingLink {
    pub clip: ClipId,
    pub target: ClipId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    origin: ClipId,
    clip: ClipId,
}

/// Clips created in one gesture, paired with the clip each was cut from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RelinkBatch {
    fragments: Vec<Fragment>,
}

impl RelinkBatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `clip` as cut from `origin`. When `origin` is itself a
    /// fragment of this batch, the fragment's own origin is recorded.
    pub(crate) fn push(&mut self, origin: ClipId, clip: ClipId) {
        let origin = self.root_of(origin);
        self.fragments.push(Fragment { origin, clip });
    }

    /// The pre-existing clip `id` descends from, or `id` itself.
    pub(crate) fn root_of(&self, id: ClipId) -> ClipId {
        self.fragments
            .iter()
            .find(|fragment| fragment.clip == id)
            .map_or(id, |fragment| fragment.origin)
    }

    pub(crate) fn len(&self) -> usize {
        self.fragments.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Links to append to new clips, plus links that no longer resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Relinked {
    pub(crate) links: Vec<(ClipId, Vec<ClipId>)>,
    pub(crate) dangling: Vec<DanglingLink>,
}

/// Computes links among the fragments of one batch.
///
/// For each fragment F of origin A and each partner B in `A.linked` (read
/// from `base`, the sequence before the gesture), F is linked to the
/// fragments of B still present in `working`. When B has several fragments,
/// only those starting on F's first frame are chosen, falling back to all of
/// them when none do. Links from A to clips outside the batch stay on A.
pub(crate) fn relink_clips_using_ids(
    base: &Sequence,
    working: &Sequence,
    batch: &RelinkBatch,
) -> Relinked {
    let mut relinked = Relinked::default();

    for fragment in &batch.fragments {
        let Some(start) = working.clip(fragment.clip).map(|clip| clip.timeline_in) else {
            continue;
        };
        let Some(origin) = base.clip(fragment.origin) else {
            continue;
        };

        let mut links = Vec::<ClipId>::new();
        for &partner in &origin.linked {
            if base.clip(partner).is_none() {
                let dangling = DanglingLink {
                    clip: origin.id,
                    target: partner,
                };
                if !relinked.dangling.contains(&dangling) {
                    relinked.dangling.push(dangling);
                }
                continue;
            }

            let partner_fragments: Vec<(ClipId, i64)> = batch
                .fragments
                .iter()
                .filter(|candidate| candidate.origin == partner && candidate.clip != fragment.clip)
                .filter_map(|candidate| {
                    working
                        .clip(candidate.clip)
                        .map(|clip| (clip.id, clip.timeline_in))
                })
                .collect();
            for id in choose_fragments(start, &partner_fragments) {
                if !links.contains(&id) {
                    links.push(id);
                }
            }
        }

        if !links.is_empty() {
            relinked.links.push((fragment.clip, links));
        }
    }

    relinked
}

/// Picks which of a partner's `(id, timeline_in)` fragments a fragment
/// starting at `start` links to: those starting at `start`, or all of them
/// when none do.
pub(crate) fn choose_fragments(start: i64, candidates: &[(ClipId, i64)]) -> Vec<ClipId> {
    let aligned: Vec<ClipId> = candidates
        .iter()
        .filter(|(_, candidate_start)| *candidate_start == start)
        .map(|(id, _)| *id)
        .collect();
    if aligned.is_empty() {
        candidates.iter().map(|(id, _)| *id).collect()
    } else {
        aligned
    }
}

/// Resolves `batch` and records the appended links into the gesture.
pub(crate) fn apply_relink(gesture: &mut Gesture<'_>, batch: &RelinkBatch) {
    if batch.is_empty() {
        return;
    }
    let relinked = relink_clips_using_ids(gesture.base, &gesture.working, batch);
    for link in relinked.dangling {
        warn!(
            clip_id = link.clip,
            target = link.target,
            "dropping link to missing clip"
        );
        gesture.note_dangling(link);
    }
    for (id, additions) in relinked.links {
        let Some(clip) = gesture.working.clip(id) else {
            continue;
        };
        let mut links = clip.linked.clone();
        for addition in additions {
            if !links.contains(&addition) {
                links.push(addition);
            }
        }
        gesture.action.set_links(&mut gesture.working, id, links);
    }
}

#[cfg(test)]
mod tests {
    use super::{DanglingLink, RelinkBatch, relink_clips_using_ids};
    use crate::sequence::{Clip, Sequence, SequenceSettings, Track};

    #[test]
    fn fragments_of_linked_origins_link_to_each_other() {
        let base = linked_pair();
        let mut working = base.clone();
        working
            .insert_clip(Clip::new(10, Track(-1), 40, 100))
            .expect("insert should succeed");
        working
            .insert_clip(Clip::new(11, Track(0), 40, 100))
            .expect("insert should succeed");

        let mut batch = RelinkBatch::new();
        batch.push(1, 10);
        batch.push(2, 11);

        let relinked = relink_clips_using_ids(&base, &working, &batch);
        assert_eq!(relinked.links, vec![(10, vec![11]), (11, vec![10])]);
        assert!(relinked.dangling.is_empty());
    }

    #[test]
    fn partner_outside_the_batch_gets_no_new_link() {
        let base = linked_pair();
        let mut working = base.clone();
        working
            .insert_clip(Clip::new(10, Track(-1), 40, 100))
            .expect("insert should succeed");

        let mut batch = RelinkBatch::new();
        batch.push(1, 10);

        let relinked = relink_clips_using_ids(&base, &working, &batch);
        assert!(relinked.links.is_empty());
    }

    #[test]
    fn multiple_partner_fragments_prefer_same_start() {
        let base = linked_pair();
        let mut working = base.clone();
        for (id, track, start) in [(10, -1, 30), (11, -1, 70), (12, 0, 30), (13, 0, 70)] {
            working
                .insert_clip(Clip::new(id, Track(track), start, start + 10))
                .expect("insert should succeed");
        }

        let mut batch = RelinkBatch::new();
        batch.push(1, 10);
        batch.push(10, 11);
        batch.push(2, 12);
        batch.push(12, 13);
        assert_eq!(batch.root_of(11), 1);

        let relinked = relink_clips_using_ids(&base, &working, &batch);
        assert_eq!(
            relinked.links,
            vec![(10, vec![12]), (11, vec![13]), (12, vec![10]), (13, vec![11])]
        );
    }

    #[test]
    fn unresolved_link_is_reported_once() {
        let mut base = Sequence::new("test", SequenceSettings::default());
        let mut clip = Clip::new(1, Track(-1), 0, 100);
        clip.linked = vec![99];
        base.insert_clip(clip).expect("insert should succeed");
        let mut working = base.clone();
        for id in [10, 11] {
            working
                .insert_clip(Clip::new(id, Track(-1), 40 + id as i64, 100))
                .expect("insert should succeed");
        }

        let mut batch = RelinkBatch::new();
        batch.push(1, 10);
        batch.push(1, 11);

        let relinked = relink_clips_using_ids(&base, &working, &batch);
        assert_eq!(
            relinked.dangling,
            vec![DanglingLink {
                clip: 1,
                target: 99
            }]
        );
    }

    fn linked_pair() -> Sequence {
        let mut sequence = Sequence::new("test", SequenceSettings::default());
        let mut video = Clip::new(1, Track(-1), 0, 100);
        video.linked = vec![2];
        let mut audio = Clip::new(2, Track(0), 0, 100);
        audio.linked = vec![1];
        sequence.insert_clip(video).expect("insert should succeed");
        sequence.insert_clip(audio).expect("insert should succeed");
        sequence
    }
}
