use serde::{Deserialize, Serialize};

use crate::sequence::{Clip, Sequence, Track};

/// A selected time range on one track. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionData")]
pub struct Selection {
    pub in_point: i64,
    pub out_point: i64,
    pub track: Track,
    /// `in_point` before the current ripple; decides ripple membership.
    pub old_in_point: i64,
}

/// Wire form of [`Selection`]; a missing `old_in_point` means `in_point`.
#[derive(Deserialize)]
struct SelectionData {
    in_point: i64,
    out_point: i64,
    track: Track,
    #[serde(default)]
    old_in_point: Option<i64>,
}

impl From<SelectionData> for Selection {
    fn from(data: SelectionData) -> Self {
        Self {
            in_point: data.in_point,
            out_point: data.out_point,
            track: data.track,
            old_in_point: data.old_in_point.unwrap_or(data.in_point),
        }
    }
}

impl Selection {
    pub fn new(in_point: i64, out_point: i64, track: Track) -> Self {
        Self {
            in_point,
            out_point,
            track,
            old_in_point: in_point,
        }
    }

    /// Selection covering `clip` exactly.
    pub fn of_clip(clip: &Clip) -> Self {
        Self::new(clip.timeline_in, clip.timeline_out, clip.track)
    }

    pub fn length(&self) -> i64 {
        self.out_point - self.in_point
    }

    pub fn is_empty(&self) -> bool {
        self.out_point <= self.in_point
    }

    /// True when `clip` lies entirely inside the selection.
    pub fn contains_clip(&self, clip: &Clip) -> bool {
        clip.track == self.track
            && clip.timeline_in >= self.in_point
            && clip.timeline_out <= self.out_point
    }

    /// True when `clip` shares at least one frame with the selection.
    pub fn overlaps_clip(&self, clip: &Clip) -> bool {
        clip.track == self.track
            && clip.timeline_in < self.out_point
            && clip.timeline_out > self.in_point
    }
}

/// Merges same-track overlapping selections in place.
///
/// Ranges that only touch (`a.out_point == b.in_point`) are not merged. The
/// pairwise pass repeats until nothing changes, so the result is idempotent
/// and pairwise non-overlapping per track.
pub fn clean_up_selections(areas: &mut Vec<Selection>) {
    loop {
        let mut changed = false;
        let mut i = 0;
        while i < areas.len() {
            if absorb_into_other(areas, i) {
                areas.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Tries to fold `areas[i]` into another selection on its track. Returns true
/// when `areas[i]` became redundant.
fn absorb_into_other(areas: &mut [Selection], i: usize) -> bool {
    let s = areas[i];
    for j in 0..areas.len() {
        if i == j || areas[j].track != s.track {
            continue;
        }
        let other = &mut areas[j];
        if s.in_point < other.in_point && s.out_point > other.out_point {
            // `other` is removed when its own turn comes.
            continue;
        }
        if s.in_point >= other.in_point && s.out_point <= other.out_point {
            return true;
        }
        if s.in_point < other.out_point && s.out_point > other.out_point {
            other.out_point = s.out_point;
            return true;
        }
        if s.out_point > other.in_point && s.in_point < other.in_point {
            other.in_point = s.in_point;
            other.old_in_point = other.old_in_point.min(s.old_in_point);
            return true;
        }
    }
    false
}

/// True when `clip` is inside (`containing`) or overlapping any selection.
pub fn is_clip_selected(clip: &Clip, selections: &[Selection], containing: bool) -> bool {
    selections.iter().any(|selection| {
        if containing {
            selection.contains_clip(clip)
        } else {
            selection.overlaps_clip(clip)
        }
    })
}

/// One selection per live clip.
pub fn select_all(sequence: &Sequence) -> Vec<Selection> {
    sequence.clips().map(Selection::of_clip).collect()
}

#[cfg(test)]
mod tests {
    use super::{Selection, clean_up_selections, is_clip_selected};
    use crate::sequence::{Clip, Track};

    #[test]
    fn deserialized_selection_defaults_old_in_point_to_in_point() {
        let selection: Selection =
            serde_json::from_str(r#"{"in_point":60,"out_point":90,"track":-1}"#)
                .expect("selection should parse");
        assert_eq!(selection, Selection::new(60, 90, Track(-1)));

        let explicit: Selection = serde_json::from_str(
            r#"{"in_point":60,"out_point":90,"track":-1,"old_in_point":40}"#,
        )
        .expect("selection should parse");
        assert_eq!(explicit.old_in_point, 40);
    }

    #[test]
    fn overlapping_selections_merge_into_one() {
        let mut areas = vec![
            Selection::new(0, 10, Track(-1)),
            Selection::new(20, 30, Track(-1)),
            Selection::new(5, 25, Track(-1)),
        ];
        clean_up_selections(&mut areas);
        assert_eq!(areas.len(), 1);
        assert_eq!((areas[0].in_point, areas[0].out_point), (0, 30));
    }

    #[test]
    fn contained_selection_is_dropped_regardless_of_order() {
        let mut areas = vec![
            Selection::new(0, 100, Track(1)),
            Selection::new(10, 20, Track(1)),
        ];
        clean_up_selections(&mut areas);
        assert_eq!(areas, vec![Selection::new(0, 100, Track(1))]);
    }

    #[test]
    fn touching_selections_stay_separate() {
        let mut areas = vec![
            Selection::new(0, 10, Track(-1)),
            Selection::new(10, 20, Track(-1)),
        ];
        clean_up_selections(&mut areas);
        assert_eq!(areas.len(), 2);
    }

    #[test]
    fn selections_on_different_tracks_never_merge() {
        let mut areas = vec![
            Selection::new(0, 10, Track(-1)),
            Selection::new(0, 10, Track(0)),
        ];
        clean_up_selections(&mut areas);
        assert_eq!(areas.len(), 2);
    }

    #[test]
    fn identical_selections_collapse() {
        let mut areas = vec![Selection::new(4, 8, Track(0)); 3];
        clean_up_selections(&mut areas);
        assert_eq!(areas, vec![Selection::new(4, 8, Track(0))]);
    }

    #[test]
    fn clip_touching_selection_edge_is_not_selected() {
        let clip = Clip::new(1, Track(-1), 10, 20);
        let touching = [Selection::new(20, 30, Track(-1))];
        assert!(!is_clip_selected(&clip, &touching, false));
        assert!(!is_clip_selected(&clip, &touching, true));

        let covering = [Selection::new(10, 20, Track(-1))];
        assert!(is_clip_selected(&clip, &covering, true));
    }
}
