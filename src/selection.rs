use serde::{Deserialize, Serialize};

use crate::types::BoundingBox;

/// How to pick one face out of the detector's candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Largest area wins; ties go to the earlier candidate.
    #[default]
    Largest,
    /// Trust the detector's ordering and take the first candidate.
    First,
}

/// Select the face to process this cycle.
///
/// Returns `None` for an empty candidate list, which is an ordinary
/// face-absent frame rather than an error.
pub fn select_face(candidates: &[BoundingBox], policy: SelectionPolicy) -> Option<BoundingBox> {
    match policy {
        SelectionPolicy::First => candidates.first().copied(),
        SelectionPolicy::Largest => {
            let mut best: Option<BoundingBox> = None;
            for candidate in candidates {
                // Strictly greater keeps the first of equally sized boxes.
                if best.map_or(true, |b| candidate.area() > b.area()) {
                    best = Some(*candidate);
                }
            }
            best
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates() {
        assert_eq!(select_face(&[], SelectionPolicy::Largest), None);
        assert_eq!(select_face(&[], SelectionPolicy::First), None);
    }

    #[test]
    fn picks_largest_area() {
        let faces = [
            BoundingBox::new(0, 0, 100, 100),
            BoundingBox::new(300, 40, 180, 200),
            BoundingBox::new(50, 50, 150, 150),
        ];
        assert_eq!(
            select_face(&faces, SelectionPolicy::Largest),
            Some(BoundingBox::new(300, 40, 180, 200))
        );
    }

    #[test]
    fn ties_keep_first_encountered() {
        let faces = [
            BoundingBox::new(0, 0, 50, 200),
            BoundingBox::new(10, 10, 100, 100),
            BoundingBox::new(20, 20, 200, 50),
        ];
        assert_eq!(
            select_face(&faces, SelectionPolicy::Largest),
            Some(BoundingBox::new(0, 0, 50, 200))
        );
    }

    #[test]
    fn first_policy_ignores_size() {
        let faces = [BoundingBox::new(0, 0, 10, 10), BoundingBox::new(0, 0, 90, 90)];
        assert_eq!(
            select_face(&faces, SelectionPolicy::First),
            Some(BoundingBox::new(0, 0, 10, 10))
        );
    }
}
