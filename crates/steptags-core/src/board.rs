//! Status board: top-level steps grouped into one column per status.
//!
//! Column order is owned by the client. Dragging a card between columns only
//! persists the new status, so the position a card was dropped at lives here
//! and nowhere else until the next reload. [`Board::resync`] folds a fresh
//! step collection back in without discarding that local order.

use std::collections::{HashMap, HashSet};

use crate::models::{Step, StepId, StepStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    buckets: [Vec<StepId>; 4],
}

/// Top-level live steps in sibling order.
fn top_level<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Vec<&'a Step> {
    let mut roots: Vec<&Step> = steps
        .into_iter()
        .filter(|s| s.is_top_level() && !s.is_deleted())
        .collect();
    roots.sort_by(|a, b| a.sibling_cmp(b));
    roots
}

impl Board {
    /// Fresh board with each column in backend order.
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let mut board = Self::default();
        for step in top_level(steps) {
            board.buckets[step.status.index()].push(step.id.clone());
        }
        board
    }

    pub fn bucket(&self, status: StepStatus) -> &[StepId] {
        &self.buckets[status.index()]
    }

    /// Column and index of a card.
    pub fn position_of(&self, id: &StepId) -> Option<(StepStatus, usize)> {
        StepStatus::ALL.into_iter().find_map(|status| {
            self.bucket(status)
                .iter()
                .position(|card| card == id)
                .map(|idx| (status, idx))
        })
    }

    pub fn status_of(&self, id: &StepId) -> Option<StepStatus> {
        self.position_of(id).map(|(status, _)| status)
    }

    pub fn contains(&self, id: &StepId) -> bool {
        self.position_of(id).is_some()
    }

    /// Take a card off the board, returning where it was.
    pub fn remove(&mut self, id: &StepId) -> Option<(StepStatus, usize)> {
        let (status, idx) = self.position_of(id)?;
        self.buckets[status.index()].remove(idx);
        Some((status, idx))
    }

    /// Drop a card into `status` at `position` (clamped to the column).
    /// Returns the column it came from, if it was on the board.
    pub fn move_card(&mut self, id: &StepId, status: StepStatus, position: usize) -> Option<StepStatus> {
        let previous = self.remove(id).map(|(from, _)| from);
        let bucket = &mut self.buckets[status.index()];
        let position = position.min(bucket.len());
        bucket.insert(position, id.clone());
        previous
    }

    /// Put a card at the tail of `status`.
    pub fn append(&mut self, id: &StepId, status: StepStatus) {
        self.remove(id);
        self.buckets[status.index()].push(id.clone());
    }

    /// Place a card right before the first of `followers` sharing its column,
    /// or at the tail when none does.
    pub fn insert_before_any(&mut self, id: &StepId, status: StepStatus, followers: &[StepId]) {
        self.remove(id);
        let bucket = &mut self.buckets[status.index()];
        let followers: HashSet<&StepId> = followers.iter().collect();
        match bucket.iter().position(|card| followers.contains(card)) {
            Some(idx) => bucket.insert(idx, id.clone()),
            None => bucket.push(id.clone()),
        }
    }

    /// Fold a fresh collection in.
    ///
    /// Cards still present in the same column keep their relative order;
    /// vanished cards are dropped; new cards and cards whose status changed
    /// are appended to the tail of their column in backend order.
    pub fn resync<'a>(&mut self, steps: impl IntoIterator<Item = &'a Step>) {
        let roots = top_level(steps);
        let current: HashMap<&StepId, StepStatus> =
            roots.iter().map(|s| (&s.id, s.status)).collect();

        let mut kept: HashSet<StepId> = HashSet::new();
        for status in StepStatus::ALL {
            let bucket = &mut self.buckets[status.index()];
            bucket.retain(|card| current.get(card) == Some(&status));
            kept.extend(bucket.iter().cloned());
        }

        for step in roots {
            if !kept.contains(&step.id) {
                self.buckets[step.status.index()].push(step.id.clone());
            }
        }
    }

    /// Number of cards across all columns.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ids, step};

    #[test]
    fn test_from_steps_only_takes_top_level() {
        let steps = vec![
            step("a", None, 1.0, StepStatus::NotStarted),
            step("b", None, 0.0, StepStatus::NotStarted),
            step("c", None, 2.0, StepStatus::Complete),
            step("d", Some("a"), 0.0, StepStatus::NotStarted),
        ];

        let board = Board::from_steps(&steps);

        assert_eq!(board.bucket(StepStatus::NotStarted), ids(&["b", "a"]).as_slice());
        assert_eq!(board.bucket(StepStatus::Complete), ids(&["c"]).as_slice());
        assert!(board.bucket(StepStatus::InProgress).is_empty());
        assert_eq!(board.len(), 3);
        assert_eq!(board.status_of(&StepId::from("d")), None);
    }

    #[test]
    fn test_move_card_splices_into_new_column() {
        let steps = vec![
            step("a", None, 0.0, StepStatus::NotStarted),
            step("b", None, 1.0, StepStatus::InProgress),
            step("c", None, 2.0, StepStatus::InProgress),
        ];
        let mut board = Board::from_steps(&steps);

        let from = board.move_card(&StepId::from("a"), StepStatus::InProgress, 1);

        assert_eq!(from, Some(StepStatus::NotStarted));
        assert!(board.bucket(StepStatus::NotStarted).is_empty());
        assert_eq!(board.bucket(StepStatus::InProgress), ids(&["b", "a", "c"]).as_slice());

        board.move_card(&StepId::from("a"), StepStatus::InProgress, 50);
        assert_eq!(board.bucket(StepStatus::InProgress), ids(&["b", "c", "a"]).as_slice());
    }

    #[test]
    fn test_resync_preserves_local_order() {
        let mut steps = vec![
            step("a", None, 0.0, StepStatus::InReview),
            step("b", None, 1.0, StepStatus::InReview),
            step("c", None, 2.0, StepStatus::InReview),
        ];
        let mut board = Board::from_steps(&steps);
        // Local order C, A, B differs from backend order
        board.move_card(&StepId::from("c"), StepStatus::InReview, 0);

        steps.push(step("n", None, -5.0, StepStatus::InReview));
        board.resync(&steps);

        assert_eq!(board.bucket(StepStatus::InReview), ids(&["c", "a", "b", "n"]).as_slice());
    }

    #[test]
    fn test_resync_drops_vanished_and_moves_status_changes_to_tail() {
        let mut steps = vec![
            step("a", None, 0.0, StepStatus::NotStarted),
            step("b", None, 1.0, StepStatus::NotStarted),
            step("c", None, 2.0, StepStatus::Complete),
        ];
        let mut board = Board::from_steps(&steps);

        steps.retain(|s| s.id.as_str() != "b");
        steps[0].status = StepStatus::Complete;
        board.resync(&steps);

        assert!(board.bucket(StepStatus::NotStarted).is_empty());
        assert_eq!(board.bucket(StepStatus::Complete), ids(&["c", "a"]).as_slice());
    }

    #[test]
    fn test_resync_is_stable_when_nothing_changed() {
        let steps = vec![
            step("a", None, 0.0, StepStatus::NotStarted),
            step("b", None, 1.0, StepStatus::NotStarted),
        ];
        let mut board = Board::from_steps(&steps);
        board.move_card(&StepId::from("b"), StepStatus::NotStarted, 0);
        let before = board.clone();

        board.resync(&steps);
        board.resync(&steps);

        assert_eq!(board, before);
    }

    #[test]
    fn test_insert_before_any_follows_tree_order() {
        let steps = vec![
            step("s1", None, 0.0, StepStatus::NotStarted),
            step("s2", None, 1.0, StepStatus::NotStarted),
            step("s3", None, 2.0, StepStatus::NotStarted),
        ];
        let mut board = Board::from_steps(&steps);

        board.insert_before_any(&StepId::from("s3"), StepStatus::NotStarted, &ids(&["s1", "s2"]));
        assert_eq!(board.bucket(StepStatus::NotStarted), ids(&["s3", "s1", "s2"]).as_slice());

        board.insert_before_any(&StepId::from("s3"), StepStatus::NotStarted, &ids(&["zz"]));
        assert_eq!(board.bucket(StepStatus::NotStarted), ids(&["s1", "s2", "s3"]).as_slice());
    }

    #[test]
    fn test_remove_reports_slot() {
        let steps = vec![
            step("a", None, 0.0, StepStatus::InProgress),
            step("b", None, 1.0, StepStatus::InProgress),
        ];
        let mut board = Board::from_steps(&steps);
        assert_eq!(
            board.remove(&StepId::from("b")),
            Some((StepStatus::InProgress, 1))
        );
        assert_eq!(board.remove(&StepId::from("b")), None);
    }
}
