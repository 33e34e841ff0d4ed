//! Ordered forest built from a flat step collection.
//!
//! Steps arrive as a flat list carrying a parent reference and a sibling
//! `order`. [`SiblingIndex`] groups them by parent and sorts each group once
//! (O(N log N)); [`Forest`] walks that index from the top-level group down.
//! Soft-deleted steps are dropped up front, and a step whose parent is not in
//! the live set is unreachable, so it is hidden together with its subtree.

use std::collections::HashMap;

use crate::models::{Step, StepId};

/// Live steps grouped by parent, each group in sibling order.
pub struct SiblingIndex<'a> {
    roots: Vec<&'a Step>,
    children: HashMap<&'a StepId, Vec<&'a Step>>,
}

impl<'a> SiblingIndex<'a> {
    pub fn new(steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let mut roots = Vec::new();
        let mut children: HashMap<&'a StepId, Vec<&'a Step>> = HashMap::new();
        for step in steps.into_iter().filter(|s| !s.is_deleted()) {
            match &step.parent_id {
                None => roots.push(step),
                Some(parent) => children.entry(parent).or_default().push(step),
            }
        }
        roots.sort_by(|a, b| a.sibling_cmp(b));
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| a.sibling_cmp(b));
        }
        Self { roots, children }
    }

    /// Children of `parent` (`None` for the top level) in order.
    pub fn siblings(&self, parent: Option<&StepId>) -> &[&'a Step] {
        match parent {
            None => self.roots.as_slice(),
            Some(id) => self.children.get(id).map(Vec::as_slice).unwrap_or_default(),
        }
    }
}

/// A step with its ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestNode {
    pub step: Step,
    pub children: Vec<ForestNode>,
}

impl ForestNode {
    fn count(&self) -> usize {
        1 + self.children.iter().map(ForestNode::count).sum::<usize>()
    }

    fn find(&self, id: &StepId) -> Option<&ForestNode> {
        if &self.step.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Render tree: one tree per top-level step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    pub roots: Vec<ForestNode>,
}

impl Forest {
    /// Build the forest. Repeated builds from the same input produce the same
    /// shape, ties included.
    pub fn build<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let index = SiblingIndex::new(steps);
        Self::from_index(&index)
    }

    pub fn from_index(index: &SiblingIndex<'_>) -> Self {
        fn grow(index: &SiblingIndex<'_>, parent: Option<&StepId>) -> Vec<ForestNode> {
            index
                .siblings(parent)
                .iter()
                .map(|step| ForestNode {
                    step: (*step).clone(),
                    children: grow(index, Some(&step.id)),
                })
                .collect()
        }

        Self {
            roots: grow(index, None),
        }
    }

    pub fn root_ids(&self) -> Vec<StepId> {
        self.roots.iter().map(|node| node.step.id.clone()).collect()
    }

    /// Depth-first `(step, depth)` pairs in display order.
    pub fn flatten(&self) -> Vec<(&Step, usize)> {
        fn walk<'a>(nodes: &'a [ForestNode], depth: usize, out: &mut Vec<(&'a Step, usize)>) {
            for node in nodes {
                out.push((&node.step, depth));
                walk(&node.children, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.roots, 0, &mut out);
        out
    }

    pub fn find(&self, id: &StepId) -> Option<&ForestNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    /// Ids of the direct children of `parent`, in order.
    pub fn child_ids(&self, parent: Option<&StepId>) -> Vec<StepId> {
        match parent {
            None => self.root_ids(),
            Some(id) => self
                .find(id)
                .map(|node| node.children.iter().map(|c| c.step.id.clone()).collect())
                .unwrap_or_default(),
        }
    }

    /// Number of reachable steps.
    pub fn len(&self) -> usize {
        self.roots.iter().map(ForestNode::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Whether `candidate` is `ancestor` itself or lies somewhere below it.
///
/// Walks parent links upward from `candidate`; the walk is bounded by the
/// collection size so a corrupt (cyclic) collection cannot loop forever.
pub fn is_descendant(steps: &HashMap<StepId, Step>, candidate: &StepId, ancestor: &StepId) -> bool {
    let mut current = Some(candidate);
    let mut hops = 0;
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        hops += 1;
        if hops > steps.len() {
            return true;
        }
        current = steps.get(id).and_then(|s| s.parent_id.as_ref());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::StepStatus,
        test_support::{ids, step},
    };

    #[test]
    fn test_build_orders_roots_and_children() {
        let steps = vec![
            step("b", None, 2.0, StepStatus::NotStarted),
            step("c", Some("a"), 1.0, StepStatus::NotStarted),
            step("a", None, 1.0, StepStatus::NotStarted),
            step("d", Some("a"), 0.5, StepStatus::NotStarted),
            step("e", Some("d"), 0.0, StepStatus::NotStarted),
        ];

        let forest = Forest::build(&steps);

        assert_eq!(forest.root_ids(), ids(&["a", "b"]));
        assert_eq!(forest.child_ids(Some(&StepId::from("a"))), ids(&["d", "c"]));
        let order: Vec<(&str, usize)> = forest
            .flatten()
            .into_iter()
            .map(|(s, depth)| (s.id.as_str(), depth))
            .collect();
        assert_eq!(order, vec![("a", 0), ("d", 1), ("e", 2), ("c", 1), ("b", 0)]);
        assert_eq!(forest.len(), 5);
    }

    #[test]
    fn test_sibling_lookup_outlives_key() {
        let steps = vec![
            step("a", None, 0.0, StepStatus::NotStarted),
            step("c", Some("a"), 1.0, StepStatus::NotStarted),
            step("d", Some("a"), 0.5, StepStatus::NotStarted),
        ];
        let index = SiblingIndex::new(&steps);

        let children = {
            let key = StepId::from("a");
            index.siblings(Some(&key))
        };
        let names: Vec<&str> = children.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(names, vec!["d", "c"]);
        assert_eq!(index.siblings(None).len(), 1);
        assert!(index.siblings(Some(&StepId::from("missing"))).is_empty());
    }

    #[test]
    fn test_build_is_deterministic_with_ties() {
        // Equal orders: creation time breaks the tie, then id
        let mut steps = vec![
            step("z", None, 1.0, StepStatus::NotStarted),
            step("m", None, 1.0, StepStatus::NotStarted),
            step("q", None, 1.0, StepStatus::NotStarted),
        ];
        let first = Forest::build(&steps);
        steps.reverse();
        let second = Forest::build(&steps);

        assert_eq!(first, second);
        assert_eq!(first.root_ids(), ids(&["m", "q", "z"]));
    }

    #[test]
    fn test_same_created_at_falls_back_to_id() {
        let mut x = step("x", None, 1.0, StepStatus::NotStarted);
        let mut y = step("y", None, 1.0, StepStatus::NotStarted);
        x.created_at = y.created_at;
        y.id = StepId::from("w");
        let forest = Forest::build([&x, &y]);
        assert_eq!(forest.root_ids(), ids(&["w", "x"]));
    }

    #[test]
    fn test_soft_deleted_and_orphaned_steps_are_hidden() {
        let mut gone = step("g", None, 0.0, StepStatus::NotStarted);
        gone.deleted_at = Some(jiff::Timestamp::UNIX_EPOCH);
        let steps = vec![
            gone,
            step("child", Some("g"), 0.0, StepStatus::NotStarted),
            step("orphan", Some("missing"), 0.0, StepStatus::NotStarted),
            step("keep", None, 1.0, StepStatus::NotStarted),
        ];

        let forest = Forest::build(&steps);
        assert_eq!(forest.root_ids(), ids(&["keep"]));
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_cyclic_records_are_unreachable() {
        let steps = vec![
            step("a", Some("b"), 0.0, StepStatus::NotStarted),
            step("b", Some("a"), 0.0, StepStatus::NotStarted),
            step("r", None, 0.0, StepStatus::NotStarted),
        ];
        let forest = Forest::build(&steps);
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_is_descendant() {
        let steps: HashMap<StepId, Step> = [
            step("a", None, 0.0, StepStatus::NotStarted),
            step("b", Some("a"), 0.0, StepStatus::NotStarted),
            step("c", Some("b"), 0.0, StepStatus::NotStarted),
            step("x", None, 1.0, StepStatus::NotStarted),
        ]
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

        let id = StepId::from;
        assert!(is_descendant(&steps, &id("c"), &id("a")));
        assert!(is_descendant(&steps, &id("a"), &id("a")));
        assert!(!is_descendant(&steps, &id("a"), &id("c")));
        assert!(!is_descendant(&steps, &id("x"), &id("a")));
    }
}
