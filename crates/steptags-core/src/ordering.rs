//! Sibling order values.
//!
//! Only the relative order of siblings matters, so inserting between two
//! siblings takes the midpoint of their order values. Repeated midpoint
//! insertion eventually runs out of float precision; once the gap between
//! neighbours drops below [`MIN_ORDER_GAP`] the whole sibling list is
//! renumbered to `0, 1, 2, ...` instead.

use crate::models::{Step, StepId};

/// Smallest neighbour gap a midpoint insertion may split.
pub const MIN_ORDER_GAP: f64 = 1e-6;

/// Where an inserted step lands.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The moved step takes this order value; no sibling changes.
    Order(f64),
    /// Every listed step (moved step included) takes the paired order value.
    Renumber(Vec<(StepId, f64)>),
}

/// Order value appended after a sibling list whose last order is `last`.
pub fn order_after(last: Option<f64>) -> f64 {
    match last {
        None => 0.0,
        Some(last) => last.floor() + 1.0,
    }
}

/// Order for inserting `moving` at `index` among `siblings`.
///
/// `siblings` must be sorted and must not contain the moved step. An index
/// past the end appends.
pub fn place_at(siblings: &[&Step], moving: &StepId, index: usize) -> Placement {
    let index = index.min(siblings.len());
    let before = index.checked_sub(1).map(|i| siblings[i].order);
    let after = siblings.get(index).map(|s| s.order);

    let candidate = match (before, after) {
        (None, None) => return Placement::Order(0.0),
        (Some(last), None) => return Placement::Order(order_after(Some(last))),
        (None, Some(first)) => first - 1.0,
        (Some(lo), Some(hi)) => {
            if hi - lo < MIN_ORDER_GAP {
                return renumber(siblings, moving, index);
            }
            lo + (hi - lo) / 2.0
        }
    };

    let fits = before.map_or(true, |lo| candidate > lo) && after.map_or(true, |hi| candidate < hi);
    if candidate.is_finite() && fits {
        Placement::Order(candidate)
    } else {
        renumber(siblings, moving, index)
    }
}

fn renumber(siblings: &[&Step], moving: &StepId, index: usize) -> Placement {
    let mut ids: Vec<StepId> = siblings.iter().map(|s| s.id.clone()).collect();
    ids.insert(index, moving.clone());
    log::debug!("Renumbering {} siblings around step {moving}", ids.len());
    Placement::Renumber(
        ids.into_iter()
            .enumerate()
            .map(|(position, id)| (id, position as f64))
            .collect(),
    )
}
