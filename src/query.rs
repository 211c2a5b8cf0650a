//! Spatial queries over the element list: nearest-element search with a
//! deterministic tie-break, click-cycling through overlapping elements, and
//! rectangle selection.
//!
//! All queries follow the same two-stage shape: a cheap axis-aligned-bounds
//! prefilter, then the exact per-shape [`Element::formal_distance`] metric.
//! Ties within tolerance are kept together (the *tie set*) and ordered by
//! z-position so the topmost element — the one painted last — wins first.

use crate::geometry::{Point, Rect};
use crate::model::{Element, ElementId};

/// Indices (ascending z-order) of the candidates judged equally nearest to
/// `point` within `tolerance`.
///
/// A candidate survives the prefilter when its bounds inflated by
/// `tolerance` contain the point; of the survivors, everything within
/// `tolerance` of the minimum formal distance stays in the tie set. The
/// tolerance is not an absolute distance cutoff — the bounds test is the
/// only rejection, the exact metric only ranks.
pub fn find_most_near_elements(
    elements: &[Element],
    point: Point,
    tolerance: f64,
) -> Vec<usize> {
    let mut survivors: Vec<(usize, f64)> = elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.bounds().inflated(tolerance).contains(point))
        .map(|(i, e)| (i, e.formal_distance(point)))
        .collect();

    let Some(best) = survivors
        .iter()
        .map(|(_, d)| *d)
        .fold(None, |acc: Option<f64>, d| {
            Some(acc.map_or(d, |a| a.min(d)))
        })
    else {
        return Vec::new();
    };

    survivors.retain(|(_, d)| *d - best <= tolerance);
    survivors.into_iter().map(|(i, _)| i).collect()
}

/// Pick an element at `point`, cycling through overlapping candidates.
///
/// The first call (no `current`, or `current` not in the tie set) returns the
/// topmost tied element. Passing the previously returned id walks downward
/// through the tie set, wrapping back to the top — repeated clicks on a stack
/// of overlapping elements visit each one in paint order.
pub fn find_element<'a>(
    elements: &'a [Element],
    point: Point,
    current: Option<ElementId>,
    tolerance: f64,
) -> Option<&'a Element> {
    let ties = find_most_near_elements(elements, point, tolerance);
    if ties.is_empty() {
        return None;
    }
    // Topmost first.
    let order: Vec<usize> = ties.into_iter().rev().collect();
    let next = match current.and_then(|id| {
        order.iter().position(|&i| elements[i].id() == id)
    }) {
        Some(pos) => order[(pos + 1) % order.len()],
        None => order[0],
    };
    Some(&elements[next])
}

/// Indices (ascending z-order) of elements whose bounds intersect `rect`.
///
/// Bounds are exact per shape: curved lines include their control point,
/// loops use the origin ± radius box, groups the recursive union.
pub fn elements_in_rect(elements: &[Element], rect: &Rect) -> Vec<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.bounds().intersects(rect))
        .map(|(i, _)| i)
        .collect()
}
