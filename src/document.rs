//! The diagram document: the aggregate root owning every element, the
//! selection, and the command history.
//!
//! All mutation flows through [`Document::do_command`] / [`Document::undo`] /
//! [`Document::redo`]. Each of these ends with the same fixed commit
//! pipeline — reindex the derived per-type lists, rebind the vertex graph,
//! resync the selection — so the document always transitions between two
//! self-consistent snapshots. The pipeline is deliberately a full O(n)
//! rebuild: diagrams are small and the simplicity pays for itself.
//!
//! The history is a single linear log with a head cursor. Undoing moves the
//! head back without discarding commands; dispatching a new command while the
//! head sits mid-log truncates the redo tail first, permanently.

use indexmap::IndexMap;
use tracing::debug;

use crate::command::Command;
use crate::geometry::{Point, Rect};
use crate::model::{Annotation, Element, ElementId, Line, Loop, Vertex};
use crate::query;
use crate::selection::Selection;

/// One history slot: the command plus the vertices the self-healing rebind
/// pass synthesized while committing it. Undo removes those vertices again
/// (once nothing references them) and redo re-inserts them with their
/// original ids, so replaying history is exact down to z-order.
#[derive(Debug, Clone)]
struct HistoryEntry {
    cmd: Command,
    healed: Vec<(ElementId, Point)>,
}

/// The in-memory diagram document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Authoritative element list; array position is z-order, last = topmost.
    pub(crate) elements: Vec<Element>,
    /// Next id handed out by [`Document::allocate_id`].
    pub(crate) next_id: ElementId,
    /// Derived: vertex ids in document order (recursing through groups).
    pub(crate) vertex_ids: Vec<ElementId>,
    /// Derived: line ids in document order.
    pub(crate) line_ids: Vec<ElementId>,
    /// Derived: loop ids in document order.
    pub(crate) loop_ids: Vec<ElementId>,
    /// Derived: vertex id → current position, in document order.
    pub(crate) vertex_map: IndexMap<ElementId, Point>,
    pub(crate) selection: Selection,
    history: Vec<HistoryEntry>,
    head: usize,
}

impl Document {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Hand out a fresh element id. Seeded past the largest id seen on load.
    pub fn allocate_id(&mut self) -> ElementId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Top-level elements in z-order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    // ── Command history ──────────────────────────────────────────────────

    /// Dispatch a command: truncate the redo tail, apply, append, and run the
    /// commit pipeline.
    pub fn do_command(&mut self, mut cmd: Command) {
        self.history.truncate(self.head);
        debug!(command = cmd.name(), "dispatch");
        cmd.apply(self);
        let healed = self.commit();
        self.history.push(HistoryEntry { cmd, healed });
        self.head += 1;
    }

    /// Step the head back one command, reverting it. No-op at the start of
    /// history. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        if self.head == 0 {
            return false;
        }
        self.head -= 1;
        let entry = self.history[self.head].clone();
        debug!(command = entry.cmd.name(), "undo");
        entry.cmd.revert(self);
        // Drop the vertices this command's commit synthesized; the revert
        // just restored the references that made them necessary.
        for &(vid, _) in &entry.healed {
            if !self.vertex_is_referenced(vid) {
                self.remove_element_anywhere(vid);
            }
        }
        self.commit();
        true
    }

    /// Re-apply the command at the head. No-op at the end of history.
    pub fn redo(&mut self) -> bool {
        if self.head == self.history.len() {
            return false;
        }
        let mut entry = self.history[self.head].clone();
        debug!(command = entry.cmd.name(), "redo");
        entry.cmd.apply(self);
        // Re-insert the recorded healed vertices so the rebind pass reuses
        // the original ids instead of minting fresh ones.
        for &(vid, at) in &entry.healed {
            if self.get_element(vid).is_none() {
                self.push_element(Element::Vertex(Vertex::new(vid, at.x, at.y)));
            }
        }
        let healed = self.commit();
        entry.healed.extend(healed);
        // Store back: apply re-records the prior state the next revert needs.
        self.history[self.head] = entry;
        self.head += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.head > 0
    }

    pub fn can_redo(&self) -> bool {
        self.head < self.history.len()
    }

    /// `(head, log length)` — mostly for tests and debugging output.
    pub fn history_position(&self) -> (usize, usize) {
        (self.head, self.history.len())
    }

    /// The fixed commit barrier between two document states. Returns the
    /// vertices the rebind pass had to synthesize.
    pub(crate) fn commit(&mut self) -> Vec<(ElementId, Point)> {
        self.reindex();
        let healed = self.rebind_graph_references();
        self.resync_selection();
        healed
    }

    /// True if any line or loop, at any nesting depth, references the vertex.
    fn vertex_is_referenced(&self, id: ElementId) -> bool {
        fn scan(elems: &[Element], id: ElementId) -> bool {
            elems.iter().any(|e| match e {
                Element::Line(l) => {
                    l.start_vertex == Some(id) || l.end_vertex == Some(id)
                }
                Element::Loop(l) => l.center_vertex == Some(id),
                Element::Group(g) => scan(&g.children, id),
                Element::Vertex(_) | Element::Annotation(_) => false,
            })
        }
        scan(&self.elements, id)
    }

    // ── Derived indices ──────────────────────────────────────────────────

    /// Full rebuild of the per-type id lists and the vertex position map,
    /// walking groups recursively.
    fn reindex(&mut self) {
        self.vertex_ids.clear();
        self.line_ids.clear();
        self.loop_ids.clear();
        self.vertex_map.clear();

        fn walk(
            elems: &[Element],
            vertex_ids: &mut Vec<ElementId>,
            line_ids: &mut Vec<ElementId>,
            loop_ids: &mut Vec<ElementId>,
            vertex_map: &mut IndexMap<ElementId, Point>,
        ) {
            for e in elems {
                match e {
                    Element::Vertex(v) => {
                        vertex_ids.push(v.id);
                        vertex_map.insert(v.id, v.at);
                    }
                    Element::Line(l) => line_ids.push(l.id),
                    Element::Loop(l) => loop_ids.push(l.id),
                    Element::Annotation(_) => {}
                    Element::Group(g) => walk(
                        &g.children,
                        vertex_ids,
                        line_ids,
                        loop_ids,
                        vertex_map,
                    ),
                }
            }
        }
        walk(
            &self.elements,
            &mut self.vertex_ids,
            &mut self.line_ids,
            &mut self.loop_ids,
            &mut self.vertex_map,
        );
    }

    /// Drop selected ids that no longer name a live top-level element.
    fn resync_selection(&mut self) {
        let elements = &self.elements;
        self.selection
            .retain(|id| elements.iter().any(|e| e.id() == id));
    }

    // ── Element access ───────────────────────────────────────────────────

    /// Find an element anywhere, descending into groups.
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        fn find(elems: &[Element], id: ElementId) -> Option<&Element> {
            for e in elems {
                if e.id() == id {
                    return Some(e);
                }
                if let Element::Group(g) = e {
                    if let Some(found) = find(&g.children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find(&self.elements, id)
    }

    pub(crate) fn get_element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        fn find_mut(elems: &mut Vec<Element>, id: ElementId) -> Option<&mut Element> {
            if let Some(i) = elems.iter().position(|e| e.id() == id) {
                return elems.get_mut(i);
            }
            for e in elems.iter_mut() {
                if let Element::Group(g) = e {
                    if subtree_contains(&g.children, id) {
                        return find_mut(&mut g.children, id);
                    }
                }
            }
            None
        }
        find_mut(&mut self.elements, id)
    }

    /// Index of a top-level element.
    pub(crate) fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    /// Remove a top-level element, returning its z-slot for exact reversal.
    pub(crate) fn take_element(&mut self, id: ElementId) -> Option<(usize, Element)> {
        let idx = self.index_of(id)?;
        Some((idx, self.elements.remove(idx)))
    }

    pub(crate) fn insert_element(&mut self, idx: usize, element: Element) {
        let idx = idx.min(self.elements.len());
        self.elements.insert(idx, element);
    }

    pub(crate) fn push_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Remove an element wherever it lives, including inside groups.
    pub(crate) fn remove_element_anywhere(&mut self, id: ElementId) -> bool {
        fn remove_in(elems: &mut Vec<Element>, id: ElementId) -> bool {
            if let Some(i) = elems.iter().position(|e| e.id() == id) {
                elems.remove(i);
                return true;
            }
            for e in elems.iter_mut() {
                if let Element::Group(g) = e {
                    if remove_in(&mut g.children, id) {
                        return true;
                    }
                }
            }
            false
        }
        remove_in(&mut self.elements, id)
    }

    pub fn get_vertex(&self, id: ElementId) -> Option<&Vertex> {
        self.get_element(id).and_then(Element::as_vertex)
    }

    pub(crate) fn vertex_mut(&mut self, id: ElementId) -> Option<&mut Vertex> {
        match self.get_element_mut(id) {
            Some(Element::Vertex(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn line_mut(&mut self, id: ElementId) -> Option<&mut Line> {
        match self.get_element_mut(id) {
            Some(Element::Line(l)) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn loop_mut(&mut self, id: ElementId) -> Option<&mut Loop> {
        match self.get_element_mut(id) {
            Some(Element::Loop(l)) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn annotation_mut(&mut self, id: ElementId) -> Option<&mut Annotation> {
        match self.get_element_mut(id) {
            Some(Element::Annotation(a)) => Some(a),
            _ => None,
        }
    }

    // ── Geometry writes used by commands ─────────────────────────────────

    pub(crate) fn write_vertex_position(&mut self, id: ElementId, at: Point) {
        if let Some(v) = self.vertex_mut(id) {
            v.at = at;
        }
    }

    /// Write a line's geometry and carry its bound vertices along, so the
    /// vertex-authoritative rebind pass doesn't snap the change back.
    pub(crate) fn write_line_geometry(
        &mut self,
        id: ElementId,
        origin: Point,
        to: Point,
        control: Option<Point>,
    ) {
        let Some(l) = self.line_mut(id) else { return };
        l.origin = origin;
        l.to = to;
        l.control = control;
        let start = l.start_vertex;
        let end = l.end_vertex;
        if let Some(vid) = start {
            self.write_vertex_position(vid, origin);
        }
        if let Some(vid) = end {
            self.write_vertex_position(vid, to);
        }
    }

    /// Translate a set of elements, moving each shared vertex exactly once.
    ///
    /// Vertices bound by a moved line/loop but living outside the moved
    /// subtrees are dragged along; that is what makes shared endpoints
    /// shared. Targets nested inside other targets are skipped.
    pub(crate) fn shift_targets(&mut self, ids: &[ElementId], delta: Point) {
        use std::collections::BTreeSet;

        // Per-target coverage, used to drop duplicates and targets nested
        // inside other targets so nothing shifts twice.
        let mut subtrees: Vec<(ElementId, BTreeSet<ElementId>)> = Vec::new();
        for &id in ids {
            if subtrees.iter().any(|(seen, _)| *seen == id) {
                continue;
            }
            if let Some(elem) = self.get_element(id) {
                let mut set = BTreeSet::new();
                collect_subtree_ids(elem, &mut set);
                subtrees.push((id, set));
            }
        }
        let roots: Vec<ElementId> = subtrees
            .iter()
            .filter(|(id, _)| {
                !subtrees
                    .iter()
                    .any(|(other, set)| other != id && set.contains(id))
            })
            .map(|(id, _)| *id)
            .collect();
        let covered: BTreeSet<ElementId> =
            subtrees.into_iter().flat_map(|(_, set)| set).collect();

        let mut bound: BTreeSet<ElementId> = BTreeSet::new();
        for &id in &roots {
            if let Some(elem) = self.get_element(id) {
                collect_bound_vertices(elem, &mut bound);
            }
        }

        for &id in &roots {
            if let Some(elem) = self.get_element_mut(id) {
                elem.shift(delta);
            }
        }
        for vid in bound {
            if covered.contains(&vid) {
                continue;
            }
            if let Some(v) = self.vertex_mut(vid) {
                v.at = v.at.translated(delta);
            }
        }
    }

    // ── Spatial queries ──────────────────────────────────────────────────

    /// Nearest vertex within `tolerance` of `point`, in document order,
    /// optionally excluding one id. Tolerance 0 demands an exact position
    /// match.
    pub fn find_nearest_vertex(
        &self,
        point: Point,
        tolerance: f64,
        exclude: Option<ElementId>,
    ) -> Option<ElementId> {
        let mut best: Option<(ElementId, f64)> = None;
        for (&id, at) in &self.vertex_map {
            if exclude == Some(id) {
                continue;
            }
            let d = at.distance_to(&point);
            if d > tolerance {
                continue;
            }
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Topmost element within `px_tolerance` screen pixels of `point` at the
    /// given zoom factor.
    pub fn hit_test(&self, point: Point, zoom: f64, px_tolerance: f64) -> Option<&Element> {
        if zoom <= 0.0 {
            return None;
        }
        query::find_element(&self.elements, point, None, px_tolerance / zoom)
    }

    /// Click-cycling variant of [`Document::hit_test`]: passing the
    /// previously returned id walks down through overlapping elements.
    pub fn find_element(
        &self,
        point: Point,
        current: Option<ElementId>,
        tolerance: f64,
    ) -> Option<&Element> {
        query::find_element(&self.elements, point, current, tolerance)
    }

    // ── Selection surface ────────────────────────────────────────────────

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Make `id` the current element (clearing the rest unless `additive`).
    /// Unknown ids are ignored.
    pub fn set_current_element(&mut self, id: ElementId, additive: bool) {
        if self.index_of(id).is_none() {
            return;
        }
        self.selection.set_current(id, additive);
    }

    pub fn toggle_selection(&mut self, id: ElementId) {
        if self.index_of(id).is_none() {
            return;
        }
        self.selection.toggle(id);
    }

    /// Replace the selection wholesale; ids that don't resolve are dropped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        let alive: Vec<ElementId> = ids
            .into_iter()
            .filter(|&id| self.index_of(id).is_some())
            .collect();
        self.selection.set(alive);
    }

    /// Select every element whose bounds intersect `rect`, in z-order.
    pub fn select_in_rect(&mut self, rect: &Rect, additive: bool) {
        let hits = query::elements_in_rect(&self.elements, rect);
        if !additive {
            self.selection.set([]);
        }
        for idx in hits {
            let id = self.elements[idx].id();
            self.selection.insert(id);
        }
    }

    pub fn clear_select_mode(&mut self) {
        self.selection.clear();
    }

    /// Swap the primary and legacy secondary cursors.
    pub fn change_select(&mut self) {
        self.selection.swap_current();
    }

    /// Set (or clear) the legacy secondary cursor. Unknown ids are ignored.
    pub fn set_current_sub_element(&mut self, id: Option<ElementId>) {
        if let Some(id) = id {
            if self.index_of(id).is_none() {
                return;
            }
        }
        self.selection.set_current_sub(id);
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.is_selected(id)
    }

    pub fn current_element(&self) -> Option<&Element> {
        self.selection.current().and_then(|id| self.get_element(id))
    }

    pub fn current_sub_element(&self) -> Option<&Element> {
        self.selection
            .current_sub()
            .and_then(|id| self.get_element(id))
    }

    /// Selected elements in selection order.
    pub fn selected_elements(&self) -> Vec<&Element> {
        self.selection
            .ids()
            .filter_map(|id| self.get_element(id))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tree walkers
// ────────────────────────────────────────────────────────────────────────────

/// True if `id` names `elems`' own entries or anything nested below them.
pub(crate) fn subtree_contains(elems: &[Element], id: ElementId) -> bool {
    elems.iter().any(|e| {
        e.id() == id
            || matches!(e, Element::Group(g) if subtree_contains(&g.children, id))
    })
}

/// Collect the element's id and every nested child id.
fn collect_subtree_ids(elem: &Element, out: &mut std::collections::BTreeSet<ElementId>) {
    out.insert(elem.id());
    if let Element::Group(g) = elem {
        for child in &g.children {
            collect_subtree_ids(child, out);
        }
    }
}

/// Collect every vertex id referenced by lines/loops in the element's subtree.
fn collect_bound_vertices(elem: &Element, out: &mut std::collections::BTreeSet<ElementId>) {
    match elem {
        Element::Line(l) => {
            out.extend(l.start_vertex);
            out.extend(l.end_vertex);
        }
        Element::Loop(l) => out.extend(l.center_vertex),
        Element::Group(g) => {
            for child in &g.children {
                collect_bound_vertices(child, out);
            }
        }
        Element::Vertex(_) | Element::Annotation(_) => {}
    }
}
