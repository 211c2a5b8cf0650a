//! The vertex-graph binder.
//!
//! Lines and loops reference shared vertices by id and carry denormalized
//! copies of their positions (`origin`/`to`/loop origin). This module keeps
//! the two views mutually consistent:
//!
//! - After every command/undo/redo, [`Document::rebind_graph_references`]
//!   resolves each reference. A resolving reference copies the vertex
//!   position into the denormalized fields (the vertex is authoritative); an
//!   unset or dangling reference is *healed* by binding to a vertex found at
//!   the exact denormalized position, synthesizing one if necessary. The
//!   graph therefore can never end a command with a dangling reference, even
//!   for lines authored without pre-created vertices.
//! - Vertex adjacency sets are derived: rebuilt from scratch on every pass.
//!
//! The explicit bind/merge/cleanup operations below are the scripting
//! surface; they run outside the undo history.

use tracing::trace;

use crate::document::Document;
use crate::geometry::Point;
use crate::model::{Element, ElementId, LineEnd, Vertex};

impl Document {
    /// The self-healing rebind pass. Part of the fixed commit pipeline; runs
    /// after reindexing so the vertex map is current. Returns the vertices it
    /// had to synthesize so the history can replay them exactly.
    pub(crate) fn rebind_graph_references(&mut self) -> Vec<(ElementId, Point)> {
        let mut healed = Vec::new();

        for line_id in self.line_ids.clone() {
            let Some(l) = self.get_element(line_id).and_then(Element::as_line) else {
                continue;
            };
            let (origin, to) = (l.origin, l.to);
            let (start_ref, end_ref) = (l.start_vertex, l.end_vertex);
            let (start_id, start_at) = self.resolve_or_heal(start_ref, origin, &mut healed);
            let (end_id, end_at) = self.resolve_or_heal(end_ref, to, &mut healed);
            if let Some(l) = self.line_mut(line_id) {
                l.start_vertex = Some(start_id);
                l.origin = start_at;
                l.end_vertex = Some(end_id);
                l.to = end_at;
            }
        }

        for loop_id in self.loop_ids.clone() {
            let Some(l) = self.get_element(loop_id).and_then(Element::as_loop) else {
                continue;
            };
            let (origin, center_ref) = (l.origin, l.center_vertex);
            let (center_id, center_at) = self.resolve_or_heal(center_ref, origin, &mut healed);
            if let Some(l) = self.loop_mut(loop_id) {
                l.center_vertex = Some(center_id);
                l.origin = center_at;
            }
        }

        self.rebuild_adjacency();
        healed
    }

    /// Resolve a vertex reference, or bind to a vertex at `at` — reusing an
    /// exact-position match, synthesizing a fresh vertex otherwise.
    fn resolve_or_heal(
        &mut self,
        vertex: Option<ElementId>,
        at: Point,
        healed: &mut Vec<(ElementId, Point)>,
    ) -> (ElementId, Point) {
        if let Some(vid) = vertex {
            if let Some(&pos) = self.vertex_map.get(&vid) {
                return (vid, pos);
            }
        }
        if let Some(vid) = self.find_nearest_vertex(at, 0.0, None) {
            return (vid, at);
        }
        let vid = self.allocate_id();
        trace!(vertex = vid, x = at.x, y = at.y, "synthesizing vertex for dangling reference");
        self.push_element(Element::Vertex(Vertex::new(vid, at.x, at.y)));
        self.vertex_ids.push(vid);
        self.vertex_map.insert(vid, at);
        healed.push((vid, at));
        (vid, at)
    }

    /// Rebuild every vertex's adjacency sets from the line/loop references.
    fn rebuild_adjacency(&mut self) {
        fn clear(elems: &mut Vec<Element>) {
            for e in elems {
                match e {
                    Element::Vertex(v) => {
                        v.lines.clear();
                        v.loops.clear();
                    }
                    Element::Group(g) => clear(&mut g.children),
                    _ => {}
                }
            }
        }
        clear(&mut self.elements);

        for line_id in self.line_ids.clone() {
            let Some(l) = self.get_element(line_id).and_then(Element::as_line) else {
                continue;
            };
            let refs = [l.start_vertex, l.end_vertex];
            for vid in refs.into_iter().flatten() {
                if let Some(v) = self.vertex_mut(vid) {
                    v.lines.insert(line_id);
                }
            }
        }
        for loop_id in self.loop_ids.clone() {
            let center = self
                .get_element(loop_id)
                .and_then(Element::as_loop)
                .and_then(|l| l.center_vertex);
            if let Some(vid) = center {
                if let Some(v) = self.vertex_mut(vid) {
                    v.loops.insert(loop_id);
                }
            }
        }
    }

    // ── Explicit binding surface ─────────────────────────────────────────

    /// Bind both line endpoints to the given vertices.
    pub fn bind_line_to_vertices(
        &mut self,
        line_id: ElementId,
        start: ElementId,
        end: ElementId,
    ) {
        self.bind_line_endpoint(line_id, LineEnd::Start, start);
        self.bind_line_endpoint(line_id, LineEnd::End, end);
    }

    /// Bind one line endpoint to `vertex_id`: detach the previous vertex's
    /// adjacency entry if the reference changed, attach the new one, copy the
    /// vertex position into the endpoint.
    pub fn bind_line_endpoint(&mut self, line_id: ElementId, end: LineEnd, vertex_id: ElementId) {
        let Some(&at) = self.vertex_map.get(&vertex_id) else {
            return;
        };
        let Some(l) = self.line_mut(line_id) else {
            return;
        };
        let prev = match end {
            LineEnd::Start => {
                let prev = l.start_vertex.replace(vertex_id);
                l.origin = at;
                prev
            }
            LineEnd::End => {
                let prev = l.end_vertex.replace(vertex_id);
                l.to = at;
                prev
            }
        };
        let still_attached = self
            .get_element(line_id)
            .and_then(Element::as_line)
            .map(|l| l.start_vertex == prev || l.end_vertex == prev)
            .unwrap_or(false);
        if let Some(pid) = prev {
            if pid != vertex_id && !still_attached {
                if let Some(v) = self.vertex_mut(pid) {
                    v.lines.remove(&line_id);
                }
            }
        }
        if let Some(v) = self.vertex_mut(vertex_id) {
            v.lines.insert(line_id);
        }
    }

    /// Bind a loop's center to `vertex_id`, detaching the previous center.
    pub fn bind_loop_center(&mut self, loop_id: ElementId, vertex_id: ElementId) {
        let Some(&at) = self.vertex_map.get(&vertex_id) else {
            return;
        };
        let Some(l) = self.loop_mut(loop_id) else {
            return;
        };
        let prev = l.center_vertex.replace(vertex_id);
        l.origin = at;
        if let Some(pid) = prev {
            if pid != vertex_id {
                if let Some(v) = self.vertex_mut(pid) {
                    v.loops.remove(&loop_id);
                }
            }
        }
        if let Some(v) = self.vertex_mut(vertex_id) {
            v.loops.insert(loop_id);
        }
    }

    /// Re-point every reference to `source` at `target`, then remove
    /// `source`. Afterwards nothing references `source`; everything that did
    /// now sits at `target`'s position. Self-merge and unknown ids are
    /// no-ops.
    pub fn merge_vertex_into(&mut self, source: ElementId, target: ElementId) {
        if source == target
            || self.get_vertex(source).is_none()
            || self.get_vertex(target).is_none()
        {
            return;
        }
        trace!(source, target, "merging vertex");
        for line_id in self.line_ids.clone() {
            if let Some(l) = self.line_mut(line_id) {
                if l.start_vertex == Some(source) {
                    l.start_vertex = Some(target);
                }
                if l.end_vertex == Some(source) {
                    l.end_vertex = Some(target);
                }
            }
        }
        for loop_id in self.loop_ids.clone() {
            if let Some(l) = self.loop_mut(loop_id) {
                if l.center_vertex == Some(source) {
                    l.center_vertex = Some(target);
                }
            }
        }
        self.remove_element_anywhere(source);
        // Full pipeline: positions re-copied from the target, adjacency
        // rebuilt, the source scrubbed from the selection.
        self.commit();
    }

    /// Remove every vertex that has no attached line or loop and is not part
    /// of the current selection.
    pub fn cleanup_dangling_vertices(&mut self) {
        let dangling: Vec<ElementId> = self
            .vertex_ids
            .iter()
            .copied()
            .filter(|&id| !self.selection.is_selected(id))
            .filter(|&id| self.get_vertex(id).is_some_and(Vertex::is_dangling))
            .collect();
        for id in dangling {
            self.remove_element_anywhere(id);
        }
        self.commit();
    }

    // ── Detach/restore used by the delete commands ───────────────────────

    /// Clear every surviving line's reference to `vertex_id`, reporting which
    /// ends were detached so a revert can restore them.
    pub(crate) fn detach_vertex_from_lines(
        &mut self,
        vertex_id: ElementId,
    ) -> Vec<(ElementId, LineEnd)> {
        let mut detached = Vec::new();
        for line_id in self.line_ids.clone() {
            let Some(l) = self.line_mut(line_id) else {
                continue;
            };
            if l.start_vertex == Some(vertex_id) {
                l.start_vertex = None;
                detached.push((line_id, LineEnd::Start));
            }
            if l.end_vertex == Some(vertex_id) {
                l.end_vertex = None;
                detached.push((line_id, LineEnd::End));
            }
        }
        detached
    }

    /// Clear every surviving loop's center reference to `vertex_id`.
    pub(crate) fn detach_vertex_from_loops(&mut self, vertex_id: ElementId) -> Vec<ElementId> {
        let mut detached = Vec::new();
        for loop_id in self.loop_ids.clone() {
            let Some(l) = self.loop_mut(loop_id) else {
                continue;
            };
            if l.center_vertex == Some(vertex_id) {
                l.center_vertex = None;
                detached.push(loop_id);
            }
        }
        detached
    }

    pub(crate) fn restore_line_binding(
        &mut self,
        line_id: ElementId,
        end: LineEnd,
        vertex_id: ElementId,
    ) {
        if let Some(l) = self.line_mut(line_id) {
            match end {
                LineEnd::Start => l.start_vertex = Some(vertex_id),
                LineEnd::End => l.end_vertex = Some(vertex_id),
            }
        }
    }

    pub(crate) fn restore_loop_binding(&mut self, loop_id: ElementId, vertex_id: ElementId) {
        if let Some(l) = self.loop_mut(loop_id) {
            l.center_vertex = Some(vertex_id);
        }
    }
}
