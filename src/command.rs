//! Reversible editing commands.
//!
//! Every mutation of the document goes through a [`Command`]. A command
//! carries its own inverse: `apply` performs the mutation and records the
//! prior state it needs, `revert` undoes exactly that mutation. Reversal is
//! targeted — a command never replays the document from a snapshot, it only
//! touches what it changed, which keeps history memory bounded.
//!
//! Two recording disciplines are used:
//! - Creation commands hold a **copy** of the entity, snapshotted when the
//!   command is constructed. The live object the caller keeps editing is a
//!   different instance, so later edits can never corrupt history.
//! - Mutation commands store the previous value (or, for plain translations,
//!   the negated delta) at `apply` time. Trigonometric transforms store
//!   previous values outright since rotating back is not bit-exact.
//!
//! Commands with nothing to do — a missing id, a scale factor of zero, an
//! ungroup of a non-group — are silent no-ops, never errors.

use crate::document::Document;
use crate::geometry::{Point, normalize_angle};
use crate::model::{
    Annotation, Element, ElementId, Group, Line, LineEnd, LineStyle, Loop, Vertex,
};

/// A single undoable mutation of the diagram document.
///
/// Fields named `prev*` / `slots` / `detached*` are recorded by `apply` and
/// consumed by `revert`; construct commands through the associated functions,
/// which leave them empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ── Creation ──────────────────────────────────────────────────────────
    SetVertex(Vertex),
    SetLine(Line),
    SetLoop(Loop),
    SetAnnotation(Annotation),

    // ── Deletion ──────────────────────────────────────────────────────────
    /// Remove one element. Deleting a vertex also detaches it from every
    /// line/loop that referenced it (the self-healing pass then synthesizes
    /// replacements at the denormalized positions).
    Delete {
        id: ElementId,
        removed: Option<(usize, Element)>,
        detached_lines: Vec<(ElementId, LineEnd)>,
        detached_loops: Vec<ElementId>,
    },
    /// Remove several elements atomically as one history entry.
    DeleteGroup {
        ids: Vec<ElementId>,
        removed: Vec<(usize, Element)>,
        detached_lines: Vec<(ElementId, LineEnd, ElementId)>,
        detached_loops: Vec<(ElementId, ElementId)>,
    },

    // ── Movement / transform ──────────────────────────────────────────────
    /// Translate one element. Bound vertices move with it, so shared
    /// endpoints drag their other lines along.
    Move { id: ElementId, delta: Point },
    /// Translate several elements atomically; shared vertices move once.
    MoveGroup { ids: Vec<ElementId>, delta: Point },
    /// Rotate a line about its origin or spin a loop's arc angles.
    Rotation {
        id: ElementId,
        angle: f64,
        prev_vertices: Vec<(ElementId, Point)>,
        prev_line: Option<(Point, Point, Option<Point>)>,
        prev_loop: Option<(f64, f64)>,
    },
    /// Scale a line about its origin or a loop's radius. Factor 0 is vacuous.
    ChangeScale {
        id: ElementId,
        factor: f64,
        prev_vertices: Vec<(ElementId, Point)>,
        prev_line: Option<(Point, Point, Option<Point>)>,
        prev_radius: Option<f64>,
    },

    // ── Loop geometry ─────────────────────────────────────────────────────
    ChangeArcAngle { id: ElementId, delta: f64, prev: Option<f64> },
    ChangeArcEndAngle { id: ElementId, delta: f64, prev: Option<f64> },
    SetLoopRadius { id: ElementId, radius: f64, prev: Option<f64> },
    SetLoopBeginAngle { id: ElementId, angle: f64, prev: Option<f64> },
    SetLoopEndAngle { id: ElementId, angle: f64, prev: Option<f64> },
    SetLoopAngles {
        id: ElementId,
        begin: f64,
        end: f64,
        prev: Option<(f64, f64)>,
    },

    // ── Styling / labels ──────────────────────────────────────────────────
    /// Cycle a line's stroke style.
    ChangeType { id: ElementId, prev: Option<LineStyle> },
    /// Cycle a loop's stroke style.
    ChangeStyle { id: ElementId, prev: Option<LineStyle> },
    SetLineStyle { id: ElementId, style: LineStyle, prev: Option<LineStyle> },
    SetLoopStyle { id: ElementId, style: LineStyle, prev: Option<LineStyle> },
    SetLineLabel {
        id: ElementId,
        label: String,
        offset: f64,
        prev: Option<(String, f64)>,
    },
    SetLoopLabel { id: ElementId, label: String, prev: Option<String> },
    SetAnnotationText { id: ElementId, text: String, prev: Option<String> },
    /// Toggle a loop's fill. Self-inverse.
    Fill { id: ElementId },

    // ── Arrows ────────────────────────────────────────────────────────────
    /// Toggle a line's direction arrow. Self-inverse.
    ArrowToggle { id: ElementId },
    RotateArrow { id: ElementId, delta: f64, prev: Option<f64> },
    SetArrowRotation { id: ElementId, rotation: f64, prev: Option<f64> },

    // ── Line endpoints ────────────────────────────────────────────────────
    /// Drop one endpoint at a new position. The old vertex binding is
    /// released; the rebind pass finds or synthesizes a vertex at the new
    /// position.
    SetLineEndpoint {
        id: ElementId,
        end: LineEnd,
        at: Point,
        prev: Option<(Point, Option<ElementId>)>,
    },
    SetLineControlPoint {
        id: ElementId,
        control: Option<Point>,
        prev: Option<Option<Point>>,
    },

    // ── Grouping ──────────────────────────────────────────────────────────
    /// Collapse the given top-level elements (in their z-order) into one
    /// group occupying the slot of the lowest one.
    GroupSelection {
        ids: Vec<ElementId>,
        group_id: ElementId,
        slots: Vec<(usize, ElementId)>,
    },
    /// Dissolve a group back into its children at the group's slot.
    UngroupSelection {
        group_id: ElementId,
        slot: Option<usize>,
        child_ids: Vec<ElementId>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Constructors
// ────────────────────────────────────────────────────────────────────────────

impl Command {
    /// Snapshot `vertex` into a creation command. The argument is copied;
    /// the caller's instance stays live and independent.
    pub fn set_vertex(vertex: &Vertex) -> Command {
        Command::SetVertex(vertex.clone())
    }

    pub fn set_line(line: &Line) -> Command {
        Command::SetLine(line.clone())
    }

    pub fn set_loop(ring: &Loop) -> Command {
        Command::SetLoop(ring.clone())
    }

    pub fn set_annotation(annotation: &Annotation) -> Command {
        Command::SetAnnotation(annotation.clone())
    }

    pub fn delete(id: ElementId) -> Command {
        Command::Delete {
            id,
            removed: None,
            detached_lines: Vec::new(),
            detached_loops: Vec::new(),
        }
    }

    pub fn delete_group(ids: Vec<ElementId>) -> Command {
        Command::DeleteGroup {
            ids,
            removed: Vec::new(),
            detached_lines: Vec::new(),
            detached_loops: Vec::new(),
        }
    }

    pub fn move_element(id: ElementId, delta: Point) -> Command {
        Command::Move { id, delta }
    }

    pub fn move_group(ids: Vec<ElementId>, delta: Point) -> Command {
        Command::MoveGroup { ids, delta }
    }

    pub fn rotation(id: ElementId, angle: f64) -> Command {
        Command::Rotation {
            id,
            angle,
            prev_vertices: Vec::new(),
            prev_line: None,
            prev_loop: None,
        }
    }

    pub fn change_scale(id: ElementId, factor: f64) -> Command {
        Command::ChangeScale {
            id,
            factor,
            prev_vertices: Vec::new(),
            prev_line: None,
            prev_radius: None,
        }
    }

    pub fn change_arc_angle(id: ElementId, delta: f64) -> Command {
        Command::ChangeArcAngle { id, delta, prev: None }
    }

    pub fn change_arc_end_angle(id: ElementId, delta: f64) -> Command {
        Command::ChangeArcEndAngle { id, delta, prev: None }
    }

    pub fn set_loop_radius(id: ElementId, radius: f64) -> Command {
        Command::SetLoopRadius { id, radius, prev: None }
    }

    pub fn set_loop_begin_angle(id: ElementId, angle: f64) -> Command {
        Command::SetLoopBeginAngle { id, angle, prev: None }
    }

    pub fn set_loop_end_angle(id: ElementId, angle: f64) -> Command {
        Command::SetLoopEndAngle { id, angle, prev: None }
    }

    pub fn set_loop_angles(id: ElementId, begin: f64, end: f64) -> Command {
        Command::SetLoopAngles { id, begin, end, prev: None }
    }

    pub fn change_type(id: ElementId) -> Command {
        Command::ChangeType { id, prev: None }
    }

    pub fn change_style(id: ElementId) -> Command {
        Command::ChangeStyle { id, prev: None }
    }

    pub fn set_line_style(id: ElementId, style: LineStyle) -> Command {
        Command::SetLineStyle { id, style, prev: None }
    }

    pub fn set_loop_style(id: ElementId, style: LineStyle) -> Command {
        Command::SetLoopStyle { id, style, prev: None }
    }

    pub fn set_line_label(id: ElementId, label: impl Into<String>, offset: f64) -> Command {
        Command::SetLineLabel {
            id,
            label: label.into(),
            offset,
            prev: None,
        }
    }

    pub fn set_loop_label(id: ElementId, label: impl Into<String>) -> Command {
        Command::SetLoopLabel {
            id,
            label: label.into(),
            prev: None,
        }
    }

    pub fn set_annotation_text(id: ElementId, text: impl Into<String>) -> Command {
        Command::SetAnnotationText {
            id,
            text: text.into(),
            prev: None,
        }
    }

    pub fn fill(id: ElementId) -> Command {
        Command::Fill { id }
    }

    pub fn arrow_toggle(id: ElementId) -> Command {
        Command::ArrowToggle { id }
    }

    pub fn rotate_arrow(id: ElementId, delta: f64) -> Command {
        Command::RotateArrow { id, delta, prev: None }
    }

    pub fn set_arrow_rotation(id: ElementId, rotation: f64) -> Command {
        Command::SetArrowRotation { id, rotation, prev: None }
    }

    pub fn set_line_endpoint(id: ElementId, end: LineEnd, at: Point) -> Command {
        Command::SetLineEndpoint { id, end, at, prev: None }
    }

    pub fn set_line_control_point(id: ElementId, control: Option<Point>) -> Command {
        Command::SetLineControlPoint { id, control, prev: None }
    }

    pub fn group_selection(ids: Vec<ElementId>, group_id: ElementId) -> Command {
        Command::GroupSelection {
            ids,
            group_id,
            slots: Vec::new(),
        }
    }

    pub fn ungroup_selection(group_id: ElementId) -> Command {
        Command::UngroupSelection {
            group_id,
            slot: None,
            child_ids: Vec::new(),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetVertex(_) => "SetVertex",
            Command::SetLine(_) => "SetLine",
            Command::SetLoop(_) => "SetLoop",
            Command::SetAnnotation(_) => "SetAnnotation",
            Command::Delete { .. } => "Delete",
            Command::DeleteGroup { .. } => "DeleteGroup",
            Command::Move { .. } => "Move",
            Command::MoveGroup { .. } => "MoveGroup",
            Command::Rotation { .. } => "Rotation",
            Command::ChangeScale { .. } => "ChangeScale",
            Command::ChangeArcAngle { .. } => "ChangeArcAngle",
            Command::ChangeArcEndAngle { .. } => "ChangeArcEndAngle",
            Command::SetLoopRadius { .. } => "SetLoopRadius",
            Command::SetLoopBeginAngle { .. } => "SetLoopBeginAngle",
            Command::SetLoopEndAngle { .. } => "SetLoopEndAngle",
            Command::SetLoopAngles { .. } => "SetLoopAngles",
            Command::ChangeType { .. } => "ChangeType",
            Command::ChangeStyle { .. } => "ChangeStyle",
            Command::SetLineStyle { .. } => "SetLineStyle",
            Command::SetLoopStyle { .. } => "SetLoopStyle",
            Command::SetLineLabel { .. } => "SetLineLabel",
            Command::SetLoopLabel { .. } => "SetLoopLabel",
            Command::SetAnnotationText { .. } => "SetAnnotationText",
            Command::Fill { .. } => "Fill",
            Command::ArrowToggle { .. } => "ArrowToggle",
            Command::RotateArrow { .. } => "RotateArrow",
            Command::SetArrowRotation { .. } => "SetArrowRotation",
            Command::SetLineEndpoint { .. } => "SetLineEndpoint",
            Command::SetLineControlPoint { .. } => "SetLineControlPoint",
            Command::GroupSelection { .. } => "GroupSelection",
            Command::UngroupSelection { .. } => "UngroupSelection",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Apply / revert
// ────────────────────────────────────────────────────────────────────────────

impl Command {
    /// Perform the mutation, recording whatever `revert` will need. Called
    /// both on first dispatch and on redo; recorded state is overwritten each
    /// time so a redo after an exact undo re-records identical values.
    pub(crate) fn apply(&mut self, doc: &mut Document) {
        match self {
            Command::SetVertex(v) => doc.push_element(Element::Vertex(v.clone())),
            Command::SetLine(l) => doc.push_element(Element::Line(l.clone())),
            Command::SetLoop(l) => doc.push_element(Element::Loop(l.clone())),
            Command::SetAnnotation(a) => {
                doc.push_element(Element::Annotation(a.clone()))
            }

            Command::Delete {
                id,
                removed,
                detached_lines,
                detached_loops,
            } => {
                detached_lines.clear();
                detached_loops.clear();
                *removed = doc.take_element(*id);
                if let Some((_, Element::Vertex(_))) = removed {
                    *detached_lines = doc.detach_vertex_from_lines(*id);
                    *detached_loops = doc.detach_vertex_from_loops(*id);
                }
            }

            Command::DeleteGroup {
                ids,
                removed,
                detached_lines,
                detached_loops,
            } => {
                removed.clear();
                detached_lines.clear();
                detached_loops.clear();
                // Remove in descending index order so earlier indices stay
                // valid, exactly as recorded.
                let mut slots: Vec<(usize, ElementId)> = ids
                    .iter()
                    .filter_map(|&id| doc.index_of(id).map(|i| (i, id)))
                    .collect();
                slots.sort_by_key(|(i, _)| std::cmp::Reverse(*i));
                for (idx, id) in slots {
                    if let Some((_, elem)) = doc.take_element(id) {
                        removed.push((idx, elem));
                    }
                }
                // Detach deleted vertices from the lines/loops that survive.
                for (_, elem) in removed.iter() {
                    if let Element::Vertex(v) = elem {
                        for (line_id, end) in doc.detach_vertex_from_lines(v.id) {
                            detached_lines.push((line_id, end, v.id));
                        }
                        for loop_id in doc.detach_vertex_from_loops(v.id) {
                            detached_loops.push((loop_id, v.id));
                        }
                    }
                }
            }

            Command::Move { id, delta } => doc.shift_targets(&[*id], *delta),

            Command::MoveGroup { ids, delta } => doc.shift_targets(ids, *delta),

            Command::Rotation {
                id,
                angle,
                prev_vertices,
                prev_line,
                prev_loop,
            } => {
                prev_vertices.clear();
                *prev_line = None;
                *prev_loop = None;
                match doc.get_element(*id).cloned() {
                    Some(Element::Line(line)) => {
                        *prev_line = Some((line.origin, line.to, line.control));
                        for vid in [line.start_vertex, line.end_vertex].into_iter().flatten() {
                            if let Some(v) = doc.get_vertex(vid) {
                                prev_vertices.push((vid, v.at));
                            }
                        }
                        let new_to = line.to.rotated_around(line.origin, *angle);
                        let new_control =
                            line.control.map(|c| c.rotated_around(line.origin, *angle));
                        doc.write_line_geometry(*id, line.origin, new_to, new_control);
                    }
                    Some(Element::Loop(ring)) => {
                        *prev_loop = Some((ring.begin_angle, ring.end_angle));
                        if let Some(l) = doc.loop_mut(*id) {
                            l.begin_angle = normalize_angle(l.begin_angle + *angle);
                            l.end_angle = normalize_angle(l.end_angle + *angle);
                        }
                    }
                    // Rotating a point about itself, text, or a whole group
                    // is vacuous.
                    _ => {}
                }
            }

            Command::ChangeScale {
                id,
                factor,
                prev_vertices,
                prev_line,
                prev_radius,
            } => {
                prev_vertices.clear();
                *prev_line = None;
                *prev_radius = None;
                if *factor <= 0.0 {
                    return;
                }
                match doc.get_element(*id).cloned() {
                    Some(Element::Line(line)) => {
                        *prev_line = Some((line.origin, line.to, line.control));
                        for vid in [line.start_vertex, line.end_vertex].into_iter().flatten() {
                            if let Some(v) = doc.get_vertex(vid) {
                                prev_vertices.push((vid, v.at));
                            }
                        }
                        let new_to = line.to.scaled_about(line.origin, *factor);
                        let new_control =
                            line.control.map(|c| c.scaled_about(line.origin, *factor));
                        doc.write_line_geometry(*id, line.origin, new_to, new_control);
                    }
                    Some(Element::Loop(ring)) => {
                        *prev_radius = Some(ring.radius);
                        if let Some(l) = doc.loop_mut(*id) {
                            l.radius *= *factor;
                        }
                    }
                    _ => {}
                }
            }

            Command::ChangeArcAngle { id, delta, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.begin_angle);
                    l.begin_angle = normalize_angle(l.begin_angle + *delta);
                }
            }

            Command::ChangeArcEndAngle { id, delta, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.end_angle);
                    l.end_angle = normalize_angle(l.end_angle + *delta);
                }
            }

            Command::SetLoopRadius { id, radius, prev } => {
                *prev = None;
                if *radius <= 0.0 {
                    return;
                }
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.radius);
                    l.radius = *radius;
                }
            }

            Command::SetLoopBeginAngle { id, angle, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.begin_angle);
                    l.begin_angle = normalize_angle(*angle);
                }
            }

            Command::SetLoopEndAngle { id, angle, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.end_angle);
                    l.end_angle = normalize_angle(*angle);
                }
            }

            Command::SetLoopAngles { id, begin, end, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some((l.begin_angle, l.end_angle));
                    l.begin_angle = normalize_angle(*begin);
                    l.end_angle = normalize_angle(*end);
                }
            }

            Command::ChangeType { id, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some(l.style);
                    l.style = l.style.next();
                }
            }

            Command::ChangeStyle { id, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.style);
                    l.style = l.style.next();
                }
            }

            Command::SetLineStyle { id, style, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some(l.style);
                    l.style = *style;
                }
            }

            Command::SetLoopStyle { id, style, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(l.style);
                    l.style = *style;
                }
            }

            Command::SetLineLabel { id, label, offset, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some((std::mem::take(&mut l.label), l.label_offset));
                    l.label = label.clone();
                    l.label_offset = *offset;
                }
            }

            Command::SetLoopLabel { id, label, prev } => {
                *prev = None;
                if let Some(l) = doc.loop_mut(*id) {
                    *prev = Some(std::mem::take(&mut l.label));
                    l.label = label.clone();
                }
            }

            Command::SetAnnotationText { id, text, prev } => {
                *prev = None;
                if let Some(a) = doc.annotation_mut(*id) {
                    *prev = Some(std::mem::take(&mut a.text));
                    a.text = text.clone();
                }
            }

            Command::Fill { id } => {
                if let Some(l) = doc.loop_mut(*id) {
                    l.fill = !l.fill;
                }
            }

            Command::ArrowToggle { id } => {
                if let Some(l) = doc.line_mut(*id) {
                    l.arrow = !l.arrow;
                }
            }

            Command::RotateArrow { id, delta, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some(l.arrow_rotation);
                    l.arrow_rotation = normalize_angle(l.arrow_rotation + *delta);
                }
            }

            Command::SetArrowRotation { id, rotation, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some(l.arrow_rotation);
                    l.arrow_rotation = normalize_angle(*rotation);
                }
            }

            Command::SetLineEndpoint { id, end, at, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    match end {
                        LineEnd::Start => {
                            *prev = Some((l.origin, l.start_vertex.take()));
                            l.origin = *at;
                        }
                        LineEnd::End => {
                            *prev = Some((l.to, l.end_vertex.take()));
                            l.to = *at;
                        }
                    }
                }
            }

            Command::SetLineControlPoint { id, control, prev } => {
                *prev = None;
                if let Some(l) = doc.line_mut(*id) {
                    *prev = Some(l.control);
                    l.control = *control;
                }
            }

            Command::GroupSelection { ids, group_id, slots } => {
                slots.clear();
                // Collect members in z-order so the group preserves the
                // original relative order.
                let mut members: Vec<(usize, ElementId)> = ids
                    .iter()
                    .filter_map(|&id| doc.index_of(id).map(|i| (i, id)))
                    .collect();
                members.sort_by_key(|(i, _)| *i);
                if members.is_empty() {
                    return;
                }
                let insert_at = members[0].0;
                *slots = members.clone();
                let mut children = Vec::with_capacity(members.len());
                for &(_, id) in members.iter().rev() {
                    if let Some((_, elem)) = doc.take_element(id) {
                        children.push(elem);
                    }
                }
                children.reverse();
                doc.insert_element(insert_at, Element::Group(Group::new(*group_id, children)));
                doc.selection_mut().set([*group_id]);
            }

            Command::UngroupSelection { group_id, slot, child_ids } => {
                *slot = None;
                child_ids.clear();
                let Some(idx) = doc.index_of(*group_id) else {
                    return;
                };
                // Ungrouping anything but a group is vacuous; check before
                // taking the element out.
                if doc.get_element(*group_id).and_then(Element::as_group).is_none() {
                    return;
                }
                let Some((_, Element::Group(group))) = doc.take_element(*group_id) else {
                    return;
                };
                *slot = Some(idx);
                *child_ids = group.children.iter().map(Element::id).collect();
                for (offset, child) in group.children.into_iter().enumerate() {
                    doc.insert_element(idx + offset, child);
                }
                doc.selection_mut().set(child_ids.iter().copied());
            }
        }
    }

    /// Exact inverse of the most recent `apply` of this command.
    pub(crate) fn revert(&self, doc: &mut Document) {
        match self {
            Command::SetVertex(v) => {
                doc.take_element(v.id);
            }
            Command::SetLine(l) => {
                doc.take_element(l.id);
            }
            Command::SetLoop(l) => {
                doc.take_element(l.id);
            }
            Command::SetAnnotation(a) => {
                doc.take_element(a.id);
            }

            Command::Delete {
                id,
                removed,
                detached_lines,
                detached_loops,
            } => {
                let Some((idx, elem)) = removed else {
                    return;
                };
                doc.insert_element(*idx, elem.clone());
                for (line_id, end) in detached_lines {
                    doc.restore_line_binding(*line_id, *end, *id);
                }
                for loop_id in detached_loops {
                    doc.restore_loop_binding(*loop_id, *id);
                }
            }

            Command::DeleteGroup {
                removed,
                detached_lines,
                detached_loops,
                ..
            } => {
                // Re-insert in ascending index order.
                let mut sorted: Vec<&(usize, Element)> = removed.iter().collect();
                sorted.sort_by_key(|(i, _)| *i);
                for (idx, elem) in sorted {
                    doc.insert_element(*idx, elem.clone());
                }
                for (line_id, end, vertex_id) in detached_lines {
                    doc.restore_line_binding(*line_id, *end, *vertex_id);
                }
                for (loop_id, vertex_id) in detached_loops {
                    doc.restore_loop_binding(*loop_id, *vertex_id);
                }
            }

            Command::Move { id, delta } => {
                doc.shift_targets(&[*id], Point::new(-delta.x, -delta.y));
            }

            Command::MoveGroup { ids, delta } => {
                doc.shift_targets(ids, Point::new(-delta.x, -delta.y));
            }

            Command::Rotation {
                id,
                prev_vertices,
                prev_line,
                prev_loop,
                ..
            } => {
                if let Some((origin, to, control)) = prev_line {
                    doc.write_line_geometry(*id, *origin, *to, *control);
                }
                if let Some((begin, end)) = prev_loop {
                    if let Some(l) = doc.loop_mut(*id) {
                        l.begin_angle = *begin;
                        l.end_angle = *end;
                    }
                }
                for (vid, at) in prev_vertices {
                    doc.write_vertex_position(*vid, *at);
                }
            }

            Command::ChangeScale {
                id,
                prev_vertices,
                prev_line,
                prev_radius,
                ..
            } => {
                if let Some((origin, to, control)) = prev_line {
                    doc.write_line_geometry(*id, *origin, *to, *control);
                }
                if let Some(radius) = prev_radius {
                    if let Some(l) = doc.loop_mut(*id) {
                        l.radius = *radius;
                    }
                }
                for (vid, at) in prev_vertices {
                    doc.write_vertex_position(*vid, *at);
                }
            }

            Command::ChangeArcAngle { id, prev, .. } => {
                if let (Some(angle), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.begin_angle = *angle;
                }
            }

            Command::ChangeArcEndAngle { id, prev, .. } => {
                if let (Some(angle), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.end_angle = *angle;
                }
            }

            Command::SetLoopRadius { id, prev, .. } => {
                if let (Some(radius), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.radius = *radius;
                }
            }

            Command::SetLoopBeginAngle { id, prev, .. } => {
                if let (Some(angle), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.begin_angle = *angle;
                }
            }

            Command::SetLoopEndAngle { id, prev, .. } => {
                if let (Some(angle), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.end_angle = *angle;
                }
            }

            Command::SetLoopAngles { id, prev, .. } => {
                if let (Some((begin, end)), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.begin_angle = *begin;
                    l.end_angle = *end;
                }
            }

            Command::ChangeType { id, prev } => {
                if let (Some(style), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.style = *style;
                }
            }

            Command::ChangeStyle { id, prev } => {
                if let (Some(style), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.style = *style;
                }
            }

            Command::SetLineStyle { id, prev, .. } => {
                if let (Some(style), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.style = *style;
                }
            }

            Command::SetLoopStyle { id, prev, .. } => {
                if let (Some(style), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.style = *style;
                }
            }

            Command::SetLineLabel { id, prev, .. } => {
                if let (Some((label, offset)), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.label = label.clone();
                    l.label_offset = *offset;
                }
            }

            Command::SetLoopLabel { id, prev, .. } => {
                if let (Some(label), Some(l)) = (prev, doc.loop_mut(*id)) {
                    l.label = label.clone();
                }
            }

            Command::SetAnnotationText { id, prev, .. } => {
                if let (Some(text), Some(a)) = (prev, doc.annotation_mut(*id)) {
                    a.text = text.clone();
                }
            }

            Command::Fill { id } => {
                if let Some(l) = doc.loop_mut(*id) {
                    l.fill = !l.fill;
                }
            }

            Command::ArrowToggle { id } => {
                if let Some(l) = doc.line_mut(*id) {
                    l.arrow = !l.arrow;
                }
            }

            Command::RotateArrow { id, prev, .. } => {
                if let (Some(rotation), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.arrow_rotation = *rotation;
                }
            }

            Command::SetArrowRotation { id, prev, .. } => {
                if let (Some(rotation), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.arrow_rotation = *rotation;
                }
            }

            Command::SetLineEndpoint { id, end, prev, .. } => {
                if let (Some((at, vertex)), Some(l)) = (prev, doc.line_mut(*id)) {
                    match end {
                        LineEnd::Start => {
                            l.origin = *at;
                            l.start_vertex = *vertex;
                        }
                        LineEnd::End => {
                            l.to = *at;
                            l.end_vertex = *vertex;
                        }
                    }
                }
            }

            Command::SetLineControlPoint { id, prev, .. } => {
                if let (Some(control), Some(l)) = (prev, doc.line_mut(*id)) {
                    l.control = *control;
                }
            }

            Command::GroupSelection { group_id, slots, .. } => {
                if slots.is_empty() {
                    return;
                }
                let Some((_, Element::Group(group))) = doc.take_element(*group_id) else {
                    return;
                };
                for ((idx, _), child) in slots.iter().zip(group.children.into_iter()) {
                    doc.insert_element(*idx, child);
                }
                doc.selection_mut().set(slots.iter().map(|(_, id)| *id));
            }

            Command::UngroupSelection { group_id, slot, child_ids } => {
                let Some(idx) = slot else {
                    return;
                };
                let mut children = Vec::with_capacity(child_ids.len());
                for &id in child_ids.iter() {
                    if let Some((_, elem)) = doc.take_element(id) {
                        children.push(elem);
                    }
                }
                doc.insert_element(*idx, Element::Group(Group::new(*group_id, children)));
                doc.selection_mut().set([*group_id]);
            }
        }
    }
}
