//! The diagram entity model.
//!
//! A diagram is an ordered list of [`Element`]s (array position = z-order,
//! last = topmost). The element set is closed: vertices, propagator lines,
//! loops, free-floating text annotations, and composite groups. Every shape
//! knows how to move itself, report its axis-aligned bounds, measure its
//! hit-test distance to a point, and describe itself for humans.
//!
//! Vertex adjacency (`Vertex::lines` / `Vertex::loops`) is derived state,
//! rebuilt by the graph binder after every mutation, and is therefore not
//! serialized.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, infinite_line_distance};

/// Stable identifier of an element for its whole lifetime.
pub type ElementId = u64;

/// Sentinel distance returned for "nowhere near" (e.g. outside a loop).
pub const FAR_AWAY: f64 = 1.0e9;

// ────────────────────────────────────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────────────────────────────────────

/// Stroke style of a propagator line or loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    /// Solid line (fermion propagator).
    #[default]
    Plain,
    /// Dashed line (scalar/ghost).
    Dash,
    /// Sine wave (photon / weak boson).
    Wave,
    /// Coil (gluon).
    Coil,
}

impl LineStyle {
    /// The next style in the cycle order used by the style-cycling commands.
    pub fn next(self) -> LineStyle {
        match self {
            LineStyle::Plain => LineStyle::Dash,
            LineStyle::Dash => LineStyle::Wave,
            LineStyle::Wave => LineStyle::Coil,
            LineStyle::Coil => LineStyle::Plain,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LineStyle::Plain => "plain",
            LineStyle::Dash => "dash",
            LineStyle::Wave => "wave",
            LineStyle::Coil => "coil",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vertex
// ────────────────────────────────────────────────────────────────────────────

/// A point entity. When lines or loops bind to it, the adjacency sets record
/// which ones; a vertex with empty adjacency is a plain drawable point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: ElementId,
    pub at: Point,
    /// Ids of lines attached by either endpoint. Derived, not serialized.
    #[serde(skip)]
    pub lines: BTreeSet<ElementId>,
    /// Ids of loops centered here. Derived, not serialized.
    #[serde(skip)]
    pub loops: BTreeSet<ElementId>,
}

impl Vertex {
    pub fn new(id: ElementId, x: f64, y: f64) -> Self {
        Self {
            id,
            at: Point::new(x, y),
            lines: BTreeSet::new(),
            loops: BTreeSet::new(),
        }
    }

    /// True if no line or loop is attached.
    pub fn is_dangling(&self) -> bool {
        self.lines.is_empty() && self.loops.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line
// ────────────────────────────────────────────────────────────────────────────

/// A propagator line between two (usually vertex-bound) endpoints.
///
/// `origin` and `to` are denormalized copies of the bound vertex positions;
/// the graph binder keeps them in sync after every command. `control`, when
/// present, bends the line into a curve and is never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: ElementId,
    pub origin: Point,
    pub to: Point,
    #[serde(default)]
    pub control: Option<Point>,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default)]
    pub label: String,
    /// Perpendicular offset of the label from the line midpoint.
    #[serde(default)]
    pub label_offset: f64,
    /// Whether the direction arrow is drawn.
    #[serde(default = "default_arrow")]
    pub arrow: bool,
    /// Extra rotation of the arrow head, radians.
    #[serde(default)]
    pub arrow_rotation: f64,
    #[serde(default)]
    pub start_vertex: Option<ElementId>,
    #[serde(default)]
    pub end_vertex: Option<ElementId>,
}

fn default_arrow() -> bool {
    true
}

impl Line {
    pub fn new(id: ElementId, origin: Point, to: Point) -> Self {
        Self {
            id,
            origin,
            to,
            control: None,
            style: LineStyle::Plain,
            label: String::new(),
            label_offset: 0.0,
            arrow: true,
            arrow_rotation: 0.0,
            start_vertex: None,
            end_vertex: None,
        }
    }

    pub fn length(&self) -> f64 {
        self.origin.distance_to(&self.to)
    }

    pub fn bounds(&self) -> Rect {
        let r = Rect::from_corners(self.origin, self.to);
        match self.control {
            Some(c) => r.expanded_to(c),
            None => r,
        }
    }

    /// Hit-test metric: distance to the infinite carrier line, not the
    /// segment. Kept as-is so tie-break ordering stays stable.
    pub fn formal_distance(&self, p: Point) -> f64 {
        infinite_line_distance(p, self.origin, self.to)
    }
}

/// Which end of a line an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnd {
    Start,
    End,
}

// ────────────────────────────────────────────────────────────────────────────
// Loop
// ────────────────────────────────────────────────────────────────────────────

/// One of possibly several labels placed around a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopLabel {
    pub label: String,
    /// Angular position on the ring, radians.
    pub angle: f64,
    /// Radial offset from the ring.
    #[serde(default)]
    pub offset: f64,
}

/// A circular loop (or arc) centered on an optionally vertex-bound origin.
///
/// `begin_angle` and `end_angle` live in `[0, 2π)`. Equal angles denote the
/// full circle: the arc span is then 2π, not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub id: ElementId,
    pub origin: Point,
    pub radius: f64,
    #[serde(default)]
    pub begin_angle: f64,
    #[serde(default)]
    pub end_angle: f64,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default)]
    pub fill: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub labels: Vec<LoopLabel>,
    #[serde(default)]
    pub center_vertex: Option<ElementId>,
}

impl Loop {
    pub fn new(id: ElementId, origin: Point, radius: f64) -> Self {
        Self {
            id,
            origin,
            radius,
            begin_angle: 0.0,
            end_angle: 0.0,
            style: LineStyle::Plain,
            fill: false,
            label: String::new(),
            labels: Vec::new(),
            center_vertex: None,
        }
    }

    /// Arc span in `(0, 2π]`. Equal begin/end angles mean a gap-free circle.
    pub fn arc_span(&self) -> f64 {
        let tau = std::f64::consts::TAU;
        let span = (self.end_angle - self.begin_angle).rem_euclid(tau);
        if span == 0.0 { tau } else { span }
    }

    pub fn bounds(&self) -> Rect {
        Rect::around(self.origin, self.radius)
    }

    /// Hit-test metric: zero anywhere inside the radius, a large sentinel
    /// outside. No graded falloff — kept as-is for tie-break stability.
    pub fn formal_distance(&self, p: Point) -> f64 {
        if p.distance_to(&self.origin) <= self.radius {
            0.0
        } else {
            FAR_AWAY
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Annotation
// ────────────────────────────────────────────────────────────────────────────

/// Free-floating text. Its origin never participates in the vertex graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: ElementId,
    pub origin: Point,
    #[serde(default)]
    pub text: String,
}

impl Annotation {
    pub fn new(id: ElementId, origin: Point, text: impl Into<String>) -> Self {
        Self {
            id,
            origin,
            text: text.into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Group
// ────────────────────────────────────────────────────────────────────────────

/// A composite element: an ordered list of children moved and measured as a
/// unit. Children keep their own ids and styles so that ungrouping restores
/// them exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: ElementId,
    pub children: Vec<Element>,
}

impl Group {
    pub fn new(id: ElementId, children: Vec<Element>) -> Self {
        Self { id, children }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Element — the closed shape union
// ────────────────────────────────────────────────────────────────────────────

/// Any diagram element. The `shape` tag doubles as the persisted
/// discriminator; `Vertex` serializes as `"Point"` and `Annotation` as
/// `"String"` to match the snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum Element {
    #[serde(rename = "Point")]
    Vertex(Vertex),
    Line(Line),
    Loop(Loop),
    #[serde(rename = "String")]
    Annotation(Annotation),
    Group(Group),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Vertex(v) => v.id,
            Element::Line(l) => l.id,
            Element::Loop(l) => l.id,
            Element::Annotation(a) => a.id,
            Element::Group(g) => g.id,
        }
    }

    /// The persisted shape tag, also used in descriptions.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Vertex(_) => "Point",
            Element::Line(_) => "Line",
            Element::Loop(_) => "Loop",
            Element::Annotation(_) => "String",
            Element::Group(_) => "Group",
        }
    }

    /// Axis-aligned bounds used as the spatial-query prefilter.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Vertex(v) => Rect::at_point(v.at),
            Element::Line(l) => l.bounds(),
            Element::Loop(l) => l.bounds(),
            Element::Annotation(a) => Rect::at_point(a.origin),
            Element::Group(g) => {
                let mut it = g.children.iter();
                let Some(first) = it.next() else {
                    return Rect::at_point(Point::default());
                };
                it.fold(first.bounds(), |acc, e| acc.union(&e.bounds()))
            }
        }
    }

    /// Exact hit-test distance from `p`. See the per-shape metrics.
    pub fn formal_distance(&self, p: Point) -> f64 {
        match self {
            Element::Vertex(v) => v.at.distance_to(&p),
            Element::Line(l) => l.formal_distance(p),
            Element::Loop(l) => l.formal_distance(p),
            Element::Annotation(a) => a.origin.distance_to(&p),
            Element::Group(g) => g
                .children
                .iter()
                .map(|e| e.formal_distance(p))
                .fold(FAR_AWAY, f64::min),
        }
    }

    /// Translate the element (groups forward to every child).
    pub fn shift(&mut self, delta: Point) {
        match self {
            Element::Vertex(v) => v.at = v.at.translated(delta),
            Element::Line(l) => {
                l.origin = l.origin.translated(delta);
                l.to = l.to.translated(delta);
                if let Some(c) = &mut l.control {
                    *c = c.translated(delta);
                }
            }
            Element::Loop(l) => l.origin = l.origin.translated(delta),
            Element::Annotation(a) => a.origin = a.origin.translated(delta),
            Element::Group(g) => {
                for child in &mut g.children {
                    child.shift(delta);
                }
            }
        }
    }

    /// The anchor used by [`Element::move_absolute`]. A group anchors on its
    /// first child, preserving internal relative layout.
    pub fn reference_point(&self) -> Point {
        match self {
            Element::Vertex(v) => v.at,
            Element::Line(l) => l.origin,
            Element::Loop(l) => l.origin,
            Element::Annotation(a) => a.origin,
            Element::Group(g) => g
                .children
                .first()
                .map(Element::reference_point)
                .unwrap_or_default(),
        }
    }

    /// Move so the reference point lands on `target`.
    pub fn move_absolute(&mut self, target: Point) {
        let delta = self.reference_point().delta_to(target);
        self.shift(delta);
    }

    /// One-line human description, used by the CLI and scripting feedback.
    pub fn description(&self) -> String {
        match self {
            Element::Vertex(v) => {
                format!("vertex #{} at ({:.1}, {:.1})", v.id, v.at.x, v.at.y)
            }
            Element::Line(l) => format!(
                "{} line #{} from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                l.style.name(),
                l.id,
                l.origin.x,
                l.origin.y,
                l.to.x,
                l.to.y
            ),
            Element::Loop(l) => format!(
                "{}{} loop #{} at ({:.1}, {:.1}) radius {:.1}",
                if l.fill { "filled " } else { "" },
                l.style.name(),
                l.id,
                l.origin.x,
                l.origin.y,
                l.radius
            ),
            Element::Annotation(a) => format!(
                "text #{} {:?} at ({:.1}, {:.1})",
                a.id, a.text, a.origin.x, a.origin.y
            ),
            Element::Group(g) => {
                format!("group #{} of {} elements", g.id, g.children.len())
            }
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Element::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Element::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_loop(&self) -> Option<&Loop> {
        match self {
            Element::Loop(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Element::Group(g) => Some(g),
            _ => None,
        }
    }
}
