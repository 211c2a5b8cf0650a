//! Document model & command engine for an interactive physics diagram editor
//! (vertices, propagator lines, loops, text annotations).
//!
//! The [`document::Document`] is the aggregate root and sole mutation
//! surface: UI and scripting layers dispatch [`command::Command`]s through
//! it, giving exact linear undo/redo. A self-healing vertex binder keeps
//! shared line/loop endpoints consistent, and the spatial query engine in
//! [`query`] drives hit-testing, click-cycling, and rectangle selection.
//!
//! Rendering, event wiring, and scripting live in separate crates; this one
//! only models the diagram. The binary `feynedit` loads a saved snapshot and
//! prints it as JSON or element descriptions.

pub mod command;
pub mod document;
pub mod geometry;
mod graph;
pub mod model;
pub mod persist;
pub mod query;
pub mod selection;

pub use command::Command;
pub use document::Document;
pub use geometry::{Point, Rect};
pub use model::{Annotation, Element, ElementId, Group, Line, LineEnd, LineStyle, Loop, Vertex};
pub use persist::PersistError;
pub use selection::Selection;
