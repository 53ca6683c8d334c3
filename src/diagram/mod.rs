//! Sentence diagrams: box layout, modification arrows and SVG output.

pub mod connectors;
pub mod details;
pub mod layout;
pub mod svg;

pub use connectors::{compute_connectors, Connector, Point, WordPosition};
pub use details::{word_details, WordDetail};
pub use layout::{layout, DiagramLayout, LayoutConfig, Rect, WordBox};
pub use svg::render;
