//! Modification arrows between measured word boxes.
//!
//! Each edge is a quadratic Bézier from the top-center of the source box to
//! the top-center of the target box, arcing upward. The arc peak rises
//! `min(60, 0.3 * dx)` above the higher anchor, so short hops stay flat and
//! long ones cap out. The arrowhead is rotated along the control→end
//! tangent.

use std::collections::{HashMap, HashSet};

use crate::analysis::WordNode;

/// Upper bound on how far an arc rises above its higher anchor.
pub const MAX_CURVE_HEIGHT: f64 = 60.0;
/// Arc rise per unit of horizontal span, before the cap.
pub const CURVE_HEIGHT_RATIO: f64 = 0.3;
/// Arrowhead length.
pub const ARROW_SIZE: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Measured geometry of one rendered word box, relative to its container.
#[derive(Debug, Clone, PartialEq)]
pub struct WordPosition {
    pub id: String,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl WordPosition {
    /// Top-center of the box, where arrows attach.
    pub fn top_anchor(&self) -> Point {
        Point::new(self.center_x, self.center_y - self.height / 2.0)
    }
}

/// One directed, drawable modification edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub from: String,
    pub to: String,
    pub start: Point,
    pub control: Point,
    pub end: Point,
    /// Arrowhead rotation in radians (control → end direction).
    pub angle: f64,
}

impl Connector {
    /// Build the arc between two measured boxes.
    pub fn between(from: &WordPosition, to: &WordPosition) -> Self {
        let start = from.top_anchor();
        let end = to.top_anchor();
        let control = Point::new(
            (start.x + end.x) / 2.0,
            start.y.min(end.y) - curve_height(start, end),
        );
        let angle = (end.y - control.y).atan2(end.x - control.x);
        Self {
            from: from.id.clone(),
            to: to.id.clone(),
            start,
            control,
            end,
            angle,
        }
    }

    /// How far the control point sits above the higher anchor.
    pub fn curve_height(&self) -> f64 {
        curve_height(self.start, self.end)
    }

    /// SVG path data: `M sx sy Q cx cy ex ey`.
    pub fn path_data(&self) -> String {
        format!(
            "M {} {} Q {} {} {} {}",
            fmt_num(self.start.x),
            fmt_num(self.start.y),
            fmt_num(self.control.x),
            fmt_num(self.control.y),
            fmt_num(self.end.x),
            fmt_num(self.end.y)
        )
    }

    pub fn angle_degrees(&self) -> f64 {
        self.angle.to_degrees()
    }

    /// Arrowhead triangle in its own frame: tip at `(ARROW_SIZE, 0)`.
    /// Place it with `translate(end) rotate(angle_degrees)`.
    pub fn arrowhead_points() -> String {
        let half = fmt_num(ARROW_SIZE / 2.0);
        format!("0,-{half} {},0 0,{half}", fmt_num(ARROW_SIZE))
    }
}

fn curve_height(start: Point, end: Point) -> f64 {
    ((end.x - start.x).abs() * CURVE_HEIGHT_RATIO).min(MAX_CURVE_HEIGHT)
}

/// Compute every drawable connector for `words`.
///
/// Topic words never originate or receive an arrow. An edge whose source
/// or target has no measured position is skipped on its own; the word's
/// other edges still draw. With no positions at all the result is empty.
pub fn compute_connectors(words: &[WordNode], positions: &[WordPosition]) -> Vec<Connector> {
    if positions.is_empty() {
        return Vec::new();
    }
    let topics: HashSet<&str> = words
        .iter()
        .filter(|w| w.is_topic)
        .map(|w| w.id.as_str())
        .collect();
    let by_id: HashMap<&str, &WordPosition> = positions
        .iter()
        .filter(|p| !topics.contains(p.id.as_str()))
        .map(|p| (p.id.as_str(), p))
        .collect();

    let mut connectors = Vec::new();
    for word in words.iter().filter(|w| !w.is_topic && !w.modifies.is_empty()) {
        let Some(from) = by_id.get(word.id.as_str()) else {
            continue;
        };
        for target in &word.modifies {
            if let Some(to) = by_id.get(target.as_str()) {
                connectors.push(Connector::between(from, to));
            }
        }
    }
    connectors
}

/// Compact number formatting for SVG attributes (`10`, `12.5`, `-3.25`).
pub(crate) fn fmt_num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.2}", rounded);
        s.trim_end_matches('0').to_string()
    }
}
