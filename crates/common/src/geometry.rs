//! Layout math for rendered elements
//!
//! Positions come from the browser in CSS pixels with the origin at the
//! top-left corner of the page.

use serde::{Deserialize, Serialize};

/// Position and size of a rendered element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// How the center of an element is derived from its rect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterFormula {
    /// `x + width / 2`
    #[default]
    Midpoint,
    /// `floor((trunc(x) + width) / 2)`, as the first generation of layout
    /// expectations was recorded with
    Legacy,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self, formula: CenterFormula) -> Point {
        match formula {
            CenterFormula::Midpoint => Point {
                x: self.x + self.width / 2.0,
                y: self.y + self.height / 2.0,
            },
            CenterFormula::Legacy => Point {
                x: ((self.x.trunc() + self.width) / 2.0).floor(),
                y: ((self.y.trunc() + self.height) / 2.0).floor(),
            },
        }
    }

    /// Same rect moved by an offset
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

impl Point {
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Straight-line distance between the centers of two elements
pub fn distance(a: &Rect, b: &Rect, formula: CenterFormula) -> f64 {
    a.center(formula).distance_to(&b.center(formula))
}

/// True when every distance is within `tolerance` of every other one
pub fn distances_equal(distances: &[f64], tolerance: f64) -> bool {
    let (min, max) = distances
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| {
            (lo.min(*d), hi.max(*d))
        });
    distances.len() < 2 || max - min <= tolerance
}

/// True when two coordinates are within `tolerance` pixels
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_center() {
        let r = Rect::new(10.0, 20.0, 40.0, 60.0);
        assert_eq!(r.center(CenterFormula::Midpoint), Point { x: 30.0, y: 50.0 });
    }

    #[test]
    fn test_legacy_center_keeps_recorded_formula() {
        let r = Rect::new(10.7, 21.0, 40.0, 60.0);
        // (10 + 40) / 2, (21 + 60) / 2 floored
        assert_eq!(r.center(CenterFormula::Legacy), Point { x: 25.0, y: 40.0 });
    }

    #[test]
    fn test_distance_symmetric_and_non_negative() {
        let a = Rect::new(100.0, 50.0, 30.0, 30.0);
        let b = Rect::new(13.5, 270.25, 44.0, 30.0);
        for formula in [CenterFormula::Midpoint, CenterFormula::Legacy] {
            let ab = distance(&a, &b, formula);
            let ba = distance(&b, &a, formula);
            assert_eq!(ab, ba);
            assert!(ab >= 0.0);
        }
        assert_eq!(distance(&a, &a, CenterFormula::Midpoint), 0.0);
    }

    #[test]
    fn test_distance_three_four_five() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(30.0, 40.0, 10.0, 10.0);
        assert_eq!(distance(&a, &b, CenterFormula::Midpoint), 50.0);
    }

    #[test]
    fn test_legacy_biased_by_width_difference() {
        // A selected switch is drawn wider; only the midpoint formula is
        // insensitive to that when the centers coincide.
        let plain = Rect::new(100.0, 100.0, 40.0, 40.0);
        let selected = Rect::new(96.0, 96.0, 48.0, 48.0);
        assert_eq!(distance(&plain, &selected, CenterFormula::Midpoint), 0.0);
        assert!(distance(&plain, &selected, CenterFormula::Legacy) > 0.0);
    }

    #[test]
    fn test_diamond_distances_equal() {
        // four switches on a circle around (200, 200)
        let s1 = Rect::new(185.0, 85.0, 30.0, 30.0);
        let s2 = Rect::new(285.0, 185.0, 30.0, 30.0);
        let s3 = Rect::new(185.0, 285.0, 30.0, 30.0);
        let s4 = Rect::new(85.0, 185.0, 30.0, 30.0);
        let f = CenterFormula::Midpoint;
        let d = [
            distance(&s1, &s2, f),
            distance(&s2, &s3, f),
            distance(&s3, &s4, f),
            distance(&s4, &s1, f),
        ];
        assert!(distances_equal(&d, 0.0));
        assert!(!distances_equal(&[1.0, 2.0], 0.5));
        assert!(distances_equal(&[1.0, 1.4], 0.5));
        assert!(distances_equal(&[], 0.0));
    }

    #[test]
    fn test_translated() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0).translated(50.0, -2.0);
        assert_eq!(r, Rect::new(51.0, 0.0, 3.0, 4.0));
        assert!(approx_eq(r.x, 51.2, 0.5));
        assert!(!approx_eq(r.x, 52.0, 0.5));
    }
}
