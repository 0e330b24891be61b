use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self { Point2 { x, y } }
    #[inline]
    pub fn length(self) -> f64 { (self.x * self.x + self.y * self.y).sqrt() }
    #[inline]
    pub fn dot(self, o: Point2) -> f64 { self.x * o.x + self.y * o.y }
    /// > 0 when `o` is anticlockwise of `self`
    #[inline]
    pub fn det(self, o: Point2) -> f64 { self.x * o.y - self.y * o.x }
    #[inline]
    pub fn dist(self, o: Point2) -> f64 { (self - o).length() }
    #[inline]
    pub fn is_finite(self) -> bool { self.x.is_finite() && self.y.is_finite() }
    #[inline]
    pub fn approx_eq(self, o: Point2, eps: f64) -> bool {
        (self.x - o.x).abs() <= eps && (self.y - o.y).abs() <= eps
    }
    pub fn normalised(self) -> Point2 {
        let len = self.length();
        if len > 0.0 { self / len } else { self }
    }
}

/// Turning angle at `p2` travelling p1 -> p2 -> p3, in [0, 2pi).
/// Collinear continuation gives pi.
pub fn angle(p1: Point2, p2: Point2, p3: Point2) -> f64 {
    let a = (p1 - p2).normalised();
    let b = (p3 - p2).normalised();
    let d = a.dot(b).max(-1.0).min(1.0);
    if a.det(b) > 0.0 { d.acos() } else { 2.0 * std::f64::consts::PI - d.acos() }
}

impl Add for Point2 {
    type Output = Point2;
    #[inline] fn add(self, o: Point2) -> Point2 { Point2::new(self.x + o.x, self.y + o.y) }
}
impl Sub for Point2 {
    type Output = Point2;
    #[inline] fn sub(self, o: Point2) -> Point2 { Point2::new(self.x - o.x, self.y - o.y) }
}
impl Mul<f64> for Point2 {
    type Output = Point2;
    #[inline] fn mul(self, s: f64) -> Point2 { Point2::new(self.x * s, self.y * s) }
}
impl Div<f64> for Point2 {
    type Output = Point2;
    #[inline] fn div(self, s: f64) -> Point2 { Point2::new(self.x / s, self.y / s) }
}
impl Neg for Point2 {
    type Output = Point2;
    #[inline] fn neg(self) -> Point2 { Point2::new(-self.x, -self.y) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_on_is_half_turn() {
        let a = angle(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0));
        assert!((a - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn right_angle_either_side() {
        let left = angle(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0));
        let right = angle(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, -1.0));
        assert!((left + right - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert!((left.min(right) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
