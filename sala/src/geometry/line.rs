use super::point::Point2;
use super::region::Region;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A segment stored as its bounding region plus two orientation bits.
///
/// The canonical `start` is always the left end (`ax`), `end` the right end
/// (`bx`). `parity` records whether y grows with x (vertical lines are stored
/// with parity set), `direction` whether the segment was supplied left to
/// right. `t_start`/`t_end` recover the supplied orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    region: Region,
    parity: bool,
    direction: bool,
}

impl Default for Line {
    fn default() -> Self {
        Line { region: Region::new(Point2::default(), Point2::default()), parity: true, direction: true }
    }
}

impl Line {
    pub fn new(a: Point2, b: Point2) -> Self {
        let (parity, direction) = if a.x == b.x {
            (true, a.y <= b.y)
        } else if a.x < b.x {
            (a.y <= b.y, true)
        } else {
            (b.y <= a.y, false)
        };
        Line { region: Region::new(a, b), parity, direction }
    }

    #[inline] pub fn region(&self) -> &Region { &self.region }
    #[inline] pub fn bottom_left(&self) -> Point2 { self.region.bottom_left }
    #[inline] pub fn top_right(&self) -> Point2 { self.region.top_right }
    #[inline] pub fn width(&self) -> f64 { self.region.width() }
    #[inline] pub fn height(&self) -> f64 { self.region.height() }
    #[inline] pub fn parity(&self) -> bool { self.parity }
    #[inline] pub fn direction(&self) -> bool { self.direction }

    #[inline] pub fn ax(&self) -> f64 { self.region.bottom_left.x }
    #[inline] pub fn bx(&self) -> f64 { self.region.top_right.x }
    #[inline]
    pub fn ay(&self) -> f64 {
        if self.parity { self.region.bottom_left.y } else { self.region.top_right.y }
    }
    #[inline]
    pub fn by(&self) -> f64 {
        if self.parity { self.region.top_right.y } else { self.region.bottom_left.y }
    }

    #[inline] fn set_ax(&mut self, v: f64) { self.region.bottom_left.x = v; }
    #[inline] fn set_bx(&mut self, v: f64) { self.region.top_right.x = v; }
    #[inline]
    fn set_ay(&mut self, v: f64) {
        if self.parity { self.region.bottom_left.y = v } else { self.region.top_right.y = v }
    }
    #[inline]
    fn set_by(&mut self, v: f64) {
        if self.parity { self.region.top_right.y = v } else { self.region.bottom_left.y = v }
    }

    #[inline] pub fn start(&self) -> Point2 { Point2::new(self.ax(), self.ay()) }
    #[inline] pub fn end(&self) -> Point2 { Point2::new(self.bx(), self.by()) }
    #[inline] pub fn midpoint(&self) -> Point2 { (self.start() + self.end()) / 2.0 }

    #[inline] pub fn rightward(&self) -> bool { self.direction }
    #[inline] pub fn upward(&self) -> bool { self.direction == self.parity }

    pub fn t_start(&self) -> Point2 {
        let r = &self.region;
        Point2::new(
            if self.rightward() { r.bottom_left.x } else { r.top_right.x },
            if self.upward() { r.bottom_left.y } else { r.top_right.y },
        )
    }

    pub fn t_end(&self) -> Point2 {
        let r = &self.region;
        Point2::new(
            if self.rightward() { r.top_right.x } else { r.bottom_left.x },
            if self.upward() { r.top_right.y } else { r.bottom_left.y },
        )
    }

    #[inline] pub fn vector(&self) -> Point2 { self.t_end() - self.t_start() }
    #[inline] pub fn sign(&self) -> f64 { if self.parity { 1.0 } else { -1.0 } }

    #[inline]
    pub fn length(&self) -> f64 { self.width().hypot(self.height()) }

    pub fn grad(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Y => self.sign() * self.height() / self.width(),
            Axis::X => self.sign() * self.width() / self.height(),
        }
    }

    pub fn constant(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Y => self.ay() - self.grad(axis) * self.ax(),
            Axis::X => self.ax() - self.grad(axis) * self.ay(),
        }
    }

    /// Crop in place to `r`. Returns false (leaving the line partially
    /// cropped) if no part of it lies within `r`.
    pub fn crop(&mut self, r: &Region) -> bool {
        if self.bx() < r.bottom_left.x {
            return false;
        }
        if self.ax() < r.bottom_left.x {
            let d = self.sign() * (self.height() * (r.bottom_left.x - self.ax()) / self.width());
            self.set_ay(self.ay() + d);
            self.set_ax(r.bottom_left.x);
        }
        if self.ax() > r.top_right.x {
            return false;
        }
        if self.bx() > r.top_right.x {
            let d = self.sign() * self.height() * (self.bx() - r.top_right.x) / self.width();
            self.set_by(self.by() - d);
            self.set_bx(r.top_right.x);
        }
        if self.region.top_right.y < r.bottom_left.y {
            return false;
        }
        if self.region.bottom_left.y < r.bottom_left.y {
            let d = self.width() * (r.bottom_left.y - self.region.bottom_left.y) / self.height();
            if self.parity { self.set_ax(self.ax() + d) } else { self.set_bx(self.bx() - d) }
            self.region.bottom_left.y = r.bottom_left.y;
        }
        if self.region.bottom_left.y > r.top_right.y {
            return false;
        }
        if self.region.top_right.y > r.top_right.y {
            let d = self.width() * (self.region.top_right.y - r.top_right.y) / self.height();
            if self.parity { self.set_bx(self.bx() - d) } else { self.set_ax(self.ax() + d) }
            self.region.top_right.y = r.top_right.y;
        }
        true
    }

    /// Location along `axis` where the infinite extension of `l` meets this
    /// line. Near-parallel lines (gradients within `tol`) fall back to the
    /// clamped midpoint of `l`.
    pub fn intersection_point(&self, l: &Line, axis: Axis, tol: f64) -> f64 {
        match axis {
            Axis::X => {
                if l.width() == 0.0 {
                    return l.bottom_left().x;
                }
                let lg = l.grad(Axis::Y);
                let g = self.grad(Axis::Y);
                if (lg - g).abs() <= tol {
                    let p = l.midpoint();
                    p.x.max(self.bottom_left().x).min(self.top_right().x)
                } else {
                    ((self.ay() - g * self.ax()) - (l.ay() - lg * l.ax())) / (lg - g)
                }
            }
            Axis::Y => {
                if l.height() == 0.0 {
                    return l.bottom_left().y;
                }
                let lg = l.grad(Axis::X);
                let g = self.grad(Axis::X);
                if (lg - g).abs() <= tol {
                    let p = l.midpoint();
                    p.y.max(self.bottom_left().y).min(self.top_right().y)
                } else {
                    ((self.ax() - g * self.ay()) - (l.ax() - lg * l.ay())) / (lg - g)
                }
            }
        }
    }

    pub fn point_on_line(&self, loc: f64, axis: Axis) -> Point2 {
        match axis {
            Axis::X => Point2::new(loc, self.grad(Axis::Y) * loc + self.constant(Axis::Y)),
            Axis::Y => Point2::new(self.grad(Axis::X) * loc + self.constant(Axis::X), loc),
        }
    }

    /// Axis with the larger extent; the stable one to parameterise along.
    #[inline]
    pub fn major_axis(&self) -> Axis {
        if self.width() >= self.height() { Axis::X } else { Axis::Y }
    }
}

/// Where `a` meets `b`, assuming the caller has already established that they intersect.
pub fn intersection_point(a: &Line, b: &Line, tol: f64) -> Point2 {
    let axis = a.major_axis();
    a.point_on_line(a.intersection_point(b, axis, tol), axis)
}

/// Distance from a point to a segment.
pub fn dist(point: Point2, line: &Line) -> f64 {
    let alpha = line.end() - line.start();
    let beta = point - line.end();
    let gamma = line.start() - line.end();
    let delta = point - line.start();
    if alpha.dot(beta) > 0.0 {
        beta.length()
    } else if gamma.dot(delta) > 0.0 {
        delta.length()
    } else if alpha.length() < super::tolerance::EPS_DIST * beta.length() {
        beta.length()
    } else {
        alpha.det(beta).abs() / alpha.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 { Point2::new(x, y) }

    #[test]
    fn canonical_orientation() {
        let l = Line::new(p(2.0, 0.0), p(0.0, 1.0));
        assert_eq!(l.start(), p(0.0, 1.0));
        assert_eq!(l.end(), p(2.0, 0.0));
        assert!(!l.parity());
        assert!(!l.rightward());
        assert_eq!(l.t_start(), p(2.0, 0.0));
        assert_eq!(l.t_end(), p(0.0, 1.0));

        let v = Line::new(p(1.0, 3.0), p(1.0, -1.0));
        assert!(v.parity());
        assert_eq!(v.start(), p(1.0, -1.0));
        assert_eq!(v.t_start(), p(1.0, 3.0));
    }

    #[test]
    fn grad_and_constant() {
        let l = Line::new(p(0.0, 1.0), p(2.0, 0.0));
        assert!((l.grad(Axis::Y) + 0.5).abs() < 1e-12);
        assert!((l.constant(Axis::Y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn crop_to_region() {
        let mut l = Line::new(p(-1.0, -1.0), p(3.0, 3.0));
        assert!(l.crop(&Region::new(p(0.0, 0.0), p(2.0, 1.0))));
        assert!(l.start().approx_eq(p(0.0, 0.0), 1e-12));
        assert!(l.end().approx_eq(p(1.0, 1.0), 1e-12));

        let mut d = Line::new(p(0.0, 2.0), p(2.0, 0.0));
        assert!(d.crop(&Region::new(p(0.0, 0.0), p(1.5, 1.5))));
        assert!(d.start().approx_eq(p(0.5, 1.5), 1e-12));
        assert!(d.end().approx_eq(p(1.5, 0.5), 1e-12));

        let mut miss = Line::new(p(5.0, 5.0), p(6.0, 6.0));
        assert!(!miss.crop(&Region::new(p(0.0, 0.0), p(1.0, 1.0))));
    }

    #[test]
    fn crossing_point() {
        let a = Line::new(p(0.0, 0.0), p(2.0, 2.0));
        let b = Line::new(p(0.0, 2.0), p(2.0, 0.0));
        assert!(intersection_point(&a, &b, 1e-12).approx_eq(p(1.0, 1.0), 1e-12));
        let v = Line::new(p(0.5, -1.0), p(0.5, 3.0));
        assert!(intersection_point(&a, &v, 1e-12).approx_eq(p(0.5, 0.5), 1e-12));
    }

    #[test]
    fn point_segment_distance() {
        let l = Line::new(p(0.0, 0.0), p(2.0, 0.0));
        assert!((dist(p(1.0, 1.0), &l) - 1.0).abs() < 1e-12);
        assert!((dist(p(3.0, 0.0), &l) - 1.0).abs() < 1e-12);
        assert!((dist(p(-3.0, 4.0), &l) - 5.0).abs() < 1e-12);
    }
}
