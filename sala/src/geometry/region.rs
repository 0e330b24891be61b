use super::point::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. `Region::null()` holds no points and is the
/// identity for `union`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bottom_left: Point2,
    pub top_right: Point2,
}

impl Default for Region {
    fn default() -> Self { Region::null() }
}

impl Region {
    pub fn new(a: Point2, b: Point2) -> Self {
        Region {
            bottom_left: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            top_right: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub const fn null() -> Self {
        Region {
            bottom_left: Point2::new(f64::INFINITY, f64::INFINITY),
            top_right: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.bottom_left.x > self.top_right.x || self.bottom_left.y > self.top_right.y
    }

    #[inline] pub fn width(&self) -> f64 { (self.top_right.x - self.bottom_left.x).abs() }
    #[inline] pub fn height(&self) -> f64 { self.top_right.y - self.bottom_left.y }
    #[inline] pub fn area(&self) -> f64 { self.width() * self.height() }
    #[inline]
    pub fn centre(&self) -> Point2 { (self.bottom_left + self.top_right) / 2.0 }

    /// Strict interior test.
    pub fn contains(&self, p: Point2) -> bool {
        p.x > self.bottom_left.x && p.x < self.top_right.x
            && p.y > self.bottom_left.y && p.y < self.top_right.y
    }

    pub fn contains_touch(&self, p: Point2) -> bool {
        p.x >= self.bottom_left.x && p.x <= self.top_right.x
            && p.y >= self.bottom_left.y && p.y <= self.top_right.y
    }

    pub fn encompass(&mut self, p: Point2) {
        self.bottom_left.x = self.bottom_left.x.min(p.x);
        self.bottom_left.y = self.bottom_left.y.min(p.y);
        self.top_right.x = self.top_right.x.max(p.x);
        self.top_right.y = self.top_right.y.max(p.y);
    }

    /// Scale about the centre.
    pub fn grow(&mut self, scalar: f64) {
        let w = self.width();
        let h = self.height();
        let dx = 0.5 * w * (scalar - 1.0);
        let dy = 0.5 * h * (scalar - 1.0);
        self.bottom_left.x -= dx;
        self.bottom_left.y -= dy;
        self.top_right.x += dx;
        self.top_right.y += dy;
    }

    pub fn union(&self, o: &Region) -> Region {
        Region {
            bottom_left: Point2::new(
                self.bottom_left.x.min(o.bottom_left.x),
                self.bottom_left.y.min(o.bottom_left.y),
            ),
            top_right: Point2::new(
                self.top_right.x.max(o.top_right.x),
                self.top_right.y.max(o.top_right.y),
            ),
        }
    }

    pub fn overlap_x(&self, o: &Region, tol: f64) -> bool {
        if self.bottom_left.x > o.bottom_left.x {
            o.top_right.x >= self.bottom_left.x - tol
        } else {
            self.top_right.x >= o.bottom_left.x - tol
        }
    }

    pub fn overlap_y(&self, o: &Region, tol: f64) -> bool {
        if self.bottom_left.y > o.bottom_left.y {
            o.top_right.y >= self.bottom_left.y - tol
        } else {
            self.top_right.y >= o.bottom_left.y - tol
        }
    }

    /// Touching counts as intersecting.
    #[inline]
    pub fn intersects(&self, o: &Region, tol: f64) -> bool {
        self.overlap_x(o, tol) && self.overlap_y(o, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(ax: f64, ay: f64, bx: f64, by: f64) -> Region {
        Region::new(Point2::new(ax, ay), Point2::new(bx, by))
    }

    #[test]
    fn null_is_union_identity() {
        let a = r(0.0, 1.0, 2.0, 3.0);
        assert!(Region::null().is_null());
        assert_eq!(Region::null().union(&a), a);
        assert_eq!(a.union(&Region::null()), a);
    }

    #[test]
    fn touching_regions_intersect() {
        let a = r(0.0, 0.0, 1.0, 1.0);
        let b = r(1.0, 1.0, 2.0, 2.0);
        let c = r(1.0 + 1e-6, 0.0, 2.0, 1.0);
        assert!(a.intersects(&b, 0.0));
        assert!(!a.intersects(&c, 0.0));
        assert!(a.intersects(&c, 1e-5));
    }

    #[test]
    fn contains_is_strict() {
        let a = r(0.0, 0.0, 1.0, 1.0);
        assert!(a.contains(Point2::new(0.5, 0.5)));
        assert!(!a.contains(Point2::new(1.0, 0.5)));
        assert!(a.contains_touch(Point2::new(1.0, 0.5)));
    }
}
