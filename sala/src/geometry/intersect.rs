// Segment/segment intersection predicates built on a double side-product test.
// All three variants share one tolerance so touch/cross classification never
// oscillates between them. None of them look at regions: callers must reject
// by `Region::intersects` first, since collinear-but-disjoint lines pass.

use super::line::Line;
use super::point::Point2;
use crate::error::{Result, SalaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    None,
    Touch,
    Cross,
}

impl Crossing {
    /// Half-crossing count used by polygon parity: touch 1, cross 2.
    #[inline]
    pub fn weight(self) -> u32 {
        match self {
            Crossing::None => 0,
            Crossing::Touch => 1,
            Crossing::Cross => 2,
        }
    }
}

// Signed side of `p` relative to the infinite extension of `a`.
#[inline]
fn side(a: &Line, p: Point2) -> f64 {
    (a.ay() - a.by()) * (p.x - a.ax()) + (a.bx() - a.ax()) * (p.y - a.ay())
}

#[inline]
fn straddle(a: &Line, b: &Line) -> f64 {
    side(a, b.start()) * side(a, b.end())
}

/// Touching counts as an intersection.
pub fn intersect_line(a: &Line, b: &Line, tol: f64) -> bool {
    straddle(a, b) <= tol && straddle(b, a) <= tol
}

/// Touching does not count.
pub fn intersect_line_no_touch(a: &Line, b: &Line, tol: f64) -> bool {
    straddle(a, b) < -tol && straddle(b, a) < -tol
}

pub fn intersect_line_distinguish(a: &Line, b: &Line, tol: f64) -> Crossing {
    let alpha = straddle(a, b);
    let beta = straddle(b, a);
    if alpha <= tol && beta <= tol {
        if alpha < -tol && beta < -tol { Crossing::Cross } else { Crossing::Touch }
    } else {
        Crossing::None
    }
}

/// Containment probe: `b` is a ray whose canonical start is the query point.
/// Errors with `OnBoundary` when that point lies on `a` within `tol`.
pub fn intersect_line_b(a: &Line, b: &Line, tol: f64) -> Result<Crossing> {
    let alpha = side(a, b.start());
    let beta = side(a, b.end());
    let gamma = straddle(b, a);
    if alpha * beta <= tol && gamma <= tol {
        if alpha * beta < -tol && gamma < -tol {
            Ok(Crossing::Cross)
        } else if alpha.abs() <= tol {
            Err(SalaError::OnBoundary)
        } else {
            Ok(Crossing::Touch)
        }
    } else {
        Ok(Crossing::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(ax: f64, ay: f64, bx: f64, by: f64) -> Line {
        Line::new(Point2::new(ax, ay), Point2::new(bx, by))
    }

    #[test]
    fn proper_cross() {
        let a = l(0.0, 0.0, 2.0, 2.0);
        let b = l(0.0, 2.0, 2.0, 0.0);
        assert!(intersect_line(&a, &b, 0.0));
        assert!(intersect_line_no_touch(&a, &b, 0.0));
        assert_eq!(intersect_line_distinguish(&a, &b, 0.0), Crossing::Cross);
    }

    #[test]
    fn endpoint_touch() {
        let a = l(0.0, 0.0, 1.0, 0.0);
        let b = l(1.0, 0.0, 1.0, 1.0);
        assert!(intersect_line(&a, &b, 0.0));
        assert!(!intersect_line_no_touch(&a, &b, 0.0));
        assert_eq!(intersect_line_distinguish(&a, &b, 0.0), Crossing::Touch);
    }

    #[test]
    fn apart() {
        let a = l(0.0, 0.0, 1.0, 0.0);
        let b = l(0.0, 1.0, 1.0, 2.0);
        assert!(!intersect_line(&a, &b, 0.0));
        assert_eq!(intersect_line_distinguish(&a, &b, 0.0), Crossing::None);
    }

    #[test]
    fn probe_on_edge_is_boundary() {
        let edge = l(0.0, 0.0, 0.0, 2.0);
        let probe = l(0.0, 1.0, 3.0, 4.0);
        assert!(matches!(intersect_line_b(&edge, &probe, 0.0), Err(SalaError::OnBoundary)));
        let clear = l(-1.0, 1.0, 3.0, 4.0);
        assert_eq!(intersect_line_b(&edge, &clear, 0.0).unwrap(), Crossing::Cross);
    }
}
