use crate::algorithms::region_tree::RegionTree;
use crate::error::{Result, SalaError};
use crate::geometry::line::{dist, Line};
use crate::geometry::point::Point2;
use crate::geometry::region::Region;
use crate::geometry::tolerance::EPS_LINE;

/// How to resolve a point that lies on a polygon edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryPolicy {
    Inside,
    Outside,
}

/// Closed polygon (or any set of boundary segments) indexed by a region tree.
#[derive(Clone, Debug, Default)]
pub struct Polygon {
    tree: RegionTree,
}

impl Polygon {
    pub fn new() -> Self { Self::default() }

    /// Builds the closed ring through `points`; the closing edge is implied.
    pub fn from_points(points: &[Point2]) -> Result<Self> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(SalaError::NonFinite("points"));
        }
        let mut poly = Polygon::new();
        if points.len() < 2 {
            return Ok(poly);
        }
        for w in points.windows(2) {
            poly.add_line_segment(Line::new(w[0], w[1]));
        }
        if points.len() > 2 {
            poly.add_line_segment(Line::new(points[points.len() - 1], points[0]));
        }
        Ok(poly)
    }

    pub fn add_line_segment(&mut self, line: Line) { self.tree.insert(line); }

    pub fn bounding_box(&self) -> Region { self.tree.region() }
    pub fn edges(&self) -> impl Iterator<Item = &Line> + '_ { self.tree.lines() }
    pub fn len(&self) -> usize { self.tree.len() }
    pub fn is_empty(&self) -> bool { self.tree.is_empty() }

    /// Parity test along a ray towards the far top-right of the bounding box.
    /// Errs with `OnBoundary` when the ray grazes an edge at its origin;
    /// retry with `contains_towards` or resolve with `contains_with`.
    pub fn contains(&self, p: Point2) -> Result<bool> {
        let bb = self.bounding_box();
        let target = Point2::new(bb.top_right.x + bb.width(), bb.top_right.y + bb.height());
        self.contains_towards(p, target)
    }

    /// As `contains` with an explicit ray target. The target must lie outside
    /// the bounding box and to the right of `p`.
    pub fn contains_towards(&self, p: Point2, target: Point2) -> Result<bool> {
        if !p.is_finite() {
            return Err(SalaError::NonFinite("point"));
        }
        if self.tree.is_empty() || !self.bounding_box().contains_touch(p) {
            return Ok(false);
        }
        let double_n = self.tree.count_intersections(&Line::new(p, target), EPS_LINE)?;
        Ok(double_n % 2 == 0 && double_n % 4 != 0)
    }

    /// Containment with the boundary case decided by `policy`. A ray that
    /// grazes an edge without `p` lying on it is retried along other rays.
    pub fn contains_with(&self, p: Point2, policy: BoundaryPolicy) -> Result<bool> {
        match self.contains(p) {
            Err(SalaError::OnBoundary) => {}
            other => return other,
        }
        let bb = self.bounding_box();
        let scale = bb.width().max(bb.height()).max(1.0);
        if self.edges().any(|e| dist(p, e) <= 1e-9 * scale) {
            return Ok(policy == BoundaryPolicy::Inside);
        }
        let far_x = bb.top_right.x + bb.width() + 1.0;
        let h = bb.height() + 1.0;
        for dy in [-1.0, 0.37, -0.61, 1.73] {
            match self.contains_towards(p, Point2::new(far_x, bb.centre().y + dy * h)) {
                Err(SalaError::OnBoundary) => continue,
                other => return other,
            }
        }
        Ok(policy == BoundaryPolicy::Inside)
    }

    /// Edges of the two polygons meet; a shared corner or edge counts.
    pub fn intersects(&self, other: &Polygon) -> bool { self.tree.intersects_with(&other.tree, true, 0.0) }

    /// Edges of the two polygons properly cross within `tol`.
    pub fn crosses(&self, other: &Polygon, tol: f64) -> bool { self.tree.intersects_with(&other.tree, false, tol) }
}
