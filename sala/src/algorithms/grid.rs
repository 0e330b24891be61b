use crate::algorithms::polygon::{BoundaryPolicy, Polygon};
use crate::algorithms::sieve::{Octant, Sieve};
use crate::comm::{check_cancel, Communicator, PollTimer};
use crate::error::{Result, SalaError};
use crate::geometry::line::Line;
use crate::geometry::point::Point2;
use crate::geometry::region::Region;
use crate::geometry::tolerance::EPS_CELL;
use crate::model::{MapKind, Shape};
use crate::ShapeGraph;
use serde::{Deserialize, Serialize};

pub const POINT_FIRST_MOMENT: &str = "Point First Moment";
pub const POINT_SECOND_MOMENT: &str = "Point Second Moment";

// Refuse grids that would not fit comfortably in memory.
const MAX_CELLS: usize = 1 << 26;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PixelRef {
    pub x: i32,
    pub y: i32,
}

impl PixelRef {
    pub const fn new(x: i32, y: i32) -> Self { PixelRef { x, y } }

    fn dist(self, o: PixelRef) -> f64 { f64::from(self.x - o.x).hypot(f64::from(self.y - o.y)) }
}

#[derive(Clone, Debug, Default)]
struct Cell {
    filled: bool,
    lines: Vec<Line>, // boundary lines cropped to this cell
}

/// Regular grid of candidate viewpoints laid over a plan. Cells are filled
/// (walkable) or empty, and remember the wall fragments that cross them.
#[derive(Clone, Debug)]
pub struct PointGrid {
    spacing: f64,
    bottom_left: Point2, // centre of cell (0, 0)
    cols: i32,
    rows: i32,
    region: Region,
    cells: Vec<Cell>,
}

impl PointGrid {
    /// Covers `extent` with cells of side `spacing`. `offset` shifts the lattice
    /// relative to the extent's corner.
    pub fn new(extent: &Region, spacing: f64, offset: Point2) -> Result<Self> {
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(SalaError::InvalidSpacing(spacing));
        }
        if extent.is_null() || !extent.bottom_left.is_finite() || !extent.top_right.is_finite() || !offset.is_finite()
        {
            return Err(SalaError::NonFinite("extent"));
        }
        let snap = |v: f64| {
            let mut o = v % spacing;
            if o < spacing / 2.0 {
                o += spacing;
            }
            if o > spacing / 2.0 {
                o -= spacing;
            }
            o
        };
        let xoff = snap(extent.bottom_left.x + offset.x);
        let yoff = snap(extent.bottom_left.y + offset.y);
        let cols = ((xoff + extent.width()) / spacing + 0.5).floor() + 1.0;
        let rows = ((yoff + extent.height()) / spacing + 0.5).floor() + 1.0;
        if cols * rows > MAX_CELLS as f64 {
            return Err(SalaError::InvalidSpacing(spacing));
        }
        let (cols, rows) = (cols as i32, rows as i32);
        let bottom_left = Point2::new(extent.bottom_left.x - xoff, extent.bottom_left.y - yoff);
        let half = spacing / 2.0;
        let region = Region::new(
            Point2::new(bottom_left.x - half, bottom_left.y - half),
            Point2::new(
                bottom_left.x + f64::from(cols - 1) * spacing + half,
                bottom_left.y + f64::from(rows - 1) * spacing + half,
            ),
        );
        tracing::debug!(cols, rows, spacing, "point grid");
        Ok(PointGrid {
            spacing,
            bottom_left,
            cols,
            rows,
            region,
            cells: vec![Cell::default(); (cols * rows) as usize],
        })
    }

    #[inline] pub fn spacing(&self) -> f64 { self.spacing }
    #[inline] pub fn cols(&self) -> i32 { self.cols }
    #[inline] pub fn rows(&self) -> i32 { self.rows }
    #[inline] pub fn region(&self) -> &Region { &self.region }
    #[inline] pub fn bottom_left(&self) -> Point2 { self.bottom_left }

    #[inline]
    pub fn includes(&self, p: PixelRef) -> bool { p.x >= 0 && p.x < self.cols && p.y >= 0 && p.y < self.rows }

    fn index(&self, p: PixelRef) -> Option<usize> {
        self.includes(p).then(|| (p.x * self.rows + p.y) as usize)
    }

    fn cell(&self, p: PixelRef) -> Option<&Cell> { self.index(p).map(|i| &self.cells[i]) }

    /// Cell containing `p`; may lie outside the grid.
    pub fn pixelate(&self, p: Point2) -> PixelRef {
        let half = self.spacing / 2.0;
        PixelRef::new(
            ((p.x - self.bottom_left.x + half) / self.spacing).floor() as i32,
            ((p.y - self.bottom_left.y + half) / self.spacing).floor() as i32,
        )
    }

    pub fn pixelate_constrained(&self, p: Point2) -> PixelRef {
        let r = self.pixelate(p);
        PixelRef::new(r.x.clamp(0, self.cols - 1), r.y.clamp(0, self.rows - 1))
    }

    /// Centre of a cell.
    pub fn depixelate(&self, p: PixelRef) -> Point2 {
        Point2::new(
            self.bottom_left.x + self.spacing * f64::from(p.x),
            self.bottom_left.y + self.spacing * f64::from(p.y),
        )
    }

    /// Cell square grown by `border` cell widths on every side.
    pub fn regionate(&self, p: PixelRef, border: f64) -> Region {
        let c = self.depixelate(p);
        let h = self.spacing * (0.5 + border);
        Region::new(Point2::new(c.x - h, c.y - h), Point2::new(c.x + h, c.y + h))
    }

    /// Record `line` as a wall in every cell it passes through.
    pub fn block_line(&mut self, line: &Line) {
        let lo = self.pixelate_constrained(line.bottom_left());
        let hi = self.pixelate_constrained(line.top_right());
        for x in (lo.x - 1).max(0)..=(hi.x + 1).min(self.cols - 1) {
            for y in (lo.y - 1).max(0)..=(hi.y + 1).min(self.rows - 1) {
                let p = PixelRef::new(x, y);
                let mut l = *line;
                if l.crop(&self.regionate(p, EPS_CELL)) {
                    let i = (x * self.rows + y) as usize;
                    self.cells[i].lines.push(l);
                }
            }
        }
    }

    pub fn block_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a Line>) {
        for l in lines {
            self.block_line(l);
        }
    }

    pub fn blocked_lines(&self, p: PixelRef) -> &[Line] {
        match self.cell(p) {
            Some(c) => &c.lines,
            None => &[],
        }
    }

    /// Returns false if `p` is outside the grid.
    pub fn set_filled(&mut self, p: PixelRef, filled: bool) -> bool {
        match self.index(p) {
            Some(i) => {
                self.cells[i].filled = filled;
                true
            }
            None => false,
        }
    }

    pub fn is_filled(&self, p: PixelRef) -> bool { self.cell(p).map_or(false, |c| c.filled) }

    pub fn fill_all(&mut self) {
        for c in &mut self.cells {
            c.filled = true;
        }
    }

    /// Fill every cell whose centre lies inside `boundary`. Returns the number filled.
    pub fn fill_inside(&mut self, boundary: &Polygon, policy: BoundaryPolicy) -> Result<usize> {
        let mut n = 0;
        for x in 0..self.cols {
            for y in 0..self.rows {
                let p = PixelRef::new(x, y);
                if boundary.contains_with(self.depixelate(p), policy)? {
                    self.set_filled(p, true);
                    n += 1;
                }
            }
        }
        Ok(n)
    }

    pub fn filled_count(&self) -> usize { self.cells.iter().filter(|c| c.filled).count() }

    /// Filled cells in storage order (column-major).
    pub fn filled_cells(&self) -> impl Iterator<Item = PixelRef> + '_ {
        let rows = self.rows;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.filled)
            .map(move |(i, _)| PixelRef::new(i as i32 / rows, i as i32 % rows))
    }

    /// Filled cells whose centres `curs` can see, octant by octant, out to
    /// `max_dist` if given.
    pub fn visible_cells(&self, curs: PixelRef, max_dist: Option<f64>) -> Vec<PixelRef> {
        let centre = self.depixelate(curs);
        let border = self.spacing * EPS_CELL;
        let own = self.blocked_lines(curs);
        let mut out = Vec::new();
        for q in Octant::ALL {
            let mut sieve = Sieve::new(centre, max_dist);
            let mut vp = self.regionate(curs, EPS_CELL);
            match q.index() {
                0 => {
                    vp.top_right.x = centre.x;
                    vp.bottom_left.y = centre.y - border;
                }
                6 => {
                    vp.top_right.x = centre.x + border;
                    vp.bottom_left.y = centre.y;
                }
                1 => {
                    vp.bottom_left.x = centre.x;
                    vp.bottom_left.y = centre.y - border;
                }
                7 => {
                    vp.bottom_left.x = centre.x - border;
                    vp.bottom_left.y = centre.y;
                }
                2 => {
                    vp.top_right.x = centre.x;
                    vp.top_right.y = centre.y + border;
                }
                4 => {
                    vp.top_right.x = centre.x + border;
                    vp.top_right.y = centre.y;
                }
                3 => {
                    vp.bottom_left.x = centre.x;
                    vp.top_right.y = centre.y + border;
                }
                _ => {
                    vp.bottom_left.x = centre.x - border;
                    vp.top_right.y = centre.y;
                }
            }
            let near: Vec<Line> = own
                .iter()
                .filter_map(|l| {
                    let mut l = *l;
                    l.crop(&vp).then_some(l)
                })
                .collect();
            sieve.block(near.iter(), q);
            sieve.collect_garbage();

            let mut depth = 1;
            while sieve.has_gaps() {
                if !self.sieve_ring(&mut sieve, &mut out, q, depth, curs) {
                    break;
                }
                depth += 1;
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    // One ring of cells at `depth` within octant `q`. Returns false once the
    // ring lies wholly outside the grid.
    fn sieve_ring(&self, sieve: &mut Sieve, out: &mut Vec<PixelRef>, q: Octant, depth: i32, curs: PixelRef) -> bool {
        let mut has_gaps = false;
        let mut first = 0;
        let d = f64::from(depth);
        let gaps = sieve.gaps().to_vec();
        for g in &gaps {
            let lo = (g.start * (d - 0.5) - 0.5).ceil() as i32;
            let hi = (g.end * (d + 0.5) + 0.5).floor() as i32;
            for ind in lo..=hi {
                if ind < first {
                    continue;
                }
                if ind > depth {
                    break;
                }
                first = ind;
                let (x, y) = if q.is_vertical() { (ind, depth) } else { (depth, ind) };
                let here = PixelRef::new(
                    curs.x + if q.east() { x } else { -x },
                    curs.y + if q.north() { y } else { -y },
                );
                let Some(cell) = self.cell(here) else { continue };
                has_gaps = true;
                let i = f64::from(ind);
                let centre_gap = i >= g.start * d && i <= g.end * d;
                // axes and diagonals belong to exactly one octant
                let owned = (ind != 0 || matches!(q.index(), 0 | 1 | 5 | 6)) && (ind != depth || !q.is_vertical());
                if centre_gap
                    && cell.filled
                    && owned
                    && !sieve.test_block(self.depixelate(here), cell.lines.iter(), self.spacing * EPS_CELL)
                {
                    out.push(here);
                }
                sieve.block(cell.lines.iter(), q);
            }
        }
        sieve.collect_garbage();
        has_gaps
    }

    /// Visibility graph over the filled cells. Node keys follow `filled_cells`
    /// order; each node links to the cells it sees.
    pub fn make_graph(&self, max_dist: Option<f64>, comm: Option<&dyn Communicator>) -> Result<ShapeGraph> {
        let mut g = ShapeGraph::new(MapKind::Point);
        let first_col = g.attributes.get_or_insert_locked_column(POINT_FIRST_MOMENT);
        let second_col = g.attributes.get_or_insert_locked_column(POINT_SECOND_MOMENT);

        let mut node_of = vec![u32::MAX; self.cells.len()];
        let filled: Vec<PixelRef> = self.filled_cells().collect();
        for p in &filled {
            let key = g.push_node(Shape::Point { at: self.depixelate(*p) }, self.spacing, None)?;
            if let Some(i) = self.index(*p) {
                node_of[i] = key;
            }
        }
        if let Some(c) = comm {
            c.set_total_records(filled.len());
        }

        let mut timer = PollTimer::new(crate::algorithms::depth::DEFAULT_POLL_INTERVAL);
        for (n, p) in filled.iter().enumerate() {
            let seen = self.visible_cells(*p, max_dist);
            let mut first = 0.0;
            let mut second = 0.0;
            let key = n as u32;
            for v in &seen {
                let d = v.dist(*p) * self.spacing;
                first += d;
                second += d * d;
                if let Some(i) = self.index(*v) {
                    g.connectors[n].add_connection(node_of[i], 0.0);
                }
            }
            g.set_connectivity(key, seen.len());
            if let Some(mut row) = g.attributes.row_mut(key) {
                row.set_value(first_col, first).set_value(second_col, second);
            }
            check_cancel(comm, &mut timer)?;
            if let Some(c) = comm {
                c.set_current_record(n + 1);
            }
        }
        tracing::debug!(nodes = filled.len(), "visibility graph built");
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(w: f64, h: f64) -> PointGrid {
        PointGrid::new(&Region::new(Point2::new(0.0, 0.0), Point2::new(w, h)), 1.0, Point2::default()).unwrap()
    }

    #[test]
    fn cell_coordinates() {
        let g = room(10.0, 10.0);
        assert_eq!((g.cols(), g.rows()), (11, 11));
        assert_eq!(g.bottom_left(), Point2::new(0.0, 0.0));
        assert_eq!(g.pixelate(Point2::new(0.4, 0.6)), PixelRef::new(0, 1));
        assert_eq!(g.depixelate(PixelRef::new(3, 4)), Point2::new(3.0, 4.0));
        assert_eq!(g.pixelate_constrained(Point2::new(-7.0, 40.0)), PixelRef::new(0, 10));
        let r = g.regionate(PixelRef::new(2, 2), 0.0);
        assert_eq!(r.bottom_left, Point2::new(1.5, 1.5));
        assert_eq!(r.top_right, Point2::new(2.5, 2.5));
        assert!(!g.includes(PixelRef::new(11, 0)));
    }

    #[test]
    fn bad_spacing_rejected() {
        let r = Region::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(PointGrid::new(&r, s, Point2::default()), Err(SalaError::InvalidSpacing(_))));
        }
        assert!(matches!(PointGrid::new(&Region::null(), 1.0, Point2::default()), Err(SalaError::NonFinite(_))));
    }

    #[test]
    fn open_room_sees_everything() {
        let mut g = room(2.0, 2.0);
        g.fill_all();
        let centre = g.visible_cells(PixelRef::new(1, 1), None);
        assert_eq!(centre.len(), 8);
        let corner = g.visible_cells(PixelRef::new(0, 0), None);
        assert_eq!(corner.len(), 8);
        assert!(corner.contains(&PixelRef::new(2, 1)));
    }

    #[test]
    fn max_dist_limits_view() {
        let mut g = room(2.0, 2.0);
        g.fill_all();
        let v = g.visible_cells(PixelRef::new(0, 0), Some(1.2));
        assert_eq!(v, vec![PixelRef::new(0, 1), PixelRef::new(1, 0)]);
    }

    #[test]
    fn wall_fragments_land_in_both_cells() {
        let mut g = room(2.0, 0.0);
        g.block_line(&Line::new(Point2::new(0.5, -1.0), Point2::new(0.5, 1.0)));
        assert_eq!(g.blocked_lines(PixelRef::new(0, 0)).len(), 1);
        assert_eq!(g.blocked_lines(PixelRef::new(1, 0)).len(), 1);
        assert!(g.blocked_lines(PixelRef::new(2, 0)).is_empty());
    }
}
