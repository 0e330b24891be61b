// Angular occlusion tracker around a fixed centre, one 45 degree octant at a time.
// Angles are "tanified": a ratio of coordinate differences that is monotonic in
// true angle within the octant, so no trigonometry is needed.

use crate::geometry::intersect::intersect_line;
use crate::geometry::line::Line;
use crate::geometry::point::Point2;
use crate::geometry::tolerance::EPS_SIEVE;
use serde::{Deserialize, Serialize};

/// Unoccluded interval in tanified coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub start: f64,
    pub end: f64,
}

impl Gap {
    pub const fn new(start: f64, end: f64) -> Self { Gap { start, end } }
    #[inline] pub fn width(&self) -> f64 { self.end - self.start }
}

/// Octant index, laid out as
///
/// ```text
///      \ 6 | 7 /
///      0 \ | / 1
///      - -   - -
///      2 / | \ 3
///      / 4 | 5 \
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Octant(u8);

impl Octant {
    pub const ALL: [Octant; 8] =
        [Octant(0), Octant(1), Octant(2), Octant(3), Octant(4), Octant(5), Octant(6), Octant(7)];

    pub fn new(q: u8) -> Option<Octant> { (q < 8).then_some(Octant(q)) }
    #[inline] pub fn index(self) -> u8 { self.0 }
    /// Octants 4..8 sweep along x at each row of y.
    #[inline] pub fn is_vertical(self) -> bool { self.0 >= 4 }
    /// Cells lie towards +x.
    #[inline] pub fn east(self) -> bool { self.0 % 2 == 1 }
    /// Cells lie towards +y.
    #[inline] pub fn north(self) -> bool { self.0 <= 1 || self.0 >= 6 }
}

#[derive(Clone, Debug)]
pub struct Sieve {
    centre: Point2,
    max_dist: Option<f64>,
    gaps: Vec<Gap>,
    blocks: Vec<Gap>,
}

impl Sieve {
    /// A fresh sieve with the whole octant `[0, 1]` open. `max_dist` bounds
    /// how far `test_block` lets the centre see.
    pub fn new(centre: Point2, max_dist: Option<f64>) -> Self {
        Sieve { centre, max_dist, gaps: vec![Gap::new(0.0, 1.0)], blocks: Vec::new() }
    }

    #[inline] pub fn centre(&self) -> Point2 { self.centre }
    #[inline] pub fn gaps(&self) -> &[Gap] { &self.gaps }
    #[inline] pub fn has_gaps(&self) -> bool { !self.gaps.is_empty() }
    #[inline] pub fn pending_blocks(&self) -> usize { self.blocks.len() }

    pub fn tanify(&self, p: Point2, q: Octant) -> f64 {
        let c = self.centre;
        match q.0 {
            0 => (p.y - c.y) / (c.x - p.x),
            1 => (p.y - c.y) / (p.x - c.x),
            2 => (c.y - p.y) / (c.x - p.x),
            3 => (c.y - p.y) / (p.x - c.x),
            4 => (c.x - p.x) / (c.y - p.y),
            5 => (p.x - c.x) / (c.y - p.y),
            6 => (c.x - p.x) / (p.y - c.y),
            _ => (p.x - c.x) / (p.y - c.y),
        }
    }

    /// Queue each line as an opaque block, widened by `EPS_SIEVE` on both sides.
    /// Blocks stay sorted by start (longer first on ties) until `collect_garbage`.
    pub fn block<'a>(&mut self, lines: impl IntoIterator<Item = &'a Line>, q: Octant) {
        for l in lines {
            let a = self.tanify(l.start(), q);
            let b = self.tanify(l.end(), q);
            let blk = Gap::new(a.min(b) - EPS_SIEVE, a.max(b) + EPS_SIEVE);
            let at = self
                .blocks
                .partition_point(|x| x.start < blk.start || (x.start == blk.start && x.end > blk.end));
            self.blocks.insert(at, blk);
        }
    }

    /// Apply queued blocks to the gap list in one merge pass, then drop them.
    pub fn collect_garbage(&mut self) {
        let blocks = std::mem::take(&mut self.blocks);
        let gaps = std::mem::take(&mut self.gaps);
        let mut out = Vec::with_capacity(gaps.len() + 1);
        let mut gi = 0;
        let mut cur = gaps.first().copied();
        let mut bi = 0;
        while bi < blocks.len() {
            let Some(mut g) = cur else { break };
            let blk = blocks[bi];
            if blk.end < g.start {
                bi += 1;
                continue;
            }
            let mut create = true;
            if blk.start <= g.start {
                create = false;
                if blk.end > g.start {
                    g.start = blk.end;
                }
            }
            if blk.end >= g.end {
                create = false;
                if blk.start < g.end {
                    g.end = blk.start;
                }
            }
            if g.end <= g.start + EPS_SIEVE {
                // closed: drop it and retry this block on the next gap
                gi += 1;
                cur = gaps.get(gi).copied();
                continue;
            } else if blk.end > g.end {
                // block runs past this gap: keep it and retry on the next gap
                out.push(g);
                gi += 1;
                cur = gaps.get(gi).copied();
                continue;
            } else if create {
                out.push(Gap::new(g.start, blk.start));
                g.start = blk.end;
            }
            cur = Some(g);
            bi += 1;
        }
        if let Some(g) = cur {
            out.push(g);
            out.extend_from_slice(&gaps[gi + 1..]);
        }
        self.gaps = out;
    }

    /// True if the sight line from the centre to `point` is too long or crosses
    /// (or touches) any of `lines`.
    pub fn test_block<'a>(&self, point: Point2, lines: impl IntoIterator<Item = &'a Line>, tol: f64) -> bool {
        let sight = Line::new(self.centre, point);
        if let Some(max) = self.max_dist {
            if sight.length() > max {
                return true;
            }
        }
        lines
            .into_iter()
            .any(|l| sight.region().intersects(l.region(), tol) && intersect_line(&sight, l, tol))
    }
}
