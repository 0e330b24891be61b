use crate::error::Result;
use crate::geometry::intersect::{intersect_line, intersect_line_b, intersect_line_no_touch};
use crate::geometry::line::Line;
use crate::geometry::region::Region;

#[derive(Clone, Debug)]
enum TreeNode {
    Leaf(Line),
    Branch { region: Region, left: usize, right: usize },
}

impl TreeNode {
    #[inline]
    fn region(&self) -> Region {
        match self {
            TreeNode::Leaf(l) => *l.region(),
            TreeNode::Branch { region, .. } => *region,
        }
    }
}

/// Binary tree of segments keyed by enclosing regions. Nodes live in an arena
/// and refer to each other by index; every walk is iterative.
///
/// Insertion keeps depth logarithmic without rebalancing: the `n`th segment
/// is spliced in `popcount(n - 1) - 2` right-hops below the root, which
/// builds the tree up like a binary counter.
#[derive(Clone, Debug, Default)]
pub struct RegionTree {
    nodes: Vec<TreeNode>,
    root: Option<usize>,
    count: usize,
}

impl RegionTree {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.count }
    #[inline] pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Region enclosing every stored segment; null when empty.
    pub fn region(&self) -> Region {
        self.root.map_or(Region::null(), |r| self.nodes[r].region())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.count = 0;
    }

    #[inline]
    fn push(&mut self, n: TreeNode) -> usize {
        self.nodes.push(n);
        self.nodes.len() - 1
    }

    fn branch(&mut self, left: usize, right: usize) -> usize {
        let region = self.nodes[left].region().union(&self.nodes[right].region());
        self.push(TreeNode::Branch { region, left, right })
    }

    pub fn insert(&mut self, line: Line) {
        self.count += 1;
        let leaf = self.push(TreeNode::Leaf(line));
        let root = match self.root {
            None => {
                self.root = Some(leaf);
                return;
            }
            Some(r) => r,
        };

        let cut = (self.count - 1).count_ones() as i64 - 2;
        if cut < 0 {
            self.root = Some(self.branch(root, leaf));
            return;
        }

        // `path` holds the branches from the root down to the splice point
        let mut path = vec![root];
        let mut here = root;
        for _ in 0..cut {
            match self.nodes[here] {
                TreeNode::Branch { right, .. } if matches!(self.nodes[right], TreeNode::Branch { .. }) => {
                    here = right;
                    path.push(here);
                }
                _ => break,
            }
        }
        let insertion_point = match self.nodes[here] {
            TreeNode::Branch { right, .. } => right,
            // a lone leaf root only occurs for count == 1, handled above
            TreeNode::Leaf(_) => {
                self.root = Some(self.branch(root, leaf));
                return;
            }
        };
        let spliced = self.branch(insertion_point, leaf);
        if let TreeNode::Branch { right, .. } = &mut self.nodes[here] {
            *right = spliced;
        }
        for &n in path.iter().rev() {
            if let TreeNode::Branch { left, right, .. } = self.nodes[n] {
                let u = self.nodes[left].region().union(&self.nodes[right].region());
                if let TreeNode::Branch { region, .. } = &mut self.nodes[n] {
                    *region = u;
                }
            }
        }
    }

    /// Stored segments in tree order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> + '_ {
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        std::iter::from_fn(move || {
            while let Some(n) = stack.pop() {
                match &self.nodes[n] {
                    TreeNode::Leaf(l) => return Some(l),
                    TreeNode::Branch { left, right, .. } => {
                        stack.push(*right);
                        stack.push(*left);
                    }
                }
            }
            None
        })
    }

    #[inline]
    fn children(&self, n: usize) -> Option<(usize, usize)> {
        match self.nodes[n] {
            TreeNode::Leaf(_) => None,
            TreeNode::Branch { left, right, .. } => Some((left, right)),
        }
    }

    /// Does any segment of `self` intersect any segment of `other`? Touching counts.
    pub fn intersects(&self, other: &RegionTree) -> bool { self.intersects_with(other, true, 0.0) }

    /// As `intersects`, with touching segments counted only when `touch` is set.
    /// Subtrees are pruned by region before any segment test.
    pub fn intersects_with(&self, other: &RegionTree, touch: bool, tol: f64) -> bool {
        let (Some(ra), Some(rb)) = (self.root, other.root) else { return false };
        let mut stack = vec![(ra, rb)];
        while let Some((a, b)) = stack.pop() {
            let na = &self.nodes[a];
            let nb = &other.nodes[b];
            if !na.region().intersects(&nb.region(), 0.0) {
                continue;
            }
            match (na, nb) {
                (TreeNode::Leaf(la), TreeNode::Leaf(lb)) => {
                    let hit = if touch { intersect_line(la, lb, tol) } else { intersect_line_no_touch(la, lb, tol) };
                    if hit {
                        return true;
                    }
                }
                _ => {
                    let (al, ar) = self.children(a).unwrap_or((a, a));
                    let (bl, br) = other.children(b).unwrap_or((b, b));
                    // popped in reverse: left/left, right/right, left/right, right/left
                    for pair in [(ar, bl), (al, br), (ar, br), (al, bl)] {
                        if !stack.contains(&pair) {
                            stack.push(pair);
                        }
                    }
                }
            }
        }
        false
    }

    /// Sum of half-crossings of `probe` over the stored segments: a touch
    /// contributes 1, a proper crossing 2. Errs with `OnBoundary` when the
    /// probe's canonical start lies on a segment.
    pub fn count_intersections(&self, probe: &Line, tol: f64) -> Result<u32> {
        let mut n = 0u32;
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        while let Some(i) = stack.pop() {
            match &self.nodes[i] {
                TreeNode::Leaf(l) => n += intersect_line_b(l, probe, tol)?.weight(),
                TreeNode::Branch { region, left, right } => {
                    if region.intersects(probe.region(), 0.0) {
                        stack.push(*right);
                        stack.push(*left);
                    }
                }
            }
        }
        Ok(n)
    }

    /// Longest root-to-leaf path, counting the root as 1.
    pub fn depth(&self) -> usize {
        let mut best = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((n, d)) = stack.pop() {
            best = best.max(d);
            if let Some((l, r)) = self.children(n) {
                stack.push((l, d + 1));
                stack.push((r, d + 1));
            }
        }
        best
    }

    /// Every branch's region equals the union of its children's regions.
    pub fn unions_consistent(&self) -> bool {
        self.nodes.iter().all(|n| match n {
            TreeNode::Leaf(_) => true,
            TreeNode::Branch { region, left, right } => {
                *region == self.nodes[*left].region().union(&self.nodes[*right].region())
            }
        })
    }
}
