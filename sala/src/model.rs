use crate::geometry::line::Line;
use crate::geometry::point::Point2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Point,
    Axial,
    Segment,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Point { at: Point2 },
    Line { line: Line },
}

impl Shape {
    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Shape::Line { line } => Some(line),
            Shape::Point { .. } => None,
        }
    }
}

/// End of a segment a link leaves from: `Back` is the supplied start, `Forward` the supplied end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    Back,
    Forward,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub node: u32,
    pub weight: f64, // turn in quarter-turns
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentLink {
    pub node: u32,
    pub dir: Dir, // end of `node` the link arrives at
    pub weight: f64,
}

/// Per-node adjacency: undirected `connections` for point and axial graphs,
/// `back`/`forward` lists for segment graphs. Each list is sorted by node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub connections: Vec<Link>,
    pub back: Vec<SegmentLink>,
    pub forward: Vec<SegmentLink>,
}

impl Connector {
    /// Returns false if `node` was already connected.
    pub(crate) fn add_connection(&mut self, node: u32, weight: f64) -> bool {
        let at = self.connections.partition_point(|l| l.node < node);
        if self.connections.get(at).map_or(false, |l| l.node == node) {
            return false;
        }
        self.connections.insert(at, Link { node, weight });
        true
    }

    pub(crate) fn add_segment_link(&mut self, end: Dir, link: SegmentLink) -> bool {
        let list = match end {
            Dir::Back => &mut self.back,
            Dir::Forward => &mut self.forward,
        };
        let at = list.partition_point(|l| (l.node, l.dir) < (link.node, link.dir));
        if list.get(at).map_or(false, |l| l.node == link.node && l.dir == link.dir) {
            return false;
        }
        list.insert(at, link);
        true
    }

    /// Neighbours in relaxation order: back links, forward links, then undirected links.
    pub fn neighbours(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.back
            .iter()
            .chain(self.forward.iter())
            .map(|l| (l.node, l.weight))
            .chain(self.connections.iter().map(|l| (l.node, l.weight)))
    }

    pub fn degree(&self) -> usize { self.connections.len() + self.back.len() + self.forward.len() }

    pub fn max_weight(&self) -> f64 { self.neighbours().map(|(_, w)| w).fold(0.0, f64::max) }
}
