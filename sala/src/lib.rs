pub mod comm;
pub mod error;
pub mod layers;
pub mod model;
pub mod geometry {
    pub mod intersect;
    pub mod line;
    pub mod point;
    pub mod region;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod depth;
    pub mod grid;
    pub mod polygon;
    pub mod region_tree;
    pub mod segmentation;
    pub mod sieve;
}
pub mod attributes {
    pub mod index;
    pub mod table;
}
mod json;
mod persist;

pub use error::{Result, SalaError};

use algorithms::depth::{DepthColumns, DepthOptions, Radius};
use attributes::index::AttributeTableView;
use attributes::table::AttributeTable;
use comm::Communicator;
use geometry::intersect::intersect_line;
use geometry::line::Line;
use geometry::point::{angle, Point2};
use geometry::region::Region;
use geometry::tolerance::EPS_LINE;
use layers::LayerManager;
use model::{Connector, Dir, MapKind, SegmentLink, Shape};
use std::f64::consts::{FRAC_PI_2, PI};
use std::io::{Read, Write};

pub const CONNECTIVITY: &str = "Connectivity";
pub const LINE_LENGTH: &str = "Line Length";
pub const SEGMENT_LENGTH: &str = "Segment Length";
pub const AXIAL_LINE_REF: &str = "Axial Line Ref";

/// A spatial graph: point, axial or segment nodes with their adjacency,
/// attribute table and layers.
#[derive(Clone, Debug)]
pub struct ShapeGraph {
    pub(crate) kind: MapKind,
    pub(crate) shapes: Vec<Shape>,         // key is index
    pub(crate) lengths: Vec<f64>,          // traversal weight per node
    pub(crate) axial_refs: Vec<u32>,       // parent axial line; own key otherwise
    pub(crate) connectors: Vec<Connector>,
    pub(crate) attributes: AttributeTable,
    pub(crate) layers: LayerManager,
    pub(crate) displayed_attribute: Option<usize>,
}

impl ShapeGraph {
    pub fn new(kind: MapKind) -> Self {
        let mut attributes = AttributeTable::new();
        attributes.get_or_insert_locked_column(CONNECTIVITY);
        match kind {
            MapKind::Point => {}
            MapKind::Axial => {
                attributes.get_or_insert_locked_column(LINE_LENGTH);
            }
            MapKind::Segment => {
                attributes.get_or_insert_locked_column(SEGMENT_LENGTH);
                attributes.get_or_insert_locked_column(AXIAL_LINE_REF);
            }
        }
        ShapeGraph {
            kind,
            shapes: Vec::new(),
            lengths: Vec::new(),
            axial_refs: Vec::new(),
            connectors: Vec::new(),
            attributes,
            layers: LayerManager::new(),
            displayed_attribute: None,
        }
    }

    #[inline] pub fn kind(&self) -> MapKind { self.kind }
    #[inline] pub fn node_count(&self) -> usize { self.shapes.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }
    pub fn shape(&self, key: u32) -> Option<&Shape> { self.shapes.get(key as usize) }
    pub fn node_length(&self, key: u32) -> Option<f64> { self.lengths.get(key as usize).copied() }
    pub fn axial_ref(&self, key: u32) -> Option<u32> { self.axial_refs.get(key as usize).copied() }
    pub fn connector(&self, key: u32) -> Option<&Connector> { self.connectors.get(key as usize) }
    #[inline] pub fn attributes(&self) -> &AttributeTable { &self.attributes }
    #[inline] pub fn attributes_mut(&mut self) -> &mut AttributeTable { &mut self.attributes }
    #[inline] pub fn layers(&self) -> &LayerManager { &self.layers }
    #[inline] pub fn layers_mut(&mut self) -> &mut LayerManager { &mut self.layers }

    /// Bounding region of every node.
    pub fn region(&self) -> Region {
        self.shapes.iter().fold(Region::null(), |acc, s| match s {
            Shape::Point { at } => acc.union(&Region::new(*at, *at)),
            Shape::Line { line } => acc.union(line.region()),
        })
    }

    fn check_key(&self, key: u32) -> Result<usize> {
        let i = key as usize;
        if i < self.shapes.len() { Ok(i) } else { Err(SalaError::UnknownNode(key)) }
    }

    pub(crate) fn push_node(&mut self, shape: Shape, length: f64, axial_ref: Option<u32>) -> Result<u32> {
        let key = u32::try_from(self.shapes.len()).map_err(|_| SalaError::UnknownNode(u32::MAX))?;
        let axial_ref = axial_ref.unwrap_or(key);
        let kind = self.kind;
        let mut row = self.attributes.add_row(key)?;
        row.set_value_by_name(CONNECTIVITY, 0.0)?;
        match kind {
            MapKind::Point => {}
            MapKind::Axial => {
                row.set_value_by_name(LINE_LENGTH, length)?;
            }
            MapKind::Segment => {
                row.set_value_by_name(SEGMENT_LENGTH, length)?;
                row.set_value_by_name(AXIAL_LINE_REF, f64::from(axial_ref))?;
            }
        }
        self.shapes.push(shape);
        self.lengths.push(length);
        self.axial_refs.push(axial_ref);
        self.connectors.push(Connector::default());
        Ok(key)
    }

    /// Adds a point node. `length` is its traversal weight (the grid uses its spacing).
    pub fn add_point(&mut self, at: Point2, length: f64) -> Result<u32> {
        if !at.is_finite() {
            return Err(SalaError::NonFinite("point"));
        }
        if !(length.is_finite() && length >= 0.0) {
            return Err(SalaError::NonFinite("length"));
        }
        self.push_node(Shape::Point { at }, length, None)
    }

    /// Adds a line node that is its own axial reference.
    pub fn add_line(&mut self, line: Line) -> Result<u32> {
        if !line.start().is_finite() || !line.end().is_finite() {
            return Err(SalaError::NonFinite("line"));
        }
        self.push_node(Shape::Line { line }, line.length(), None)
    }

    /// Adds a segment cut from axial line `axial_ref`. Segments of one axial
    /// line are joined at no topological cost.
    pub fn add_segment(&mut self, line: Line, axial_ref: u32) -> Result<u32> {
        if !line.start().is_finite() || !line.end().is_finite() {
            return Err(SalaError::NonFinite("line"));
        }
        self.push_node(Shape::Line { line }, line.length(), Some(axial_ref))
    }

    pub(crate) fn set_connectivity(&mut self, key: u32, degree: usize) {
        if let Some(mut row) = self.attributes.row_mut(key) {
            let _ = row.set_value_by_name(CONNECTIVITY, degree as f64);
        }
    }

    fn refresh_connectivity(&mut self, key: u32) {
        let degree = self.connectors[key as usize].degree();
        self.set_connectivity(key, degree);
    }

    /// Undirected link. Between two lines the weight is the acute angle
    /// between them in quarter-turns, otherwise 0. Returns false if already linked.
    pub fn connect(&mut self, a: u32, b: u32) -> Result<bool> {
        let w = match (self.shape(a).and_then(Shape::as_line), self.shape(b).and_then(Shape::as_line)) {
            (Some(la), Some(lb)) => crossing_weight(la, lb),
            _ => 0.0,
        };
        self.connect_weighted(a, b, w)
    }

    pub fn connect_weighted(&mut self, a: u32, b: u32, weight: f64) -> Result<bool> {
        let (ia, ib) = (self.check_key(a)?, self.check_key(b)?);
        if !weight.is_finite() {
            return Err(SalaError::NonFinite("weight"));
        }
        if a == b {
            return Ok(false);
        }
        let added = self.connectors[ia].add_connection(b, weight);
        self.connectors[ib].add_connection(a, weight);
        self.refresh_connectivity(a);
        self.refresh_connectivity(b);
        Ok(added)
    }

    /// Join end `a_end` of segment `a` to end `b_end` of segment `b`, both ways.
    pub fn connect_segments(&mut self, a: u32, a_end: Dir, b: u32, b_end: Dir, weight: f64) -> Result<bool> {
        let (ia, ib) = (self.check_key(a)?, self.check_key(b)?);
        if !weight.is_finite() {
            return Err(SalaError::NonFinite("weight"));
        }
        if a == b {
            return Ok(false);
        }
        let added = self.connectors[ia].add_segment_link(a_end, SegmentLink { node: b, dir: b_end, weight });
        self.connectors[ib].add_segment_link(b_end, SegmentLink { node: a, dir: a_end, weight });
        self.refresh_connectivity(a);
        self.refresh_connectivity(b);
        Ok(added)
    }

    /// Link every pair of line nodes that cross or touch. Returns the number of new links.
    pub fn make_axial_connections(&mut self) -> usize {
        let mut order: Vec<(u32, Line)> = self
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(k, s)| s.as_line().map(|l| (k as u32, *l)))
            .collect();
        order.sort_by(|a, b| a.1.ax().total_cmp(&b.1.ax()));
        let mut pairs = Vec::new();
        for (i, (ka, a)) in order.iter().enumerate() {
            for (kb, b) in &order[i + 1..] {
                if b.ax() > a.bx() {
                    break;
                }
                if a.region().intersects(b.region(), EPS_LINE) && intersect_line(a, b, EPS_LINE) {
                    pairs.push((*ka, *kb, crossing_weight(a, b)));
                }
            }
        }
        let mut added = 0;
        for (a, b, w) in pairs {
            if let Ok(true) = self.connect_weighted(a, b, w) {
                added += 1;
            }
        }
        tracing::debug!(lines = order.len(), links = added, "axial connections");
        added
    }

    /// Join segment ends that coincide within `tol`, weighting each join by
    /// the turn it implies (0 straight on, 1 right angle, 2 reversal).
    /// Returns the number of new joins.
    pub fn make_segment_connections(&mut self, tol: f64) -> usize {
        struct End {
            at: Point2,
            far: Point2,
            node: u32,
            dir: Dir,
        }
        let mut ends: Vec<End> = Vec::with_capacity(self.shapes.len() * 2);
        for (k, s) in self.shapes.iter().enumerate() {
            if let Some(l) = s.as_line() {
                ends.push(End { at: l.t_start(), far: l.t_end(), node: k as u32, dir: Dir::Back });
                ends.push(End { at: l.t_end(), far: l.t_start(), node: k as u32, dir: Dir::Forward });
            }
        }
        ends.sort_by(|a, b| a.at.x.total_cmp(&b.at.x));
        let mut joins = Vec::new();
        for (i, a) in ends.iter().enumerate() {
            for b in &ends[i + 1..] {
                if b.at.x - a.at.x > tol {
                    break;
                }
                if a.node != b.node && (b.at.y - a.at.y).abs() <= tol {
                    let turn = (PI - angle(a.far, a.at, b.far)).abs() / FRAC_PI_2;
                    joins.push((a.node, a.dir, b.node, b.dir, turn));
                }
            }
        }
        let mut added = 0;
        for (a, ad, b, bd, w) in joins {
            if let Ok(true) = self.connect_segments(a, ad, b, bd, w) {
                added += 1;
            }
        }
        added
    }

    pub fn set_selected(&mut self, key: u32, selected: bool) -> Result<()> {
        let mut row = self.attributes.row_mut(key).ok_or(SalaError::UnknownNode(key))?;
        row.set_selected(selected);
        Ok(())
    }

    pub fn clear_selection(&mut self) { self.attributes.deselect_all(); }
    pub fn selected_keys(&self) -> Vec<u32> { self.attributes.selected_keys() }

    /// Adds layer `name` holding the visible selection; returns its index.
    pub fn push_selection_to_layer(&mut self, name: &str) -> Result<usize> {
        self.attributes.push_selection_to_layer(&mut self.layers, name)
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.layers.set_layer_visible(index, visible)
    }

    pub fn is_node_visible(&self, key: u32) -> bool {
        self.attributes.row(key).map_or(false, |r| self.layers.is_visible(r.layer_key()))
    }

    #[inline] pub fn displayed_attribute(&self) -> Option<usize> { self.displayed_attribute }

    pub fn set_displayed_attribute(&mut self, column: Option<usize>) -> Result<()> {
        if let Some(c) = column {
            if c >= self.attributes.num_columns() {
                return Err(SalaError::UnknownColumn(format!("#{}", c)));
            }
        }
        self.displayed_attribute = column;
        Ok(())
    }

    /// Render view over the displayed attribute.
    pub fn view(&self) -> AttributeTableView<'_> {
        let mut v = AttributeTableView::new(&self.attributes);
        if v.set_display_column(self.displayed_attribute).is_err() {
            tracing::trace!(column = ?self.displayed_attribute, "displayed attribute no longer exists");
        }
        v
    }

    pub fn analyse_depth(&mut self, opts: &DepthOptions, comm: Option<&dyn Communicator>) -> Result<DepthColumns> {
        algorithms::depth::analyse_depth(self, opts, comm)
    }

    pub fn run_radii(
        &mut self,
        opts: &DepthOptions,
        radii: &[Radius],
        comm: Option<&dyn Communicator>,
    ) -> Result<Vec<DepthColumns>> {
        algorithms::depth::analyse_depth_radii(self, opts, radii, comm)
    }

    /// Attribute table followed by the layer manager.
    pub fn write_attributes<W: Write>(&self, w: &mut W) -> Result<()> {
        self.attributes.write(w)?;
        self.layers.write(w)
    }

    /// Replace the attribute table and layers. The stream must hold exactly
    /// one row per node.
    pub fn read_attributes<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let table = AttributeTable::read(r)?;
        let layers = LayerManager::read(r)?;
        let n = self.node_count();
        if table.num_rows() != n || !table.keys().enumerate().all(|(i, k)| k as usize == i) {
            return Err(SalaError::Format(format!("attribute rows do not match {} nodes", n)));
        }
        self.attributes = table;
        self.layers = layers;
        self.displayed_attribute = None;
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value { json::to_json_impl(self) }

    pub fn from_json(v: serde_json::Value) -> Result<Self> { json::from_json_impl(v) }
}

// Acute angle between two lines in quarter-turns.
fn crossing_weight(a: &Line, b: &Line) -> f64 {
    let (va, vb) = (a.vector(), b.vector());
    let (la, lb) = (va.length(), vb.length());
    if la == 0.0 || lb == 0.0 {
        return 0.0;
    }
    let cos = (va.dot(vb) / (la * lb)).abs().min(1.0);
    cos.acos() / FRAC_PI_2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(ax: f64, ay: f64, bx: f64, by: f64) -> Line { Line::new(Point2::new(ax, ay), Point2::new(bx, by)) }

    #[test]
    fn system_columns_per_kind() {
        let mut g = ShapeGraph::new(MapKind::Segment);
        let k = g.add_segment(l(0.0, 0.0, 3.0, 4.0), 7).unwrap();
        let t = g.attributes();
        let row = t.row(k).unwrap();
        assert_eq!(row.value(t.column_index(SEGMENT_LENGTH).unwrap()), 5.0);
        assert_eq!(row.value(t.column_index(AXIAL_LINE_REF).unwrap()), 7.0);
        assert!(t.column(t.column_index(CONNECTIVITY).unwrap()).unwrap().is_locked());
        assert!(g.attributes_mut().insert_or_reset_column(SEGMENT_LENGTH).is_err());
        assert_eq!(ShapeGraph::new(MapKind::Point).attributes().num_columns(), 1);
    }

    #[test]
    fn non_finite_input_rejected() {
        let mut g = ShapeGraph::new(MapKind::Axial);
        assert!(matches!(g.add_line(l(0.0, f64::NAN, 1.0, 1.0)), Err(SalaError::NonFinite(_))));
        assert!(matches!(g.add_point(Point2::new(f64::INFINITY, 0.0), 1.0), Err(SalaError::NonFinite(_))));
        assert!(g.is_empty());
        assert_eq!(g.attributes().num_rows(), 0);
    }

    #[test]
    fn axial_crossings_link_with_angle_weight() {
        let mut g = ShapeGraph::new(MapKind::Axial);
        g.add_line(l(0.0, 0.0, 10.0, 0.0)).unwrap();
        g.add_line(l(5.0, -5.0, 5.0, 5.0)).unwrap();
        g.add_line(l(20.0, 0.0, 30.0, 0.0)).unwrap();
        assert_eq!(g.make_axial_connections(), 1);
        let c = g.connector(0).unwrap();
        assert_eq!(c.connections.len(), 1);
        assert_eq!(c.connections[0].node, 1);
        assert!((c.connections[0].weight - 1.0).abs() < 1e-12);
        let conn = g.attributes().column_index(CONNECTIVITY).unwrap();
        assert_eq!(g.attributes().row(1).unwrap().value(conn), 1.0);
        assert_eq!(g.attributes().row(2).unwrap().value(conn), 0.0);
    }

    #[test]
    fn segment_ends_join_with_turns() {
        let mut g = ShapeGraph::new(MapKind::Segment);
        g.add_segment(l(0.0, 0.0, 1.0, 0.0), 0).unwrap();
        g.add_segment(l(1.0, 0.0, 2.0, 0.0), 0).unwrap();
        g.add_segment(l(1.0, 0.0, 1.0, 1.0), 1).unwrap();
        assert_eq!(g.make_segment_connections(1e-9), 3);
        let a = g.connector(0).unwrap();
        assert!(a.back.is_empty());
        let fw: Vec<(u32, f64)> = a.forward.iter().map(|s| (s.node, s.weight)).collect();
        assert_eq!(fw.len(), 2);
        assert_eq!(fw[0].0, 1);
        assert!(fw[0].1.abs() < 1e-12);
        assert_eq!(fw[1].0, 2);
        assert!((fw[1].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_nodes_and_self_links() {
        let mut g = ShapeGraph::new(MapKind::Point);
        let a = g.add_point(Point2::new(0.0, 0.0), 1.0).unwrap();
        assert!(matches!(g.connect(a, 9), Err(SalaError::UnknownNode(9))));
        assert!(!g.connect(a, a).unwrap());
        assert!(matches!(g.set_selected(4, true), Err(SalaError::UnknownNode(4))));
    }
}
