use crate::error;
use crate::interop::{arr_f64, arr_u32, arr_u8, new_obj, points, set_kv};
use crate::SpatialMap;
use js_sys::{Array, Float64Array};
use sala::algorithms::depth::{CostModel, DepthColumns, DepthOptions, Radius};
use sala::algorithms::grid::PointGrid;
use sala::algorithms::polygon::{BoundaryPolicy, Polygon};
use sala::algorithms::segmentation::segment_map_from_axial;
use sala::geometry::line::Line;
use sala::geometry::point::Point2;
use sala::geometry::region::Region;
use sala::model::{MapKind, Shape};
use sala::ShapeGraph;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_kind(kind: &str) -> Option<MapKind> {
    match kind {
        "point" => Some(MapKind::Point),
        "axial" => Some(MapKind::Axial),
        "segment" => Some(MapKind::Segment),
        _ => None,
    }
}

fn kind_name(kind: MapKind) -> &'static str {
    match kind {
        MapKind::Point => "point",
        MapKind::Axial => "axial",
        MapKind::Segment => "segment",
    }
}

fn finite(params: &[(&str, f64)]) -> Result<(), JsValue> {
    match params.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, _)) => Err(error::non_finite(name)),
        None => Ok(()),
    }
}

fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Line { Line::new(Point2::new(ax, ay), Point2::new(bx, by)) }

fn column_name(g: &ShapeGraph, col: usize) -> JsValue {
    g.attributes().column(col).map_or(JsValue::NULL, |c| JsValue::from_str(c.name()))
}

// Column names written by one depth run, keyed by measure.
fn depth_columns(g: &ShapeGraph, cols: &DepthColumns) -> JsValue {
    let o = new_obj();
    let opt = |c: Option<usize>| c.map_or(JsValue::NULL, |c| column_name(g, c));
    set_kv(&o, "choice", &opt(cols.choice));
    set_kv(&o, "weighted_choice", &opt(cols.weighted_choice));
    set_kv(&o, "mean_depth", &column_name(g, cols.mean_depth));
    set_kv(&o, "weighted_mean_depth", &column_name(g, cols.weighted_mean_depth));
    set_kv(&o, "total_depth", &column_name(g, cols.total_depth));
    set_kv(&o, "total_nodes", &column_name(g, cols.total_nodes));
    set_kv(&o, "total_length", &column_name(g, cols.total_length));
    o.into()
}

fn depth_options(model: &str, weighting: Option<String>, selection_only: bool) -> Result<DepthOptions, JsValue> {
    let model: CostModel = model.parse().map_err(|e| error::from_sala(&e))?;
    Ok(DepthOptions { model, selection_only, weighting_column: weighting, ..DepthOptions::default() })
}

#[wasm_bindgen]
impl SpatialMap {
    /// `kind` is one of "point", "axial" or "segment".
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str) -> Result<SpatialMap, JsValue> {
        match parse_kind(kind) {
            Some(k) => Ok(SpatialMap::rs_new(k)),
            None => Err(error::err("invalid_kind", format!("unknown map kind '{}'", kind), None)),
        }
    }

    /// Visibility graph over a grid covering the given extent. `walls` is a
    /// flat list of segments `[ax, ay, bx, by, ...]`; `boundary` a flat ring of
    /// points limiting the filled cells (empty fills everything).
    pub fn visibility_graph(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        spacing: f64,
        walls: &Float64Array,
        boundary: &Float64Array,
        max_dist: Option<f64>,
    ) -> Result<SpatialMap, JsValue> {
        finite(&[("min_x", min_x), ("min_y", min_y), ("max_x", max_x), ("max_y", max_y)])?;
        if let Some(d) = max_dist {
            if !(d.is_finite() && d > 0.0) {
                return Err(error::out_of_range("max_dist", 0.0, f64::INFINITY, d));
            }
        }
        let region = Region::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y));
        let mut grid = PointGrid::new(&region, spacing, Point2::default()).map_err(|e| error::from_sala(&e))?;

        let ring = points(&boundary.to_vec());
        if ring.len() >= 3 {
            let poly = Polygon::from_points(&ring).map_err(|e| error::from_sala(&e))?;
            grid.fill_inside(&poly, BoundaryPolicy::Inside).map_err(|e| error::from_sala(&e))?;
        } else {
            grid.fill_all();
        }

        let flat = walls.to_vec();
        if flat.iter().any(|v| !v.is_finite()) {
            return Err(error::non_finite("walls"));
        }
        let lines: Vec<Line> = flat.chunks_exact(4).map(|c| line(c[0], c[1], c[2], c[3])).collect();
        grid.block_lines(&lines);
        let inner = grid.make_graph(max_dist, None).map_err(|e| error::from_sala(&e))?;
        Ok(SpatialMap { inner })
    }

    pub fn kind(&self) -> String { kind_name(self.inner.kind()).to_string() }
    pub fn node_count(&self) -> u32 { self.inner.node_count() as u32 }

    // Nodes and links
    pub fn add_point_res(&mut self, x: f64, y: f64, length: f64) -> JsValue {
        if let Err(e) = finite(&[("x", x), ("y", y), ("length", length)]) {
            return e;
        }
        error::res(self.inner.add_point(Point2::new(x, y), length), |k| JsValue::from_f64(k as f64))
    }
    pub fn add_line_res(&mut self, ax: f64, ay: f64, bx: f64, by: f64) -> JsValue {
        if let Err(e) = finite(&[("ax", ax), ("ay", ay), ("bx", bx), ("by", by)]) {
            return e;
        }
        error::res(self.inner.add_line(line(ax, ay, bx, by)), |k| JsValue::from_f64(k as f64))
    }
    pub fn add_segment_res(&mut self, ax: f64, ay: f64, bx: f64, by: f64, axial_ref: u32) -> JsValue {
        if let Err(e) = finite(&[("ax", ax), ("ay", ay), ("bx", bx), ("by", by)]) {
            return e;
        }
        error::res(self.inner.add_segment(line(ax, ay, bx, by), axial_ref), |k| JsValue::from_f64(k as f64))
    }
    pub fn connect_res(&mut self, a: u32, b: u32) -> JsValue {
        error::res(self.inner.connect(a, b), JsValue::from_bool)
    }
    pub fn make_axial_connections(&mut self) -> u32 { self.inner.make_axial_connections() as u32 }
    pub fn make_segment_connections_res(&mut self, tol: f64) -> JsValue {
        if !(tol.is_finite() && tol >= 0.0) {
            return error::out_of_range("tol", 0.0, f64::INFINITY, tol);
        }
        error::ok(JsValue::from_f64(self.inner.make_segment_connections(tol) as f64))
    }

    /// Segment map built from this map's lines.
    pub fn segment_map(&self, stub_ratio: f64) -> Result<SpatialMap, JsValue> {
        if !(stub_ratio.is_finite() && (0.0..0.5).contains(&stub_ratio)) {
            return Err(error::out_of_range("stub_ratio", 0.0, 0.5, stub_ratio));
        }
        let inner = segment_map_from_axial(&self.inner, stub_ratio).map_err(|e| error::from_sala(&e))?;
        Ok(SpatialMap { inner })
    }

    /// `{ ids, coords, stride }`: two coordinates per point node, four per line.
    pub fn get_geometry(&self) -> JsValue {
        let stride = if self.inner.kind() == MapKind::Point { 2 } else { 4 };
        let n = self.inner.node_count() as u32;
        let ids: Vec<u32> = (0..n).collect();
        let mut coords = Vec::with_capacity(n as usize * stride);
        for k in 0..n {
            match self.inner.shape(k) {
                Some(Shape::Point { at }) => coords.extend_from_slice(&[at.x, at.y]),
                Some(Shape::Line { line }) => {
                    let (a, b) = (line.t_start(), line.t_end());
                    coords.extend_from_slice(&[a.x, a.y, b.x, b.y]);
                }
                None => {}
            }
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "coords", &arr_f64(&coords).into());
        set_kv(&obj, "stride", &JsValue::from_f64(stride as f64));
        obj.into()
    }
    pub fn get_links_res(&self, key: u32) -> JsValue {
        let Some(c) = self.inner.connector(key) else { return error::invalid_id("node", key) };
        let (nodes, weights): (Vec<u32>, Vec<f64>) = c.neighbours().unzip();
        let obj = new_obj();
        set_kv(&obj, "nodes", &arr_u32(&nodes).into());
        set_kv(&obj, "weights", &arr_f64(&weights).into());
        error::ok(obj.into())
    }

    // Analysis
    pub fn analyse_depth_res(
        &mut self,
        model: &str,
        radius: &str,
        selection_only: bool,
        weighting: Option<String>,
    ) -> JsValue {
        let mut opts = match depth_options(model, weighting, selection_only) {
            Ok(o) => o,
            Err(e) => return e,
        };
        opts.radius = match Radius::parse(radius) {
            Ok(r) => r,
            Err(e) => return error::from_sala(&e),
        };
        match self.inner.analyse_depth(&opts, None) {
            Ok(cols) => error::ok(depth_columns(&self.inner, &cols)),
            Err(e) => error::from_sala(&e),
        }
    }
    /// `radii` is a comma separated list such as "400,1200,n".
    pub fn run_radii_res(&mut self, model: &str, radii: &str, weighting: Option<String>) -> JsValue {
        let opts = match depth_options(model, weighting, false) {
            Ok(o) => o,
            Err(e) => return e,
        };
        let radii = match Radius::parse_list(radii) {
            Ok(r) => r,
            Err(e) => return error::from_sala(&e),
        };
        match self.inner.run_radii(&opts, &radii, None) {
            Ok(runs) => {
                let out = Array::new();
                for cols in &runs {
                    out.push(&depth_columns(&self.inner, cols));
                }
                error::ok(out.into())
            }
            Err(e) => error::from_sala(&e),
        }
    }

    // Attributes
    pub fn column_names(&self) -> JsValue {
        let names: Vec<&str> = self.inner.attributes().columns().iter().map(|c| c.name()).collect();
        serde_wasm_bindgen::to_value(&names).unwrap_or(JsValue::NULL)
    }
    pub fn column_values_res(&self, name: &str) -> JsValue {
        let t = self.inner.attributes();
        match t.column_index(name).and_then(|c| t.column_values(c)) {
            Some(v) => error::ok(arr_f64(&v).into()),
            None => error::from_sala(&sala::SalaError::UnknownColumn(name.to_string())),
        }
    }
    pub fn set_displayed_attribute_res(&mut self, name: Option<String>) -> JsValue {
        let col = match name {
            None => None,
            Some(n) => match self.inner.attributes().column_index(&n) {
                Some(c) => Some(c),
                None => return error::from_sala(&sala::SalaError::UnknownColumn(n)),
            },
        };
        error::res(self.inner.set_displayed_attribute(col), |_| JsValue::UNDEFINED)
    }
    pub fn displayed_attribute(&self) -> JsValue {
        self.inner.displayed_attribute().map_or(JsValue::NULL, |c| column_name(&self.inner, c))
    }
    /// Normalised display value per node key; -1 marks unset values.
    pub fn displayed_values(&self) -> Float64Array {
        let view = self.inner.view();
        let v: Vec<f64> = (0..self.inner.node_count() as u32).map(|k| view.normalised_value(k)).collect();
        arr_f64(&v)
    }
    /// Node keys in paint order, lowest display value first.
    pub fn paint_order(&self) -> JsValue {
        let view = self.inner.view();
        let keys: Vec<u32> = view.index().iter().map(|it| it.key).collect();
        arr_u32(&keys).into()
    }

    // Selection and layers
    pub fn set_selected_res(&mut self, key: u32, selected: bool) -> JsValue {
        error::res(self.inner.set_selected(key, selected), |_| JsValue::UNDEFINED)
    }
    pub fn clear_selection(&mut self) { self.inner.clear_selection(); }
    pub fn selected_keys(&self) -> JsValue { arr_u32(&self.inner.selected_keys()).into() }
    pub fn push_selection_to_layer_res(&mut self, name: &str) -> JsValue {
        error::res(self.inner.push_selection_to_layer(name), |i| JsValue::from_f64(i as f64))
    }
    pub fn set_layer_visible_res(&mut self, index: u32, visible: bool) -> JsValue {
        error::res(self.inner.set_layer_visible(index as usize, visible), |_| JsValue::UNDEFINED)
    }
    pub fn layer_names(&self) -> JsValue {
        let l = self.inner.layers();
        let names: Vec<&str> = (0..l.num_layers()).filter_map(|i| l.layer_name(i)).collect();
        serde_wasm_bindgen::to_value(&names).unwrap_or(JsValue::NULL)
    }
    pub fn is_node_visible(&self, key: u32) -> bool { self.inner.is_node_visible(key) }

    // Persistence
    pub fn to_json(&self) -> JsValue {
        self.inner
            .to_json()
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .unwrap_or(JsValue::NULL)
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => match ShapeGraph::from_json(val) {
                Ok(g) => {
                    self.inner = g;
                    error::ok(JsValue::from_bool(true))
                }
                Err(e) => error::from_sala(&e),
            },
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
    pub fn write_attributes_res(&self) -> JsValue {
        let mut buf = Vec::new();
        error::res(self.inner.write_attributes(&mut buf), |_| arr_u8(&buf).into())
    }
    pub fn read_attributes_res(&mut self, bytes: &[u8]) -> JsValue {
        let mut r = bytes;
        error::res(self.inner.read_attributes(&mut r), |_| JsValue::UNDEFINED)
    }

    pub fn log_summary(&self) {
        let g = &self.inner;
        web_sys::console::log_1(&JsValue::from_str(&format!(
            "{} map: {} nodes, {} columns, {} layers, {} selected",
            kind_name(g.kind()),
            g.node_count(),
            g.attributes().num_columns(),
            g.layers().num_layers(),
            g.selected_keys().len()
        )));
    }
}
