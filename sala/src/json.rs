use crate::attributes::table::{ColumnStats, DisplayParams};
use crate::error::{Result, SalaError};
use crate::layers::LayerKey;
use crate::model::{Connector, Link, MapKind, SegmentLink, Shape};
use crate::ShapeGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const VERSION: u32 = 1;

#[inline]
fn finite(v: f64) -> Option<f64> { v.is_finite().then_some(v) }

pub fn to_json_impl(g: &ShapeGraph) -> Value {
    #[derive(Serialize)]
    struct NodeSer<'a> {
        key: u32,
        #[serde(flatten)]
        shape: &'a Shape,
        length: f64,
        axial_ref: u32,
        #[serde(flatten)]
        links: &'a Connector,
    }
    #[derive(Serialize)]
    struct ColumnSer<'a> {
        name: &'a str,
        locked: bool,
        hidden: bool,
        display: DisplayParams,
        stats: ColumnStats,
    }
    #[derive(Serialize)]
    struct RowSer {
        key: u32,
        values: Vec<Option<f64>>, // null for NaN
        selected: bool,
        layer_key: LayerKey,
        visible: bool,
    }
    #[derive(Serialize)]
    struct LayerSer<'a> {
        index: usize,
        name: &'a str,
        visible: bool,
    }
    #[derive(Serialize)]
    struct Doc<'a> {
        version: u32,
        kind: MapKind,
        nodes: Vec<NodeSer<'a>>,
        columns: Vec<ColumnSer<'a>>,
        rows: Vec<RowSer>,
        layers: Vec<LayerSer<'a>>,
        displayed_attribute: Option<usize>,
    }

    let nodes = g
        .shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| NodeSer {
            key: i as u32,
            shape,
            length: g.lengths[i],
            axial_ref: g.axial_refs[i],
            links: &g.connectors[i],
        })
        .collect();
    let columns = g
        .attributes
        .columns()
        .iter()
        .map(|c| ColumnSer {
            name: c.name(),
            locked: c.is_locked(),
            hidden: c.is_hidden(),
            display: c.display_params(),
            stats: c.stats(),
        })
        .collect();
    let ncols = g.attributes.num_columns();
    let rows = g
        .attributes
        .rows()
        .map(|(key, r)| RowSer {
            key,
            values: (0..ncols).map(|c| finite(r.value(c))).collect(),
            selected: r.is_selected(),
            layer_key: r.layer_key(),
            visible: g.layers.is_visible(r.layer_key()),
        })
        .collect();
    let layers = (0..g.layers.num_layers())
        .filter_map(|i| {
            let name = g.layers.layer_name(i)?;
            let visible = g.layers.is_layer_visible(i).ok()?;
            Some(LayerSer { index: i, name, visible })
        })
        .collect();
    serde_json::to_value(Doc {
        version: VERSION,
        kind: g.kind,
        nodes,
        columns,
        rows,
        layers,
        displayed_attribute: g.displayed_attribute,
    })
    .unwrap_or(Value::Null)
}

pub fn from_json_impl(v: Value) -> Result<ShapeGraph> {
    #[derive(Deserialize)]
    struct NodeDe {
        key: u32,
        #[serde(flatten)]
        shape: Shape,
        length: f64,
        axial_ref: u32,
        #[serde(default)]
        connections: Vec<Link>,
        #[serde(default)]
        back: Vec<SegmentLink>,
        #[serde(default)]
        forward: Vec<SegmentLink>,
    }
    #[derive(Deserialize)]
    struct ColumnDe {
        name: String,
        #[serde(default)]
        locked: bool,
        #[serde(default)]
        hidden: bool,
        display: Option<DisplayParams>,
    }
    #[derive(Deserialize)]
    struct RowDe {
        key: u32,
        values: Vec<Option<f64>>,
        #[serde(default)]
        selected: bool,
        layer_key: Option<LayerKey>,
    }
    #[derive(Deserialize)]
    struct LayerDe {
        index: usize,
        name: String,
        visible: bool,
    }
    #[derive(Deserialize)]
    struct Doc {
        kind: MapKind,
        nodes: Vec<NodeDe>,
        #[serde(default)]
        columns: Vec<ColumnDe>,
        #[serde(default)]
        rows: Vec<RowDe>,
        #[serde(default)]
        layers: Vec<LayerDe>,
        displayed_attribute: Option<usize>,
    }

    let doc: Doc = serde_json::from_value(v).map_err(|e| SalaError::Format(e.to_string()))?;
    let mut g = ShapeGraph::new(doc.kind);
    let n = doc.nodes.len();

    let mut links = Vec::with_capacity(n);
    for (i, nd) in doc.nodes.into_iter().enumerate() {
        if nd.key as usize != i {
            return Err(SalaError::Format(format!("node {} stored at position {}", nd.key, i)));
        }
        let ok = match &nd.shape {
            Shape::Point { at } => at.is_finite(),
            Shape::Line { line } => line.start().is_finite() && line.end().is_finite(),
        };
        if !ok || !nd.length.is_finite() {
            return Err(SalaError::NonFinite("node"));
        }
        g.push_node(nd.shape, nd.length, Some(nd.axial_ref))?;
        links.push(Connector { connections: nd.connections, back: nd.back, forward: nd.forward });
    }
    for c in &links {
        for (node, w) in c.neighbours() {
            if node as usize >= n {
                return Err(SalaError::UnknownNode(node));
            }
            if !w.is_finite() {
                return Err(SalaError::NonFinite("weight"));
            }
        }
    }
    g.connectors = links;

    let mut col_of = Vec::with_capacity(doc.columns.len());
    for cd in &doc.columns {
        let t = &mut g.attributes;
        let i = if cd.locked { t.get_or_insert_locked_column(&cd.name) } else { t.get_or_insert_column(&cd.name) };
        t.set_column_hidden(i, cd.hidden)?;
        if let Some(d) = cd.display {
            t.set_display_params(i, d)?;
        }
        col_of.push(i);
    }
    for rd in doc.rows {
        if rd.values.len() != col_of.len() {
            return Err(SalaError::Format(format!("row {} has {} values", rd.key, rd.values.len())));
        }
        let mut row = g.attributes.row_mut(rd.key).ok_or(SalaError::UnknownNode(rd.key))?;
        for (c, v) in col_of.iter().zip(rd.values) {
            row.set_value(*c, v.unwrap_or(f64::NAN));
        }
        row.set_selected(rd.selected);
        if let Some(k) = rd.layer_key {
            row.add_layer_key(k);
        }
    }

    for ld in doc.layers {
        let index = match g.layers.layer_index(&ld.name) {
            Some(i) => i,
            None => g.layers.add_layer(&ld.name)?,
        };
        if index != ld.index {
            return Err(SalaError::Format(format!("layer '{}' stored at index {}", ld.name, ld.index)));
        }
        g.layers.set_layer_visible(index, ld.visible)?;
    }
    let displayed = match doc.displayed_attribute {
        Some(c) => Some(*col_of.get(c).ok_or_else(|| SalaError::UnknownColumn(format!("#{}", c)))?),
        None => None,
    };
    g.set_displayed_attribute(displayed)?;
    Ok(g)
}
