#![cfg(target_arch = "wasm32")]

use js_sys::{Float64Array, Reflect, Uint32Array};
use sala_wasm::SpatialMap;
use serde::Deserialize;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn value(v: &JsValue) -> JsValue {
    assert_eq!(Reflect::get(v, &JsValue::from_str("ok")).unwrap().as_bool(), Some(true), "{:?}", v);
    Reflect::get(v, &JsValue::from_str("value")).unwrap()
}

fn field(v: &JsValue, k: &str) -> JsValue { Reflect::get(v, &JsValue::from_str(k)).unwrap() }

fn street_cross() -> SpatialMap {
    let mut m = SpatialMap::new("axial").unwrap();
    value(&m.add_line_res(0.0, 0.0, 10.0, 0.0));
    value(&m.add_line_res(5.0, -5.0, 5.0, 5.0));
    m
}

#[wasm_bindgen_test]
fn axial_lines_and_geometry() {
    let mut m = street_cross();
    assert_eq!(m.kind(), "axial");
    assert_eq!(m.make_axial_connections(), 1);
    let geo = m.get_geometry();
    assert_eq!(field(&geo, "stride").as_f64(), Some(4.0));
    let coords = Float64Array::new(&field(&geo, "coords"));
    assert_eq!(coords.to_vec(), vec![0.0, 0.0, 10.0, 0.0, 5.0, -5.0, 5.0, 5.0]);
    let links = value(&m.get_links_res(0));
    assert_eq!(Uint32Array::new(&field(&links, "nodes")).to_vec(), vec![1]);
}

#[wasm_bindgen_test]
fn segment_map_depth_run() {
    let axial = street_cross();
    let mut segs = axial.segment_map(0.0).unwrap();
    assert_eq!(segs.kind(), "segment");
    assert_eq!(segs.node_count(), 4);

    let cols = value(&segs.analyse_depth_res("topological", "n", false, None));
    assert_eq!(field(&cols, "mean_depth").as_string().as_deref(), Some("Topological Mean Depth"));
    assert_eq!(segs.displayed_attribute().as_string().as_deref(), Some("Topological Choice"));
    let mean = Float64Array::new(&value(&segs.column_values_res("Topological Mean Depth"))).to_vec();
    assert!(mean.iter().all(|m| (m - 2.0 / 3.0).abs() < 1e-12));

    let runs = value(&segs.run_radii_res("metric", "n,3", None));
    assert_eq!(js_sys::Array::from(&runs).length(), 2);
    let names: Vec<String> = serde_wasm_bindgen::from_value(segs.column_names()).unwrap();
    assert!(names.iter().any(|n| n == "Metric Mean Depth R3.00 metric"));
}

#[wasm_bindgen_test]
fn visibility_graph_over_open_room() {
    let empty = Float64Array::new_with_length(0);
    let mut m = SpatialMap::visibility_graph(0.0, 0.0, 2.0, 2.0, 1.0, &empty, &empty, None).unwrap();
    assert_eq!(m.kind(), "point");
    assert_eq!(m.node_count(), 9);
    let conn = Float64Array::new(&value(&m.column_values_res("Connectivity"))).to_vec();
    assert_eq!(conn, vec![8.0; 9]);
    value(&m.analyse_depth_res("metric", "n", false, None));
    assert_eq!(m.displayed_values().length(), 9);
    assert_eq!(Uint32Array::new(&m.paint_order()).length(), 9);
}

#[wasm_bindgen_test]
fn selection_layers_and_persistence() {
    let mut m = street_cross();
    value(&m.set_selected_res(1, true));
    assert_eq!(Uint32Array::new(&m.selected_keys()).to_vec(), vec![1]);
    let layer = value(&m.push_selection_to_layer_res("main street")).as_f64();
    assert_eq!(layer, Some(1.0));
    value(&m.set_layer_visible_res(1, false));
    assert!(m.is_node_visible(0) && !m.is_node_visible(1));
    let names: Vec<String> = serde_wasm_bindgen::from_value(m.layer_names()).unwrap();
    assert_eq!(names, vec!["Everything".to_string(), "main street".to_string()]);

    let bytes = js_sys::Uint8Array::new(&value(&m.write_attributes_res())).to_vec();
    let mut other = street_cross();
    value(&other.read_attributes_res(&bytes));
    assert!(!other.is_node_visible(1));

    #[derive(Deserialize)]
    struct Doc {
        kind: String,
        nodes: Vec<serde_json::Value>,
    }
    let j = m.to_json();
    let doc: Doc = serde_wasm_bindgen::from_value(j.clone()).unwrap();
    assert_eq!(doc.kind, "axial");
    assert_eq!(doc.nodes.len(), 2);
    let mut back = SpatialMap::new("point").unwrap();
    value(&back.from_json_res(j));
    assert_eq!(back.kind(), "axial");
    assert_eq!(back.node_count(), 2);
}
