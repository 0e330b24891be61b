use sala::model::MapKind;
use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

#[wasm_bindgen]
pub struct SpatialMap { pub(crate) inner: sala::ShapeGraph }

impl SpatialMap {
    pub fn rs_new(kind: MapKind) -> SpatialMap { SpatialMap { inner: sala::ShapeGraph::new(kind) } }
    pub fn rs_inner(&self) -> &sala::ShapeGraph { &self.inner }
}
