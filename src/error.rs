use js_sys::{Object, Reflect};
use sala::SalaError;
use wasm_bindgen::prelude::*;

fn set_kv(obj: &Object, k: &str, v: &JsValue) { let _ = Reflect::set(obj, &JsValue::from_str(k), v); }

fn new_obj() -> Object { Object::new() }

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

#[inline]
pub fn non_finite(param: &str) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("non_finite", format!("parameter '{}' must be finite", param), Some(d.into()))
}

#[inline]
pub fn out_of_range(param: &str, min: f64, max: f64, got: f64) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    set_kv(&d, "min", &JsValue::from_f64(min));
    set_kv(&d, "max", &JsValue::from_f64(max));
    set_kv(&d, "got", &JsValue::from_f64(got));
    err("out_of_range", format!("parameter '{}' out of range", param), Some(d.into()))
}

#[inline]
pub fn invalid_id(kind: &str, id: u32) -> JsValue {
    let d = new_obj();
    set_kv(&d, "kind", &JsValue::from_str(kind));
    set_kv(&d, "id", &JsValue::from_f64(id as f64));
    err("invalid_id", format!("invalid {} id", kind), Some(d.into()))
}

fn named(code: &'static str, key: &str, name: &str, msg: String) -> JsValue {
    let d = new_obj(); set_kv(&d, key, &JsValue::from_str(name));
    err(code, msg, Some(d.into()))
}

/// Typed error object for a core failure.
pub fn from_sala(e: &SalaError) -> JsValue {
    let msg = e.to_string();
    match e {
        SalaError::NonFinite(p) => non_finite(p),
        SalaError::UnknownNode(id) => invalid_id("node", *id),
        SalaError::DuplicateRow(id) => invalid_id("row", *id),
        SalaError::UnknownLayer(i) => invalid_id("layer", *i as u32),
        SalaError::InvalidSpacing(s) => out_of_range("spacing", 0.0, f64::INFINITY, *s),
        SalaError::DuplicateLayer(n) => named("duplicate_layer", "name", n, msg),
        SalaError::LockedColumn(n) => named("locked_column", "column", n, msg),
        SalaError::UnknownColumn(n) => named("unknown_column", "column", n, msg),
        SalaError::DuplicateColumn(n) => named("duplicate_column", "column", n, msg),
        SalaError::InvalidRadius(r) => named("invalid_radius", "radius", r, msg),
        SalaError::OutOfLayers => err("out_of_layers", msg, None),
        SalaError::OnBoundary => err("on_boundary", msg, None),
        SalaError::Cancelled => err("cancelled", msg, None),
        SalaError::Io(_) | SalaError::Format(_) => err("format", msg, None),
    }
}

pub fn res<T>(r: sala::Result<T>, f: impl FnOnce(T) -> JsValue) -> JsValue {
    match r {
        Ok(v) => ok(f(v)),
        Err(e) => from_sala(&e),
    }
}
