#[cfg(feature = "bench_depth")]
use sala::algorithms::depth::{CostModel, DepthOptions, Radius};
#[cfg(feature = "bench_depth")]
use sala::algorithms::segmentation::segment_map_from_axial;
#[cfg(feature = "bench_depth")]
use sala::geometry::line::Line;
#[cfg(feature = "bench_depth")]
use sala::geometry::point::Point2;
#[cfg(feature = "bench_depth")]
use sala::model::MapKind;
#[cfg(feature = "bench_depth")]
use sala::ShapeGraph;
#[cfg(feature = "bench_depth")]
use std::time::Instant;

#[cfg(not(feature = "bench_depth"))]
fn main() {
    panic!("depth_bench requires --features bench_depth");
}

// Street grid of n horizontal and n vertical axial lines, 10 units apart.
#[cfg(feature = "bench_depth")]
fn build_street_grid(n: usize) -> ShapeGraph {
    let mut g = ShapeGraph::new(MapKind::Axial);
    let span = (n as f64 - 1.0) * 10.0 + 5.0;
    for i in 0..n {
        let c = i as f64 * 10.0;
        let _ = g.add_line(Line::new(Point2::new(-5.0, c), Point2::new(span, c)));
        let _ = g.add_line(Line::new(Point2::new(c, -5.0), Point2::new(c, span)));
    }
    g.make_axial_connections();
    g
}

#[cfg(feature = "bench_depth")]
fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut n = 20usize;
    let mut model = CostModel::Metric;
    let mut radius = Radius::Unlimited;
    for a in &args[1..] {
        if let Some(val) = a.strip_prefix("--n=") {
            if let Ok(v) = val.parse() {
                n = v;
            }
        } else if let Some(val) = a.strip_prefix("--model=") {
            if let Ok(v) = val.parse() {
                model = v;
            }
        } else if let Some(val) = a.strip_prefix("--radius=") {
            if let Ok(v) = val.parse() {
                radius = v;
            }
        }
    }

    let axial = build_street_grid(n);
    let t0 = Instant::now();
    let mut segs = match segment_map_from_axial(&axial, 0.0) {
        Ok(g) => g,
        Err(e) => panic!("segmentation failed: {}", e),
    };
    let seg_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let opts = DepthOptions { model, radius, ..DepthOptions::default() };
    let t1 = Instant::now();
    if let Err(e) = segs.analyse_depth(&opts, None) {
        panic!("analysis failed: {}", e);
    }
    let depth_ms = t1.elapsed().as_secs_f64() * 1000.0;

    println!(
        "grid={}x{} segments={} model={:?} radius={} seg_ms={:.3} depth_ms={:.3}",
        n,
        n,
        segs.node_count(),
        model,
        radius,
        seg_ms,
        depth_ms
    );
}
