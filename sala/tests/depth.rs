use sala::algorithms::depth::{CostModel, DepthColumns, DepthOptions, Radius};
use sala::attributes::table::UNSET;
use sala::comm::CancelFlag;
use sala::geometry::line::Line;
use sala::geometry::point::Point2;
use sala::model::MapKind;
use sala::{SalaError, ShapeGraph};
use std::time::Duration;

fn path(lengths: &[f64]) -> ShapeGraph {
    let mut g = ShapeGraph::new(MapKind::Point);
    for (i, &len) in lengths.iter().enumerate() {
        g.add_point(Point2::new(i as f64, 0.0), len).unwrap();
    }
    for i in 1..lengths.len() as u32 {
        g.connect(i - 1, i).unwrap();
    }
    g
}

fn column(g: &ShapeGraph, col: usize) -> Vec<f64> { g.attributes().column_values(col).unwrap() }

fn opts(model: CostModel) -> DepthOptions { DepthOptions { model, ..DepthOptions::default() } }

fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-9, "got {:?}, want {:?}", got, want);
    }
}

#[test]
fn topological_path() {
    let mut g = path(&[1.0; 4]);
    let cols = g.analyse_depth(&opts(CostModel::Topological), None).unwrap();
    assert_close(&column(&g, cols.mean_depth), &[2.0, 4.0 / 3.0, 4.0 / 3.0, 2.0]);
    assert_close(&column(&g, cols.total_depth), &[6.0, 4.0, 4.0, 6.0]);
    assert_close(&column(&g, cols.total_nodes), &[4.0; 4]);
    assert_close(&column(&g, cols.total_length), &[4.0; 4]);
    assert_close(&column(&g, cols.weighted_mean_depth), &[2.0, 4.0 / 3.0, 4.0 / 3.0, 2.0]);
    let choice = cols.choice.unwrap();
    assert_close(&column(&g, choice), &[3.0, 5.0, 5.0, 3.0]);
    assert_close(&column(&g, cols.weighted_choice.unwrap()), &[3.0, 5.0, 5.0, 3.0]);
    assert_eq!(g.displayed_attribute(), Some(choice));
    assert_eq!(g.attributes().column(choice).unwrap().name(), "Topological Choice");
}

#[test]
fn metric_path_measures_from_midpoints() {
    let mut g = path(&[2.0, 1.0, 1.0, 2.0]);
    let cols = g.analyse_depth(&opts(CostModel::Metric), None).unwrap();
    let total = column(&g, cols.total_depth);
    assert_close(&total[..2], &[8.0, 5.0]);
    let mean = column(&g, cols.mean_depth);
    assert_close(&mean[..2], &[8.0 / 3.0, 5.0 / 3.0]);
    // weighted by length: (1 * 1.5 + 1 * 2.5 + 2 * 4) / (6 - 2)
    assert_close(&column(&g, cols.weighted_mean_depth)[..1], &[3.0]);
}

#[test]
fn radius_limits_reach() {
    let mut g = path(&[1.0; 4]);
    let o = DepthOptions { radius: Radius::Limited(2.0), ..opts(CostModel::Metric) };
    let cols = g.analyse_depth(&o, None).unwrap();
    assert_eq!(g.attributes().column(cols.mean_depth).unwrap().name(), "Metric Mean Depth R2.00 metric");
    let nodes = column(&g, cols.total_nodes);
    assert_eq!(nodes[0], 2.0);
    assert_eq!(nodes[1], 3.0);
    assert_close(&column(&g, cols.mean_depth)[..1], &[1.0]);
}

#[test]
fn invalid_radius_rejected_before_any_write() {
    let mut g = path(&[1.0; 3]);
    let ncols = g.attributes().num_columns();
    let o = DepthOptions { radius: Radius::Limited(-1.0), ..opts(CostModel::Metric) };
    assert!(matches!(g.analyse_depth(&o, None), Err(SalaError::InvalidRadius(_))));
    assert_eq!(g.attributes().num_columns(), ncols);
}

#[test]
fn angular_counts_turns() {
    let mut g = ShapeGraph::new(MapKind::Segment);
    let p = Point2::new;
    g.add_segment(Line::new(p(0.0, 0.0), p(1.0, 0.0)), 0).unwrap();
    g.add_segment(Line::new(p(1.0, 0.0), p(2.0, 0.0)), 0).unwrap();
    g.add_segment(Line::new(p(1.0, 0.0), p(1.0, 1.0)), 1).unwrap();
    assert_eq!(g.make_segment_connections(1e-9), 3);
    let cols = g.analyse_depth(&opts(CostModel::Angular), None).unwrap();
    let mean = column(&g, cols.mean_depth);
    let total = column(&g, cols.total_depth);
    // straight on costs nothing, the right-angle turn costs 1
    assert!((mean[0] - 0.5).abs() < 1e-9, "{:?}", mean);
    assert!((total[0] - 1.0).abs() < 1e-9, "{:?}", total);
    assert_eq!(column(&g, cols.total_nodes), vec![3.0; 3]);
}

#[test]
fn isolated_node_has_undefined_mean() {
    let mut g = path(&[1.0]);
    let cols = g.analyse_depth(&opts(CostModel::Topological), None).unwrap();
    assert!(column(&g, cols.mean_depth)[0].is_nan());
    assert!(column(&g, cols.weighted_mean_depth)[0].is_nan());
    assert_eq!(column(&g, cols.total_nodes), vec![1.0]);
    assert_eq!(column(&g, cols.total_depth), vec![0.0]);
}

#[test]
fn selection_only_skips_choice() {
    let mut g = path(&[1.0; 4]);
    g.set_selected(0, true).unwrap();
    let o = DepthOptions { selection_only: true, ..opts(CostModel::Topological) };
    let cols = g.analyse_depth(&o, None).unwrap();
    assert!(cols.choice.is_none() && cols.weighted_choice.is_none());
    assert!(g.attributes().column_index("Topological Choice").is_none());
    let mean = column(&g, cols.mean_depth);
    assert_eq!(mean[0], 2.0);
    assert_eq!(&mean[1..], &[UNSET; 3]);
    assert_eq!(g.displayed_attribute(), Some(cols.mean_depth));
}

#[test]
fn weighting_column_scales_choice_and_mean() {
    let mut g = path(&[1.0; 4]);
    let rent = g.attributes_mut().get_or_insert_column("Rent");
    for (k, w) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
        g.attributes_mut().row_mut(k as u32).unwrap().set_value(rent, w);
    }
    let o = DepthOptions { weighting_column: Some("Rent".to_string()), ..opts(CostModel::Topological) };
    let cols = g.analyse_depth(&o, None).unwrap();
    let wc = cols.weighted_choice.unwrap();
    assert_eq!(g.attributes().column(wc).unwrap().name(), "Topological Choice [Rent Wgt]");
    // pairs through node 1: (0,1) (0,2) (0,3) (1,2) (1,3)
    assert_close(&column(&g, wc)[1..2], &[2.0 + 3.0 + 4.0 + 6.0 + 8.0]);
    assert_close(&column(&g, cols.weighted_mean_depth)[..1], &[20.0 / 9.0]);
    assert_close(&column(&g, cols.total_length)[..1], &[10.0]);

    let o = DepthOptions { weighting_column: Some("Height".to_string()), ..opts(CostModel::Topological) };
    assert!(matches!(g.analyse_depth(&o, None), Err(SalaError::UnknownColumn(_))));
}

#[test]
fn rerun_resets_columns() {
    let mut g = path(&[1.0; 4]);
    let first = g.analyse_depth(&opts(CostModel::Topological), None).unwrap();
    let ncols = g.attributes().num_columns();
    let second = g.analyse_depth(&opts(CostModel::Topological), None).unwrap();
    assert_eq!(g.attributes().num_columns(), ncols);
    assert_eq!(first.mean_depth, second.mean_depth);
    // choice accumulates per run, not across runs
    assert_close(&column(&g, second.choice.unwrap()), &[3.0, 5.0, 5.0, 3.0]);
}

#[test]
fn locked_output_column_refused() {
    let mut g = path(&[1.0; 3]);
    g.attributes_mut().get_or_insert_locked_column("Topological Mean Depth");
    let r = g.analyse_depth(&opts(CostModel::Topological), None);
    assert!(matches!(r, Err(SalaError::LockedColumn(_))));
}

#[test]
fn cancelled_run_keeps_finished_rows() {
    let mut g = path(&[1.0; 4]);
    let flag = CancelFlag::new();
    flag.cancel();
    let o = DepthOptions { poll_interval: Duration::ZERO, ..opts(CostModel::Topological) };
    let r = g.analyse_depth(&o, Some(&flag));
    assert!(matches!(r, Err(SalaError::Cancelled)));
    assert_eq!(flag.total_records(), 4);
    assert_eq!(flag.current_record(), 0);

    let t = g.attributes();
    let mean = t.column_values(t.column_index("Topological Mean Depth").unwrap()).unwrap();
    assert_eq!(mean[0], 2.0);
    assert_eq!(&mean[1..], &[UNSET; 3]);
    let choice = t.column_values(t.column_index("Topological Choice").unwrap()).unwrap();
    assert_eq!(choice, vec![UNSET; 4]);
}

#[test]
fn radii_each_get_their_own_columns() {
    let mut g = path(&[1.0; 4]);
    let radii = Radius::parse_list("n, 2").unwrap();
    let runs: Vec<DepthColumns> = g.run_radii(&opts(CostModel::Metric), &radii, None).unwrap();
    assert_eq!(runs.len(), 2);
    let name = |c: usize| g.attributes().column(c).unwrap().name().to_string();
    assert_eq!(name(runs[0].mean_depth), "Metric Mean Depth R2.00 metric");
    assert_eq!(name(runs[1].mean_depth), "Metric Mean Depth");
    assert_eq!(column(&g, runs[0].total_nodes)[0], 2.0);
    assert_eq!(column(&g, runs[1].total_nodes)[0], 4.0);
}

#[test]
fn close_radii_keep_separate_columns() {
    let mut g = path(&[1.0; 4]);
    let radii = Radius::parse_list("2, 2.6").unwrap();
    let runs = g.run_radii(&opts(CostModel::Metric), &radii, None).unwrap();
    assert_ne!(runs[0].total_nodes, runs[1].total_nodes);
    assert_ne!(runs[0].mean_depth, runs[1].mean_depth);
    let name = |c: usize| g.attributes().column(c).unwrap().name().to_string();
    assert_eq!(name(runs[0].total_nodes), "Metric Total Nodes R2.00 metric");
    assert_eq!(name(runs[1].total_nodes), "Metric Total Nodes R2.60 metric");
    // both runs survive; node 2 sits 2.5 from node 0's midpoint
    assert_eq!(column(&g, runs[0].total_nodes)[0], 2.0);
    assert_eq!(column(&g, runs[1].total_nodes)[0], 3.0);
}

#[test]
fn radii_sharing_a_name_are_rejected_up_front() {
    let mut g = path(&[1.0; 4]);
    let columns_before = g.attributes().num_columns();
    let radii = [Radius::Limited(2.001), Radius::Limited(2.004)];
    let err = g.run_radii(&opts(CostModel::Metric), &radii, None).unwrap_err();
    assert!(matches!(err, SalaError::InvalidRadius(_)));
    assert_eq!(g.attributes().num_columns(), columns_before);
}

#[test]
fn isolated_nodes_stay_out_of_display_ranges() {
    let mut g = ShapeGraph::new(MapKind::Point);
    for i in 0..4 {
        g.add_point(Point2::new(i as f64, 10.0), 1.0).unwrap();
    }
    for i in 0..5 {
        g.add_point(Point2::new(i as f64, 0.0), 1.0).unwrap();
    }
    for k in 5..9 {
        g.connect(k - 1, k).unwrap();
    }
    let cols = g.analyse_depth(&opts(CostModel::Topological), None).unwrap();
    let mean = column(&g, cols.mean_depth);
    assert!(mean[..4].iter().all(|m| m.is_nan()));
    assert_close(&mean[4..], &[2.5, 1.75, 1.5, 1.75, 2.5]);

    g.set_displayed_attribute(Some(cols.mean_depth)).unwrap();
    let view = g.view();
    let in_range: Vec<u32> = view.keys_in_range(0.0, 1.9).collect();
    assert_eq!(in_range, vec![6, 5, 7]);
    let order: Vec<u32> = view.index().iter().map(|it| it.key).collect();
    assert_eq!(order, vec![6, 5, 7, 4, 8, 0, 1, 2, 3]);
}

// Lengths across six orders of magnitude squeeze most steps into bin 0.
#[cfg_attr(not(feature = "long-stress"), ignore)]
#[test]
fn metric_depth_exact_on_skewed_lengths() {
    let lengths: Vec<f64> = (0..2000).map(|i| if i % 7 == 3 { 1e3 } else { 1e-3 * (1 + i % 5) as f64 }).collect();
    let mut g = path(&lengths);
    let cols = g.analyse_depth(&opts(CostModel::Metric), None).unwrap();

    let mut dist = lengths[0] * 0.5;
    let mut want = 0.0;
    for &len in &lengths[1..] {
        dist += len;
        want += dist - len * 0.5;
    }
    let total = column(&g, cols.total_depth);
    assert!((total[0] - want).abs() <= 1e-9 * want, "{} vs {}", total[0], want);
    assert!(column(&g, cols.total_nodes).iter().all(|&n| n == lengths.len() as f64));
    assert!(column(&g, cols.mean_depth).iter().all(|m| m.is_finite()));
}
