use proptest::prelude::*;
use sala::algorithms::polygon::{BoundaryPolicy, Polygon};
use sala::algorithms::region_tree::RegionTree;
use sala::geometry::line::Line;
use sala::geometry::point::Point2;
use sala::geometry::region::Region;
use sala::SalaError;

fn p(x: f64, y: f64) -> Point2 { Point2::new(x, y) }

fn l_shape() -> Polygon {
    let pts = [p(0.0, 0.0), p(4.0, 0.0), p(4.0, 1.0), p(1.0, 1.0), p(1.0, 4.0), p(0.0, 4.0)];
    match Polygon::from_points(&pts) {
        Ok(poly) => poly,
        Err(e) => panic!("{}", e),
    }
}

#[test]
fn concave_containment() {
    let poly = l_shape();
    assert_eq!(poly.len(), 6);
    assert!(poly.contains(p(0.5, 3.0)).unwrap());
    assert!(poly.contains(p(3.0, 0.5)).unwrap());
    // in the notch: inside the bounding box but outside the ring
    assert!(!poly.contains(p(3.0, 3.0)).unwrap());
    assert!(!poly.contains(p(5.0, 0.5)).unwrap());
    assert!(!poly.contains(p(-1.0, 2.0)).unwrap());
}

#[test]
fn boundary_points_follow_policy() {
    let square = Polygon::from_points(&[p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)]).unwrap();
    assert!(square.contains(p(0.5, 1.5)).unwrap());
    assert!(matches!(square.contains(p(2.0, 1.0)), Err(SalaError::OnBoundary)));
    assert!(square.contains_with(p(2.0, 1.0), BoundaryPolicy::Inside).unwrap());
    assert!(!square.contains_with(p(2.0, 1.0), BoundaryPolicy::Outside).unwrap());
    assert!(square.contains_with(p(0.5, 1.5), BoundaryPolicy::Outside).unwrap());
    assert!(!square.contains_with(p(3.0, 1.0), BoundaryPolicy::Inside).unwrap());
}

#[test]
fn empty_polygon_contains_nothing() {
    let poly = Polygon::new();
    assert!(poly.is_empty());
    assert!(!poly.contains(p(0.0, 0.0)).unwrap());
    assert!(poly.bounding_box().is_null());
}

#[test]
fn polygons_touching_at_a_corner_intersect() {
    let a = Polygon::from_points(&[p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]).unwrap();
    let b = Polygon::from_points(&[p(1.0, 1.0), p(2.0, 1.0), p(2.0, 2.0), p(1.0, 2.0)]).unwrap();
    let c = Polygon::from_points(&[p(5.0, 5.0), p(6.0, 5.0), p(6.0, 6.0)]).unwrap();
    assert!(a.intersects(&b));
    assert!(!a.crosses(&b, 0.0));
    assert!(!a.intersects(&c));
    assert!(!a.crosses(&c, 0.0));

    let d = Polygon::from_points(&[p(0.5, 0.5), p(1.5, 0.5), p(1.5, 1.5), p(0.5, 1.5)]).unwrap();
    assert!(a.intersects(&d));
    assert!(a.crosses(&d, 0.0));
}

fn line_strategy() -> impl Strategy<Value = Line> {
    (-1000i32..1000, -1000i32..1000, -50i32..50, -50i32..50).prop_map(|(x, y, dx, dy)| {
        let a = p(f64::from(x) * 0.5, f64::from(y) * 0.5);
        Line::new(a, p(a.x + f64::from(dx), a.y + f64::from(dy)))
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 1_000, .. ProptestConfig::default() })]
    #[test]
    fn branches_enclose_their_children(lines in prop::collection::vec(line_strategy(), 1..200)) {
        let mut tree = RegionTree::new();
        let mut expected = Region::null();
        for l in &lines {
            tree.insert(*l);
            expected = expected.union(l.region());
            prop_assert!(tree.unions_consistent());
        }
        prop_assert_eq!(tree.len(), lines.len());
        prop_assert_eq!(tree.region(), expected);
        let stored: Vec<Line> = tree.lines().copied().collect();
        prop_assert_eq!(stored, lines);
    }
}
