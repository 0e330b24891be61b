use crate::error::Result;
use crate::geometry::intersect::intersect_line;
use crate::geometry::line::{intersection_point, Line};
use crate::geometry::point::Point2;
use crate::geometry::tolerance::{EPS_ENDPOINT, EPS_LINE};
use crate::model::{MapKind, Shape};
use crate::ShapeGraph;

#[derive(Clone, Copy, Debug)]
struct Cut {
    at: f64, // distance from the line's start
    point: Point2,
    crossing: bool,
}

/// Split every axial line at its crossings with the others and join the
/// pieces at shared ends. Each segment keeps its parent line's key as its
/// axial reference. End pieces shorter than `stub_ratio` of their parent are
/// dropped; pass 0 to keep everything.
pub fn segment_map_from_axial(axial: &ShapeGraph, stub_ratio: f64) -> Result<ShapeGraph> {
    let lines: Vec<(u32, Line)> = axial
        .shapes
        .iter()
        .enumerate()
        .filter_map(|(k, s)| s.as_line().map(|l| (k as u32, *l)))
        .collect();

    let mut cuts: Vec<Vec<Point2>> = vec![Vec::new(); lines.len()];
    // sweep on x so only lines with overlapping x extents are tested
    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by(|&a, &b| lines[a].1.ax().total_cmp(&lines[b].1.ax()));
    for (oi, &i) in order.iter().enumerate() {
        let a = &lines[i].1;
        for &j in &order[oi + 1..] {
            let b = &lines[j].1;
            if b.ax() > a.bx() {
                break;
            }
            if a.region().intersects(b.region(), EPS_LINE) && intersect_line(a, b, EPS_LINE) {
                let p = intersection_point(a, b, EPS_LINE);
                cuts[i].push(p);
                cuts[j].push(p);
            }
        }
    }

    let mut out = ShapeGraph::new(MapKind::Segment);
    for ((key, line), line_cuts) in lines.iter().zip(&cuts) {
        for piece in split_line(line, line_cuts, stub_ratio) {
            out.add_segment(piece, *key)?;
        }
    }
    let joined = out.make_segment_connections(EPS_ENDPOINT);
    tracing::debug!(axial = lines.len(), segments = out.node_count(), joined, "segment map");
    Ok(out)
}

fn split_line(line: &Line, crossings: &[Point2], stub_ratio: f64) -> Vec<Line> {
    let start = line.t_start();
    let len = line.length();
    if len <= 0.0 {
        return Vec::new();
    }
    let dir = line.vector() / len;
    let tol = EPS_ENDPOINT * len.max(1.0);

    let mut marks = Vec::with_capacity(crossings.len() + 2);
    marks.push(Cut { at: 0.0, point: start, crossing: false });
    marks.push(Cut { at: len, point: line.t_end(), crossing: false });
    marks.extend(crossings.iter().map(|p| Cut { at: (*p - start).dot(dir), point: *p, crossing: true }));
    marks.sort_by(|a, b| a.at.total_cmp(&b.at));

    // collapse coincident marks, preferring the crossing point so both lines
    // through it share the exact same coordinates
    let mut merged: Vec<Cut> = Vec::with_capacity(marks.len());
    for m in marks {
        match merged.last_mut() {
            Some(last) if (m.at - last.at).abs() <= tol => {
                if m.crossing && !last.crossing {
                    *last = Cut { at: last.at, ..m };
                }
            }
            _ => merged.push(m),
        }
    }

    let mut pieces: Vec<Line> = merged
        .windows(2)
        .filter(|w| w[1].at - w[0].at > tol)
        .map(|w| Line::new(w[0].point, w[1].point))
        .collect();
    if stub_ratio > 0.0 && pieces.len() > 1 {
        let min = stub_ratio * len;
        if pieces.last().map_or(false, |p| p.length() < min) {
            pieces.pop();
        }
        if pieces.len() > 1 && pieces[0].length() < min {
            pieces.remove(0);
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(ax: f64, ay: f64, bx: f64, by: f64) -> Line { Line::new(Point2::new(ax, ay), Point2::new(bx, by)) }

    #[test]
    fn split_at_crossings_in_order() {
        let line = l(0.0, 0.0, 10.0, 0.0);
        let pieces = split_line(&line, &[Point2::new(7.0, 0.0), Point2::new(3.0, 0.0)], 0.0);
        let lens: Vec<f64> = pieces.iter().map(Line::length).collect();
        assert_eq!(lens, vec![3.0, 4.0, 3.0]);
    }

    #[test]
    fn crossing_at_end_adds_no_piece() {
        let line = l(0.0, 0.0, 10.0, 0.0);
        let pieces = split_line(&line, &[Point2::new(10.0, 0.0), Point2::new(0.0, 0.0)], 0.0);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn stubs_trimmed() {
        let line = l(0.0, 0.0, 10.0, 0.0);
        let pieces = split_line(&line, &[Point2::new(0.5, 0.0), Point2::new(9.0, 0.0)], 0.2);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].length(), 8.5);
    }
}
