// Centralized tolerances shared by the intersection predicates and analysis passes

pub const EPS_LINE: f64 = 0.0;            // default for touch/no-touch/distinguish predicates
pub const EPS_SIEVE: f64 = 1e-10;         // block widening and gap collapse (tanified units)
pub const EPS_CELL: f64 = 1e-10;          // cell region border and test_block slack, scaled by spacing
pub const EPS_ENDPOINT: f64 = 1e-9;       // shared-endpoint match for segment connections
pub const EPS_DIST: f64 = 1e-9;           // degenerate segment guard in point/segment distance

// Bucket queue resolution for metric and angular traversal
pub const DEPTH_BINS: usize = 512;
pub const DEPTH_BIN_SCALE: f64 = 511.0;

#[inline] pub fn near_zero(x: f64, eps: f64) -> bool { x.abs() <= eps }
#[inline] pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool { (a - b).abs() <= eps }
#[inline] pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 { x.max(lo).min(hi) }

/// Bucket offset for a hop of `weight` relative to the largest weight in the graph.
/// A zero or non-finite maximum maps every hop to offset 0.
#[inline]
pub fn bin_offset(weight: f64, max_weight: f64) -> usize {
    if !(max_weight > 0.0) || !max_weight.is_finite() { return 0; }
    let off = (0.5 + DEPTH_BIN_SCALE * weight / max_weight).floor();
    if off.is_finite() && off > 0.0 { (off as usize) % DEPTH_BINS } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_offset_scales_to_longest() {
        assert_eq!(bin_offset(10.0, 10.0), 511);
        assert_eq!(bin_offset(5.0, 10.0), 256);
        assert_eq!(bin_offset(0.0, 10.0), 0);
        assert_eq!(bin_offset(1e-6, 1e6), 0);
        assert_eq!(bin_offset(3.0, 0.0), 0);
    }
}
