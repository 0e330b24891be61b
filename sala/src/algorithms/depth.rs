use crate::comm::{check_cancel, Communicator, PollTimer};
use crate::error::{Result, SalaError};
use crate::geometry::tolerance::{bin_offset, DEPTH_BINS};
use crate::model::Connector;
use crate::ShapeGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostModel {
    Topological,
    Metric,
    Angular,
}

impl CostModel {
    fn bins(self) -> usize {
        match self {
            CostModel::Topological => 2,
            CostModel::Metric | CostModel::Angular => DEPTH_BINS,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            CostModel::Topological => "Topological",
            CostModel::Metric => "Metric",
            CostModel::Angular => "Angular",
        }
    }
}

impl FromStr for CostModel {
    type Err = SalaError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topological" => Ok(CostModel::Topological),
            "metric" => Ok(CostModel::Metric),
            "angular" => Ok(CostModel::Angular),
            _ => Err(SalaError::Format(format!("unknown cost model '{}'", s))),
        }
    }
}

/// Search radius. Metric and topological runs compare it against metric
/// distance, angular runs against accumulated turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Radius {
    Unlimited,
    Limited(f64),
}

impl Radius {
    /// "n" or "N" is unlimited; anything else must be a positive finite number.
    pub fn parse(s: &str) -> Result<Radius> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("n") {
            return Ok(Radius::Unlimited);
        }
        let r: f64 = t.parse().map_err(|_| SalaError::InvalidRadius(s.to_string()))?;
        Radius::limited(r).map_err(|_| SalaError::InvalidRadius(s.to_string()))
    }

    pub fn limited(r: f64) -> Result<Radius> {
        if r.is_finite() && r > 0.0 {
            Ok(Radius::Limited(r))
        } else {
            Err(SalaError::InvalidRadius(r.to_string()))
        }
    }

    /// Comma separated list, e.g. "n, 400,1200". Duplicates collapse;
    /// limited radii sort ascending with unlimited last.
    pub fn parse_list(s: &str) -> Result<Vec<Radius>> {
        let mut limited = Vec::new();
        let mut unlimited = false;
        for part in s.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            match Radius::parse(part)? {
                Radius::Unlimited => unlimited = true,
                Radius::Limited(r) => limited.push(r),
            }
        }
        limited.sort_by(f64::total_cmp);
        limited.dedup();
        let mut out: Vec<Radius> = limited.into_iter().map(Radius::Limited).collect();
        if unlimited {
            out.push(Radius::Unlimited);
        }
        if out.is_empty() {
            return Err(SalaError::InvalidRadius(s.to_string()));
        }
        Ok(out)
    }

    #[inline]
    fn admits(self, d: f64) -> bool {
        match self {
            Radius::Unlimited => true,
            Radius::Limited(r) => d < r,
        }
    }

    fn suffix(self, model: CostModel) -> String {
        match (self, model) {
            (Radius::Unlimited, _) => String::new(),
            (Radius::Limited(r), CostModel::Angular) => format!(" R{}", radius_text(r)),
            (Radius::Limited(r), _) => format!(" R{} metric", radius_text(r)),
        }
    }
}

// Whole units above 100, four places below 0.1, two places otherwise.
fn radius_text(r: f64) -> String {
    if r > 100.0 {
        format!("{:.0}", r)
    } else if r < 0.1 {
        format!("{:.4}", r)
    } else {
        format!("{:.2}", r)
    }
}

impl FromStr for Radius {
    type Err = SalaError;
    fn from_str(s: &str) -> Result<Self> { Radius::parse(s) }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Radius::Unlimited => f.write_str("n"),
            Radius::Limited(r) => write!(f, "{}", r),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DepthOptions {
    pub model: CostModel,
    pub radius: Radius,
    /// Only selected nodes act as sources; choice is not computed.
    pub selection_only: bool,
    /// Replaces node length as the weight in weighted outputs.
    pub weighting_column: Option<String>,
    pub poll_interval: Duration,
}

impl Default for DepthOptions {
    fn default() -> Self {
        DepthOptions {
            model: CostModel::Topological,
            radius: Radius::Unlimited,
            selection_only: false,
            weighting_column: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnNames {
    pub choice: String,
    pub weighted_choice: String,
    pub mean_depth: String,
    pub weighted_mean_depth: String,
    pub total_depth: String,
    pub total_nodes: String,
    pub total_length: String,
}

impl ColumnNames {
    pub fn new(model: CostModel, radius: Radius, weighting: Option<&str>) -> Self {
        let p = model.prefix();
        let r = radius.suffix(model);
        let w = match weighting {
            Some(name) => format!("[{} Wgt]", name),
            None => "[SLW]".to_string(),
        };
        ColumnNames {
            choice: format!("{} Choice{}", p, r),
            weighted_choice: format!("{} Choice {}{}", p, w, r),
            mean_depth: format!("{} Mean Depth{}", p, r),
            weighted_mean_depth: format!("{} Mean Depth {}{}", p, w, r),
            total_depth: format!("{} Total Depth{}", p, r),
            total_nodes: format!("{} Total Nodes{}", p, r),
            total_length: format!("{} Total Length{}", p, r),
        }
    }
}

/// Column indices written by one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DepthColumns {
    pub choice: Option<usize>,
    pub weighted_choice: Option<usize>,
    pub mean_depth: usize,
    pub weighted_mean_depth: usize,
    pub total_depth: usize,
    pub total_nodes: usize,
    pub total_length: usize,
}

#[derive(Clone, Copy, Debug)]
struct Audit {
    dist: f64,
    previous: Option<u32>,
    done: bool,
}

const FRESH: Audit = Audit { dist: 0.0, previous: None, done: false };

/// Per-source totals, already reduced to the written values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceResult {
    pub mean_depth: f64,
    pub weighted_mean_depth: f64,
    pub total_depth: f64,
    pub total_nodes: f64,
    pub total_length: f64,
}

/// Inputs for one traversal, borrowed out of the graph so the attribute table
/// stays free for writes.
struct Search<'g> {
    model: CostModel,
    radius: Radius,
    choice: bool,
    lengths: &'g [f64],
    weights: &'g [f64],
    axial_refs: &'g [u32],
    connectors: &'g [Connector],
    max_length: f64,
    max_turn: f64,
}

struct Scratch {
    seen: Vec<u32>,
    audit: Vec<Audit>,
    bins: Vec<Vec<u32>>,
    choice: Vec<f64>,
    weighted_choice: Vec<f64>,
}

impl Scratch {
    fn new(n: usize, bins: usize) -> Self {
        Scratch {
            seen: vec![u32::MAX; n],
            audit: vec![FRESH; n],
            bins: vec![Vec::new(); bins],
            choice: vec![0.0; n],
            weighted_choice: vec![0.0; n],
        }
    }
}

impl Search<'_> {
    fn traverse(&self, src: u32, s: &mut Scratch) -> SourceResult {
        s.seen.fill(u32::MAX);
        s.audit.fill(FRESH);
        let nbins = s.bins.len();
        let srci = src as usize;
        let root_len = self.lengths[srci];
        let root_w = self.weights[srci];

        s.audit[srci].dist = if self.model == CostModel::Angular { 0.0 } else { root_len * 0.5 };
        let mut bin = 0usize;
        s.bins[bin].push(src);
        let mut open = 1usize;
        let mut segdepth: u32 = 0;

        let mut total = 0.0;
        let mut wtotal = 0.0;
        let mut total_seg_depth = 0.0;
        let mut total_dist_depth = 0.0;
        let mut wtotal_depth = 0.0;

        while open > 0 {
            while s.bins[bin].is_empty() {
                bin = (bin + 1) % nbins;
                segdepth = segdepth.wrapping_add(1);
            }
            let Some(here) = s.bins[bin].pop() else { continue };
            open -= 1;
            let hi = here as usize;
            if s.audit[hi].done {
                continue;
            }
            s.audit[hi].done = true;

            let len = self.lengths[hi];
            let w = self.weights[hi];
            let dist = s.audit[hi].dist;
            total_seg_depth += segdepth as f64;
            match self.model {
                CostModel::Topological => wtotal_depth += w * segdepth as f64,
                CostModel::Metric => {
                    total_dist_depth += dist - len * 0.5;
                    wtotal_depth += w * (dist - len * 0.5);
                }
                CostModel::Angular => {
                    total_dist_depth += dist;
                    wtotal_depth += w * dist;
                }
            }
            wtotal += w;
            total += 1.0;

            for (c, turn) in self.connectors[hi].neighbours() {
                let ci = c as usize;
                if s.seen[ci] <= segdepth || c == src {
                    continue;
                }
                let seen_already = s.seen[ci] != u32::MAX;
                let step = if self.model == CostModel::Angular { turn } else { self.lengths[ci] };
                let reach = dist + step;
                s.audit[ci] = Audit { dist: reach, previous: Some(here), done: false };
                s.seen[ci] = segdepth;

                if self.radius.admits(reach) {
                    open += 1;
                    match self.model {
                        CostModel::Topological => {
                            if self.axial_refs[hi] == self.axial_refs[ci] {
                                s.bins[bin].push(c);
                            } else {
                                s.bins[(bin + 1) % nbins].push(c);
                                s.seen[ci] = segdepth + 1;
                            }
                        }
                        CostModel::Metric => {
                            s.bins[(bin + bin_offset(self.lengths[ci], self.max_length)) % nbins].push(c)
                        }
                        CostModel::Angular => s.bins[(bin + bin_offset(turn, self.max_turn)) % nbins].push(c),
                    }
                }

                // Each unordered pair is counted once, from its lower key.
                if self.choice && c > src && !seen_already {
                    let wc = root_w * self.weights[ci];
                    let mut at = Some(c);
                    while let Some(node) = at {
                        let ni = node as usize;
                        s.choice[ni] += 1.0;
                        s.weighted_choice[ni] += wc;
                        at = s.audit[ni].previous;
                    }
                }
            }
        }

        let total_depth = match self.model {
            CostModel::Topological => total_seg_depth,
            CostModel::Metric | CostModel::Angular => total_dist_depth,
        };
        SourceResult {
            mean_depth: total_depth / (total - 1.0),
            weighted_mean_depth: wtotal_depth / (wtotal - root_w),
            total_depth,
            total_nodes: total,
            total_length: wtotal,
        }
    }
}

/// Depth (and, over all sources, choice) from every source node. Results go
/// into the graph's attribute table; the displayed attribute becomes choice,
/// or mean depth for selection-only runs. A cancelled run keeps the rows it
/// already wrote.
pub fn analyse_depth(g: &mut ShapeGraph, opts: &DepthOptions, comm: Option<&dyn Communicator>) -> Result<DepthColumns> {
    if let Radius::Limited(r) = opts.radius {
        Radius::limited(r)?;
    }
    let n = g.connectors.len();
    let weights: Vec<f64> = match &opts.weighting_column {
        Some(name) => {
            let col = g.attributes.column_index(name).ok_or_else(|| SalaError::UnknownColumn(name.clone()))?;
            (0..n as u32)
                .map(|k| g.attributes.row(k).map_or(0.0, |r| r.value(col).max(0.0)))
                .collect()
        }
        None => g.lengths.clone(),
    };
    let sources: Vec<u32> = (0..n as u32)
        .filter(|&k| !opts.selection_only || g.attributes.row(k).map_or(false, |r| r.is_selected()))
        .collect();

    let names = ColumnNames::new(opts.model, opts.radius, opts.weighting_column.as_deref());
    let ShapeGraph { lengths, axial_refs, connectors, attributes, displayed_attribute, .. } = g;
    let lengths: &[f64] = lengths;
    let axial_refs: &[u32] = axial_refs;
    let connectors: &[Connector] = connectors;

    let with_choice = !opts.selection_only;
    let (choice_col, wchoice_col) = if with_choice {
        (
            Some(attributes.insert_or_reset_column(&names.choice)?),
            Some(attributes.insert_or_reset_column(&names.weighted_choice)?),
        )
    } else {
        (None, None)
    };
    let cols = DepthColumns {
        choice: choice_col,
        weighted_choice: wchoice_col,
        mean_depth: attributes.insert_or_reset_column(&names.mean_depth)?,
        weighted_mean_depth: attributes.insert_or_reset_column(&names.weighted_mean_depth)?,
        total_depth: attributes.insert_or_reset_column(&names.total_depth)?,
        total_nodes: attributes.insert_or_reset_column(&names.total_nodes)?,
        total_length: attributes.insert_or_reset_column(&names.total_length)?,
    };

    let search = Search {
        model: opts.model,
        radius: opts.radius,
        choice: with_choice,
        lengths,
        weights: &weights,
        axial_refs,
        connectors,
        max_length: lengths.iter().copied().fold(0.0, f64::max),
        max_turn: connectors.iter().map(|c| c.max_weight()).fold(0.0, f64::max),
    };
    tracing::debug!(
        model = ?opts.model,
        radius = %opts.radius,
        nodes = n,
        sources = sources.len(),
        "depth analysis start"
    );

    if let Some(c) = comm {
        c.set_total_records(sources.len());
    }
    let mut timer = PollTimer::new(opts.poll_interval);
    let mut scratch = Scratch::new(n, opts.model.bins());
    for (done, &src) in sources.iter().enumerate() {
        let res = search.traverse(src, &mut scratch);
        if let Some(mut row) = attributes.row_mut(src) {
            row.set_value(cols.mean_depth, res.mean_depth)
                .set_value(cols.weighted_mean_depth, res.weighted_mean_depth)
                .set_value(cols.total_depth, res.total_depth)
                .set_value(cols.total_nodes, res.total_nodes)
                .set_value(cols.total_length, res.total_length);
        }
        check_cancel(comm, &mut timer)?;
        if let Some(c) = comm {
            c.set_current_record(done + 1);
        }
    }

    if let (Some(cc), Some(wc)) = (cols.choice, cols.weighted_choice) {
        for k in 0..n {
            if let Some(mut row) = attributes.row_mut(k as u32) {
                row.set_value(cc, scratch.choice[k]).set_value(wc, scratch.weighted_choice[k]);
            }
        }
    }
    *displayed_attribute = Some(cols.choice.unwrap_or(cols.mean_depth));
    tracing::debug!(columns = ?cols, "depth analysis done");
    Ok(cols)
}

/// One run per radius, in the given order. Stops at the first error.
/// Radii whose column names coincide are rejected before any run.
pub fn analyse_depth_radii(
    g: &mut ShapeGraph,
    opts: &DepthOptions,
    radii: &[Radius],
    comm: Option<&dyn Communicator>,
) -> Result<Vec<DepthColumns>> {
    let mut seen = std::collections::HashSet::with_capacity(radii.len());
    for r in radii {
        if !seen.insert(r.suffix(opts.model)) {
            return Err(SalaError::InvalidRadius(format!("{} repeats a column name", r)));
        }
    }
    if let Some(c) = comm {
        c.set_total_steps(radii.len());
    }
    let mut out = Vec::with_capacity(radii.len());
    for (step, &radius) in radii.iter().enumerate() {
        if let Some(c) = comm {
            c.set_current_step(step + 1);
        }
        let o = DepthOptions { radius, ..opts.clone() };
        out.push(analyse_depth(g, &o, comm)?);
    }
    Ok(out)
}
