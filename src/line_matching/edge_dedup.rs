//! Turns a line's closed walk into as few drawable edge runs as possible.
//!
//! An edge whose reverse also occurs in the walk is drawn once, without an
//! arrow head, at its first occurrence. All other edges are drawn directed.
//! Consecutive edges of the same kind are chained into one run so the
//! renderer can emit a single styled statement per run.

use super::RouteMatchError;
use super::registry::Line;
use crate::railnet_formats::{StationId, Stop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Drawn directed; its reverse never occurs.
    Unique,
    /// Drawn undirected; its reverse occurs later in the walk.
    DuplicateFirst,
    /// Not drawn; its reverse was already drawn.
    DuplicateFurther,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRun {
    pub undirected: bool,
    pub stops: Vec<Stop>,
}

/// The walk of `stops` with the first stop repeated at the end.
pub fn closed_walk(stops: &[Stop]) -> Vec<Stop> {
    let mut walk = stops.to_vec();
    if let Some(&first) = stops.first() {
        walk.push(first);
    }
    walk
}

/// Kind of every edge `walk[i - 1] -> walk[i]`, in walk order.
pub fn classify_edges(walk: &[Stop], is_bicycle: bool) -> Vec<EdgeKind> {
    (1..walk.len())
        .map(|i| {
            if is_bicycle {
                return EdgeKind::DuplicateFirst;
            }
            let (prev, cur) = (walk[i - 1], walk[i]);
            if (0..i).any(|j| walk[j] == cur && walk[j + 1] == prev) {
                EdgeKind::DuplicateFurther
            } else if (i + 1..walk.len()).any(|j| walk[j - 1] == cur && walk[j] == prev) {
                EdgeKind::DuplicateFirst
            } else {
                EdgeKind::Unique
            }
        })
        .collect()
}

/// Chains the drawable edges of the closed walk over `stops` into runs.
pub fn plan_edges(stops: &[Stop], is_bicycle: bool) -> Vec<EdgeRun> {
    let walk = closed_walk(stops);
    let kinds = classify_edges(&walk, is_bicycle);

    let mut runs = Vec::new();
    let mut current: Option<EdgeRun> = None;
    // nothing pending
    let mut last = EdgeKind::DuplicateFurther;

    for (i, kind) in kinds.into_iter().enumerate() {
        let (prev, cur) = (walk[i], walk[i + 1]);

        if kind != last {
            if let Some(run) = current.take() {
                runs.push(run);
            }
            if kind != EdgeKind::DuplicateFurther {
                current = Some(EdgeRun {
                    undirected: kind == EdgeKind::DuplicateFirst,
                    stops: vec![prev],
                });
            }
        }
        if let Some(run) = current.as_mut() {
            run.stops.push(cur);
        }
        last = kind;
    }

    runs.extend(current);
    runs
}

/// Edge runs of a registered line, after checking that every stop is a
/// known station.
pub fn plan_line_edges(
    line: &Line,
    has_station: impl Fn(StationId) -> bool,
) -> Result<Vec<EdgeRun>, RouteMatchError> {
    if let Some(stop) = line.stops.iter().find(|stop| !has_station(stop.station)) {
        return Err(RouteMatchError::UnknownStation {
            station: stop.station,
            unit: line.primary_id,
        });
    }
    Ok(plan_edges(&line.stops, line.is_bicycle))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineColor {
    pub hue: f32,
    pub value: f32,
}

impl LineColor {
    /// Values below one half are hard to read, so only the upper half of
    /// the range is used.
    pub fn brightness(&self) -> f32 {
        0.5 + self.value / 2.0
    }
}

/// Walks hue and value in large prime steps so neighbouring lines get
/// visibly different colors.
#[derive(Debug, Clone)]
pub struct ColorCycle {
    hue: f32,
    value: f32,
    hue_step: f32,
    value_step: f32,
}

impl ColorCycle {
    const HUE_PRIME: f32 = 7919.0;
    const VALUE_PRIME: f32 = 5417.0;

    pub fn new(line_count: usize) -> Self {
        let (hue_step, value_step) = if line_count == 0 {
            (0.0, 0.0)
        } else {
            let n = line_count as f32;
            (Self::HUE_PRIME / n, Self::VALUE_PRIME / n)
        };
        Self {
            hue: 0.0,
            value: 0.0,
            hue_step,
            value_step,
        }
    }

    pub fn advance(&mut self) -> LineColor {
        self.hue = (self.hue + self.hue_step) % 1.0;
        self.value = (self.value + self.value_step) % 1.0;
        LineColor {
            hue: self.hue,
            value: self.value,
        }
    }
}
