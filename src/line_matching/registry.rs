use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use super::RouteMatchError;
use super::classification::{Classification, ClassifyOptions, Relation, RouteQuery, classify};
use super::node_index::{Direction, LineId, NodeIndex, TraversalKey, traversal_stops};
use crate::railnet_formats::{CandidateRoute, CargoInfo, CargoLabel, StationId, Stop, UnitId};

/// A registered physical route. Its stops never change once registered;
/// later merges only touch the cargo map, the reverse identity and the
/// cycle flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub primary_id: UnitId,
    pub reverse_id: Option<UnitId>,
    pub stops: Vec<Stop>,
    pub cargo: BTreeMap<CargoLabel, CargoInfo>,
    pub is_cycle: bool,
    pub is_bicycle: bool,
    next_slice: u32,
}

impl Line {
    pub fn from_candidate(candidate: &CandidateRoute) -> Self {
        let is_cycle =
            candidate.stops.len() > 2 && candidate.stops.iter().map(|s| s.station).all_unique();

        let mut line = Self {
            primary_id: candidate.primary_id,
            reverse_id: candidate.reverse_id,
            stops: candidate.stops.clone(),
            cargo: BTreeMap::new(),
            is_cycle,
            is_bicycle: false,
            next_slice: 1,
        };
        let slice = line.allocate_slice();
        for &label in &candidate.forward_cargo {
            line.cargo.entry(label).or_insert(CargoInfo {
                forward: false,
                backward: false,
                slice,
            });
            line.mark(label, Direction::Forward);
        }
        for &label in &candidate.backward_cargo {
            line.cargo.entry(label).or_insert(CargoInfo {
                forward: false,
                backward: false,
                slice,
            });
            line.mark(label, Direction::Backward);
        }
        line
    }

    pub fn next_slice(&self) -> u32 {
        self.next_slice
    }

    fn allocate_slice(&mut self) -> u32 {
        let slice = self.next_slice;
        self.next_slice += 1;
        slice
    }

    fn mark(&mut self, label: CargoLabel, direction: Direction) {
        if let Some(info) = self.cargo.get_mut(&label) {
            match direction {
                Direction::Forward => info.forward = true,
                Direction::Backward => info.backward = true,
            }
        }
    }

    /// Folds cargo of one merged vehicle in. New labels get `slice`, labels
    /// already present get `slice` added to their current tag.
    fn fold_cargo(&mut self, labels: &BTreeSet<CargoLabel>, slice: u32, direction: Direction) {
        for &label in labels {
            self.cargo
                .entry(label)
                .and_modify(|info| info.slice += slice)
                .or_insert(CargoInfo {
                    forward: false,
                    backward: false,
                    slice,
                });
            self.mark(label, direction);
        }
    }

    pub fn identity(&self, direction: Direction) -> Option<UnitId> {
        match direction {
            Direction::Forward => Some(self.primary_id),
            Direction::Backward => self.reverse_id,
        }
    }

    /// Cargo labels carried when running in `direction`.
    pub fn directional_cargo(&self, direction: Direction) -> BTreeSet<CargoLabel> {
        self.cargo
            .iter()
            .filter(|(_, info)| match direction {
                Direction::Forward => info.forward,
                Direction::Backward => info.backward,
            })
            .map(|(label, _)| *label)
            .collect()
    }

    pub fn halting_stations(&self, direction: Direction) -> Vec<StationId> {
        traversal_stops(&self.stops, direction)
            .into_iter()
            .filter(|stop| stop.halts)
            .map(|stop| stop.station)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The route extractor could not resolve a path between two orders.
    PathNotFound,
    NoStops,
    NoHaltingStops,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Registered(LineId),
    MergedForward { line: LineId, slice: u32 },
    MergedReverse { line: LineId, slice: u32 },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineFilter {
    pub hide_short: bool,
    pub hide_express: bool,
}

/// All accepted lines plus the index over their traversals.
#[derive(Debug, Clone, Default)]
pub struct LineRegistry {
    lines: Vec<Line>,
    index: NodeIndex,
}

impl LineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(id)
    }

    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Folds `candidate` into the line it duplicates, or registers it as a
    /// new line.
    pub fn submit(&mut self, candidate: &CandidateRoute) -> Result<MergeOutcome, RouteMatchError> {
        let unit = candidate.primary_id;
        if !candidate.path_found {
            warn!("Could not compute order list for train #{}, leaving it out", unit);
            return Ok(MergeOutcome::Skipped(SkipReason::PathNotFound));
        }
        if candidate.stops.is_empty() {
            warn!("Order list of train #{} has no stations, leaving it out", unit);
            return Ok(MergeOutcome::Skipped(SkipReason::NoStops));
        }

        let query = RouteQuery::from_candidate(candidate);
        if query.stations.is_empty() {
            warn!("Train #{} never stops, leaving it out", unit);
            return Ok(MergeOutcome::Skipped(SkipReason::NoHaltingStops));
        }

        let forward = classify(
            &query,
            &self.index,
            ClassifyOptions {
                ignore_cargo: true,
                reverse_traversal: false,
            },
        )?;
        let reverse = classify(
            &query,
            &self.index,
            ClassifyOptions {
                ignore_cargo: true,
                reverse_traversal: true,
            },
        )?;

        // direction of the candidate relative to the matched line
        let matches: BTreeSet<(LineId, Direction)> = forward
            .same_matches()
            .map(|key| (key.line, key.direction))
            .chain(
                reverse
                    .same_matches()
                    .map(|key| (key.line, key.direction.opposite())),
            )
            .collect();

        let matched_lines: Vec<LineId> = matches.iter().map(|(line, _)| *line).dedup().collect();
        match matched_lines.as_slice() {
            [] => Ok(MergeOutcome::Registered(self.register(candidate))),
            [line_id] => {
                // a route that is its own reverse matches both ways; it is the
                // same traversal, so fold it forward
                if matches.contains(&(*line_id, Direction::Forward)) {
                    self.merge_forward(*line_id, candidate)
                } else {
                    self.merge_reverse(*line_id, candidate)
                }
            }
            [first, second, ..] => Err(RouteMatchError::AmbiguousSameMatch {
                candidate: unit,
                first: self.lines[*first].primary_id,
                second: self.lines[*second].primary_id,
            }),
        }
    }

    fn register(&mut self, candidate: &CandidateRoute) -> LineId {
        let line = Line::from_candidate(candidate);
        let id = self.lines.len();
        self.index.register(id, &line);
        debug!(
            "Train #{} registered as line {} ({} stops, cycle: {})",
            line.primary_id,
            id,
            line.stops.len(),
            line.is_cycle
        );
        self.lines.push(line);
        id
    }

    fn merge_forward(
        &mut self,
        line_id: LineId,
        candidate: &CandidateRoute,
    ) -> Result<MergeOutcome, RouteMatchError> {
        let line = &mut self.lines[line_id];
        let slice = line.allocate_slice();
        line.fold_cargo(&candidate.forward_cargo, slice, Direction::Forward);
        line.fold_cargo(&candidate.backward_cargo, slice, Direction::Backward);
        debug!(
            "Train #{} runs the same route as train #{}, merged as slice {}",
            candidate.primary_id, line.primary_id, slice
        );

        if let Some(reverse_unit) = candidate.reverse_id {
            self.bind_reverse(line_id, reverse_unit)?;
        }
        self.sync_index(line_id);
        Ok(MergeOutcome::MergedForward {
            line: line_id,
            slice,
        })
    }

    fn merge_reverse(
        &mut self,
        line_id: LineId,
        candidate: &CandidateRoute,
    ) -> Result<MergeOutcome, RouteMatchError> {
        self.bind_reverse(line_id, candidate.primary_id)?;

        let line = &mut self.lines[line_id];
        let slice = line.allocate_slice();
        line.fold_cargo(&candidate.forward_cargo, slice, Direction::Backward);
        line.fold_cargo(&candidate.backward_cargo, slice, Direction::Forward);
        debug!(
            "Train #{} runs the route of train #{} in reverse, merged as slice {}",
            candidate.primary_id, line.primary_id, slice
        );

        self.sync_index(line_id);
        Ok(MergeOutcome::MergedReverse {
            line: line_id,
            slice,
        })
    }

    fn bind_reverse(&mut self, line_id: LineId, unit: UnitId) -> Result<(), RouteMatchError> {
        let line = &mut self.lines[line_id];
        match line.reverse_id {
            Some(existing) if existing != unit => {
                return Err(RouteMatchError::ConflictingReverse {
                    line: line.primary_id,
                    existing,
                    candidate: unit,
                });
            }
            _ => line.reverse_id = Some(unit),
        }
        line.is_cycle = false;
        line.is_bicycle = true;

        self.index
            .register_traversal(TraversalKey::backward(line_id), &self.lines[line_id]);
        Ok(())
    }

    fn sync_index(&mut self, line_id: LineId) {
        let line = &self.lines[line_id];
        for direction in [Direction::Forward, Direction::Backward] {
            self.index.sync_cargo(
                TraversalKey {
                    line: line_id,
                    direction,
                },
                line.directional_cargo(direction),
            );
        }
    }

    /// Relation of a registered line's forward traversal to every other
    /// line, cargo respected.
    pub fn classify_line(&self, line_id: LineId) -> Result<Classification, RouteMatchError> {
        let Some(line) = self.lines.get(line_id) else {
            return Ok(Classification::default());
        };
        let cargo = line.directional_cargo(Direction::Forward);
        let query = RouteQuery {
            stations: line.halting_stations(Direction::Forward),
            length: line.stops.len(),
            cargo: &cargo,
            exclude_line: Some(line_id),
        };
        classify(&query, &self.index, ClassifyOptions::default())
    }

    /// Lines left after hiding short and/or express variants. The registry
    /// itself is not modified.
    pub fn visible_lines(&self, filter: LineFilter) -> Result<Vec<LineId>, RouteMatchError> {
        let mut visible = Vec::with_capacity(self.lines.len());
        for (line_id, line) in self.lines.iter().enumerate() {
            let relation = self.classify_line(line_id)?.aggregate;
            let is_express = relation.contains(Relation::EXPRESS);
            let is_short = relation.contains(Relation::SHORT);

            if (is_express && filter.hide_express) || (is_short && filter.hide_short) {
                let reason = match (is_express, is_short) {
                    (true, true) => "express + short",
                    (true, false) => "express",
                    _ => "short",
                };
                info!("Erasing train: {}, reason: {}", line.primary_id, reason);
                continue;
            }
            visible.push(line_id);
        }
        Ok(visible)
    }
}
