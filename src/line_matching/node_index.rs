use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::registry::Line;
use crate::railnet_formats::{CargoLabel, StationId, Stop};

/// Position of a line inside the registry.
pub type LineId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// One directional traversal of a registered line. A line owns its stops
/// once; the forward and backward traversals are two views on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraversalKey {
    pub line: LineId,
    pub direction: Direction,
}

impl TraversalKey {
    pub fn forward(line: LineId) -> Self {
        Self {
            line,
            direction: Direction::Forward,
        }
    }

    pub fn backward(line: LineId) -> Self {
        Self {
            line,
            direction: Direction::Backward,
        }
    }
}

impl fmt::Display for TraversalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        };
        write!(f, "line {} ({})", self.line, dir)
    }
}

/// Stops of a line in traversal order.
pub fn traversal_stops(stops: &[Stop], direction: Direction) -> Vec<Stop> {
    match direction {
        Direction::Forward => stops.to_vec(),
        Direction::Backward => stops.iter().rev().copied().collect(),
    }
}

/// Every traversal visiting one station, with the ordinal of the visit
/// (counting halting stops only). Kept in insertion order: when a traversal
/// visits a station twice, its first inserted ordinal is its zero point.
#[derive(Debug, Clone, Default)]
pub struct StationVisits {
    visits: Vec<(TraversalKey, usize)>,
}

impl StationVisits {
    pub fn ordinals_of(&self, key: TraversalKey) -> impl Iterator<Item = usize> + '_ {
        self.visits
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, ordinal)| *ordinal)
    }

    /// Each visiting traversal once, paired with its first inserted ordinal.
    pub fn first_visits(&self) -> Vec<(TraversalKey, usize)> {
        let mut seen = BTreeSet::new();
        self.visits
            .iter()
            .filter(|(key, _)| seen.insert(*key))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalInfo {
    /// All stops of the loop, halting or not. Offsets between ordinals are
    /// taken modulo this count.
    pub length: usize,
    pub cargo: BTreeSet<CargoLabel>,
}

/// Per-station lookup of which registered traversals stop there, and at
/// which position of their cycle. Grows with the registry, never shrinks.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    stations: BTreeMap<StationId, StationVisits>,
    traversals: AHashMap<TraversalKey, TraversalInfo>,
}

impl NodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the forward traversal of `line` and, if it already has a
    /// reverse identity, its backward traversal.
    pub fn register(&mut self, line_id: LineId, line: &Line) {
        self.register_traversal(TraversalKey::forward(line_id), line);
        if line.reverse_id.is_some() {
            self.register_traversal(TraversalKey::backward(line_id), line);
        }
    }

    pub fn register_traversal(&mut self, key: TraversalKey, line: &Line) {
        if self.traversals.contains_key(&key) {
            return;
        }

        let stops = traversal_stops(&line.stops, key.direction);
        let mut nth = 0;
        for stop in stops.iter().filter(|stop| stop.halts) {
            self.insert_visit(stop.station, key, nth);
            nth += 1;
        }

        self.insert_traversal(
            key,
            TraversalInfo {
                length: stops.len(),
                cargo: line.directional_cargo(key.direction),
            },
        );
    }

    pub fn sync_cargo(&mut self, key: TraversalKey, cargo: BTreeSet<CargoLabel>) {
        if let Some(info) = self.traversals.get_mut(&key) {
            info.cargo = cargo;
        }
    }

    pub(crate) fn insert_visit(&mut self, station: StationId, key: TraversalKey, ordinal: usize) {
        self.stations
            .entry(station)
            .or_default()
            .visits
            .push((key, ordinal));
    }

    pub(crate) fn insert_traversal(&mut self, key: TraversalKey, info: TraversalInfo) {
        self.traversals.insert(key, info);
    }

    pub fn visits_at(&self, station: StationId) -> Option<&StationVisits> {
        self.stations.get(&station)
    }

    pub fn traversal(&self, key: TraversalKey) -> Option<&TraversalInfo> {
        self.traversals.get(&key)
    }

    pub fn contains(&self, key: TraversalKey) -> bool {
        self.traversals.contains_key(&key)
    }

    pub fn traversal_count(&self) -> usize {
        self.traversals.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}
