//! Superset detection between cyclic routes.
//!
//! A query route is walked station by station. Every registered traversal
//! that stops at the first station of the query starts as a superset
//! candidate; it survives a step if it reaches the next station further
//! along its own cycle. Positions are measured as offsets from where the
//! traversal met the first station, modulo its total stop count, so the
//! starting stop of either route does not matter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use log::trace;

use super::RouteMatchError;
use super::node_index::{LineId, NodeIndex, StationVisits, TraversalKey};
use crate::railnet_formats::{CandidateRoute, CargoLabel, StationId};

/// Bit set of relations between a query and a registered traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Relation(u8);

impl Relation {
    pub const NONE: Relation = Relation(0);
    /// Superset, but the query skips some of its stations and no
    /// turnaround explains the gap.
    pub const EXPRESS: Relation = Relation(1);
    pub const SHORT: Relation = Relation(2);
    pub const SAME: Relation = Relation(8);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Relation) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Relation {
    type Output = Relation;

    fn bitor(self, rhs: Relation) -> Relation {
        Relation(self.0 | rhs.0)
    }
}

impl BitOrAssign for Relation {
    fn bitor_assign(&mut self, rhs: Relation) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        let names = [
            (Relation::EXPRESS, "express"),
            (Relation::SHORT, "short"),
            (Relation::SAME, "same"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifyOptions {
    /// Skip the cargo inclusion checks, comparing topology only.
    pub ignore_cargo: bool,
    /// Match the query against registered traversals run backwards.
    pub reverse_traversal: bool,
}

/// A route to classify: its halting stations in walk order.
#[derive(Debug, Clone)]
pub struct RouteQuery<'a> {
    pub stations: Vec<StationId>,
    /// Total stop count, halting or not.
    pub length: usize,
    pub cargo: &'a BTreeSet<CargoLabel>,
    /// Traversals of this line are never considered as supersets.
    pub exclude_line: Option<LineId>,
}

impl<'a> RouteQuery<'a> {
    pub fn from_candidate(candidate: &'a CandidateRoute) -> Self {
        Self {
            stations: candidate.halting_stations(),
            length: candidate.stops.len(),
            cargo: &candidate.forward_cargo,
            exclude_line: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub aggregate: Relation,
    pub per_traversal: BTreeMap<TraversalKey, Relation>,
}

impl Classification {
    pub fn relation_to(&self, key: TraversalKey) -> Relation {
        self.per_traversal.get(&key).copied().unwrap_or_default()
    }

    pub fn same_matches(&self) -> impl Iterator<Item = TraversalKey> + '_ {
        self.per_traversal
            .iter()
            .filter(|(_, rel)| rel.contains(Relation::SAME))
            .map(|(key, _)| *key)
    }
}

#[derive(Debug, Clone)]
struct SupersetCursor {
    key: TraversalKey,
    /// Ordinal of this traversal at the first station of the query.
    zero: usize,
    /// Offset reached so far; never decreases.
    cursor: usize,
    can_be_short: bool,
    /// Total stop count of the traversal; the modulus of every offset.
    length: usize,
}

impl SupersetCursor {
    fn offset(&self, ordinal: usize, mirrored: bool) -> usize {
        let l = self.length;
        if mirrored {
            (l + self.zero - ordinal % l) % l
        } else {
            (l + ordinal % l - self.zero) % l
        }
    }

    /// Advances across the step `prev -> cur`. Returns false once this
    /// traversal cannot be a superset any more.
    fn follow(
        &mut self,
        prev: Option<&StationVisits>,
        cur: &StationVisits,
        mirrored: bool,
    ) -> bool {
        let l = self.length;
        let next = cur
            .ordinals_of(self.key)
            .map(|ordinal| match self.offset(ordinal, mirrored) {
                0 => l,
                offset => offset,
            })
            .filter(|offset| *offset >= self.cursor)
            .min();

        let Some(next) = next else {
            return false;
        };

        if self.cursor + 1 < next {
            // stations skipped: fine only if the superset turned around at
            // the previous station and came back to it just before `next`
            let slope = prev
                .into_iter()
                .flat_map(|visits| visits.ordinals_of(self.key))
                .map(|ordinal| self.offset(ordinal, mirrored))
                .any(|offset| self.cursor < offset && offset == next - 1);
            if !slope {
                self.can_be_short = false;
            }
        }

        self.cursor = next;
        true
    }
}

/// Computes how `query` relates to every traversal in `index`.
///
/// Only structural faults of the index are errors; an unmatched query is an
/// empty classification.
pub fn classify(
    query: &RouteQuery<'_>,
    index: &NodeIndex,
    options: ClassifyOptions,
) -> Result<Classification, RouteMatchError> {
    let mirrored = options.reverse_traversal;

    let Some(&first) = query.stations.first() else {
        return Ok(Classification::default());
    };
    let Some(first_visits) = index.visits_at(first) else {
        return Ok(Classification::default());
    };

    let mut supersets = Vec::new();
    for (key, ordinal) in first_visits.first_visits() {
        if query.exclude_line == Some(key.line) {
            continue;
        }
        let info = index
            .traversal(key)
            .ok_or(RouteMatchError::MissingTraversal(key))?;
        if !options.ignore_cargo && !info.cargo.is_superset(query.cargo) {
            continue;
        }

        let seed = SupersetCursor {
            key,
            zero: ordinal,
            cursor: 0,
            can_be_short: true,
            length: info.length,
        };
        let zero_offset = if ordinal < seed.length {
            seed.offset(ordinal, mirrored)
        } else {
            ordinal
        };
        if ordinal >= seed.length || zero_offset != 0 {
            return Err(RouteMatchError::ZeroOffsetViolation {
                key,
                ordinal,
                offset: zero_offset,
                length: seed.length,
            });
        }
        supersets.push(seed);
    }

    for step in query.stations.windows(2) {
        let (prev, cur) = (step[0], step[1]);
        let Some(cur_visits) = index.visits_at(cur) else {
            return Ok(Classification::default());
        };
        let prev_visits = index.visits_at(prev);
        supersets.retain_mut(|s| s.follow(prev_visits, cur_visits, mirrored));
    }

    // close the loop: last station back to the first
    if let Some(&last) = query.stations.last() {
        let prev_visits = index.visits_at(last);
        supersets.retain_mut(|s| s.follow(prev_visits, first_visits, mirrored));
    }

    let mut result = Classification::default();
    for s in &supersets {
        let mut relation = if s.can_be_short {
            Relation::SHORT
        } else {
            Relation::EXPRESS
        };
        if s.length == query.length {
            let cargo_matches = options.ignore_cargo
                || index
                    .traversal(s.key)
                    .is_some_and(|info| query.cargo.is_superset(&info.cargo));
            if cargo_matches {
                relation |= Relation::SAME;
            }
        }
        trace!("superset {} -> {}", s.key, relation);
        result.per_traversal.insert(s.key, relation);
        result.aggregate |= relation;
    }

    Ok(result)
}
