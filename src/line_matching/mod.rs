//! Deduplication and classification of cyclic train lines.
//!
//! Candidates are submitted one at a time to a [`LineRegistry`]. Each one is
//! matched against the lines accepted so far through the [`NodeIndex`] and is
//! either folded into an identical line (same stops, either direction) or
//! registered as a new line. Afterwards lines that are only short or express
//! variants of a fuller line can be filtered out of a rendering view, and
//! [`edge_dedup`] turns the remaining lines into drawable edge runs.
//!
//! Results depend on the submission order; the same input in the same order
//! always yields the same registry.

pub mod classification;
pub mod edge_dedup;
pub mod node_index;
pub mod registry;

#[cfg(test)]
mod test_registry;

pub use classification::{Classification, ClassifyOptions, Relation, RouteQuery, classify};
pub use edge_dedup::{ColorCycle, EdgeKind, EdgeRun, LineColor, plan_edges, plan_line_edges};
pub use node_index::{Direction, LineId, NodeIndex, TraversalKey};
pub use registry::{Line, LineFilter, LineRegistry, MergeOutcome, SkipReason};

use crate::railnet_formats::{StationId, UnitId};
use thiserror::Error;

/// Faults that abort the whole run. They are deterministic consequences of
/// the input (or of a logic defect), never transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteMatchError {
    #[error(
        "internal error: zero offset of {key} is {offset} (ordinal {ordinal}, length {length})"
    )]
    ZeroOffsetViolation {
        key: TraversalKey,
        ordinal: usize,
        offset: usize,
        length: usize,
    },
    #[error("internal error: {0} is visited at a station but unknown to the node index")]
    MissingTraversal(TraversalKey),
    #[error("train {candidate} runs the same route as both train {first} and train {second}")]
    AmbiguousSameMatch {
        candidate: UnitId,
        first: UnitId,
        second: UnitId,
    },
    #[error(
        "train {line} is already run in reverse by train {existing}, cannot also bind train {candidate}"
    )]
    ConflictingReverse {
        line: UnitId,
        existing: UnitId,
        candidate: UnitId,
    },
    #[error("could not find station id {station} (order list of train {unit})")]
    UnknownStation { station: StationId, unit: UnitId },
}
