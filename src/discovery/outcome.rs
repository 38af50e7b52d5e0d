//! # Classification of a stage call.
//!
//! Every stage result goes through [`classify`] so the resolver dispatches on
//! one shape instead of inspecting each call's errors separately:
//! ```text
//! Ok(Batch{items, failures: []})  ─► Outcome::Success(items)
//! Ok(Batch{items, failures: [..]}) ─► Outcome::Partial{items, faults}
//! Err(ApiError)                   ─► Outcome::Fatal(fault)
//! ```

use crate::discovery::api::{Batch, Stage};
use crate::error::{ApiError, DiscoveryError};

/// Classified result of one stage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Every requested resource was described.
    Success(Vec<T>),
    /// Some resources failed; the successes are still usable.
    Partial {
        /// Successfully described resources.
        items: Vec<T>,
        /// One `PartialFailure` per failed resource.
        faults: Vec<DiscoveryError>,
    },
    /// The call failed as a whole; the cluster's resolution stops.
    Fatal(DiscoveryError),
}

impl<T> Outcome<T> {
    /// Splits the outcome: appends faults to `sink` and returns the usable
    /// items, or `None` when resolution must stop.
    pub fn absorb(self, sink: &mut Vec<DiscoveryError>) -> Option<Vec<T>> {
        match self {
            Outcome::Success(items) => Some(items),
            Outcome::Partial { items, faults } => {
                sink.extend(faults);
                Some(items)
            }
            Outcome::Fatal(fault) => {
                sink.push(fault);
                None
            }
        }
    }
}

/// Classifies the result of a stage call.
pub fn classify<T>(stage: Stage, result: Result<Batch<T>, ApiError>) -> Outcome<T> {
    match result {
        Err(err) => Outcome::Fatal(DiscoveryError::Transport(err)),
        Ok(batch) if batch.failures.is_empty() => Outcome::Success(batch.items),
        Ok(batch) => Outcome::Partial {
            items: batch.items,
            faults: batch
                .failures
                .into_iter()
                .map(|f| DiscoveryError::PartialFailure {
                    stage,
                    resource: f.resource,
                    reason: f.reason,
                })
                .collect(),
        },
    }
}
