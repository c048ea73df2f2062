//! Snapshot hand-off to the output layer
//!
//! The driver emits a [`Snapshot`] after a step has fully completed. Sinks
//! decide how to store it; the core never reads anything back.

use super::diagnostics::FrontSample;
use crate::error::SinkError;
use crate::grid::Grid;
use crate::solver::FieldData;

/// Consistent view of the running state after a completed step
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Completed steps
    pub step: usize,
    /// Simulation time
    pub time: f64,
    /// Grid the fields live on
    pub grid: &'a Grid,
    /// Density `u`
    pub density: &'a FieldData,
    /// Level set `φ`
    pub level_set: &'a FieldData,
    /// Extended normal velocity
    pub velocity: &'a FieldData,
    /// Front diagnostics of this step, if the front was found
    pub front: Option<FrontSample>,
}

/// Receiver of simulation snapshots
pub trait SnapshotSink {
    /// Store or forward one snapshot
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the snapshot could not be stored; the run
    /// then stops.
    fn emit(&mut self, snapshot: &Snapshot<'_>) -> Result<(), SinkError>;
}

/// Owned copy of a [`Snapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedSnapshot {
    /// Completed step count
    pub step: usize,
    /// Simulated time
    pub time: f64,
    /// Density `u`
    pub density: FieldData,
    /// Level set `φ`
    pub level_set: FieldData,
    /// Extended normal velocity
    pub velocity: FieldData,
    /// Front sample at this step, if the front was found
    pub front: Option<FrontSample>,
}

impl From<&Snapshot<'_>> for OwnedSnapshot {
    fn from(snapshot: &Snapshot<'_>) -> Self {
        Self {
            step: snapshot.step,
            time: snapshot.time,
            density: snapshot.density.clone(),
            level_set: snapshot.level_set.clone(),
            velocity: snapshot.velocity.clone(),
            front: snapshot.front,
        }
    }
}

/// Sink keeping every snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Snapshots in emission order
    pub snapshots: Vec<OwnedSnapshot>,
}

impl SnapshotSink for MemorySink {
    fn emit(&mut self, snapshot: &Snapshot<'_>) -> Result<(), SinkError> {
        self.snapshots.push(snapshot.into());
        Ok(())
    }
}

/// Sink discarding every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn emit(&mut self, _snapshot: &Snapshot<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}
