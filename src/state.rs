//! Job state machine and shared progress snapshots
//!
//! A transcription job moves through a fixed pipeline of stages and is
//! observed through immutable snapshots. Stage, percent, and status message
//! are always written together under one lock, so a snapshot taken at any
//! point is internally consistent.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Pipeline stage of a transcription job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum JobStage {
    /// Normalizing audio samples from the source
    Preprocessing,
    /// Ensuring the speech model is loaded
    LoadingModel,
    /// Running the inference engine
    Inference,
    /// Post-processing the raw model output
    Decoding,
    /// Finished with a transcript
    Completed,
    /// Finished with a classified failure
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl JobStage {
    /// Check if this stage is terminal (the job will not advance further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStage::Completed | JobStage::Failed | JobStage::Cancelled
        )
    }

    /// Check if this stage is part of the active pipeline
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Position in the forward pipeline order, used to reject regressions
    fn order(&self) -> u8 {
        match self {
            JobStage::Preprocessing => 0,
            JobStage::LoadingModel => 1,
            JobStage::Inference => 2,
            JobStage::Decoding => 3,
            JobStage::Completed => 4,
            // Terminal short-circuits are reachable from any active stage
            JobStage::Failed | JobStage::Cancelled => 4,
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Preprocessing => write!(f, "Preprocessing"),
            JobStage::LoadingModel => write!(f, "LoadingModel"),
            JobStage::Inference => write!(f, "Inference"),
            JobStage::Decoding => write!(f, "Decoding"),
            JobStage::Completed => write!(f, "Completed"),
            JobStage::Failed => write!(f, "Failed"),
            JobStage::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Mutable state of one transcription job
///
/// Percent is 0-100, non-decreasing, and reaches 100 only together with
/// [`JobStage::Completed`]. Stages only move forward; a terminal stage
/// freezes the state.
#[derive(Clone, Debug)]
pub struct JobState {
    id: Uuid,
    stage: JobStage,
    percent: u8,
    message: String,
}

impl JobState {
    /// Create a fresh job entering the pipeline
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            stage: JobStage::Preprocessing,
            percent: 0,
            message: "Preparing audio".to_string(),
        }
    }

    /// Advance to a pipeline stage with a progress checkpoint
    ///
    /// Regressions are ignored: a terminal job stays frozen, an
    /// earlier-stage update is dropped, and percent never decreases.
    /// Percent is capped at 99 until the job completes.
    pub fn advance(&mut self, stage: JobStage, percent: u8, message: &str) {
        if self.stage.is_terminal() {
            warn!("Job {} is terminal ({}), ignoring update to {}", self.id, self.stage, stage);
            return;
        }
        if stage.order() < self.stage.order() {
            warn!("Job {} stage regression {} -> {} ignored", self.id, self.stage, stage);
            return;
        }
        if stage != self.stage {
            debug!("Job {} stage: {} -> {}", self.id, self.stage, stage);
        }
        let capped = if stage == JobStage::Completed {
            100
        } else {
            percent.min(99)
        };
        self.stage = stage;
        self.percent = self.percent.max(capped);
        self.message = message.to_string();
    }

    /// Finish successfully at 100%
    pub fn complete(&mut self, message: &str) {
        self.advance(JobStage::Completed, 100, message);
    }

    /// Finish with a failure, freezing progress where it stopped
    pub fn fail(&mut self, message: &str) {
        if self.stage.is_terminal() {
            return;
        }
        debug!("Job {} failed in stage {}", self.id, self.stage);
        self.stage = JobStage::Failed;
        self.message = message.to_string();
    }

    /// Finish as cancelled, freezing progress where it stopped
    pub fn cancel(&mut self, message: &str) {
        if self.stage.is_terminal() {
            return;
        }
        debug!("Job {} cancelled in stage {}", self.id, self.stage);
        self.stage = JobStage::Cancelled;
        self.message = message.to_string();
    }

    /// Create an immutable snapshot of this job
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            stage: self.stage,
            percent: self.percent,
            message: self.message.clone(),
        }
    }
}

/// Immutable observation of a job at one point in its pipeline
///
/// Also used as the payload of the controller's progress event stream.
#[derive(Clone, Debug, Serialize)]
pub struct JobSnapshot {
    /// Job identifier, unique per transcribe call
    pub id: Uuid,
    /// Stage at the time of the snapshot
    pub stage: JobStage,
    /// Progress percent, 0-100
    pub percent: u8,
    /// Human-readable status for display only
    pub message: String,
}

/// Thread-safe shared job state
///
/// Holds at most one job. The controller writes; observers read snapshots.
#[derive(Clone, Default)]
pub struct SharedJobState {
    inner: Arc<RwLock<Option<JobState>>>,
}

impl SharedJobState {
    /// Create an empty shared state (no job yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a fresh job, replacing any previous terminal state
    pub fn begin(&self, id: Uuid) {
        *self.inner.write() = Some(JobState::new(id));
    }

    /// Get a snapshot of the current job, if any
    pub fn snapshot(&self) -> Option<JobSnapshot> {
        self.inner.read().as_ref().map(JobState::snapshot)
    }

    /// Advance the current job and return the resulting snapshot
    pub fn advance(&self, stage: JobStage, percent: u8, message: &str) -> Option<JobSnapshot> {
        let mut guard = self.inner.write();
        let job = guard.as_mut()?;
        job.advance(stage, percent, message);
        Some(job.snapshot())
    }

    /// Complete the current job and return the resulting snapshot
    pub fn complete(&self, message: &str) -> Option<JobSnapshot> {
        let mut guard = self.inner.write();
        let job = guard.as_mut()?;
        job.complete(message);
        Some(job.snapshot())
    }

    /// Fail the current job and return the resulting snapshot
    pub fn fail(&self, message: &str) -> Option<JobSnapshot> {
        let mut guard = self.inner.write();
        let job = guard.as_mut()?;
        job.fail(message);
        Some(job.snapshot())
    }

    /// Cancel the current job and return the resulting snapshot
    pub fn cancel(&self, message: &str) -> Option<JobSnapshot> {
        let mut guard = self.inner.write();
        let job = guard.as_mut()?;
        job.cancel(message);
        Some(job.snapshot())
    }
}
