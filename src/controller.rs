//! Transcription job controller
//!
//! Drives exactly one transcription job at a time from request to a terminal
//! state: gates on model availability, runs the staged pipeline
//! (preprocess -> load -> infer -> decode), publishes progress after every
//! transition, honors cooperative cancellation, and classifies failures.
//!
//! The controller is single-job by contract: one observer, one cancel
//! target. Batch work wants multiple controller instances, each with its
//! own collaborators.

use crate::config::ControllerConfig;
use crate::decode::normalize_transcript;
use crate::perf::Stopwatch;
use crate::provider::{AudioSource, InferenceEngine, ModelHost, NormalizedSamples, SourceHandle};
use crate::state::{JobSnapshot, JobStage, SharedJobState};
use crate::{MurmurError, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Progress checkpoints. Inference ramps between its entry value and the
// ceiling; the tail above the ceiling is reserved for decoding.
const PREPROCESS_DONE_PERCENT: u8 = 10;
const MODEL_LOADED_PERCENT: u8 = 30;
const INFERENCE_CEILING_PERCENT: u8 = 90;
const DECODING_PERCENT: u8 = 95;

/// A completed transcription with its metadata
///
/// The controller never persists this; storing it (plus whatever metadata
/// the app wants) is the caller's responsibility.
#[derive(Clone, Debug, Serialize)]
pub struct Transcription {
    /// Job that produced this text
    pub job_id: Uuid,
    /// Normalized transcript
    pub text: String,
    /// Duration of the source audio in seconds
    pub audio_seconds: f32,
    /// Wall time spent in the pipeline in milliseconds
    pub processing_ms: u64,
    /// When the job completed
    pub completed_at: DateTime<Utc>,
}

/// Drives transcription jobs over injected collaborators
///
/// Share the controller behind an [`Arc`]: [`transcribe`](Self::transcribe)
/// takes `&self`, and [`cancel`](Self::cancel) / [`progress`](Self::progress)
/// are safe to call concurrently with an in-flight job.
pub struct TranscriptionController {
    config: ControllerConfig,
    audio: Arc<dyn AudioSource>,
    model: Arc<dyn ModelHost>,
    engine: Arc<dyn InferenceEngine>,
    job: SharedJobState,
    active: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
    event_tx: Sender<JobSnapshot>,
    event_rx: Receiver<JobSnapshot>,
}

impl TranscriptionController {
    /// Create a controller over the given collaborators
    pub fn new(
        config: ControllerConfig,
        audio: Arc<dyn AudioSource>,
        model: Arc<dyn ModelHost>,
        engine: Arc<dyn InferenceEngine>,
    ) -> Self {
        let (event_tx, event_rx) = bounded(config.event_buffer_size);
        Self {
            config,
            audio,
            model,
            engine,
            job: SharedJobState::new(),
            active: Arc::new(AtomicBool::new(false)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            event_tx,
            event_rx,
        }
    }

    /// Transcribe the audio behind a source handle
    ///
    /// Rejects immediately with [`MurmurError::JobAlreadyActive`] while
    /// another job is in flight. On success returns the normalized
    /// transcript; on any other outcome returns the classified error, with
    /// cancellation surfaced as [`MurmurError::Cancelled`]. The controller
    /// is ready for a new call as soon as this one returns, whatever the
    /// outcome.
    pub async fn transcribe(&self, source: &SourceHandle) -> Result<Transcription> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("transcribe called while another job is active");
            return Err(MurmurError::JobAlreadyActive);
        }
        // Released on every exit path below
        let _guard = ActiveGuard {
            active: Arc::clone(&self.active),
        };
        self.cancel_requested.store(false, Ordering::SeqCst);

        // Model gate runs before any job state exists
        if !self.model.is_available().await {
            info!("Model unavailable, rejecting before pipeline start");
            return Err(MurmurError::ModelNotAvailable(
                "no speech model installed".to_string(),
            ));
        }

        let job_id = Uuid::new_v4();
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        self.job.begin(job_id);
        self.emit(self.job.snapshot());
        info!("Job {} started for source '{}'", job_id, source);

        match self.run_pipeline(job_id, source, deadline).await {
            Ok(done) => {
                info!(
                    "Job {} COMPLETE in {}ms: '{}'",
                    job_id, done.processing_ms, done.text
                );
                Ok(done)
            }
            Err(MurmurError::Cancelled) => {
                self.emit(self.job.cancel("Transcription cancelled"));
                info!("Job {} cancelled", job_id);
                Err(MurmurError::Cancelled)
            }
            Err(e) => {
                self.emit(self.job.fail(&e.to_string()));
                warn!("Job {} failed: {}", job_id, e);
                Err(e)
            }
        }
    }

    /// Request cooperative cancellation of the active job
    ///
    /// The flag is observed at stage boundaries and at every inference poll
    /// tick; the job resolves to [`MurmurError::Cancelled`] at the next
    /// checkpoint. With no active job this is a no-op.
    pub fn cancel(&self) {
        if self.active.load(Ordering::SeqCst) {
            info!("Cancellation requested");
            self.cancel_requested.store(true, Ordering::SeqCst);
        } else {
            debug!("Cancel requested with no active job, ignoring");
        }
    }

    /// Snapshot of the current job's progress
    ///
    /// `None` until the first job starts. A finished job's terminal snapshot
    /// stays readable until the next job enters the pipeline and replaces
    /// it.
    pub fn progress(&self) -> Option<JobSnapshot> {
        self.job.snapshot()
    }

    /// Receiver for the progress event stream
    ///
    /// A snapshot is emitted after every stage transition and progress
    /// checkpoint. Events are dropped rather than blocking the pipeline if
    /// no one drains the channel.
    pub fn progress_events(&self) -> Receiver<JobSnapshot> {
        self.event_rx.clone()
    }

    async fn run_pipeline(
        &self,
        job_id: Uuid,
        source: &SourceHandle,
        deadline: Option<Instant>,
    ) -> Result<Transcription> {
        let mut sw = Stopwatch::start();

        // Preprocessing
        self.checkpoint(deadline)?;
        let samples = self.audio.preprocess(source).await?;
        let estimate_seconds = self.audio.estimate_duration_seconds(source).await;
        let audio_seconds = samples.duration_seconds();
        debug!(
            "Job {} preprocessed {:.2}s of audio (estimate {:.2}s)",
            job_id, audio_seconds, estimate_seconds
        );
        self.emit(
            self.job
                .advance(JobStage::Preprocessing, PREPROCESS_DONE_PERCENT, "Audio prepared"),
        );
        sw.split("preprocess");

        // LoadingModel
        self.checkpoint(deadline)?;
        self.emit(self.job.advance(
            JobStage::LoadingModel,
            PREPROCESS_DONE_PERCENT,
            "Loading speech model",
        ));
        self.model.ensure_loaded().await?;
        self.emit(
            self.job
                .advance(JobStage::LoadingModel, MODEL_LOADED_PERCENT, "Model ready"),
        );
        sw.split("load");

        // Inference
        self.checkpoint(deadline)?;
        self.emit(self.job.advance(
            JobStage::Inference,
            MODEL_LOADED_PERCENT,
            "Transcribing audio",
        ));
        let raw = self.run_inference(samples, estimate_seconds, deadline).await?;
        sw.split("inference");

        // Decoding
        self.checkpoint(deadline)?;
        self.emit(
            self.job
                .advance(JobStage::Decoding, DECODING_PERCENT, "Decoding transcript"),
        );
        let text = normalize_transcript(&raw);
        sw.split("decode");

        self.emit(self.job.complete("Transcription complete"));
        debug!("Job {} stage timing: {}", job_id, sw.summary());

        Ok(Transcription {
            job_id,
            text,
            audio_seconds,
            processing_ms: sw.elapsed_ms(),
            completed_at: Utc::now(),
        })
    }

    /// Supervise the spawned inference call, polling for cancellation and
    /// advancing the progress ramp at each tick
    async fn run_inference(
        &self,
        samples: NormalizedSamples,
        estimate_seconds: f32,
        deadline: Option<Instant>,
    ) -> Result<String> {
        let engine = Arc::clone(&self.engine);
        let mut handle = tokio::spawn(async move { engine.run(samples).await });

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick resolves immediately; consume it so the ramp starts
        // one full interval in.
        ticker.tick().await;

        loop {
            tokio::select! {
                joined = &mut handle => {
                    return match joined {
                        Ok(Ok(text)) => Ok(text),
                        Ok(Err(failure)) => Err(failure.into()),
                        Err(e) => Err(MurmurError::Inference(format!(
                            "inference task did not finish: {}",
                            e
                        ))),
                    };
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.checkpoint(deadline) {
                        // Stop supervising; the engine's in-flight work is
                        // cooperative and winds down on its own.
                        handle.abort();
                        return Err(e);
                    }
                    let percent = inference_percent(started.elapsed().as_secs_f32(), estimate_seconds);
                    self.emit(self.job.advance(
                        JobStage::Inference,
                        percent,
                        "Transcribing audio",
                    ));
                }
            }
        }
    }

    /// Cancellation/deadline check shared by every pipeline checkpoint
    ///
    /// A deadline expiry is reported as a cancellation.
    fn checkpoint(&self, deadline: Option<Instant>) -> Result<()> {
        if self.cancel_requested.load(Ordering::SeqCst) {
            return Err(MurmurError::Cancelled);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                debug!("Job deadline exceeded, treating as cancellation");
                return Err(MurmurError::Cancelled);
            }
        }
        Ok(())
    }

    fn emit(&self, snapshot: Option<JobSnapshot>) {
        if let Some(snapshot) = snapshot {
            let _ = self.event_tx.try_send(snapshot);
        }
    }
}

/// Clears the active-job flag when a transcribe call exits
struct ActiveGuard {
    active: Arc<AtomicBool>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Progress percent for the inference stage after `elapsed_seconds`,
/// ramping from the stage entry value toward the ceiling over the
/// estimated audio duration
fn inference_percent(elapsed_seconds: f32, estimate_seconds: f32) -> u8 {
    if estimate_seconds <= 0.0 {
        return MODEL_LOADED_PERCENT;
    }
    let fraction = (elapsed_seconds / estimate_seconds).min(1.0);
    let span = (INFERENCE_CEILING_PERCENT - MODEL_LOADED_PERCENT) as f32;
    MODEL_LOADED_PERCENT + (fraction * span) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_percent_ramp() {
        assert_eq!(inference_percent(0.0, 3.0), MODEL_LOADED_PERCENT);
        assert_eq!(inference_percent(1.5, 3.0), 60);
        assert_eq!(inference_percent(3.0, 3.0), INFERENCE_CEILING_PERCENT);
    }

    #[test]
    fn test_inference_percent_never_exceeds_ceiling() {
        assert_eq!(inference_percent(30.0, 3.0), INFERENCE_CEILING_PERCENT);
    }

    #[test]
    fn test_inference_percent_without_estimate() {
        // No estimate: hold the entry value rather than guessing
        assert_eq!(inference_percent(5.0, 0.0), MODEL_LOADED_PERCENT);
        assert_eq!(inference_percent(5.0, -1.0), MODEL_LOADED_PERCENT);
    }

    #[test]
    fn test_checkpoint_order() {
        // Checkpoints stay inside the reserved decoding tail
        assert!(PREPROCESS_DONE_PERCENT < MODEL_LOADED_PERCENT);
        assert!(MODEL_LOADED_PERCENT < INFERENCE_CEILING_PERCENT);
        assert!(INFERENCE_CEILING_PERCENT < DECODING_PERCENT);
        assert!(DECODING_PERCENT < 100);
    }
}
