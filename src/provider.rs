//! Collaborator interfaces consumed by the transcription controller
//!
//! The controller owns the job lifecycle only; audio normalization, model
//! management, and inference are injected behind these traits so callers
//! (and tests) can substitute their own implementations.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque reference to an audio resource owned by the caller
///
/// The controller never interprets the handle; only the [`AudioSource`]
/// collaborator knows how to resolve it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceHandle(String);

impl SourceHandle {
    /// Create a handle from a caller-defined key (path, URI, row id, ...)
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The caller-defined key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mono audio samples normalized for the inference engine
#[derive(Clone, Debug, Default)]
pub struct NormalizedSamples {
    /// Samples as 32-bit floats
    pub samples: Vec<f32>,
    /// Sample rate in Hz (16 kHz for every engine we target)
    pub sample_rate: u32,
}

impl NormalizedSamples {
    /// Create a sample buffer
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of the audio in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Failures produced while resolving and normalizing an audio source
#[derive(Error, Debug, Clone)]
pub enum AudioSourceError {
    /// The handle does not resolve to readable audio
    #[error("Unreadable audio source: {0}")]
    Unreadable(String),

    /// The audio exists but cannot be decoded into normalized samples
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}

/// Failures produced while ensuring the speech model is loaded
#[derive(Error, Debug, Clone)]
pub enum ModelHostError {
    /// No model binary is present
    #[error("Model not available: {0}")]
    Unavailable(String),

    /// Loading the model exhausted memory
    #[error("Out of memory while loading model: {0}")]
    OutOfMemory(String),

    /// The model is present but failed to load
    #[error("Model load failed: {0}")]
    LoadFailed(String),
}

/// Failures produced by the inference engine
#[derive(Error, Debug, Clone)]
pub enum InferenceFailure {
    /// Inference exhausted memory; a shorter clip may succeed
    #[error("Out of memory during inference: {0}")]
    OutOfMemory(String),

    /// Any other engine failure
    #[error("Inference failed: {0}")]
    Failed(String),
}

/// Resolves source handles into normalized audio
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Read and normalize the audio behind a handle
    async fn preprocess(&self, handle: &SourceHandle)
        -> Result<NormalizedSamples, AudioSourceError>;

    /// Estimate the audio duration without full preprocessing
    ///
    /// Drives the inference progress ramp. Implementations that cannot
    /// estimate should return 0.0; the ramp then holds its entry value.
    async fn estimate_duration_seconds(&self, handle: &SourceHandle) -> f32;
}

/// Reports and manages availability of the speech model
#[async_trait]
pub trait ModelHost: Send + Sync {
    /// Check whether a model binary is present and loadable
    async fn is_available(&self) -> bool;

    /// Load the model if it is not already loaded
    ///
    /// Must be idempotent: a call with the model already loaded is a no-op.
    async fn ensure_loaded(&self) -> Result<(), ModelHostError>;
}

/// Runs speech-to-text inference over normalized samples
///
/// The real implementation wraps a native ML runtime; the controller only
/// needs an awaitable call it can supervise for progress and cancellation.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Transcribe the samples, returning raw (un-normalized) text
    async fn run(&self, samples: NormalizedSamples) -> Result<String, InferenceFailure>;
}
