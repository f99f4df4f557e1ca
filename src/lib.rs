pub mod config;
pub mod controller;
pub mod decode;
pub mod perf;
pub mod provider;
pub mod state;

use provider::{AudioSourceError, InferenceFailure, ModelHostError};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MurmurError {
    #[error("Another transcription is already in progress")]
    JobAlreadyActive,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Transcription cancelled")]
    Cancelled,
}

impl From<AudioSourceError> for MurmurError {
    fn from(e: AudioSourceError) -> Self {
        MurmurError::AudioFormat(e.to_string())
    }
}

impl From<ModelHostError> for MurmurError {
    fn from(e: ModelHostError) -> Self {
        match e {
            ModelHostError::Unavailable(detail) => MurmurError::ModelNotAvailable(detail),
            ModelHostError::OutOfMemory(detail) => MurmurError::OutOfMemory(detail),
            ModelHostError::LoadFailed(detail) => MurmurError::Inference(detail),
        }
    }
}

impl From<InferenceFailure> for MurmurError {
    fn from(e: InferenceFailure) -> Self {
        match e {
            InferenceFailure::OutOfMemory(detail) => MurmurError::OutOfMemory(detail),
            InferenceFailure::Failed(detail) => MurmurError::Inference(detail),
        }
    }
}

impl MurmurError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors allow the caller to retry the same request,
    /// while non-recoverable errors require user intervention first.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Another job finishing frees the controller
            MurmurError::JobAlreadyActive => true,
            // Model must be installed/downloaded first
            MurmurError::ModelNotAvailable(_) => false,
            // The source itself is bad; retrying won't help
            MurmurError::AudioFormat(_) => false,
            // Inference failures are typically transient
            MurmurError::Inference(_) => true,
            // A shorter clip may fit
            MurmurError::OutOfMemory(_) => true,
            // Cancellation is a normal outcome
            MurmurError::Cancelled => true,
        }
    }

    /// Get a user-friendly description of the error
    ///
    /// Returns a message suitable for display in the UI. `JobAlreadyActive`
    /// and `Cancelled` are phrased as status rather than failure; they should
    /// not be presented as errors.
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::JobAlreadyActive => {
                "A transcription is already running. Please wait for it to finish.".to_string()
            }
            MurmurError::ModelNotAvailable(_) => {
                "Speech model is not installed. Please download a model first.".to_string()
            }
            MurmurError::AudioFormat(_) => {
                "Could not read this recording. Please try recording again.".to_string()
            }
            MurmurError::Inference(_) => {
                "Transcription failed. Please try again.".to_string()
            }
            MurmurError::OutOfMemory(_) => {
                "Ran out of memory while transcribing. Try a shorter clip.".to_string()
            }
            MurmurError::Cancelled => "Transcription cancelled.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
