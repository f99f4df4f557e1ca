//! Configuration for the transcription controller

use std::time::Duration;

/// Configuration for a [`TranscriptionController`](crate::controller::TranscriptionController)
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// How often the inference stage checks for cancellation and
    /// advances the progress ramp
    pub poll_interval: Duration,

    /// Optional deadline for the whole transcribe call; expiry behaves
    /// like an external cancel
    pub timeout: Option<Duration>,

    /// Progress event channel buffer size
    pub event_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            timeout: None,
            event_buffer_size: 100,
        }
    }
}

impl ControllerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inference poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set a deadline for the whole transcribe call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the progress event channel buffer size
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}
