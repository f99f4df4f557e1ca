//! Shared test fixtures: scriptable fakes for the controller's collaborators

use async_trait::async_trait;
use murmur::config::ControllerConfig;
use murmur::controller::TranscriptionController;
use murmur::provider::{
    AudioSource, AudioSourceError, InferenceEngine, InferenceFailure, ModelHost, ModelHostError,
    NormalizedSamples, SourceHandle,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SAMPLE_RATE: u32 = 16_000;

/// Audio source that synthesizes silence of a fixed duration, or fails
pub struct FakeAudioSource {
    seconds: f32,
    fail: Option<AudioSourceError>,
    preprocess_calls: AtomicUsize,
}

impl FakeAudioSource {
    pub fn with_seconds(seconds: f32) -> Arc<Self> {
        Arc::new(Self {
            seconds,
            fail: None,
            preprocess_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(fail: AudioSourceError) -> Arc<Self> {
        Arc::new(Self {
            seconds: 0.0,
            fail: Some(fail),
            preprocess_calls: AtomicUsize::new(0),
        })
    }

    pub fn preprocess_calls(&self) -> usize {
        self.preprocess_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSource for FakeAudioSource {
    async fn preprocess(
        &self,
        _handle: &SourceHandle,
    ) -> Result<NormalizedSamples, AudioSourceError> {
        self.preprocess_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => Ok(NormalizedSamples::new(
                vec![0.0; (self.seconds * SAMPLE_RATE as f32) as usize],
                SAMPLE_RATE,
            )),
        }
    }

    async fn estimate_duration_seconds(&self, _handle: &SourceHandle) -> f32 {
        self.seconds
    }
}

/// Model host with switchable availability and a load counter
pub struct FakeModelHost {
    available: AtomicBool,
    loaded: AtomicBool,
    load_count: AtomicUsize,
    fail_load: Mutex<Option<ModelHostError>>,
}

impl FakeModelHost {
    pub fn available() -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            loaded: AtomicBool::new(false),
            load_count: AtomicUsize::new(0),
            fail_load: Mutex::new(None),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        let host = Self::available();
        host.available.store(false, Ordering::SeqCst);
        host
    }

    pub fn failing_load(fail: ModelHostError) -> Arc<Self> {
        let host = Self::available();
        *host.fail_load.lock() = Some(fail);
        host
    }

    /// Number of times a full load actually ran
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelHost for FakeModelHost {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn ensure_loaded(&self) -> Result<(), ModelHostError> {
        if let Some(e) = self.fail_load.lock().clone() {
            return Err(e);
        }
        // Loading is idempotent: only the first call does the work
        if !self.loaded.swap(true, Ordering::SeqCst) {
            self.load_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Inference engine that returns scripted text after a delay, or fails
pub struct FakeEngine {
    text: String,
    delay: Duration,
    failure: Option<InferenceFailure>,
    runs: AtomicUsize,
}

impl FakeEngine {
    pub fn returning(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            delay,
            failure: None,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn failing(failure: InferenceFailure, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            text: String::new(),
            delay,
            failure: Some(failure),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn run(&self, _samples: NormalizedSamples) -> Result<String, InferenceFailure> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.failure {
            Some(f) => Err(f.clone()),
            None => Ok(self.text.clone()),
        }
    }
}

/// Build a controller over the given fakes
pub fn controller(
    config: ControllerConfig,
    audio: Arc<FakeAudioSource>,
    model: Arc<FakeModelHost>,
    engine: Arc<FakeEngine>,
) -> Arc<TranscriptionController> {
    Arc::new(TranscriptionController::new(config, audio, model, engine))
}

/// Fast poll interval so tests observe inference ticks quickly
pub fn fast_config() -> ControllerConfig {
    ControllerConfig::new().with_poll_interval(Duration::from_millis(25))
}

/// Initialize test logging (RUST_LOG controls verbosity)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
