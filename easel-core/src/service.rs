use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use candle_core::Device;
use image::DynamicImage;
use tracing::{debug, info};

use crate::{
    process_single, EditInput, EditPreparer, Error, GenerationPreparer, GenerationRequest,
    Pipeline, Prepare, Result,
};

type SharedPipeline = Arc<Mutex<Option<Box<dyn Pipeline>>>>;

/// Owns one loaded pipeline and runs prepared requests against it, one at a time.
pub struct InferenceService<S> {
    preparer: S,
    device: Device,
    pipeline: SharedPipeline,
    loaded: AtomicBool,
}

pub type EditService = InferenceService<EditPreparer>;
pub type GenerationService = InferenceService<GenerationPreparer>;

impl<S: Prepare + Default> InferenceService<S> {
    pub fn new(pipeline: Box<dyn Pipeline>) -> Self {
        Self::with_preparer(S::default(), pipeline)
    }
}

impl<S: Prepare> InferenceService<S> {
    pub fn with_preparer(preparer: S, pipeline: Box<dyn Pipeline>) -> Self {
        let device = pipeline.device().clone();
        Self {
            preparer,
            device,
            pipeline: Arc::new(Mutex::new(Some(pipeline))),
            loaded: AtomicBool::new(true),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Does not wait for an in-flight invocation.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Drops the pipeline; later calls fail with [`Error::Unavailable`].
    ///
    /// Waits for an in-flight invocation to finish first.
    pub fn release(&self) {
        let released = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.loaded.store(false, Ordering::Release);
        if released.is_some() {
            info!("Released {} pipeline", S::NAME);
        }
    }

    async fn process(&self, input: S::Input) -> Result<DynamicImage> {
        let params = self.preparer.prepare(input, &self.device);
        debug!(
            service = S::NAME,
            steps = params.num_inference_steps,
            true_cfg_scale = params.true_cfg_scale,
            seed = params.generator.seed(),
            width = ?params.width,
            height = ?params.height,
            "Prepared pipeline parameters"
        );

        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || {
            // Recover the guard after an earlier run panicked.
            let mut guard = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            let pipeline = guard.as_mut().ok_or(Error::Unavailable(S::NAME))?;
            process_single(pipeline.as_mut(), params)
        })
        .await
        .map_err(|e| Error::Inference(e.into()))?
    }
}

impl EditService {
    pub async fn edit(&self, input: EditInput) -> Result<DynamicImage> {
        self.process(input).await
    }
}

impl GenerationService {
    pub async fn generate(&self, request: GenerationRequest) -> Result<DynamicImage> {
        self.process(request).await
    }
}
