use anyhow::anyhow;
use candle_core::Device;
use image::DynamicImage;

use crate::{Error, Generator, Result};

/// Fully resolved arguments for one pipeline call.
///
/// Built fresh for every request and consumed by [`process_single`].
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub num_inference_steps: usize,
    pub true_cfg_scale: f64,
    pub width: Option<usize>,
    pub height: Option<usize>,
    /// Source image; only present for edits.
    pub image: Option<DynamicImage>,
    pub generator: Generator,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub images: Vec<DynamicImage>,
}

/// A loaded diffusion pipeline bound to one device.
pub trait Pipeline: Send {
    fn device(&self) -> &Device;

    fn run(&mut self, params: PipelineParams) -> anyhow::Result<PipelineOutput>;
}

/// Invokes `pipeline` exactly once and returns its first image.
pub fn process_single(pipeline: &mut dyn Pipeline, params: PipelineParams) -> Result<DynamicImage> {
    let output = pipeline.run(params).map_err(Error::Inference)?;
    output
        .images
        .into_iter()
        .next()
        .ok_or_else(|| Error::Inference(anyhow!("pipeline returned no images")))
}
