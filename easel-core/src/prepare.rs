use candle_core::Device;

use crate::{EditInput, GenerationRequest, Generator, PipelineParams};

pub const DEFAULT_SEED: u64 = 42;

/// Prepended to every edit prompt so the text encoder keeps mixed
/// Chinese/English text verbatim.
pub const LANG_GUARD: &str = "请严格按照以下描述生成图像，保持中文与英文原样，不要翻译任何部分 / \
    Please generate strictly according to the description below without translating any part: ";

pub const QUALITY_TAGS: &str = "masterpiece, best quality, ultra-detailed, natural";

pub const NEGATIVE_SUFFIX: &str = "过饱和, 过度对比, oversaturated colors, excessive contrast, \
    posterized, flat colors, flat shading, strong outlines, black outlines, \
    thick outlines, ink outlines, unnatural colors, filter,low detail, low quality, \
    jpeg artifacts, ugly, noise, noise pattern, smudged, blurry, misspelled text, \
    extra text, warped text, deformed letters, messy typography, wrong spelling";

pub const EDIT_STEPS: usize = 35;
pub const EDIT_TRUE_CFG_SCALE: f64 = 6.0;

pub const GENERATION_STEPS: usize = 30;
pub const GENERATION_WIDTH: usize = 1024;
pub const GENERATION_HEIGHT: usize = 768;
pub const GENERATION_TRUE_CFG_SCALE: f64 = 4.0;

/// Maps one request type onto the arguments of a pipeline call.
pub trait Prepare: Send + Sync + 'static {
    /// Used in logs and in `Unavailable` errors.
    const NAME: &'static str;

    type Input: Send + 'static;

    fn prepare(&self, input: Self::Input, device: &Device) -> PipelineParams;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EditPreparer;

impl EditPreparer {
    pub fn augment_prompt(prompt: &str) -> String {
        format!("{LANG_GUARD}{prompt}, {QUALITY_TAGS}")
    }

    pub fn augment_negative_prompt(negative_prompt: Option<&str>) -> String {
        match negative_prompt.map(str::trim).unwrap_or_default() {
            "" => NEGATIVE_SUFFIX.to_string(),
            user => format!("{user}, {NEGATIVE_SUFFIX}"),
        }
    }
}

impl Prepare for EditPreparer {
    const NAME: &'static str = "edit";

    type Input = EditInput;

    fn prepare(&self, input: EditInput, device: &Device) -> PipelineParams {
        let EditInput { request, image } = input;
        let seed = request.seed.unwrap_or(DEFAULT_SEED);
        PipelineParams {
            prompt: Self::augment_prompt(&request.prompt),
            negative_prompt: Self::augment_negative_prompt(request.negative_prompt.as_deref()),
            num_inference_steps: request.num_inference_steps.unwrap_or(EDIT_STEPS),
            true_cfg_scale: request.true_cfg_scale.unwrap_or(EDIT_TRUE_CFG_SCALE),
            width: None,
            height: None,
            image: Some(image),
            generator: Generator::manual_seed(device, seed),
        }
    }
}

/// Passes the prompt through untouched, unlike [`EditPreparer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationPreparer;

impl Prepare for GenerationPreparer {
    const NAME: &'static str = "generation";

    type Input = GenerationRequest;

    fn prepare(&self, request: GenerationRequest, device: &Device) -> PipelineParams {
        let seed = request.seed.unwrap_or(DEFAULT_SEED);
        PipelineParams {
            prompt: request.prompt,
            negative_prompt: request.negative_prompt.unwrap_or_default(),
            num_inference_steps: request.num_inference_steps.unwrap_or(GENERATION_STEPS),
            true_cfg_scale: request.true_cfg_scale.unwrap_or(GENERATION_TRUE_CFG_SCALE),
            width: Some(request.width.unwrap_or(GENERATION_WIDTH)),
            height: Some(request.height.unwrap_or(GENERATION_HEIGHT)),
            image: None,
            generator: Generator::manual_seed(device, seed),
        }
    }
}
