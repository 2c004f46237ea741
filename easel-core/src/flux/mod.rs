use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::Module;
use candle_transformers::models::{
    clip::text_model::{Activation, ClipTextConfig, ClipTextTransformer},
    flux::{
        autoencoder::{self, AutoEncoder},
        model::{self, Flux},
        sampling,
    },
    t5::{self, T5EncoderModel},
};
use hf_hub::api::tokio::Api;
use image::{imageops::FilterType, DynamicImage};
use tokenizers::Tokenizer;
use tracing::{debug, info};

mod denoise;
mod files;

pub use files::ModelFiles;

use crate::{
    image_to_tensor, loader_factory::ModelVariant, tensor_to_image, DeviceMap, Generator,
    Loader, ModelLocation, Pipeline, PipelineOutput, PipelineParams, Precision,
};

const T5_MAX_TOKENS: usize = 256;
const CLIP_MAX_TOKENS: usize = 77;
/// Guidance fed to the distilled guidance embedding (ignored by Schnell).
const DISTILLED_GUIDANCE: f64 = 3.5;
/// Edits are resized to roughly this many pixels before encoding.
const EDIT_TARGET_AREA: f64 = 1024.0 * 1024.0;
/// Fraction of the schedule an edit is re-noised to.
const EDIT_STRENGTH: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxVariant {
    Schnell,
    Dev,
}

impl FluxVariant {
    fn transformer_file(self) -> &'static str {
        match self {
            FluxVariant::Schnell => "flux1-schnell.safetensors",
            FluxVariant::Dev => "flux1-dev.safetensors",
        }
    }

    fn model_config(self) -> model::Config {
        match self {
            FluxVariant::Schnell => model::Config::schnell(),
            FluxVariant::Dev => model::Config::dev(),
        }
    }

    fn autoencoder_config(self) -> autoencoder::Config {
        match self {
            FluxVariant::Schnell => autoencoder::Config::schnell(),
            FluxVariant::Dev => autoencoder::Config::dev(),
        }
    }

    fn schedule(self, steps: usize, height: usize, width: usize) -> Vec<f64> {
        match self {
            FluxVariant::Schnell => sampling::get_schedule(steps, None),
            FluxVariant::Dev => {
                let image_seq_len = (height / 16) * (width / 16);
                sampling::get_schedule(steps, Some((image_seq_len, 0.5, 1.15)))
            }
        }
    }
}

pub struct FluxPipeline {
    variant: FluxVariant,
    device: Device,
    dtype: DType,
    t5_model: T5EncoderModel,
    t5_tokenizer: Tokenizer,
    clip_model: ClipTextTransformer,
    clip_tokenizer: Tokenizer,
    autoencoder: AutoEncoder,
    flux_model: Flux,
}

impl FluxPipeline {
    fn encode_prompt(&mut self, prompt: &str) -> Result<(Tensor, Tensor)> {
        let mut t5_tokens = self
            .t5_tokenizer
            .encode(prompt, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        t5_tokens.resize(T5_MAX_TOKENS, 0);
        let input_token_ids = Tensor::new(&*t5_tokens, &self.device)?.unsqueeze(0)?;
        let t5_emb = self.t5_model.forward(&input_token_ids)?;

        let mut clip_tokens = self
            .clip_tokenizer
            .encode(prompt, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        clip_tokens.truncate(CLIP_MAX_TOKENS);
        let input_token_ids = Tensor::new(&*clip_tokens, &self.device)?.unsqueeze(0)?;
        let clip_emb = self.clip_model.forward(&input_token_ids)?;

        Ok((t5_emb, clip_emb))
    }

    /// Noise latents for text-to-image, plus the full schedule.
    fn generation_latents(
        &self,
        width: usize,
        height: usize,
        steps: usize,
        generator: &mut Generator,
    ) -> Result<(Tensor, Vec<f64>)> {
        check_generation_size(width, height)?;
        let noise = generator
            .randn((1, 16, height / 8, width / 8))?
            .to_dtype(self.dtype)?;
        Ok((noise, self.variant.schedule(steps, height, width)))
    }

    /// Encodes the source image and re-noises it part way into the schedule.
    fn edit_latents(
        &self,
        image: &DynamicImage,
        width: usize,
        height: usize,
        steps: usize,
        generator: &mut Generator,
    ) -> Result<(Tensor, Vec<f64>)> {
        let resized = image.resize_exact(width as u32, height as u32, FilterType::Lanczos3);
        let pixels = image_to_tensor(&resized, &self.device)?.to_dtype(self.dtype)?;
        let latent = self.autoencoder.encode(&pixels)?;
        let noise = generator.randn(latent.dims4()?)?.to_dtype(self.dtype)?;

        let timesteps = self.variant.schedule(steps, height, width);
        let start = edit_start_index(steps);
        let t = timesteps[start];
        let latent = ((noise * t)? + (latent * (1.0 - t))?)?;
        Ok((latent, timesteps[start..].to_vec()))
    }
}

impl Pipeline for FluxPipeline {
    fn device(&self) -> &Device {
        &self.device
    }

    fn run(&mut self, params: PipelineParams) -> Result<PipelineOutput> {
        let PipelineParams {
            prompt,
            negative_prompt,
            num_inference_steps: steps,
            true_cfg_scale,
            width,
            height,
            image,
            mut generator,
        } = params;
        if steps == 0 {
            anyhow::bail!("num_inference_steps must be at least 1");
        }

        // --- Latents and schedule, from noise or from the source image ---
        let (latent, width, height, timesteps) = match image {
            Some(image) => {
                let (width, height) = edit_dimensions(image.width(), image.height())?;
                let (latent, timesteps) =
                    self.edit_latents(&image, width, height, steps, &mut generator)?;
                (latent, width, height, timesteps)
            }
            None => {
                let width = width.context("text-to-image requires a width")?;
                let height = height.context("text-to-image requires a height")?;
                let (latent, timesteps) =
                    self.generation_latents(width, height, steps, &mut generator)?;
                (latent, width, height, timesteps)
            }
        };
        debug!(width, height, steps = timesteps.len() - 1, "Prepared latents");

        // --- Text conditioning, with the negative prompt for true CFG ---
        let (t5_emb, clip_emb) = self.encode_prompt(&prompt)?;
        let cond = sampling::State::new(&t5_emb, &clip_emb, &latent)?;
        let uncond = if true_cfg_scale > 1.0 {
            let (t5_emb, clip_emb) = self.encode_prompt(&negative_prompt)?;
            Some(sampling::State::new(&t5_emb, &clip_emb, &latent)?)
        } else {
            None
        };

        let latent_img = denoise::denoise(
            &self.flux_model,
            &cond,
            uncond.as_ref(),
            &timesteps,
            DISTILLED_GUIDANCE,
            true_cfg_scale,
        )?;
        let unpacked = sampling::unpack(&latent_img, height, width)?;
        debug!("Generated latent image");

        // --- Decode, clamp and scale to u8 pixels ---
        let decoded = self.autoencoder.decode(&unpacked)?.to_dtype(DType::F32)?;
        let img = ((decoded.clamp(-1f32, 1f32)? + 1.0)? * 127.5)?.to_dtype(DType::U8)?;
        let image = tensor_to_image(&img.i(0)?)?;

        Ok(PipelineOutput {
            images: vec![image],
        })
    }
}

/// Latents are packed in 2x2 patches of the 8x downsampled image.
fn check_generation_size(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
        anyhow::bail!("width and height must be positive multiples of 16, got {width}x{height}");
    }
    Ok(())
}

/// Output size for an edit: about [`EDIT_TARGET_AREA`] pixels with the source
/// aspect ratio, both sides multiples of 32.
fn edit_dimensions(width: u32, height: u32) -> Result<(usize, usize)> {
    if width == 0 || height == 0 {
        anyhow::bail!("source image is empty ({width}x{height})");
    }
    let ratio = width as f64 / height as f64;
    let target_width = (EDIT_TARGET_AREA * ratio).sqrt();
    let target_height = target_width / ratio;
    let round = |side: f64| ((side / 32.0).round() as usize).max(1) * 32;
    Ok((round(target_width), round(target_height)))
}

fn edit_start_index(steps: usize) -> usize {
    let skipped = ((1.0 - EDIT_STRENGTH) * steps as f64).round() as usize;
    skipped.min(steps - 1)
}

pub struct FluxLoader;

impl Loader for FluxLoader {
    type Pipeline = FluxPipeline;

    async fn load(
        variant: ModelVariant,
        location: ModelLocation,
        device_map: DeviceMap,
        precision: Precision,
    ) -> Result<Self::Pipeline> {
        let ModelVariant::Flux(variant) = variant;

        let files = match &location {
            ModelLocation::Local(dir) => ModelFiles::from_dir(dir)?,
            ModelLocation::Hub(repo) => {
                let api = Api::new().context("failed to create hf hub API")?;
                ModelFiles::fetch(&api, repo, variant).await?
            }
        };

        // Configure device.
        let device = device_map.select().context("failed to set up device")?;
        let dtype = precision.dtype_for(&device);
        info!(?device, ?dtype, "Selected device");

        // --- Load T5 Model and Tokenizer ---
        let t5_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[&files.t5_weights], dtype, &device)
                .context("failed to build T5 var builder")?
        };
        let config_str =
            std::fs::read_to_string(&files.t5_config).context("failed to read T5 config")?;
        let t5_config: t5::Config =
            serde_json::from_str(&config_str).context("failed to parse T5 config")?;
        let t5_model =
            T5EncoderModel::load(t5_vb, &t5_config).context("failed to load T5 model")?;
        let t5_tokenizer = Tokenizer::from_file(&files.t5_tokenizer)
            .map_err(Error::msg)
            .context("failed to load T5 tokenizer")?;

        // --- Load CLIP Model and Tokenizer ---
        let clip_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[&files.clip_weights], dtype, &device)
                .context("failed to build CLIP var builder")?
        };
        let clip_config = ClipTextConfig {
            vocab_size: 49408,
            projection_dim: 768,
            activation: Activation::QuickGelu,
            intermediate_size: 3072,
            embed_dim: 768,
            max_position_embeddings: CLIP_MAX_TOKENS,
            pad_with: None,
            num_hidden_layers: 12,
            num_attention_heads: 12,
        };
        let clip_model = ClipTextTransformer::new(clip_vb.pp("text_model"), &clip_config)
            .context("failed to load CLIP model")?;
        let clip_tokenizer = Tokenizer::from_file(&files.clip_tokenizer)
            .map_err(Error::msg)
            .context("failed to load CLIP tokenizer")?;

        // --- Load Autoencoder ---
        let autoencoder_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[&files.autoencoder], dtype, &device)
                .context("failed to build autoencoder var builder")?
        };
        let autoencoder = AutoEncoder::new(&variant.autoencoder_config(), autoencoder_vb)
            .context("failed to load autoencoder")?;

        // --- Load Flux transformer ---
        let flux_vb = unsafe {
            candle_nn::VarBuilder::from_mmaped_safetensors(&[&files.transformer], dtype, &device)
                .context("failed to build flux var builder")?
        };
        let flux_model = Flux::new(&variant.model_config(), flux_vb)
            .context("failed to load flux model")?;

        info!(%location, ?variant, "Pipeline loaded");

        Ok(FluxPipeline {
            variant,
            device,
            dtype,
            t5_model,
            t5_tokenizer,
            clip_model,
            clip_tokenizer,
            autoencoder,
            flux_model,
        })
    }
}
