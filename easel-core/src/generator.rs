use candle_core::{Device, Shape, Tensor};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded source of gaussian noise bound to a compute device.
///
/// Samples are drawn on the host and then moved to the device, so the same
/// seed produces the same latents whether the pipeline runs on CPU or GPU.
#[derive(Clone, Debug)]
pub struct Generator {
    seed: u64,
    device: Device,
    rng: StdRng,
}

impl Generator {
    pub fn manual_seed(device: &Device, seed: u64) -> Self {
        Self {
            seed,
            device: device.clone(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Standard normal samples with the given shape, as f32 on the bound device.
    pub fn randn<S: Into<Shape>>(&mut self, shape: S) -> candle_core::Result<Tensor> {
        let shape = shape.into();
        let values: Vec<f32> = (0..shape.elem_count())
            .map(|_| self.rng.sample::<f32, _>(StandardNormal))
            .collect();
        Tensor::from_vec(values, shape, &Device::Cpu)?.to_device(&self.device)
    }
}
