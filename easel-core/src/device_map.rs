use anyhow::Result;
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{DType, Device};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceMap {
    ForceCpu,
    Ordinal(usize),
}

impl Default for DeviceMap {
    fn default() -> Self {
        Self::Ordinal(0)
    }
}

impl DeviceMap {
    pub fn from_cpu_flag(cpu: bool) -> Self {
        if cpu {
            Self::ForceCpu
        } else {
            Self::default()
        }
    }

    /// Picks CUDA, then Metal, then falls back to the CPU.
    pub fn select(self) -> Result<Device> {
        match self {
            DeviceMap::ForceCpu => Ok(Device::Cpu),
            DeviceMap::Ordinal(ordinal) if cuda_is_available() => Ok(Device::new_cuda(ordinal)?),
            DeviceMap::Ordinal(ordinal) if metal_is_available() => {
                Ok(Device::new_metal(ordinal)?)
            }
            DeviceMap::Ordinal(_) => {
                #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
                {
                    tracing::warn!(
                        "Running on CPU, to run on GPU(metal), build with `--features metal`"
                    );
                }
                #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
                {
                    tracing::warn!("Running on CPU, to run on GPU, build with `--features cuda`");
                }
                Ok(Device::Cpu)
            }
        }
    }
}

/// Compute precision for loaded weights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Bf16,
    F16,
    F32,
}

serde_plain::derive_fromstr_from_deserialize!(Precision);
serde_plain::derive_display_from_serialize!(Precision);

impl Precision {
    /// Half precision is only used on accelerators; the CPU runs in f32.
    pub fn dtype_for(self, device: &Device) -> DType {
        match self {
            Precision::Bf16 => device.bf16_default_to_f32(),
            Precision::F16 if device.is_cpu() => DType::F32,
            Precision::F16 => DType::F16,
            Precision::F32 => DType::F32,
        }
    }
}
