use clap::Parser;
use easel_core::{DeviceMap, Precision};

const DEFAULT_BODY_LIMIT: usize = 32 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Easel image generation and editing server")]
pub struct Args {
    /// Text-to-image model: local directory or Hugging Face repo id
    #[arg(long, env = "QWEN_IMAGE_LOCATION", default_value = "/qwen-image")]
    pub generation_location: String,

    /// Image-editing model: local directory or Hugging Face repo id
    #[arg(long, env = "QWEN_IMAGE_EDIT_LOCATION", default_value = "/qwen-image-edit")]
    pub edit_location: String,

    /// Use CPU instead of GPU
    #[arg(long)]
    pub cpu: bool,

    /// Weight precision (bf16, f16 or f32)
    #[arg(long, default_value_t = Precision::Bf16)]
    pub dtype: Precision,

    /// Host address to bind the server to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the server to
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,
}

impl Args {
    pub fn device_map(&self) -> DeviceMap {
        DeviceMap::from_cpu_flag(self.cpu)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_layout() {
        let args = Args::try_parse_from([
            "easel-server",
            "--generation-location",
            "/qwen-image",
            "--edit-location",
            "/qwen-image-edit",
        ])
        .unwrap();
        assert_eq!(args.generation_location, "/qwen-image");
        assert_eq!(args.edit_location, "/qwen-image-edit");
        assert_eq!(args.dtype, Precision::Bf16);
        assert_eq!(args.bind_address(), "0.0.0.0:8000");
        assert_eq!(args.body_limit, 32 * 1024 * 1024);
        assert_eq!(args.device_map(), DeviceMap::Ordinal(0));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "easel-server",
            "--generation-location",
            "black-forest-labs/FLUX.1-schnell",
            "--edit-location",
            "/models/edit",
            "--cpu",
            "--dtype",
            "f32",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(args.device_map(), DeviceMap::ForceCpu);
        assert_eq!(args.dtype, Precision::F32);
        assert_eq!(args.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn unknown_precision_is_rejected() {
        let result = Args::try_parse_from(["easel-server", "--dtype", "int4"]);
        assert!(result.is_err());
    }
}
