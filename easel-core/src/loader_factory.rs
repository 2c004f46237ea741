use anyhow::Result;
use tracing::info;

use crate::flux::{FluxLoader, FluxVariant};
use crate::{DeviceMap, Loader, ModelLocation, Pipeline, Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Flux(FluxVariant),
}

impl ModelVariant {
    /// Detect the variant from a location name, defaulting to Schnell.
    pub fn from_name(model_name: &str) -> Self {
        let name_upper = model_name.to_uppercase();

        if name_upper.contains("DEV") {
            ModelVariant::Flux(FluxVariant::Dev)
        } else {
            ModelVariant::Flux(FluxVariant::Schnell)
        }
    }
}

/// Load the pipeline stored at `location` onto the device picked by `device_map`.
pub async fn load_pipeline(
    location: &str,
    device_map: DeviceMap,
    precision: Precision,
) -> Result<Box<dyn Pipeline>> {
    let location = ModelLocation::parse(location);
    let variant = ModelVariant::from_name(location.name());

    info!(%location, ?variant, %precision, "Loading pipeline");

    match variant {
        ModelVariant::Flux(_) => {
            let pipeline = FluxLoader::load(variant, location, device_map, precision).await?;
            Ok(Box::new(pipeline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("qwen-image", FluxVariant::Schnell)]
    #[case("qwen-image-edit", FluxVariant::Schnell)]
    #[case("FLUX.1-schnell", FluxVariant::Schnell)]
    #[case("FLUX.1-dev", FluxVariant::Dev)]
    #[case("flux-dev-local", FluxVariant::Dev)]
    fn detects_variant_from_name(#[case] name: &str, #[case] expected: FluxVariant) {
        assert_eq!(ModelVariant::from_name(name), ModelVariant::Flux(expected));
    }
}
