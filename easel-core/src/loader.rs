use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::{loader_factory::ModelVariant, DeviceMap, Pipeline, Precision};

/// Where a pipeline's weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    Local(PathBuf),
    /// Hugging Face Hub repo id, used when no local directory matches.
    Hub(String),
}

impl ModelLocation {
    pub fn parse(location: &str) -> Self {
        let path = Path::new(location);
        if path.is_dir() {
            Self::Local(path.to_path_buf())
        } else {
            Self::Hub(location.to_string())
        }
    }

    /// Last path component or repo name, used for variant detection.
    pub fn name(&self) -> &str {
        match self {
            Self::Local(path) => path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default(),
            Self::Hub(repo) => repo.rsplit('/').next().unwrap_or(repo.as_str()),
        }
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Hub(repo) => write!(f, "hf://{repo}"),
        }
    }
}

pub trait Loader {
    type Pipeline: Pipeline + 'static;

    fn load(
        variant: ModelVariant,
        location: ModelLocation,
        device_map: DeviceMap,
        precision: Precision,
    ) -> impl Future<Output = Result<Self::Pipeline>>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_directory_is_local() {
        let dir = tempfile::tempdir().unwrap();
        let location = ModelLocation::parse(dir.path().to_str().unwrap());
        assert_eq!(location, ModelLocation::Local(dir.path().to_path_buf()));
    }

    #[test]
    fn anything_else_is_a_hub_repo() {
        let location = ModelLocation::parse("black-forest-labs/FLUX.1-schnell");
        assert_eq!(
            location,
            ModelLocation::Hub("black-forest-labs/FLUX.1-schnell".to_string())
        );
        assert_eq!(location.name(), "FLUX.1-schnell");
        assert_eq!(location.to_string(), "hf://black-forest-labs/FLUX.1-schnell");
    }

    #[test]
    fn local_name_is_the_last_component() {
        let location = ModelLocation::Local(PathBuf::from("/models/flux-dev"));
        assert_eq!(location.name(), "flux-dev");
    }
}
