use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hf_hub::api::tokio::Api;

use super::FluxVariant;

const T5_REPO: &str = "google/t5-v1_1-xxl";
const T5_REVISION: &str = "refs/pr/2";
const T5_TOKENIZER_REPO: &str = "lmz/mt5-tokenizers";
const T5_TOKENIZER_FILE: &str = "t5-v1_1-xxl.tokenizer.json";
const CLIP_REPO: &str = "openai/clip-vit-large-patch14";

/// Resolved weight, config and tokenizer paths for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub transformer: PathBuf,
    pub autoencoder: PathBuf,
    pub t5_weights: PathBuf,
    pub t5_config: PathBuf,
    pub t5_tokenizer: PathBuf,
    pub clip_weights: PathBuf,
    pub clip_tokenizer: PathBuf,
}

impl ModelFiles {
    /// Files laid out in a local model directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let files = Self {
            transformer: dir.join("transformer.safetensors"),
            autoencoder: dir.join("ae.safetensors"),
            t5_weights: dir.join("t5/model.safetensors"),
            t5_config: dir.join("t5/config.json"),
            t5_tokenizer: dir.join("t5/tokenizer.json"),
            clip_weights: dir.join("clip/model.safetensors"),
            clip_tokenizer: dir.join("clip/tokenizer.json"),
        };

        let missing: Vec<String> = files
            .paths()
            .into_iter()
            .filter(|path| !path.is_file())
            .map(|path| path.display().to_string())
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "model directory {} is incomplete, missing: {}",
                dir.display(),
                missing.join(", ")
            );
        }
        Ok(files)
    }

    /// Downloads (or reuses cached) files from the Hugging Face Hub.
    pub async fn fetch(api: &Api, repo: &str, variant: FluxVariant) -> Result<Self> {
        // --- T5 weights, config and tokenizer ---
        let t5_repo = api.repo(hf_hub::Repo::with_revision(
            T5_REPO.to_string(),
            hf_hub::RepoType::Model,
            T5_REVISION.to_string(),
        ));
        let t5_weights = t5_repo
            .get("model.safetensors")
            .await
            .context("failed to get T5 model file")?;
        let t5_config = t5_repo
            .get("config.json")
            .await
            .context("failed to get T5 config")?;
        let t5_tokenizer = api
            .model(T5_TOKENIZER_REPO.to_string())
            .get(T5_TOKENIZER_FILE)
            .await
            .context("failed to get T5 tokenizer")?;

        // --- CLIP weights and tokenizer ---
        let clip_repo = api.repo(hf_hub::Repo::model(CLIP_REPO.to_string()));
        let clip_weights = clip_repo
            .get("model.safetensors")
            .await
            .context("failed to get CLIP model file")?;
        let clip_tokenizer = clip_repo
            .get("tokenizer.json")
            .await
            .context("failed to get CLIP tokenizer")?;

        // --- Transformer and autoencoder ---
        let model_repo = api.repo(hf_hub::Repo::model(repo.to_string()));
        let autoencoder = model_repo
            .get("ae.safetensors")
            .await
            .context("failed to get autoencoder model file")?;
        let transformer = model_repo
            .get(variant.transformer_file())
            .await
            .with_context(|| format!("failed to get {}", variant.transformer_file()))?;

        Ok(Self {
            transformer,
            autoencoder,
            t5_weights,
            t5_config,
            t5_tokenizer,
            clip_weights,
            clip_tokenizer,
        })
    }

    fn paths(&self) -> [&PathBuf; 7] {
        [
            &self.transformer,
            &self.autoencoder,
            &self.t5_weights,
            &self.t5_config,
            &self.t5_tokenizer,
            &self.clip_weights,
            &self.clip_tokenizer,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, relative: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn complete_directory_resolves() {
        let dir = tempfile::tempdir().unwrap();
        for file in [
            "transformer.safetensors",
            "ae.safetensors",
            "t5/model.safetensors",
            "t5/config.json",
            "t5/tokenizer.json",
            "clip/model.safetensors",
            "clip/tokenizer.json",
        ] {
            touch(dir.path(), file);
        }
        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert_eq!(files.autoencoder, dir.path().join("ae.safetensors"));
        assert_eq!(files.clip_tokenizer, dir.path().join("clip/tokenizer.json"));
    }

    #[test]
    fn incomplete_directory_lists_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "transformer.safetensors");
        touch(dir.path(), "ae.safetensors");
        let err = ModelFiles::from_dir(dir.path()).unwrap_err().to_string();
        assert!(err.contains("t5/config.json"));
        assert!(err.contains("clip/model.safetensors"));
        assert!(!err.contains("ae.safetensors"));
    }
}
