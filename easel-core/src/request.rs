use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Text-to-image request body.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_cfg_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: None,
            height: None,
            negative_prompt: None,
            num_inference_steps: None,
            true_cfg_scale: None,
            seed: None,
        }
    }
}

/// Edit fields; the source image travels next to it in [`EditInput`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct EditRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_cfg_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl EditRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditInput {
    pub request: EditRequest,
    pub image: DynamicImage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_stay_unset() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"prompt": "a red fox in snow"}"#).unwrap();
        assert_eq!(request, GenerationRequest::new("a red fox in snow"));
    }

    #[test]
    fn prompt_is_required() {
        let err = serde_json::from_str::<GenerationRequest>(r#"{"width": 512}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `prompt`"));
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let json = serde_json::to_value(EditRequest::new("make it blue")).unwrap();
        assert_eq!(json, serde_json::json!({ "prompt": "make it blue" }));
    }
}
