use anyhow::Result;
use chrono::Utc;
use easel_core::image_to_base64_png;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ImagesResponse {
    pub created: i64,
    pub data: Vec<ImageData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageData {
    pub b64_json: String,
}

impl ImagesResponse {
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Ok(Self {
            created: Utc::now().timestamp(),
            data: vec![ImageData {
                b64_json: image_to_base64_png(image)?,
            }],
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub generation: bool,
    pub edit: bool,
}
