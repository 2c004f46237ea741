use axum::{body::Bytes, extract::Multipart};
use easel_core::{decode_rgb_image, EditInput, EditRequest, Error};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Fields collected from a `multipart/form-data` edit upload.
#[derive(Debug, Default)]
pub(crate) struct EditForm {
    image: Option<Bytes>,
    prompt: Option<String>,
    negative_prompt: Option<String>,
    num_inference_steps: Option<usize>,
    true_cfg_scale: Option<f64>,
    seed: Option<u64>,
}

impl EditForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await?),
                "prompt" => form.prompt = Some(field.text().await?),
                "negative_prompt" => form.negative_prompt = Some(field.text().await?),
                "num_inference_steps" => {
                    form.num_inference_steps = parse_field(&name, &field.text().await?)?
                }
                "true_cfg_scale" => form.true_cfg_scale = parse_field(&name, &field.text().await?)?,
                "seed" => form.seed = parse_field(&name, &field.text().await?)?,
                _ => {}
            }
        }
        Ok(form)
    }

    /// Checks required fields and decodes the uploaded image to RGB.
    pub(crate) fn into_input(self) -> easel_core::Result<EditInput> {
        let prompt = self.prompt.ok_or(Error::MissingField("prompt"))?;
        let bytes = self.image.ok_or(Error::MissingField("image"))?;
        let image = decode_rgb_image(&bytes)?;
        Ok(EditInput {
            request: EditRequest {
                prompt,
                negative_prompt: self.negative_prompt,
                num_inference_steps: self.num_inference_steps,
                true_cfg_scale: self.true_cfg_scale,
                seed: self.seed,
            },
            image,
        })
    }
}

/// Blank values count as absent, as browsers submit empty inputs.
fn parse_field<T: DeserializeOwned>(name: &str, value: &str) -> easel_core::Result<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    serde_plain::from_str(value)
        .map(Some)
        .map_err(|e| Error::Validation(format!("invalid `{name}` value {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};
    use std::io::Cursor;

    fn png() -> Bytes {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(6, 4));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(bytes)
    }

    #[test]
    fn parses_typed_fields() {
        assert_eq!(parse_field::<u64>("seed", "7").unwrap(), Some(7));
        assert_eq!(parse_field::<f64>("true_cfg_scale", " 4.5 ").unwrap(), Some(4.5));
        assert_eq!(parse_field::<usize>("num_inference_steps", "").unwrap(), None);
    }

    #[test]
    fn malformed_field_names_the_field() {
        let err = parse_field::<u64>("seed", "-3").unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("`seed`"));
    }

    #[test]
    fn missing_prompt_is_reported_first() {
        let form = EditForm {
            image: Some(png()),
            ..Default::default()
        };
        let err = form.into_input().unwrap_err();
        assert!(matches!(err, Error::MissingField("prompt")));
    }

    #[test]
    fn missing_image_is_reported() {
        let form = EditForm {
            prompt: Some("make it snow".to_string()),
            ..Default::default()
        };
        let err = form.into_input().unwrap_err();
        assert!(matches!(err, Error::MissingField("image")));
    }

    #[test]
    fn image_is_converted_to_rgb() {
        let form = EditForm {
            image: Some(png()),
            prompt: Some("make it snow".to_string()),
            seed: Some(3),
            ..Default::default()
        };
        let input = form.into_input().unwrap();
        assert_eq!(input.image.color(), image::ColorType::Rgb8);
        assert_eq!(input.request.seed, Some(3));
        assert_eq!(input.request.negative_prompt, None);
    }
}
