use async_trait::async_trait;
use serde_json::{json, Value};

use uniflow_core::api::{GenerationStage, ImageHandle, SourceImage, Stage, StageConfig, StageError};
use uniflow_core::config::defaults::{DEFAULT_GENERATION_MODEL, DEFAULT_IMAGE_SIZE};

use super::http::{build_client, preview_body, require_endpoint, status_error, transport_error};

/// Generation stage backed by an OpenAI-compatible `images/generations` endpoint.
#[derive(Clone)]
pub struct OpenAiImageStage {
    http: reqwest::Client,
}

impl OpenAiImageStage {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout_ms)?,
        })
    }
}

/// Prompt actually sent; a configured instruction wraps the derived prompt.
pub fn compose_prompt(prompt: &str, config: &StageConfig) -> String {
    match config.instruction() {
        Some(instruction) => format!(
            "{}\n\nTask: Generate an image based on this description: {}",
            instruction, prompt
        ),
        None => prompt.to_string(),
    }
}

fn request_body(prompt: &str, config: &StageConfig) -> Value {
    let size = config
        .aspect_ratio
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_IMAGE_SIZE);
    json!({
        "model": config.model_or(DEFAULT_GENERATION_MODEL),
        "prompt": compose_prompt(prompt, config),
        "size": size,
        "n": 1
    })
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract the result from a provider response.
///
/// Looked up in order: `data[0].url`, top-level `url`, `data[0].b64_json`
/// (taken as PNG), then `images[0]` as a string or as an object with
/// `url` / `b64_json`.
pub fn parse_image_response(v: &Value) -> Result<ImageHandle, StageError> {
    let first = v.pointer("/data/0");

    if let Some(url) = non_empty_str(first.and_then(|d| d.get("url")))
        .or_else(|| non_empty_str(v.get("url")))
    {
        if let Some(handle) = ImageHandle::parse(url) {
            return Ok(handle);
        }
    }

    if let Some(b64) = non_empty_str(first.and_then(|d| d.get("b64_json"))) {
        return Ok(ImageHandle::inline_png(b64));
    }

    match v.pointer("/images/0") {
        Some(Value::String(s)) => {
            if let Some(handle) = ImageHandle::parse(s) {
                return Ok(handle);
            }
        }
        Some(obj @ Value::Object(_)) => {
            if let Some(handle) = non_empty_str(obj.get("url")).and_then(ImageHandle::parse) {
                return Ok(handle);
            }
            if let Some(b64) = non_empty_str(obj.get("b64_json")) {
                return Ok(ImageHandle::inline_png(b64));
            }
        }
        _ => {}
    }

    Err(StageError::NoImage)
}

#[async_trait]
impl GenerationStage for OpenAiImageStage {
    fn name(&self) -> &str {
        "openai-images"
    }

    async fn generate_image(
        &self,
        image: &SourceImage,
        prompt: &str,
        config: &StageConfig,
    ) -> Result<ImageHandle, StageError> {
        let (api_key, base_url) = require_endpoint(Stage::Generation, config)?;
        let url = format!("{}/images/generations", base_url);
        let body = request_body(prompt, config);

        tracing::debug!(
            target: "uniflow.http",
            stage = "generation.in",
            url = %url,
            model = %body["model"],
            size = %body["size"],
            file = %image.file_name,
            prompt_len = prompt.len()
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(Stage::Generation, resp).await);
        }

        let text = resp.text().await.map_err(transport_error)?;
        let v: Value = serde_json::from_str(&text).map_err(|e| {
            StageError::MalformedResponse(format!("{} | body={}", e, preview_body(&text)))
        })?;
        let handle = parse_image_response(&v)?;

        tracing::debug!(
            target: "uniflow.http",
            stage = "generation.out",
            status = %status,
            inline = handle.is_inline()
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn config(base_url: &str) -> StageConfig {
        StageConfig {
            api_key: "sk-gen".into(),
            base_url: base_url.to_string(),
            ..StageConfig::default()
        }
    }

    fn image() -> SourceImage {
        SourceImage::new("cat.png", b"pngbytes".to_vec())
    }

    #[test]
    fn test_parse_data_url_first() {
        let v = json!({
            "url": "https://top.example/x.png",
            "data": [{"url": "https://data.example/x.png", "b64_json": "AAAA"}]
        });
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::Url("https://data.example/x.png".into())
        );
    }

    #[test]
    fn test_parse_top_level_url_before_b64() {
        let v = json!({
            "url": "https://top.example/x.png",
            "data": [{"b64_json": "AAAA"}]
        });
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::Url("https://top.example/x.png".into())
        );
    }

    #[test]
    fn test_parse_b64_as_inline_png() {
        let v = json!({"data": [{"b64_json": "iVBORw0KGgo="}]});
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::inline_png("iVBORw0KGgo=")
        );
    }

    #[test]
    fn test_parse_images_array_shapes() {
        let v = json!({"images": ["https://alt.example/1.png"]});
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::Url("https://alt.example/1.png".into())
        );

        let v = json!({"images": ["data:image/webp;base64,UklGRg=="]});
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::Inline {
                mime: "image/webp".into(),
                data: "UklGRg==".into()
            }
        );

        let v = json!({"images": [{"b64_json": "AAAA"}]});
        assert_eq!(
            parse_image_response(&v).unwrap(),
            ImageHandle::inline_png("AAAA")
        );
    }

    #[test]
    fn test_parse_nothing_usable() {
        for v in [
            json!({}),
            json!({"data": []}),
            json!({"data": [{"url": ""}]}),
            json!({"images": [42]}),
        ] {
            assert_eq!(parse_image_response(&v), Err(StageError::NoImage));
        }
    }

    #[test]
    fn test_compose_prompt() {
        let mut cfg = StageConfig::default();
        assert_eq!(compose_prompt("a cat", &cfg), "a cat");

        cfg.system_instruction = Some("Watercolor style.".into());
        assert_eq!(
            compose_prompt("a cat", &cfg),
            "Watercolor style.\n\nTask: Generate an image based on this description: a cat"
        );
    }

    #[tokio::test]
    async fn test_request_shape_and_url_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/images/generations")
            .match_header("authorization", "Bearer sk-gen")
            .match_body(Matcher::Json(json!({
                "model": "flux.1",
                "prompt": "a cat on a mat",
                "size": "1024x1024",
                "n": 1
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"url":"https://cdn.example/out.png"}]}"#)
            .create_async()
            .await;

        let stage = OpenAiImageStage::new(5_000).unwrap();
        let handle = stage
            .generate_image(&image(), "a cat on a mat", &config(&server.url()))
            .await
            .unwrap();
        assert_eq!(handle, ImageHandle::Url("https://cdn.example/out.png".into()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_custom_model_and_size() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/images/generations")
            .match_body(Matcher::PartialJson(json!({
                "model": "dall-e-3",
                "size": "1792x1024"
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"b64_json":"AAAA"}]}"#)
            .create_async()
            .await;

        let mut cfg = config(&server.url());
        cfg.model = "dall-e-3".into();
        cfg.aspect_ratio = Some("1792x1024".into());

        let stage = OpenAiImageStage::new(5_000).unwrap();
        let handle = stage.generate_image(&image(), "p", &cfg).await.unwrap();
        assert!(handle.is_inline());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/images/generations")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let stage = OpenAiImageStage::new(5_000).unwrap();
        let err = stage
            .generate_image(&image(), "p", &config(&server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Image Gen Error (429): rate limited");
    }

    #[tokio::test]
    async fn test_missing_image_in_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/images/generations")
            .with_status(200)
            .with_body(r#"{"created": 1}"#)
            .create_async()
            .await;

        let stage = OpenAiImageStage::new(5_000).unwrap();
        let err = stage
            .generate_image(&image(), "p", &config(&server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No image URL returned from provider.");
    }

    #[tokio::test]
    async fn test_missing_endpoint() {
        let stage = OpenAiImageStage::new(5_000).unwrap();
        let cfg = StageConfig {
            api_key: "sk".into(),
            ..StageConfig::default()
        };
        let err = stage.generate_image(&image(), "p", &cfg).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing Base URL for generation node.");
    }
}
