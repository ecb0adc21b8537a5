use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use uniflow_core::api::{PromptStream, SourceImage, Stage, StageConfig, StageError, VisionStage};
use uniflow_core::config::defaults::{DEFAULT_VISION_MODEL, FALLBACK_VISION_INSTRUCTION};

use super::http::{build_client, preview_body, require_endpoint, status_error, transport_error};
use super::sse::{message_content, SseDeltaParser, SseEvent};

const NO_ANALYSIS_RESULT: &str = "No analysis result found.";

/// Vision stage backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiVisionStage {
    http: reqwest::Client,
}

impl OpenAiVisionStage {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout_ms)?,
        })
    }
}

fn request_body(image: &SourceImage, config: &StageConfig) -> Value {
    let instruction = config.instruction().unwrap_or(FALLBACK_VISION_INSTRUCTION);
    json!({
        "model": config.model_or(DEFAULT_VISION_MODEL),
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": instruction },
                { "type": "image_url", "image_url": { "url": image.to_data_uri() } }
            ]
        }],
        "stream": true
    })
}

#[async_trait]
impl VisionStage for OpenAiVisionStage {
    fn name(&self) -> &str {
        "openai-vision"
    }

    async fn describe_image(
        &self,
        image: &SourceImage,
        config: &StageConfig,
    ) -> Result<PromptStream, StageError> {
        let (api_key, base_url) = require_endpoint(Stage::Analysis, config)?;
        let url = format!("{}/chat/completions", base_url);
        let body = request_body(image, config);

        tracing::debug!(
            target: "uniflow.http",
            stage = "vision.in",
            url = %url,
            model = %body["model"],
            file = %image.file_name,
            bytes = image.bytes.len()
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
            return Err(status_error(Stage::Analysis, resp).await);
        }

        let is_event_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        tracing::debug!(
            target: "uniflow.http",
            stage = "vision.out",
            status = %status,
            streaming = is_event_stream
        );

        if !is_event_stream {
            let text = resp.text().await.map_err(transport_error)?;
            let v: Value = serde_json::from_str(&text).map_err(|e| {
                StageError::MalformedResponse(format!("{} | body={}", e, preview_body(&text)))
            })?;
            let content = message_content(&v)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| NO_ANALYSIS_RESULT.to_string());
            return Ok(stream::once(async move { Ok(content) }).boxed());
        }

        Ok(prefix_stream(resp.bytes_stream()).boxed())
    }
}

/// Turn raw SSE chunks into the running text so far, one element per delta.
/// Always yields at least one element.
fn prefix_stream<S>(chunks: S) -> impl Stream<Item = Result<String, StageError>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut parser = SseDeltaParser::new();
        let mut text = String::new();
        let mut yielded = false;
        let mut done = false;

        'read: while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(transport_error(err));
                    return;
                }
            };
            for event in parser.push(&chunk) {
                match event {
                    SseEvent::Delta(delta) => {
                        text.push_str(&delta);
                        yielded = true;
                        yield Ok(text.clone());
                    }
                    SseEvent::Done => {
                        done = true;
                        break 'read;
                    }
                }
            }
        }

        if !done {
            if let Some(SseEvent::Delta(delta)) = parser.finish() {
                text.push_str(&delta);
                yielded = true;
                yield Ok(text.clone());
            }
        }

        if !yielded {
            yield Ok(text);
        }
    }
}
