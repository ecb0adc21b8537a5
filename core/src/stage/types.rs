use std::fmt;

use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One of the two remote processing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Analysis,
    Generation,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Generation => "generation",
        }
    }

    /// Prefix used for non-2xx provider responses.
    pub fn error_label(self) -> &'static str {
        match self {
            Self::Analysis => "Vision API Error",
            Self::Generation => "Image Gen Error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally-addressable location of a generated image.
///
/// Providers either hand back a remote address or inline the encoded image;
/// both render to a URI via [`ImageHandle::as_uri`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ImageHandle {
    Url(String),
    Inline { mime: String, data: String },
}

impl ImageHandle {
    /// Parse a provider string: `data:<mime>;base64,<payload>` becomes `Inline`,
    /// anything else non-empty is treated as a URL.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(rest) = raw.strip_prefix("data:") {
            let (meta, data) = rest.split_once(',')?;
            let mime = meta.strip_suffix(";base64")?;
            if data.is_empty() {
                return None;
            }
            let mime = if mime.is_empty() { "image/png" } else { mime };
            return Some(Self::Inline {
                mime: mime.to_string(),
                data: data.to_string(),
            });
        }

        Some(Self::Url(raw.to_string()))
    }

    pub fn inline_png(b64: impl Into<String>) -> Self {
        Self::Inline {
            mime: "image/png".to_string(),
            data: b64.into(),
        }
    }

    pub fn as_uri(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { mime, data } => format!("data:{};base64,{}", mime, data),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline { .. })
    }

    /// Decoded bytes for inline handles; `None` for remote URLs.
    pub fn decode_inline(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            Self::Url(_) => None,
            Self::Inline { data, .. } => Some(general_purpose::STANDARD.decode(data)),
        }
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Inline { mime, data } => write!(f, "data:{};base64,<{} chars>", mime, data.len()),
        }
    }
}

impl From<ImageHandle> for String {
    fn from(handle: ImageHandle) -> Self {
        handle.as_uri()
    }
}

impl TryFrom<String> for ImageHandle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not an image handle: {:?}", value))
    }
}

/// Immutable source payload owned by a work item.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
    /// Path the image was read from. Left empty for in-memory submissions
    /// until the owning work item assigns `memory:<item id>`.
    pub preview: String,
}

impl SourceImage {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for_name(&file_name).to_string();
        Self {
            file_name,
            mime,
            bytes: bytes.into(),
            preview: String::new(),
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }
}

/// Best-effort MIME type from a file extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}

/// File extension matching a MIME type, used when saving results.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_uri_as_inline() {
        let handle = ImageHandle::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(
            handle,
            ImageHandle::Inline {
                mime: "image/jpeg".to_string(),
                data: "AAAA".to_string()
            }
        );
        assert_eq!(handle.as_uri(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn parses_plain_string_as_url() {
        let handle = ImageHandle::parse(" https://cdn.example.com/a.png ").unwrap();
        assert_eq!(
            handle,
            ImageHandle::Url("https://cdn.example.com/a.png".to_string())
        );
        assert!(ImageHandle::parse("   ").is_none());
        assert!(ImageHandle::parse("data:image/png,raw").is_none());
    }

    #[test]
    fn handle_serializes_as_uri_string() {
        let handle = ImageHandle::inline_png("iVBO");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"data:image/png;base64,iVBO\"");
        let back: ImageHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }

    #[test]
    fn decode_inline_only_for_inline_handles() {
        let handle = ImageHandle::inline_png(general_purpose::STANDARD.encode(b"png-bytes"));
        assert_eq!(handle.decode_inline().unwrap().unwrap(), b"png-bytes");
        assert!(ImageHandle::Url("https://x/y.png".into())
            .decode_inline()
            .is_none());
    }

    #[test]
    fn source_image_guesses_mime_and_encodes() {
        let img = SourceImage::new("Cat.JPG", b"abc".to_vec());
        assert_eq!(img.mime, "image/jpeg");
        assert!(img.preview.is_empty());
        assert_eq!(img.to_data_uri(), "data:image/jpeg;base64,YWJj");
    }
}
