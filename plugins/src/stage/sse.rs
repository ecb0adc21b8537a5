//! Incremental decoder for OpenAI-style chat completion event streams.

use serde_json::Value;

/// What one complete `data:` line contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Line-buffered SSE parser. Feed raw network chunks; complete lines are
/// decoded and partial lines (including split UTF-8 sequences) wait for the
/// next chunk.
#[derive(Debug, Default)]
pub struct SseDeltaParser {
    buf: Vec<u8>,
}

impl SseDeltaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(ev) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(ev);
            }
        }
        events
    }

    /// Decode whatever is left once the stream ends without a final newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }

    // malformed chunks are skipped
    let v: Value = serde_json::from_str(payload).ok()?;
    let content = v
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)?;
    if content.is_empty() {
        return None;
    }
    Some(SseEvent::Delta(content.to_string()))
}

/// `choices[0].message.content` of a non-streamed completion.
pub fn message_content(v: &Value) -> Option<String> {
    v.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}
