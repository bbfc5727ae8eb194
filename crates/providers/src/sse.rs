//! Decoding of OpenAI-style server-sent event streams.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Decode one SSE line. Lines that are not `data:` payloads, payloads that do
/// not parse, and chunks without delta content yield `None`.
pub fn decode_line(line: &str) -> Option<SseEvent> {
    let data = line.trim_end_matches('\r').strip_prefix("data: ")?;
    if data.trim() == "[DONE]" {
        return Some(SseEvent::Done);
    }
    let chunk: Value = serde_json::from_str(data).ok()?;
    let content = chunk["choices"].get(0)?["delta"]["content"].as_str()?;
    (!content.is_empty()).then(|| SseEvent::Delta(content.to_string()))
}

/// Reassembles lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return the events completed by it. Nothing is
    /// returned once `[DONE]` has been seen.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).to_string();
            match decode_line(&line) {
                Some(SseEvent::Done) => {
                    self.done = true;
                    self.buffer.clear();
                    events.push(SseEvent::Done);
                    break;
                }
                Some(event) => events.push(event),
                None => {}
            }
        }
        events
    }

    /// Decode a trailing line left without a newline at end of stream.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).to_string();
        self.buffer.clear();
        decode_line(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line("data: [DONE]"), Some(SseEvent::Done));
        assert_eq!(
            decode_line(chunk("Hi").trim_end()),
            Some(SseEvent::Delta("Hi".to_string()))
        );
        assert_eq!(decode_line("data: {not json"), None);
        assert_eq!(decode_line(": keep-alive"), None);
        assert_eq!(decode_line(r#"data: {"choices":[{"delta":{}}]}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), None);
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let stream = format!(
            "{}\n{}data: garbage\n{}data: [DONE]\n{}",
            chunk("Hel"),
            chunk("lo"),
            chunk("!"),
            chunk("ignored")
        );
        let bytes = stream.as_bytes();
        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        for piece in bytes.chunks(7) {
            for event in decoder.push(piece) {
                if let SseEvent::Delta(delta) = event {
                    text.push_str(&delta);
                }
            }
        }
        assert_eq!(text, "Hello!");
        assert!(decoder.is_done());
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_finish_decodes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        let line = chunk("tail");
        assert!(decoder.push(line.trim_end().as_bytes()).is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Delta("tail".to_string())));
    }
}
