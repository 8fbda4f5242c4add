/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, `"message"` when the frame has none.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw[..end])) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Option<String> = None;

    for line in raw.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    if event.is_none() && data.is_none() {
        return None;
    }
    Some(SseFrame {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: put\ndata: {\"path\":\"/\",\"data\":null}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "put".into(),
                data: "{\"path\":\"/\",\"data\":null}".into(),
            }]
        );
    }

    #[test]
    fn test_frames_split_across_chunks_and_crlf() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: keep-al").is_empty());
        assert!(parser.feed(b"ive\r\ndata: null\r\n").is_empty());
        let frames = parser.feed(b"\r\nevent: patch\ndata: {}\n\nevent: pu");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "keep-alive");
        assert_eq!(frames[0].data, "null");
        assert_eq!(frames[1].event, "patch");
        assert!(parser.feed(b"t\ndata: 1\n\n").iter().any(|f| f.event == "put"));
    }

    #[test]
    fn test_multibyte_split() {
        let payload = "event: put\ndata: \"héllo\"\n\n".as_bytes();
        let split = payload.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let mut parser = SseParser::new();
        assert!(parser.feed(&payload[..split]).is_empty());
        let frames = parser.feed(&payload[split..]);
        assert_eq!(frames[0].data, "\"héllo\"");
    }

    #[test]
    fn test_comments_and_multiline_data() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b": heartbeat\n\ndata: a\ndata: b\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "message".into(),
                data: "a\nb".into(),
            }]
        );
    }
}
