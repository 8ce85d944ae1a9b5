//! Bounded output capture
//!
//! 자식 프로세스 출력을 무제한 버퍼링하지 않는다. 앞부분 `limit` 바이트와
//! 뒷부분 `limit` 바이트만 유지하고 가운데는 버린다.

use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default bytes kept at each end of a stream
pub const DEFAULT_CAPTURE_BYTES: usize = 64 * 1024;

/// Marker placed between kept prefix and suffix
pub const ELISION_MARKER: &str = "\n...\n";

/// Head + tail byte buffer
#[derive(Debug)]
pub struct BoundedCapture {
    limit: usize,
    head: Vec<u8>,
    tail: VecDeque<u8>,
    dropped: usize,
}

impl BoundedCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            head: Vec::new(),
            tail: VecDeque::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, mut chunk: &[u8]) {
        if self.head.len() < self.limit {
            let take = (self.limit - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];
        }

        self.tail.extend(chunk.iter().copied());
        if self.tail.len() > self.limit {
            let excess = self.tail.len() - self.limit;
            self.tail.drain(..excess);
            self.dropped += excess;
        }
    }

    /// Bytes discarded from the middle
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Decode (lossy) and join, returns (text, truncated)
    pub fn finish(self) -> (String, bool) {
        let head = String::from_utf8_lossy(&self.head);
        let tail_bytes: Vec<u8> = self.tail.into_iter().collect();
        let tail = String::from_utf8_lossy(&tail_bytes);

        if self.dropped == 0 {
            (format!("{}{}", head, tail), false)
        } else {
            (
                format!(
                    "{}\n... [{} bytes omitted] ...\n{}",
                    head, self.dropped, tail
                ),
                true,
            )
        }
    }
}

/// Read a stream to EOF into a bounded capture
pub async fn drain<R>(mut reader: R, limit: usize) -> std::io::Result<BoundedCapture>
where
    R: AsyncRead + Unpin,
{
    let mut capture = BoundedCapture::new(limit);
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        capture.push(&buf[..n]);
    }
    Ok(capture)
}

/// Cut text longer than `limit` characters to `keep` prefix + marker + `keep` suffix
pub fn truncate_middle(text: &str, limit: usize, keep: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }

    let keep = keep.min(limit / 2);
    let prefix: String = text.chars().take(keep).collect();
    let suffix: String = text.chars().skip(total - keep).collect();
    format!("{}{}{}", prefix, ELISION_MARKER, suffix)
}

/// Strip ANSI escape sequences from output
pub fn strip_ansi(input: &str) -> String {
    strip_ansi_escapes::strip_str(input).to_string()
}
