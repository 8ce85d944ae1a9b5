//! Console transport - 로컬 stdin/stdout 채널
//!
//! 채팅 네트워크 없이 바이너리를 돌릴 때 사용한다. 각 메시지는 한 줄
//! `[chat] #id text` 형태로 출력된다.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use warden_gate::{MessageHandle, Transport, TransportError};

pub struct ConsoleTransport<W> {
    out: Mutex<W>,
    next_id: AtomicU64,
}

impl ConsoleTransport<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_id: AtomicU64::new(1),
        }
    }

    async fn write_line(&self, line: String) -> Result<(), TransportError> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))
    }

    #[cfg(test)]
    async fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> Transport for ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.write_line(format!("[{}] #{} {}", chat_id, id, text))
            .await?;
        Ok(MessageHandle::new(chat_id, id))
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<(), TransportError> {
        self.write_line(format!(
            "[{}] #{} (edited) {}",
            handle.chat_id, handle.message_id, text
        ))
        .await
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), TransportError> {
        self.write_line(format!(
            "[{}] #{} (deleted)",
            handle.chat_id, handle.message_id
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_lines() {
        let console = ConsoleTransport::new(Vec::new());

        let handle = console.send("42", "Processing...").await.unwrap();
        assert_eq!(handle, MessageHandle::new("42", "1"));
        console.edit(&handle, "done").await.unwrap();
        let second = console.send("42", "bye").await.unwrap();
        console.delete(&second).await.unwrap();

        let text = String::from_utf8(console.into_inner().await).unwrap();
        assert_eq!(
            text,
            "[42] #1 Processing...\n[42] #1 (edited) done\n[42] #2 bye\n[42] #2 (deleted)\n"
        );
    }
}
