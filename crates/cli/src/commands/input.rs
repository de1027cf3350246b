//! Line input from the terminal.
//!
//! Stdin is read on its own task so the prompt can be awaited alongside
//! everything else on the runtime.

use std::io::Write;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

pub struct LineReader {
    rx: mpsc::Receiver<String>,
}

impl LineReader {
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(pump(BufReader::new(io::stdin()), tx));
        Self { rx }
    }

    /// Print `prompt` and wait for a line. `None` means stdin was closed.
    pub async fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        self.rx.recv().await
    }
}

/// Forward lines from `reader` until EOF, a read error, or the receiver goes away.
/// Invalid UTF-8 is replaced rather than ending the session.
async fn pump<R: AsyncBufRead + Unpin>(mut reader: R, tx: mpsc::Sender<String>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from stdin");
                break;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if std::str::from_utf8(raw).is_err() {
        warn!("Input line was not valid UTF-8; invalid bytes replaced");
    }
    String::from_utf8_lossy(raw).into_owned()
}
