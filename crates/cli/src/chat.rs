//! Interactive question loop over an already-ingested document.

use anyhow::Result;
use docqa_core::Session;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "> ";

fn is_exit(line: &str) -> bool {
    matches!(line.to_ascii_lowercase().as_str(), "exit" | "quit")
}

/// Reads questions line by line until EOF or `exit`/`quit`, writing each
/// answer with its confidence. Returns the number of questions answered.
pub async fn run<R, W>(session: &Session, input: R, mut output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0;
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit(question) {
            break;
        }
        let result = session.ask(question).await;
        output
            .write_all(format!("{}\nConfidence: {}%\n\n", result.text, result.confidence).as_bytes())
            .await?;
        answered += 1;
    }
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(answered)
}
