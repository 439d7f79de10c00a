//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Lines are accepted in order on the read loop; every request then runs in
//! its own task so that `notifications/cancelled` can reach a call that is
//! still waiting on an upstream. Responses are written in completion order.
//! Logs must go to stderr in this mode.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

use crate::mcp::{accept, answer, Intake, McpState, Reply};

/// Serve MCP on the process's stdin and stdout until stdin closes.
pub async fn run(state: Arc<McpState>) -> Result<()> {
    info!("📡 dataportal MCP on stdio");
    let reader = BufReader::new(tokio::io::stdin());
    serve(state, reader, tokio::io::stdout())
        .await
        .context("stdio transport failed")?;
    info!("stdin closed, shutting down");
    Ok(())
}

/// Serve one session over `reader`/`writer`. Returns the writer once the
/// reader is exhausted and every pending response has been written.
pub async fn serve<R, W>(state: Arc<McpState>, reader: R, mut writer: W) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let session_id = state.sessions.get_or_create(None);
    let (tx, mut rx) = mpsc::channel::<Value>(64);

    let read_loop = {
        let state = Arc::clone(&state);
        let session_id = session_id.clone();
        async move {
            let mut lines = reader.lines();
            let mut tasks = JoinSet::new();

            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                // Accepting inline keeps notifications and request
                // registration in line order.
                let pending = match accept(&state, &session_id, line.as_bytes()) {
                    Intake::Done(Reply::Rejected(body)) => {
                        let _ = tx.send(body).await;
                        continue;
                    }
                    Intake::Done(_) => continue,
                    Intake::Pending(pending) => pending,
                };

                let state = Arc::clone(&state);
                let session_id = session_id.clone();
                let tx = tx.clone();
                tasks.spawn(async move {
                    match answer(&state, &session_id, pending).await {
                        Reply::Response(body) | Reply::Rejected(body) => {
                            let _ = tx.send(body).await;
                        }
                        Reply::Cancelled(_) | Reply::Accepted => {}
                    }
                });
            }

            while tasks.join_next().await.is_some() {}
            Ok::<_, std::io::Error>(())
        }
    };

    let write_loop = async {
        while let Some(body) = rx.recv().await {
            let mut line = serde_json::to_vec(&body)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (read, write) = tokio::join!(read_loop, write_loop);
    state.sessions.remove(&session_id);
    read?;
    write?;
    Ok(writer)
}
