//! Line-delimited JSON-RPC over stdio.
//!
//! Each inbound line is handled on its own task so slow tool calls do not block
//! `ping` or other invocations; responses are written back as they complete.

use super::core::FreshserviceMcpServer;
use super::protocol::{PARSE_ERROR, error_response};
use crate::upstream::Transport;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

impl<T: Transport + 'static> FreshserviceMcpServer<T> {
    /// Serve JSON-RPC messages read line by line from `reader` until EOF.
    ///
    /// In-flight invocations are drained before returning.
    pub async fn serve_lines<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

        // The channel closes once the reader and every spawned handler drop their senders.
        let read = async move {
            let mut lines = reader.lines();
            while let Some(line) = lines.next_line().await? {
                if !line.trim().is_empty() {
                    self.clone().spawn_message(&line, tx.clone());
                }
            }
            debug!("Input closed, draining in-flight requests");
            Ok::<_, std::io::Error>(())
        };
        let write = async {
            while let Some(response) = rx.recv().await {
                writer.write_all(response.to_string().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        tokio::try_join!(read, write).map(|_| ())
    }

    fn spawn_message(self: Arc<Self>, line: &str, tx: mpsc::UnboundedSender<Value>) {
        let message = match serde_json::from_str::<Value>(line) {
            Ok(message) => message,
            Err(error) => {
                warn!("Discarding unparseable message: {}", error);
                let _ = tx.send(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {error}"),
                ));
                return;
            }
        };
        tokio::spawn(async move {
            if let Some(response) = self.handle_message(message).await {
                let _ = tx.send(response);
            }
        });
    }

    /// Run the MCP server using stdio communication
    ///
    /// Reads requests from stdin and writes responses to stdout. Logging must go
    /// to stderr while this runs.
    pub async fn run_stdio(self: Arc<Self>) -> std::io::Result<()> {
        info!(
            "{} {} ready on stdio with {} tools",
            self.server_info.name,
            self.server_info.version,
            self.dispatcher.list_operations().len()
        );
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve_lines(stdin, tokio::io::stdout()).await
    }
}
