//! Newline-delimited JSON-RPC over a byte stream.
//!
//! One line in, at most one line out. The next line is only read after the
//! previous request has been answered.

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::handlers::{Dispatch, handle_request};
use super::jsonrpc::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcRequest, salvage_id};
use super::session::Session;
use crate::calendar::CalendarService;

/// Decode one line, or build the parse error to send back.
fn decode_line(line: &[u8]) -> Result<JsonRpcRequest, JsonRpcErrorResponse> {
    let raw: Value = serde_json::from_slice(line)
        .map_err(|e| JsonRpcErrorResponse::parse_error(Value::Null, e.to_string()))?;
    let id = salvage_id(&raw);
    serde_json::from_value(raw).map_err(|e| JsonRpcErrorResponse::parse_error(id, e.to_string()))
}

async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &JsonRpcMessage,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message).context("Failed to encode response")?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush response")?;
    Ok(())
}

/// Serve requests from `reader` until EOF or `exit`.
pub async fn serve<R, W>(
    service: &CalendarService,
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read request")?;
        if read == 0 {
            break;
        }
        // Bytes, not str: a line with invalid UTF-8 is a parse error, not EOF.
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let request = match decode_line(line) {
            Ok(request) => request,
            Err(parse_error) => {
                tracing::warn!(
                    detail = ?parse_error.error.data,
                    "Discarding malformed request line"
                );
                write_message(&mut writer, &JsonRpcMessage::from(parse_error)).await?;
                continue;
            }
        };

        if request.jsonrpc != "2.0" {
            tracing::debug!(version = %request.jsonrpc, "Request without jsonrpc 2.0 marker");
        }
        tracing::debug!(method = %request.method, id = %request.reply_id(), "Request");
        match handle_request(service, &mut session, &request).await {
            Dispatch::Reply(message) => write_message(&mut writer, &message).await?,
            Dispatch::Silent => {}
            Dispatch::Exit => {
                tracing::info!("Exit requested");
                return Ok(());
            }
        }
    }

    tracing::info!("Input closed");
    Ok(())
}
