//! Request/response framing
//!
//! Requests are `PUT /<procedure>` with a `Content-Length` header followed by
//! exactly that many payload bytes. Responses carry a status line, a
//! `Content-Length` header and the payload. No chunked encoding.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::request::Procedure;

/// Upper bound on header lines accepted in one response head
const MAX_HEADER_LINES: usize = 64;

/// Upper bound on the length of one status or header line
const MAX_LINE_BYTES: usize = 8 * 1024;

/// A node's answer as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Write one request for `procedure`, addressed to `host`
pub async fn write_request<W>(writer: &mut W, host: &str, procedure: &Procedure) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "PUT /{} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        procedure.name(),
        host,
        procedure.body().len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(procedure.body()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one response
///
/// Non-2xx responses are returned without reading their body. For 2xx
/// responses the `Content-Length` header must be present and numeric, and
/// exactly that many bytes must follow.
pub async fn read_response<R>(reader: &mut R, max_body: usize) -> Result<Response>
where
    R: AsyncBufRead + Unpin,
{
    let status = read_status_line(reader).await?;

    let mut content_length: Option<String> = None;
    let mut lines = 0;
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        lines += 1;
        if lines > MAX_HEADER_LINES {
            return Err(Error::InvalidFrame("Too many header lines".to_string()));
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = Some(value.trim().to_string());
            }
        }
    }

    let response_ok = (200..300).contains(&status);
    if !response_ok {
        return Ok(Response {
            status,
            body: Vec::new(),
        });
    }

    let declared = match content_length {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| Error::InvalidLength(raw.clone()))?,
        None => return Err(Error::InvalidLength("missing".to_string())),
    };

    if declared > max_body {
        return Err(Error::InvalidFrame(format!(
            "Message too large: {} bytes",
            declared
        )));
    }

    let mut body = Vec::with_capacity(declared.min(64 * 1024));
    (&mut *reader)
        .take(declared as u64)
        .read_to_end(&mut body)
        .await?;
    if body.len() < declared {
        return Err(Error::Truncated {
            declared,
            received: body.len(),
        });
    }

    Ok(Response { status, body })
}

async fn read_status_line<R>(reader: &mut R) -> Result<u16>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse::<u16>()
            .map_err(|_| Error::InvalidFrame(format!("Bad status line: {}", line))),
        _ => Err(Error::InvalidFrame(format!("Bad status line: {}", line))),
    }
}

/// Read a CRLF (or LF) terminated line, without the terminator
///
/// Lines longer than `MAX_LINE_BYTES` are rejected before they are buffered
/// in full.
async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64)
        .read_line(&mut line)
        .await?;
    if read == 0 {
        return Err(Error::ConnectionClosed);
    }
    if read >= MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(Error::InvalidFrame("Header line too long".to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
