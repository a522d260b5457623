// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

//! Minimal HTTP/1.1 client for the mempool API.

use std::path::Path;
use std::time::Duration;

use mempool_core::user_op::UserOperation;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:50051";
pub const DEFAULT_USER_OP_FILE: &str = "userop.json";
pub const USER_OPERATIONS_PATH: &str = "/user_operations";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResponse {
    pub ok: bool,
    pub user_operation: UserOperation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub user_operations: Vec<UserOperation>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid user operation JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("timed out while {0}")]
    Timeout(&'static str),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed http response: {0}")]
    Response(String),
    #[error("server replied {status}: {body}")]
    Status { status: u16, body: String },
}

pub fn read_user_operation(path: &Path) -> Result<UserOperation, ClientError> {
    let data = std::fs::read(path).map_err(|source| ClientError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_slice(&data)?)
}

pub async fn add_user_operation(
    endpoint: &str,
    user_operation: &UserOperation,
    timeout: Duration,
) -> Result<AddResponse, ClientError> {
    let body = serde_json::to_string(user_operation)?;
    let response = request(endpoint, "POST", Some(body.as_str()), timeout).await?;
    Ok(serde_json::from_str(response.as_str())?)
}

pub async fn list_user_operations(
    endpoint: &str,
    timeout: Duration,
) -> Result<ListResponse, ClientError> {
    let response = request(endpoint, "GET", None, timeout).await?;
    Ok(serde_json::from_str(response.as_str())?)
}

async fn request(
    endpoint: &str,
    method: &str,
    body: Option<&str>,
    timeout: Duration,
) -> Result<String, ClientError> {
    let (host_port, path_prefix) = parse_http_url(endpoint).map_err(ClientError::Endpoint)?;
    let path = format!(
        "{}{USER_OPERATIONS_PATH}",
        path_prefix.trim_end_matches('/')
    );
    let request = match body {
        Some(body) => format!(
            "{method} {path} HTTP/1.1\r\nHost: {host_port}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{method} {path} HTTP/1.1\r\nHost: {host_port}\r\nConnection: close\r\n\r\n"),
    };

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(host_port.as_str()))
        .await
        .map_err(|_| ClientError::Timeout("connecting"))??;
    tokio::time::timeout(timeout, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| ClientError::Timeout("writing request"))??;
    tokio::time::timeout(timeout, stream.flush())
        .await
        .map_err(|_| ClientError::Timeout("flushing request"))??;

    let mut response = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = tokio::time::timeout(timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| ClientError::Timeout("reading response"))??;
        if read == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..read]);

        if let Some((header_end, content_length)) = response_content_len(response.as_slice())
            && response.len() >= header_end.saturating_add(content_length)
        {
            break;
        }
    }

    let (status, body) = parse_http_response(response.as_slice()).map_err(ClientError::Response)?;
    if !(200..300).contains(&status) {
        return Err(ClientError::Status { status, body });
    }
    Ok(body)
}

/// Splits `http://host:port/prefix` into `("host:port", "/prefix")`.
pub fn parse_http_url(url: &str) -> Result<(String, String), String> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| format!("only http:// endpoints are supported, got {url}"))?;
    let (host_port, path) = match rest.find('/') {
        Some(index) => (&rest[..index], &rest[index..]),
        None => (rest, ""),
    };
    if host_port.is_empty() {
        return Err(format!("missing host in {url}"));
    }
    Ok((host_port.to_string(), path.to_string()))
}

/// Returns the status code and body of a complete HTTP/1.1 response.
pub fn parse_http_response(raw: &[u8]) -> Result<(u16, String), String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("response is not utf8: {e}"))?;
    let (headers, body) = text
        .split_once("\r\n\r\n")
        .ok_or_else(|| "missing header terminator".to_string())?;
    let status = headers
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| "missing status line".to_string())?
        .parse::<u16>()
        .map_err(|e| format!("invalid status code: {e}"))?;
    Ok((status, body.to_string()))
}

/// Header length and declared `Content-Length`, once the header block is complete.
pub fn response_content_len(raw: &[u8]) -> Option<(usize, usize)> {
    let header_end = raw.windows(4).position(|window| window == b"\r\n\r\n")? + 4;
    let headers = std::str::from_utf8(&raw[..header_end]).ok()?;
    let mut content_length = None;
    for line in headers.lines() {
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse::<usize>().ok();
            break;
        }
    }
    content_length.map(|len| (header_end, len))
}
