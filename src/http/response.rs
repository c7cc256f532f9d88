use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::types::Status;

/// 响应头，按收到的顺序保留
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub key: String,
    pub value: String,
}

/// 错误来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// 请求没有发出（空 URL、组装失败）
    Validation,
    /// 传输层失败（DNS、连接、超时、TLS）
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub message: String,
}

/// 统一的响应结构
///
/// 正常响应填 status/statusText/data，失败只填 error，其余形状一致。
/// 非 2xx 状态码也是正常响应。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// 响应体原文，不做 JSON 解析
    pub data: Option<String>,
    pub headers: Vec<ResponseHeader>,
    pub duration_ms: u64,
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<ResponseHeader>, data: String, duration: Duration) -> Self {
        let status_text = Status::new(status)
            .map(|s| s.reason_phrase().to_string())
            .unwrap_or_default();
        Self {
            status: Some(status),
            status_text: Some(status_text),
            data: Some(data),
            headers,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: None,
            status_text: None,
            data: None,
            headers: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            error: Some(ResponseError {
                kind,
                message: message.into(),
            }),
        }
    }

    /// 请求未发出时合成的错误响应
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::Validation, message, Duration::ZERO)
    }

    pub fn network_error(message: impl Into<String>, duration: Duration) -> Self {
        Self::failure(ErrorKind::Network, message, duration)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn status(&self) -> Option<Status> {
        self.status.and_then(|code| Status::new(code).ok())
    }

    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|s| s.is_success())
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_client_error())
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_server_error())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// 按名称查找响应头（不区分大小写）
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    pub fn text(&self) -> &str {
        self.data.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_response_shape() {
        let response = Response::new(
            404,
            vec![ResponseHeader {
                key: "content-type".to_string(),
                value: "text/plain".to_string(),
            }],
            "not found".to_string(),
            Duration::from_millis(12),
        );

        assert_eq!(response.status, Some(404));
        assert_eq!(response.status_text.as_deref(), Some("Not Found"));
        assert_eq!(response.text(), "not found");
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert!(response.is_client_error());
        assert!(!response.is_error());
    }

    #[test]
    fn test_failure_shape() {
        let response = Response::validation_error("Request URL is empty");
        assert!(response.status.is_none());
        assert!(response.data.is_none());
        assert_eq!(response.duration_ms, 0);
        assert_eq!(response.error.as_ref().unwrap().kind, ErrorKind::Validation);
        assert!(!response.is_success());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(Response::network_error("refused", Duration::ZERO)).unwrap();
        assert!(value.get("statusText").is_some());
        assert!(value.get("durationMs").is_some());
        assert_eq!(value["error"]["kind"], "network");
    }
}
