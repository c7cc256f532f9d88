use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use tracing::{debug, info, warn};

use crate::compose::{ComposedBody, ComposedRequest};
use crate::http::response::{Response, ResponseHeader};
use crate::{PostcodeError, Result};

/// 单次发送的传输选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// 是否校验 TLS 证书，按请求设置，不修改任何全局状态
    pub strict_ssl: bool,
    pub timeout: Option<Duration>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            strict_ssl: true,
            timeout: None,
        }
    }
}

impl TransportOptions {
    pub fn insecure(mut self) -> Self {
        self.strict_ssl = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// 发送组装好的请求并把结果统一成 [`Response`]
///
/// 只有传输层失败才产生 error 响应，任何状态码都算正常响应。
#[derive(Clone)]
pub struct Dispatcher {
    strict: reqwest::Client,
    insecure: reqwest::Client,
}

impl Dispatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            strict: Self::build_client(true)?,
            insecure: Self::build_client(false)?,
        })
    }

    fn build_client(strict_ssl: bool) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("postcode/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!strict_ssl)
            .build()
            .map_err(PostcodeError::HttpError)
    }

    pub async fn send(&self, request: &ComposedRequest, options: &TransportOptions) -> Response {
        if request.url.trim().is_empty() {
            warn!("Refusing to send request with empty URL");
            return Response::validation_error("Request URL is empty");
        }

        let url = match url::Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                return Response::validation_error(
                    PostcodeError::InvalidUrl(format!("{}: {}", request.url, e)).to_string(),
                );
            }
        };

        let headers = match Self::header_map(request) {
            Ok(headers) => headers,
            Err(e) => return Response::validation_error(e.to_string()),
        };

        let client = if options.strict_ssl {
            &self.strict
        } else {
            &self.insecure
        };

        let mut builder = client
            .request(request.method.to_reqwest(), url)
            .headers(headers);

        match &request.body {
            ComposedBody::Bytes(bytes) if !bytes.is_empty() => {
                builder = builder.body(bytes.clone());
            }
            ComposedBody::Bytes(_) => {}
            ComposedBody::Multipart(fields) => {
                builder = builder.multipart(multipart_form(fields));
            }
        }
        if let Some(basic) = &request.basic_auth {
            builder = builder.basic_auth(&basic.username, Some(&basic.password));
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(method = %request.method, url = %request.url, strict_ssl = options.strict_ssl, "Sending request");

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let duration = start.elapsed();
                warn!(url = %request.url, "Request failed: {}", e);
                return Response::network_error(describe_error(&e).to_string(), duration);
            }
        };
        let duration = start.elapsed();

        let status = response.status().as_u16();
        let response_headers: Vec<ResponseHeader> = response
            .headers()
            .iter()
            .map(|(k, v)| ResponseHeader {
                key: k.as_str().to_string(),
                value: String::from_utf8_lossy(v.as_bytes()).into_owned(),
            })
            .collect();

        match response.bytes().await {
            Ok(body) => {
                info!(
                    method = %request.method,
                    url = %request.url,
                    status,
                    duration_ms = duration.as_millis() as u64,
                    "Response received"
                );
                Response::new(
                    status,
                    response_headers,
                    String::from_utf8_lossy(&body).into_owned(),
                    duration,
                )
            }
            Err(e) => {
                warn!(url = %request.url, "Failed to read response body: {}", e);
                Response::network_error(describe_error(&e).to_string(), duration)
            }
        }
    }

    /// 按顺序写入请求头，同名（不区分大小写）后写覆盖先写
    fn header_map(request: &ComposedRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in request.headers.iter() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| PostcodeError::ValidationError(format!("Invalid header name: {}", key)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| PostcodeError::ValidationError(format!("Invalid value for header {}", key)))?;
            headers.insert(name, value);
        }
        // 原生 basic 认证优先于手写的 Authorization 头
        if request.basic_auth.is_some() {
            headers.remove(AUTHORIZATION);
        }
        // multipart 的 Content-Type 由 reqwest 连同 boundary 一起写入
        if matches!(request.body, ComposedBody::Multipart(_)) {
            headers.remove(CONTENT_TYPE);
        }
        Ok(headers)
    }
}

fn multipart_form(fields: &[(String, String)]) -> Form {
    fields
        .iter()
        .fold(Form::new(), |form, (name, value)| form.text(name.clone(), value.clone()))
}

fn describe_error(error: &reqwest::Error) -> PostcodeError {
    let kind = if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connection failed"
    } else if error.is_body() || error.is_decode() {
        "body error"
    } else {
        "request error"
    };
    PostcodeError::NetworkError(format!("{}: {}", kind, error))
}
