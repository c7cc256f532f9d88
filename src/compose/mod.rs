//! 请求组装：把编辑器里的请求描述翻译成可直接发送的请求
//!
//! 纯函数，不做任何网络或存储 I/O。

pub mod body;
pub mod headers;

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::http::types::{Method, resolve_url};
use crate::model::{AuthType, BasicCredential, KeyValue, RequestSpec};

pub use body::{ComposedBody, EncodedBody, encode_body};
pub use headers::HeaderList;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Request URL is empty")]
    EmptyUrl,

    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("Invalid value for header {0:?}")]
    InvalidHeaderValue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 组装完成、可直接交给 Dispatcher 的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderList,
    pub body: ComposedBody,
    /// basic 认证交给传输层处理，不手工拼 Authorization 头
    pub basic_auth: Option<BasicCredential>,
}

/// 组装请求
///
/// 请求头的写入顺序（后写覆盖先写）:
/// 1. bearer 认证写入 `Authorization: Bearer <token>`
/// 2. 按列表顺序写入未禁用的请求头
/// 3. body 模式决定的 `Content-Type`（none 模式不写）
pub fn compose(spec: &RequestSpec) -> Result<ComposedRequest, ComposeError> {
    let base_url = resolve_url(&spec.url);
    if base_url.is_empty() {
        return Err(ComposeError::EmptyUrl);
    }
    let url = apply_query(&base_url, &spec.query_params)?;

    let mut headers = HeaderList::new();

    if spec.auth.auth_type == AuthType::Bearer {
        let token = spec
            .auth
            .bearer
            .as_ref()
            .map(|b| b.token.as_str())
            .unwrap_or_default();
        headers.set("Authorization", &format!("Bearer {}", token));
    }

    for header in spec.headers.iter().filter(|h| h.is_active()) {
        headers.set(&header.key, &header.value);
    }

    let encoded = encode_body(&spec.body)?;
    if let Some(content_type) = &encoded.content_type {
        headers.set("Content-Type", content_type);
    }

    validate_headers(&headers)?;

    let basic_auth = match spec.auth.auth_type {
        AuthType::Basic => Some(spec.auth.basic.clone().unwrap_or_default()),
        AuthType::Noauth | AuthType::Bearer => None,
    };

    debug!(
        method = %spec.method,
        url = %url,
        headers = headers.len(),
        multipart = matches!(encoded.body, ComposedBody::Multipart(_)),
        "Request composed"
    );

    Ok(ComposedRequest {
        method: spec.method,
        url,
        headers,
        body: encoded.body,
        basic_auth,
    })
}

/// 用查询参数列表重建 URL 的查询串
///
/// `url` 与 `queryParams` 是同一份查询的两种表示，列表非空时以列表为准：
/// 原有查询串被替换为未禁用参数的编码结果，fragment 保留在最后。
/// 列表为空时 URL 原样使用。
fn apply_query(url: &str, params: &[KeyValue]) -> Result<String, ComposeError> {
    if params.is_empty() {
        return Ok(url.to_string());
    }
    let query = body::urlencode_pairs(params)?;

    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let base = head.split_once('?').map_or(head, |(base, _)| base);

    let mut out = base.to_string();
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}

fn validate_headers(headers: &HeaderList) -> Result<(), ComposeError> {
    for (key, value) in headers.iter() {
        HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| ComposeError::InvalidHeaderName(key.to_string()))?;
        HeaderValue::from_str(value).map_err(|_| ComposeError::InvalidHeaderValue(key.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BodyMode, RawLanguage, RequestAuth, RequestBody};

    fn spec(url: &str) -> RequestSpec {
        RequestSpec::new(Method::Post, url)
    }

    #[test]
    fn test_empty_url_is_rejected() {
        assert_eq!(compose(&spec("")), Err(ComposeError::EmptyUrl));
        assert_eq!(compose(&spec("   ")), Err(ComposeError::EmptyUrl));
    }

    #[test]
    fn test_url_gets_scheme_and_query() {
        let s = spec("example.com/search")
            .with_query("q", "rust lang")
            .with_query("page", "2");
        let composed = compose(&s).unwrap();
        assert_eq!(composed.url, "http://example.com/search?q=rust+lang&page=2");
        // 原始描述不被修改
        assert_eq!(s.url, "example.com/search");
    }

    #[test]
    fn test_query_params_replace_url_query() {
        let s = spec("api.test/users?page=2").with_query("page", "2");
        let composed = compose(&s).unwrap();
        assert_eq!(composed.url, "http://api.test/users?page=2");
    }

    #[test]
    fn test_query_params_rebuild_keeps_fragment() {
        let mut s = spec("https://example.com/a?x=1#top").with_query("y", "2");
        s.query_params.push(KeyValue::new("z", "3").disabled());
        let composed = compose(&s).unwrap();
        assert_eq!(composed.url, "https://example.com/a?y=2#top");
    }

    #[test]
    fn test_all_params_disabled_drops_query() {
        let mut s = spec("https://example.com/a?x=1");
        s.query_params.push(KeyValue::new("x", "1").disabled());
        let composed = compose(&s).unwrap();
        assert_eq!(composed.url, "https://example.com/a");
    }

    #[test]
    fn test_url_query_kept_without_params() {
        let composed = compose(&spec("example.com/r?to=http://x")).unwrap();
        assert_eq!(composed.url, "http://example.com/r?to=http://x");
        assert!(url::Url::parse(&composed.url).is_ok());
    }

    #[test]
    fn test_formdata_becomes_multipart_body() {
        let s = spec("example.com")
            .with_header("Content-Type", "text/plain")
            .with_body(RequestBody {
                mode: BodyMode::Formdata,
                formdata: vec![KeyValue::new("name", "foo")],
                ..RequestBody::default()
            });
        let composed = compose(&s).unwrap();
        assert_eq!(
            composed.body,
            ComposedBody::Multipart(vec![("name".to_string(), "foo".to_string())])
        );
        assert_eq!(composed.headers.get("Content-Type"), Some("multipart/form-data"));
    }

    #[test]
    fn test_user_header_applied_after_bearer() {
        let s = spec("example.com")
            .with_auth(RequestAuth::bearer("XYZ"))
            .with_header("Authorization", "Basic old");
        let composed = compose(&s).unwrap();
        assert_eq!(composed.headers.get("Authorization"), Some("Basic old"));
    }

    #[test]
    fn test_bearer_header_injected() {
        let s = spec("example.com").with_auth(RequestAuth::bearer("XYZ"));
        let composed = compose(&s).unwrap();
        assert_eq!(composed.headers.get("Authorization"), Some("Bearer XYZ"));
        assert!(composed.basic_auth.is_none());
    }

    #[test]
    fn test_disabled_headers_skipped() {
        let mut s = spec("example.com");
        s.headers.push(KeyValue::new("X-Off", "1").disabled());
        s.headers.push(KeyValue::default());
        s.headers.push(KeyValue::new("X-On", "1"));

        let composed = compose(&s).unwrap();
        assert_eq!(composed.headers.get("X-Off"), None);
        assert_eq!(composed.headers.get("X-On"), Some("1"));
        assert_eq!(composed.headers.len(), 1);
    }

    #[test]
    fn test_body_content_type_overrides_user_header() {
        let s = spec("example.com")
            .with_header("Content-Type", "text/plain")
            .with_body(RequestBody {
                mode: BodyMode::Raw,
                raw: r#"{"a":1}"#.to_string(),
                options: crate::model::BodyOptions {
                    raw: crate::model::RawOptions {
                        language: RawLanguage::Json,
                    },
                },
                ..RequestBody::default()
            });
        let composed = compose(&s).unwrap();
        assert_eq!(composed.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(composed.body, ComposedBody::Bytes(br#"{"a":1}"#.to_vec()));
    }

    #[test]
    fn test_mode_none_keeps_user_content_type() {
        let s = spec("example.com").with_header("Content-Type", "text/csv");
        let composed = compose(&s).unwrap();
        assert_eq!(composed.headers.get("Content-Type"), Some("text/csv"));
        assert!(composed.body.is_empty());
    }

    #[test]
    fn test_basic_auth_is_native() {
        let s = spec("example.com").with_auth(RequestAuth::basic("alice", "pw"));
        let composed = compose(&s).unwrap();
        assert_eq!(composed.basic_auth, Some(BasicCredential::new("alice", "pw")));
        assert_eq!(composed.headers.get("Authorization"), None);
    }

    #[test]
    fn test_invalid_header_name_is_reported() {
        let s = spec("example.com").with_header("Bad Header", "x");
        assert_eq!(
            compose(&s),
            Err(ComposeError::InvalidHeaderName("Bad Header".to_string()))
        );
    }

    #[test]
    fn test_invalid_header_value_is_reported() {
        let s = spec("example.com").with_header("X-Multi", "a\nb");
        assert_eq!(
            compose(&s),
            Err(ComposeError::InvalidHeaderValue("X-Multi".to_string()))
        );
    }
}
