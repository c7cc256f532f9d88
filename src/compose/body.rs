//! 请求体编码
//!
//! 每种 body 模式对应一份载荷和至多一个强制的 Content-Type。

use crate::compose::ComposeError;
use crate::model::{BodyMode, KeyValue, RequestBody};

/// 组装后的请求体，只是数据，不含任何传输层对象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedBody {
    Bytes(Vec<u8>),
    /// 表单字段（名称, 值），按顺序；由 Dispatcher 编成 multipart/form-data
    Multipart(Vec<(String, String)>),
}

impl Default for ComposedBody {
    fn default() -> Self {
        ComposedBody::Bytes(Vec::new())
    }
}

impl ComposedBody {
    pub fn is_empty(&self) -> bool {
        match self {
            ComposedBody::Bytes(bytes) => bytes.is_empty(),
            ComposedBody::Multipart(_) => false,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ComposedBody::Bytes(bytes) => Some(bytes.as_slice()),
            ComposedBody::Multipart(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBody {
    pub body: ComposedBody,
    /// 只有 [`BodyMode::None`] 为 `None`
    pub content_type: Option<String>,
}

impl EncodedBody {
    fn text(payload: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            body: ComposedBody::Bytes(payload.into().into_bytes()),
            content_type: Some(content_type.into()),
        }
    }
}

pub fn encode_body(body: &RequestBody) -> Result<EncodedBody, ComposeError> {
    match body.mode {
        BodyMode::None => Ok(EncodedBody::default()),

        BodyMode::Raw => Ok(EncodedBody::text(
            body.raw.clone(),
            body.options.raw.language.content_type(),
        )),

        BodyMode::Urlencoded => Ok(EncodedBody::text(
            urlencode_pairs(&body.urlencoded)?,
            "application/x-www-form-urlencoded",
        )),

        // boundary 由传输层生成，这里的 Content-Type 会被带 boundary 的版本替换
        BodyMode::Formdata => Ok(EncodedBody {
            body: ComposedBody::Multipart(
                body.formdata
                    .iter()
                    .filter(|f| f.is_active())
                    .map(|f| (f.key.clone(), f.value.clone()))
                    .collect(),
            ),
            content_type: Some("multipart/form-data".to_string()),
        }),

        BodyMode::File => Ok(EncodedBody {
            body: ComposedBody::Bytes(body.file_data.clone().into_bytes()),
            content_type: Some("application/octet-stream".to_string()),
        }),

        BodyMode::Graphql => {
            // variables 能解析成 JSON 就按 JSON 发送，否则原样作为字符串
            let variables = serde_json::from_str::<serde_json::Value>(&body.graphql.variables)
                .unwrap_or_else(|_| serde_json::Value::String(body.graphql.variables.clone()));
            let payload = serde_json::to_string(&serde_json::json!({
                "query": body.graphql.query,
                "variables": variables,
            }))
            .map_err(|e| ComposeError::Serialization(e.to_string()))?;
            Ok(EncodedBody::text(payload, "application/json"))
        }
    }
}

/// 未禁用的键值对 URL 编码后以 `&` 连接
pub fn urlencode_pairs(pairs: &[KeyValue]) -> Result<String, ComposeError> {
    let active: Vec<(&str, &str)> = pairs
        .iter()
        .filter(|p| p.is_active())
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect();
    serde_urlencoded::to_string(active).map_err(|e| ComposeError::Serialization(e.to_string()))
}
