use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::types::Method;
use crate::{PostcodeError, Result};

/// 键值行：请求头、查询参数、表单字段共用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disabled: bool,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// 编辑器里的空白行（key 和 value 都为空）
    pub fn is_blank(&self) -> bool {
        self.key.trim().is_empty() && self.value.is_empty()
    }

    /// 参与组装的行：未禁用且非空白
    pub fn is_active(&self) -> bool {
        !self.disabled && !self.is_blank()
    }
}

/// 请求体编码方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    #[default]
    None,
    Raw,
    Formdata,
    Urlencoded,
    File,
    Graphql,
}

/// raw 模式下的子语言，决定 Content-Type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawLanguage {
    Json,
    Html,
    Xml,
    #[default]
    Text,
}

impl RawLanguage {
    pub fn content_type(&self) -> &'static str {
        match self {
            RawLanguage::Json => "application/json",
            RawLanguage::Html => "text/html",
            RawLanguage::Xml => "text/xml",
            RawLanguage::Text => "text/plain",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default)]
    pub language: RawLanguage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyOptions {
    #[serde(default)]
    pub raw: RawOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlBody {
    #[serde(default)]
    pub query: String,
    /// 变量原文（编辑器里的 JSON 文本）
    #[serde(default)]
    pub variables: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(default)]
    pub mode: BodyMode,
    #[serde(default)]
    pub raw: String,
    /// 文件名，只用于展示
    #[serde(default)]
    pub file: String,
    /// 文件内容
    #[serde(default)]
    pub file_data: String,
    #[serde(default)]
    pub formdata: Vec<KeyValue>,
    #[serde(default)]
    pub urlencoded: Vec<KeyValue>,
    #[serde(default)]
    pub graphql: GraphqlBody,
    #[serde(default)]
    pub options: BodyOptions,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Noauth,
    Basic,
    Bearer,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCredential {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl BasicCredential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

// 手写 Debug，避免密码出现在日志里
impl std::fmt::Debug for BasicCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerCredential {
    #[serde(default)]
    pub token: String,
}

impl BearerCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAuth {
    #[serde(rename = "type", default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<BearerCredential>,
}

impl RequestAuth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Basic,
            basic: Some(BasicCredential::new(username, password)),
            bearer: None,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer,
            basic: None,
            bearer: Some(BearerCredential::new(token)),
        }
    }

    /// 清空秘密字段，保留 `type` 和字段结构
    pub fn blank_secrets(&mut self) {
        if let Some(basic) = self.basic.as_mut() {
            *basic = BasicCredential::default();
        }
        if let Some(bearer) = self.bearer.as_mut() {
            *bearer = BearerCredential::default();
        }
    }

    pub fn has_secrets(&self) -> bool {
        self.basic.as_ref().is_some_and(|b| !b.is_empty())
            || self.bearer.as_ref().is_some_and(|b| !b.is_empty())
    }
}

/// 请求描述（不含 id 和时间戳），也就是编辑器里的表单内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query_params: Vec<KeyValue>,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default)]
    pub auth: RequestAuth,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    /// 从 JSON 文本解析，未知的 method / body mode / auth type 报为校验错误
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| PostcodeError::ValidationError(format!("Invalid request spec: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push(KeyValue::new(key, value));
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_params.push(KeyValue::new(key, value));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_auth(mut self, auth: RequestAuth) -> Self {
        self.auth = auth;
        self
    }

    /// 秘密字段被清空后的副本
    pub fn sanitized(&self) -> Self {
        let mut copy = self.clone();
        copy.auth.blank_secrets();
        copy
    }
}

/// 已保存的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    #[serde(flatten)]
    pub spec: RequestSpec,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
