//! 凭据库
//!
//! 只存秘密，按带命名空间的键寻址:
//! - `credentials.<requestId>`: [`StoredCredentials`] 的 JSON 字符串
//! - `credentials.global.<name>`: 原始秘密字符串
//!
//! 除了作为关联键的请求 id，凭据库不知道集合和请求的任何信息。秘密值从不写入日志。

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::Result;
use crate::model::StoredCredentials;
use crate::store::KeyValueRegion;

const CREDENTIALS_PREFIX: &str = "credentials.";
const GLOBAL_PREFIX: &str = "credentials.global.";

pub struct CredentialVault {
    region: Arc<dyn KeyValueRegion>,
}

impl CredentialVault {
    pub fn new(region: Arc<dyn KeyValueRegion>) -> Self {
        Self { region }
    }

    pub fn credential_key(request_id: &str) -> String {
        format!("{}{}", CREDENTIALS_PREFIX, request_id)
    }

    pub fn global_key(name: &str) -> String {
        format!("{}{}", GLOBAL_PREFIX, name)
    }

    pub fn store(&self, key: &str, secret: &str) -> Result<()> {
        self.region.put(key, Value::String(secret.to_string()))?;
        debug!(key, "Secret stored");
        Ok(())
    }

    /// 未设置或不是字符串时返回 `None`
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match self.region.get(key)? {
            Some(Value::String(secret)) => Ok(Some(secret)),
            Some(_) => {
                warn!(key, "Vault entry is not a string, ignoring it");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.region.delete(key)?;
        debug!(key, "Secret deleted");
        Ok(())
    }

    pub fn store_credentials(&self, request_id: &str, credentials: &StoredCredentials) -> Result<()> {
        let json = serde_json::to_string(credentials)?;
        self.store(&Self::credential_key(request_id), &json)
    }

    /// 损坏的条目按“没有凭据”处理
    pub fn get_credentials(&self, request_id: &str) -> Result<Option<StoredCredentials>> {
        let key = Self::credential_key(request_id);
        let Some(json) = self.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) => {
                warn!(key = %key, "Ignoring corrupt credential entry: {}", e);
                Ok(None)
            }
        }
    }

    pub fn delete_credentials(&self, request_id: &str) -> Result<()> {
        self.delete(&Self::credential_key(request_id))
    }

    pub fn store_global(&self, name: &str, secret: &str) -> Result<()> {
        self.store(&Self::global_key(name), secret)
    }

    pub fn get_global(&self, name: &str) -> Result<Option<String>> {
        self.get(&Self::global_key(name))
    }

    pub fn delete_global(&self, name: &str) -> Result<()> {
        self.delete(&Self::global_key(name))
    }

    /// 当前有凭据条目的请求 id
    pub fn credential_request_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .region
            .keys()?
            .into_iter()
            .filter(|key| !key.starts_with(GLOBAL_PREFIX))
            .filter_map(|key| key.strip_prefix(CREDENTIALS_PREFIX).map(str::to_string))
            .collect())
    }

    /// 全局凭据名称
    pub fn global_names(&self) -> Result<Vec<String>> {
        Ok(self
            .region
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(GLOBAL_PREFIX).map(str::to_string))
            .collect())
    }
}
