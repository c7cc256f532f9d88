use serde::{Deserialize, Serialize};

use crate::model::request::{BasicCredential, BearerCredential, RequestAuth};

/// 凭据：请求认证中的秘密部分，单独存放在凭据库
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<BearerCredential>,
}

impl StoredCredentials {
    /// 从认证表单中取出非空的秘密字段
    pub fn extract(auth: &RequestAuth) -> Self {
        Self {
            basic: auth.basic.clone().filter(|b| !b.is_empty()),
            bearer: auth.bearer.clone().filter(|b| !b.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_none() && self.bearer.is_none()
    }

    /// 合并回认证表单，只覆盖凭据库里存在的部分
    pub fn merge_into(&self, auth: &mut RequestAuth) {
        if let Some(basic) = &self.basic {
            auth.basic = Some(basic.clone());
        }
        if let Some(bearer) = &self.bearer {
            auth.bearer = Some(bearer.clone());
        }
    }
}
