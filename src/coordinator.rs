//! 协调集合存储与凭据库
//!
//! 两个存储之间没有共享事务，只能靠操作顺序把不一致限制在无害的一侧:
//! - 保存：先存脱敏后的请求拿到 id，再写凭据；写凭据失败时请求保留，可重试
//! - 删除：先删凭据，再删请求记录；中途中断最多留下孤立凭据
//!
//! 剩余的不一致通过 [`PersistenceCoordinator::check_consistency`] 发现、
//! [`PersistenceCoordinator::prune_orphans`] 清理。

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::Result;
use crate::error::PostcodeError;
use crate::model::{AuthType, Collection, ItemKind, Request, RequestAuth, RequestSpec, StoredCredentials};
use crate::store::CollectionStore;
use crate::vault::CredentialVault;

/// 保存结果
#[derive(Debug)]
pub struct SaveOutcome {
    pub request_id: String,
    /// 请求已保存但凭据写入失败时的错误，可用 `store_credentials` 重试
    pub credential_error: Option<PostcodeError>,
}

impl SaveOutcome {
    pub fn is_complete(&self) -> bool {
        self.credential_error.is_none()
    }
}

/// 两个存储之间的不一致
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// 认证类型是 basic/bearer 但凭据库里没有凭据的请求
    pub missing_credentials: Vec<String>,
    /// 对应请求已不存在的凭据
    pub orphaned_credentials: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_credentials.is_empty() && self.orphaned_credentials.is_empty()
    }
}

pub struct PersistenceCoordinator {
    store: CollectionStore,
    vault: CredentialVault,
}

impl PersistenceCoordinator {
    pub fn new(store: CollectionStore, vault: CredentialVault) -> Self {
        Self { store, vault }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn create_collection(&mut self, name: &str) -> Result<Collection> {
        self.store.create_collection(name)
    }

    pub fn rename_item(&mut self, id: &str, kind: ItemKind, new_name: &str) -> Result<bool> {
        self.store.rename_item(id, kind, new_name)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.store.reload()
    }

    /// 保存请求，秘密字段拆到凭据库
    ///
    /// 1. 复制一份请求并清空秘密字段，保留 `auth.type`
    /// 2. 存入集合存储，得到 id
    /// 3. 如果取出的凭据非空，以该 id 写入凭据库
    pub fn save_request_with_credentials(
        &mut self,
        raw: &RequestSpec,
        collection_id: &str,
    ) -> Result<SaveOutcome> {
        let credentials = StoredCredentials::extract(&raw.auth);
        let request_id = self.store.save_request(raw.sanitized(), collection_id)?;

        let credential_error = if credentials.is_empty() {
            None
        } else {
            match self.vault.store_credentials(&request_id, &credentials) {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        request_id = %request_id,
                        "Request saved but credentials could not be stored: {}", e
                    );
                    Some(e)
                }
            }
        };

        Ok(SaveOutcome {
            request_id,
            credential_error,
        })
    }

    /// 为已保存的请求重新写入凭据（保存第 3 步的重试）
    pub fn store_credentials(&mut self, request_id: &str, auth: &RequestAuth) -> Result<bool> {
        if self.store.get_request(request_id).is_none() {
            warn!(request_id, "Request not found, credentials not stored");
            return Ok(false);
        }
        let credentials = StoredCredentials::extract(auth);
        if credentials.is_empty() {
            return Ok(false);
        }
        self.vault.store_credentials(request_id, &credentials)?;
        Ok(true)
    }

    /// 先删凭据，再删请求
    pub fn delete_request_cascade(&mut self, request_id: &str) -> Result<bool> {
        self.vault.delete_credentials(request_id)?;
        self.store.delete_request(request_id)
    }

    /// 先删集合内每个请求的凭据，再删集合（集合存储负责删除请求）
    pub fn delete_collection_cascade(&mut self, collection_id: &str) -> Result<bool> {
        let request_ids = self.store.collection_request_ids(collection_id);
        for request_id in &request_ids {
            self.vault.delete_credentials(request_id)?;
        }
        let deleted = self.store.delete_collection(collection_id)?;
        if deleted {
            info!(collection_id, credentials = request_ids.len(), "Collection and credentials deleted");
        }
        Ok(deleted)
    }

    /// 读取请求用于编辑，凭据只合并进返回的副本的 auth
    pub fn load_request(&self, request_id: &str) -> Result<Option<Request>> {
        let Some(request) = self.store.get_request(request_id) else {
            return Ok(None);
        };
        let mut request = request.clone();
        if let Some(credentials) = self.vault.get_credentials(request_id)? {
            credentials.merge_into(&mut request.spec.auth);
        }
        Ok(Some(request))
    }

    pub fn check_consistency(&self) -> Result<ConsistencyReport> {
        let mut missing_credentials = Vec::new();
        for request in self.store.requests() {
            let needs_secret = matches!(request.spec.auth.auth_type, AuthType::Basic | AuthType::Bearer);
            if needs_secret && self.vault.get_credentials(&request.id)?.is_none() {
                missing_credentials.push(request.id.clone());
            }
        }

        let known: BTreeSet<&str> = self.store.requests().map(|r| r.id.as_str()).collect();
        let orphaned_credentials = self
            .vault
            .credential_request_ids()?
            .into_iter()
            .filter(|id| !known.contains(id.as_str()))
            .collect();

        Ok(ConsistencyReport {
            missing_credentials,
            orphaned_credentials,
        })
    }

    /// 删除孤立凭据，返回删除数量
    pub fn prune_orphans(&mut self) -> Result<usize> {
        let report = self.check_consistency()?;
        for request_id in &report.orphaned_credentials {
            self.vault.delete_credentials(request_id)?;
        }
        if !report.orphaned_credentials.is_empty() {
            info!(count = report.orphaned_credentials.len(), "Orphaned credentials pruned");
        }
        Ok(report.orphaned_credentials.len())
    }
}
