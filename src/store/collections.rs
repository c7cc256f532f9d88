use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Result;
use crate::error::PostcodeError;
use crate::model::{Collection, ItemKind, Request, RequestSpec};
use crate::store::region::{KeyValueRegion, WriteOp};

const COLLECTIONS_KEY: &str = "collections";
const REQUESTS_KEY: &str = "requests";
const NOTIFY_CAPACITY: usize = 16;

/// 集合与已保存的请求，只含非秘密字段
///
/// 每次修改先把完整快照写入区域，再替换内存视图，最后通知订阅者。
/// 写入失败时区域和内存视图都保持原样。
pub struct CollectionStore {
    region: Arc<dyn KeyValueRegion>,
    collections: Vec<Collection>,
    requests: BTreeMap<String, Request>,
    notifier: broadcast::Sender<()>,
}

impl CollectionStore {
    pub fn open(region: Arc<dyn KeyValueRegion>) -> Result<Self> {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        let mut store = Self {
            region,
            collections: Vec::new(),
            requests: BTreeMap::new(),
            notifier,
        };
        store.load()?;
        Ok(store)
    }

    fn load(&mut self) -> Result<()> {
        let collections = match self.region.get(COLLECTIONS_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                PostcodeError::PersistenceError(format!("corrupt collections: {}", e))
            })?,
            None => Vec::new(),
        };
        let requests = match self.region.get(REQUESTS_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                PostcodeError::PersistenceError(format!("corrupt requests: {}", e))
            })?,
            None => BTreeMap::new(),
        };
        self.collections = collections;
        self.requests = requests;
        Ok(())
    }

    /// 重新读取区域并通知订阅者
    pub fn reload(&mut self) -> Result<()> {
        self.load()?;
        self.notify();
        Ok(())
    }

    /// 每次成功修改后发送 `()`，订阅者自行重新读取
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notifier.subscribe()
    }

    fn notify(&self) {
        // 没有订阅者也没关系
        let _ = self.notifier.send(());
    }

    fn commit(
        &mut self,
        collections: Vec<Collection>,
        requests: BTreeMap<String, Request>,
    ) -> Result<()> {
        let ops = vec![
            WriteOp::Put(
                COLLECTIONS_KEY.to_string(),
                serde_json::to_value(&collections)?,
            ),
            WriteOp::Put(REQUESTS_KEY.to_string(), serde_json::to_value(&requests)?),
        ];
        self.region.write_batch(ops)?;

        self.collections = collections;
        self.requests = requests;
        self.notify();
        Ok(())
    }

    pub fn create_collection(&mut self, name: &str) -> Result<Collection> {
        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            request_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut collections = self.collections.clone();
        collections.push(collection.clone());
        self.commit(collections, self.requests.clone())?;

        info!(id = %collection.id, name, "Collection created");
        Ok(collection)
    }

    /// 保存新请求并追加到 `collection_id`
    ///
    /// 集合不存在时只记日志，请求照常创建，只是不挂在任何集合下。
    pub fn save_request(&mut self, spec: RequestSpec, collection_id: &str) -> Result<String> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let request = Request {
            id: id.clone(),
            spec,
            created_at: now,
            updated_at: now,
        };

        let mut requests = self.requests.clone();
        requests.insert(id.clone(), request);

        let mut collections = self.collections.clone();
        match collections.iter_mut().find(|c| c.id == collection_id) {
            Some(collection) => {
                collection.request_ids.push(id.clone());
                collection.updated_at = now;
            }
            None => warn!(
                request_id = %id,
                collection_id,
                "Collection not found, request saved without a collection"
            ),
        }

        self.commit(collections, requests)?;
        info!(id = %id, collection_id, "Request saved");
        Ok(id)
    }

    /// 删除集合及其列出的全部请求，一次写入
    pub fn delete_collection(&mut self, id: &str) -> Result<bool> {
        let Some(position) = self.collections.iter().position(|c| c.id == id) else {
            warn!(id, "Collection not found, nothing to delete");
            return Ok(false);
        };

        let mut collections = self.collections.clone();
        let removed = collections.remove(position);

        let mut requests = self.requests.clone();
        for request_id in &removed.request_ids {
            requests.remove(request_id);
        }

        self.commit(collections, requests)?;
        info!(id, requests = removed.request_ids.len(), "Collection deleted");
        Ok(true)
    }

    /// 删除请求，并从所有集合中移除它的 id
    pub fn delete_request(&mut self, id: &str) -> Result<bool> {
        let mut requests = self.requests.clone();
        let existed = requests.remove(id).is_some();

        let now = Utc::now();
        let mut collections = self.collections.clone();
        let mut unlinked = false;
        for collection in collections.iter_mut().filter(|c| c.contains(id)) {
            collection.request_ids.retain(|rid| rid != id);
            collection.updated_at = now;
            unlinked = true;
        }

        if !existed && !unlinked {
            warn!(id, "Request not found, nothing to delete");
            return Ok(false);
        }

        self.commit(collections, requests)?;
        info!(id, "Request deleted");
        Ok(true)
    }

    /// 重命名集合或请求，id 不存在时什么也不做
    pub fn rename_item(&mut self, id: &str, kind: ItemKind, new_name: &str) -> Result<bool> {
        let now = Utc::now();
        let mut collections = self.collections.clone();
        let mut requests = self.requests.clone();

        let found = match kind {
            ItemKind::Collection => match collections.iter_mut().find(|c| c.id == id) {
                Some(collection) => {
                    collection.name = new_name.to_string();
                    collection.updated_at = now;
                    true
                }
                None => false,
            },
            ItemKind::Request => match requests.get_mut(id) {
                Some(request) => {
                    request.spec.name = new_name.to_string();
                    request.updated_at = now;
                    true
                }
                None => false,
            },
        };

        if !found {
            warn!(id, %kind, "Item not found, nothing to rename");
            return Ok(false);
        }

        self.commit(collections, requests)?;
        debug!(id, %kind, new_name, "Item renamed");
        Ok(true)
    }

    pub fn get_request(&self, id: &str) -> Option<&Request> {
        self.requests.get(id)
    }

    pub fn get_collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn list_collections(&self) -> &[Collection] {
        &self.collections
    }

    /// 集合列出的 id，包括悬空的
    pub fn collection_request_ids(&self, collection_id: &str) -> Vec<String> {
        self.get_collection(collection_id)
            .map(|c| c.request_ids.clone())
            .unwrap_or_default()
    }

    /// 集合内的请求，按顺序，跳过悬空 id
    pub fn collection_requests(&self, collection_id: &str) -> Vec<&Request> {
        self.get_collection(collection_id)
            .map(|c| {
                c.request_ids
                    .iter()
                    .filter_map(|id| self.requests.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }
}
