use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::Result;
use crate::compose::compose;
use crate::config::Config;
use crate::coordinator::{PersistenceCoordinator, SaveOutcome};
use crate::http::{Dispatcher, Response, TransportOptions};
use crate::model::RequestSpec;
use crate::store::{CollectionStore, JsonFileRegion, KeyValueRegion};
use crate::vault::CredentialVault;

/// 面向界面层的入口：发送、保存、订阅变更
pub struct Workbench {
    coordinator: PersistenceCoordinator,
    dispatcher: Dispatcher,
    transport: TransportOptions,
}

impl Workbench {
    pub fn new(
        coordinator: PersistenceCoordinator,
        dispatcher: Dispatcher,
        transport: TransportOptions,
    ) -> Self {
        Self {
            coordinator,
            dispatcher,
            transport,
        }
    }

    /// 按配置打开两个独立的文件存储
    pub fn open(config: &Config) -> Result<Self> {
        let store_region: Arc<dyn KeyValueRegion> = Arc::new(JsonFileRegion::new(config.store_path()));
        let vault_region: Arc<dyn KeyValueRegion> =
            Arc::new(JsonFileRegion::private(config.vault_path.clone()));

        let coordinator = PersistenceCoordinator::new(
            CollectionStore::open(store_region)?,
            CredentialVault::new(vault_region),
        );
        Ok(Self::new(coordinator, Dispatcher::new()?, config.transport()))
    }

    pub fn coordinator(&self) -> &PersistenceCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut PersistenceCoordinator {
        &mut self.coordinator
    }

    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.coordinator.store().subscribe()
    }

    /// 使用默认传输选项发送
    pub async fn send(&self, spec: &RequestSpec) -> Response {
        self.send_with(spec, &self.transport).await
    }

    /// 组装并发送；组装失败时不发请求，直接返回错误响应
    pub async fn send_with(&self, spec: &RequestSpec, transport: &TransportOptions) -> Response {
        match compose(spec) {
            Ok(composed) => self.dispatcher.send(&composed, transport).await,
            Err(e) => {
                warn!("Request not sent: {}", e);
                Response::validation_error(e.to_string())
            }
        }
    }

    /// 以给定名称保存到集合
    pub fn save(&mut self, spec: &RequestSpec, name: &str, collection_id: &str) -> Result<SaveOutcome> {
        let mut spec = spec.clone();
        spec.name = name.to_string();
        self.coordinator.save_request_with_credentials(&spec, collection_id)
    }
}
