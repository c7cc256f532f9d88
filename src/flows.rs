//! 交互流程：先通过 [`Prompter`] 询问用户，再调用存储
//!
//! 取消或空输入都视为放弃，不修改任何数据。

use crate::Result;
use crate::coordinator::{PersistenceCoordinator, SaveOutcome};
use crate::model::{Collection, ItemKind, RequestSpec};
use crate::prompt::Prompter;

fn non_empty(answer: Option<String>) -> Option<String> {
    answer.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn create_collection(
    prompter: &mut dyn Prompter,
    coordinator: &mut PersistenceCoordinator,
) -> Result<Option<Collection>> {
    let Some(name) = non_empty(prompter.ask_text("Enter collection name", "My Collection", None)?)
    else {
        return Ok(None);
    };
    coordinator.create_collection(&name).map(Some)
}

/// 选择集合、输入名称后保存
///
/// `collection_id` / `name` 已知时跳过对应的询问。
pub fn save_request(
    prompter: &mut dyn Prompter,
    coordinator: &mut PersistenceCoordinator,
    spec: &RequestSpec,
    collection_id: Option<&str>,
    name: Option<&str>,
) -> Result<Option<SaveOutcome>> {
    let collection_id = match collection_id {
        Some(id) => id.to_string(),
        None => {
            let collections = coordinator.store().list_collections();
            if collections.is_empty() {
                prompter.notify("No collections found. Create a collection first.");
                return Ok(None);
            }
            let labels: Vec<String> = collections.iter().map(|c| c.name.clone()).collect();
            let picked = prompter
                .pick_one("Select a collection to save the request to", &labels)?
                .and_then(|index| collections.get(index));
            // 越界的下标按取消处理
            let Some(collection) = picked else {
                return Ok(None);
            };
            collection.id.clone()
        }
    };

    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let Some(name) =
                non_empty(prompter.ask_text("Enter request name", "My Request", None)?)
            else {
                return Ok(None);
            };
            name
        }
    };

    let mut spec = spec.clone();
    spec.name = name.clone();
    let outcome = coordinator.save_request_with_credentials(&spec, &collection_id)?;

    match &outcome.credential_error {
        None => prompter.notify(&format!("Request \"{}\" saved successfully!", name)),
        Some(e) => prompter.notify(&format!(
            "Request \"{}\" saved, but its credentials were not stored: {}",
            name, e
        )),
    }
    Ok(Some(outcome))
}

/// 重命名；新名称为空或与原名相同时不做任何事
pub fn rename_item(
    prompter: &mut dyn Prompter,
    coordinator: &mut PersistenceCoordinator,
    id: &str,
    kind: ItemKind,
) -> Result<bool> {
    let current = match kind {
        ItemKind::Collection => coordinator.store().get_collection(id).map(|c| c.name.clone()),
        ItemKind::Request => coordinator.store().get_request(id).map(|r| r.name().to_string()),
    };
    let Some(current) = current else {
        prompter.notify(&format!("No {} with id {}", kind, id));
        return Ok(false);
    };

    let answer = prompter.ask_text(&format!("Rename {}", kind), "", Some(&current))?;
    match non_empty(answer) {
        Some(new_name) if new_name != current => coordinator.rename_item(id, kind, &new_name),
        _ => Ok(false),
    }
}

pub fn delete_collection(
    prompter: &mut dyn Prompter,
    coordinator: &mut PersistenceCoordinator,
    id: &str,
) -> Result<bool> {
    let Some(collection) = coordinator.store().get_collection(id) else {
        prompter.notify(&format!("No collection with id {}", id));
        return Ok(false);
    };
    let message = format!("Delete collection \"{}\" and all its requests?", collection.name);
    if !prompter.confirm(&message)? {
        return Ok(false);
    }
    coordinator.delete_collection_cascade(id)
}

pub fn delete_request(
    prompter: &mut dyn Prompter,
    coordinator: &mut PersistenceCoordinator,
    id: &str,
) -> Result<bool> {
    let Some(request) = coordinator.store().get_request(id) else {
        prompter.notify(&format!("No request with id {}", id));
        return Ok(false);
    };
    let message = format!("Delete request \"{}\"?", request.name());
    if !prompter.confirm(&message)? {
        return Ok(false);
    }
    coordinator.delete_request_cascade(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Method;
    use crate::model::RequestAuth;
    use crate::store::{CollectionStore, MemoryRegion};
    use crate::vault::CredentialVault;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// 按脚本回答的 Prompter
    #[derive(Default)]
    struct Scripted {
        texts: VecDeque<Option<String>>,
        confirms: VecDeque<bool>,
        picks: VecDeque<Option<usize>>,
        notices: Vec<String>,
        asked_initial: Vec<Option<String>>,
    }

    impl Prompter for Scripted {
        fn ask_text(&mut self, _: &str, _: &str, initial: Option<&str>) -> Result<Option<String>> {
            self.asked_initial.push(initial.map(str::to_string));
            Ok(self.texts.pop_front().flatten())
        }

        fn confirm(&mut self, _: &str) -> Result<bool> {
            Ok(self.confirms.pop_front().unwrap_or(false))
        }

        fn pick_one(&mut self, _: &str, _: &[String]) -> Result<Option<usize>> {
            Ok(self.picks.pop_front().flatten())
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    fn coordinator() -> PersistenceCoordinator {
        PersistenceCoordinator::new(
            CollectionStore::open(Arc::new(MemoryRegion::new())).unwrap(),
            CredentialVault::new(Arc::new(MemoryRegion::new())),
        )
    }

    #[test]
    fn test_create_collection_cancelled() {
        let mut c = coordinator();
        let mut p = Scripted::default();
        p.texts.push_back(None);
        assert!(create_collection(&mut p, &mut c).unwrap().is_none());

        p.texts.push_back(Some("   ".to_string()));
        assert!(create_collection(&mut p, &mut c).unwrap().is_none());
        assert!(c.store().list_collections().is_empty());
    }

    #[test]
    fn test_create_collection() {
        let mut c = coordinator();
        let mut p = Scripted::default();
        p.texts.push_back(Some("Users".to_string()));

        let collection = create_collection(&mut p, &mut c).unwrap().unwrap();
        assert_eq!(collection.name, "Users");
    }

    #[test]
    fn test_save_without_collections_warns() {
        let mut c = coordinator();
        let mut p = Scripted::default();
        let spec = RequestSpec::new(Method::Get, "example.com");

        assert!(save_request(&mut p, &mut c, &spec, None, None).unwrap().is_none());
        assert_eq!(p.notices, vec!["No collections found. Create a collection first."]);
    }

    #[test]
    fn test_save_picks_collection_and_name() {
        let mut c = coordinator();
        c.create_collection("first").unwrap();
        let second = c.create_collection("second").unwrap();

        let mut p = Scripted::default();
        p.picks.push_back(Some(1));
        p.texts.push_back(Some("Get me".to_string()));
        let spec = RequestSpec::new(Method::Get, "example.com").with_auth(RequestAuth::bearer("t"));

        let outcome = save_request(&mut p, &mut c, &spec, None, None).unwrap().unwrap();
        assert!(outcome.is_complete());
        assert_eq!(c.store().collection_request_ids(&second.id), vec![outcome.request_id.clone()]);
        assert_eq!(c.store().get_request(&outcome.request_id).unwrap().name(), "Get me");
        assert_eq!(p.notices, vec!["Request \"Get me\" saved successfully!"]);
    }

    #[test]
    fn test_save_cancelled_at_pick() {
        let mut c = coordinator();
        c.create_collection("only").unwrap();
        let mut p = Scripted::default();
        p.picks.push_back(None);

        let spec = RequestSpec::new(Method::Get, "example.com");
        assert!(save_request(&mut p, &mut c, &spec, None, None).unwrap().is_none());
        assert_eq!(c.store().requests().count(), 0);
    }

    #[test]
    fn test_save_out_of_range_pick_is_cancel() {
        let mut c = coordinator();
        c.create_collection("only").unwrap();
        let mut p = Scripted::default();
        p.picks.push_back(Some(5));

        let spec = RequestSpec::new(Method::Get, "example.com");
        assert!(save_request(&mut p, &mut c, &spec, None, None).unwrap().is_none());
        assert_eq!(c.store().requests().count(), 0);
        assert!(p.notices.is_empty());
    }

    #[test]
    fn test_rename_skips_unchanged_name() {
        let mut c = coordinator();
        let collection = c.create_collection("same").unwrap();
        let mut p = Scripted::default();
        p.texts.push_back(Some("same".to_string()));

        assert!(!rename_item(&mut p, &mut c, &collection.id, ItemKind::Collection).unwrap());
        assert_eq!(p.asked_initial, vec![Some("same".to_string())]);

        p.texts.push_back(Some("renamed".to_string()));
        assert!(rename_item(&mut p, &mut c, &collection.id, ItemKind::Collection).unwrap());
        assert_eq!(c.store().get_collection(&collection.id).unwrap().name, "renamed");
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let mut c = coordinator();
        let collection = c.create_collection("c").unwrap();
        let spec = RequestSpec::new(Method::Get, "example.com").with_auth(RequestAuth::bearer("t"));
        let id = c
            .save_request_with_credentials(&spec, &collection.id)
            .unwrap()
            .request_id;

        let mut p = Scripted::default();
        p.confirms.push_back(false);
        assert!(!delete_request(&mut p, &mut c, &id).unwrap());
        assert!(c.store().get_request(&id).is_some());

        p.confirms.push_back(true);
        assert!(delete_collection(&mut p, &mut c, &collection.id).unwrap());
        assert!(c.store().get_request(&id).is_none());
        assert!(c.vault().get_credentials(&id).unwrap().is_none());
    }
}
