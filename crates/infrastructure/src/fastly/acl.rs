use edge_bouncer_domain::BouncerError;
use ipnetwork::Ipv4Network;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::api::{AclOp, FastlyApi, ACL_CAPACITY};

/// Cached view of one remote ACL plus its pending mutations.
///
/// `entries` maps the canonical `ip/len` item to its remote entry id (the
/// id is required to delete). An item is never in both pending sets.
#[derive(Debug, Clone)]
pub struct Acl {
    pub id: String,
    pub name: String,
    pub entries: HashMap<String, String>,
    to_add: HashSet<String>,
    to_delete: HashSet<String>,
}

impl Acl {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            entries: HashMap::new(),
            to_add: HashSet::new(),
            to_delete: HashSet::new(),
        }
    }

    /// Entry count as it will be after the pending mutations commit.
    fn projected_count(&self) -> usize {
        self.entries.len() + self.to_add.len() - self.to_delete.len()
    }

    fn is_full(&self) -> bool {
        self.projected_count() >= ACL_CAPACITY
    }

    fn holds(&self, item: &str) -> bool {
        (self.entries.contains_key(item) && !self.to_delete.contains(item))
            || self.to_add.contains(item)
    }
}

/// A fleet of ACLs filled in order, acting as one logical address set.
pub struct AclCollection {
    api: Arc<dyn FastlyApi>,
    service_id: String,
    acls: Vec<Acl>,
    state: HashSet<String>,
}

impl AclCollection {
    pub fn new(api: Arc<dyn FastlyApi>, service_id: String, acls: Vec<Acl>) -> Self {
        Self {
            api,
            service_id,
            acls,
            state: HashSet::new(),
        }
    }

    pub fn state(&self) -> &HashSet<String> {
        &self.state
    }

    /// Mark an item for insertion into the first ACL with room. Returns
    /// `false` if it is already tracked or no ACL has room.
    pub fn insert_item(&mut self, item: &str) -> bool {
        self.state.insert(item.to_string());
        // re-adding something pending deletion just cancels the delete
        for acl in &mut self.acls {
            if acl.to_delete.contains(item) {
                acl.to_delete.remove(item);
                return true;
            }
        }
        if self.acls.iter().any(|acl| acl.holds(item)) {
            return false;
        }
        for acl in &mut self.acls {
            if !acl.is_full() {
                acl.to_add.insert(item.to_string());
                return true;
            }
        }
        warn!(service_id = %self.service_id, item, "all ACLs full, item not allocated");
        false
    }

    /// Mark an item for deletion from whichever ACL holds it.
    pub fn remove_item(&mut self, item: &str) -> bool {
        self.state.remove(item);
        for acl in &mut self.acls {
            if acl.to_add.remove(item) {
                return true;
            }
            if acl.entries.contains_key(item) && !acl.to_delete.contains(item) {
                acl.to_delete.insert(item.to_string());
                return true;
            }
        }
        false
    }

    /// Diff the tracked state against `new_state` and stage the result.
    pub fn transform_state(&mut self, new_state: &HashSet<String>) {
        let new_items: Vec<String> = new_state.difference(&self.state).cloned().collect();
        let expired: Vec<String> = self.state.difference(new_state).cloned().collect();
        for item in &new_items {
            debug!(item = %item, "staging acl entry");
            self.insert_item(item);
        }
        for item in &expired {
            debug!(item = %item, "expiring acl entry");
            self.remove_item(item);
        }
    }

    /// Push pending mutations as batched patches. After each successful
    /// patch the cached entry-id map is refreshed from the remote; a
    /// failed patch leaves the pending sets intact for the next tick.
    pub async fn commit(&mut self) -> Result<(), BouncerError> {
        let api = Arc::clone(&self.api);
        for acl in &mut self.acls {
            let mut ops = Vec::new();
            for item in &acl.to_add {
                if acl.entries.contains_key(item) {
                    continue;
                }
                match item.parse::<Ipv4Network>() {
                    Ok(net) => ops.push(AclOp::Create {
                        ip: net.network().to_string(),
                        subnet: net.prefix(),
                    }),
                    Err(_) => {
                        warn!(item = %item, "unparseable acl item skipped");
                    }
                }
            }
            for item in &acl.to_delete {
                if let Some(entry_id) = acl.entries.get(item) {
                    ops.push(AclOp::Delete {
                        entry_id: entry_id.clone(),
                    });
                }
            }
            if ops.is_empty() {
                acl.to_add.clear();
                acl.to_delete.clear();
                continue;
            }

            api.patch_acl_entries(&self.service_id, &acl.id, &ops).await?;
            let refreshed = api.list_acl_entries(&self.service_id, &acl.id).await?;
            acl.entries = refreshed
                .into_iter()
                .map(|entry| (entry.key(), entry.id))
                .collect();
            acl.to_add.clear();
            acl.to_delete.clear();
        }
        Ok(())
    }

    /// Disjunction of membership tests over all ACLs of the collection.
    pub fn conditions(&self) -> String {
        self.acls
            .iter()
            .map(|acl| format!("(client.ip ~ {})", acl.name))
            .collect::<Vec<_>>()
            .join(" || ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        patches: Mutex<Vec<(String, Vec<AclOp>)>>,
        entries: Mutex<HashMap<String, Vec<AclEntry>>>,
    }

    use super::super::api::{AclEntry, AclSummary, ServiceVersion, Snippet, SnippetSummary};

    impl RecordingApi {
        fn seed_entries(&self, acl_id: &str, items: &[(&str, &str)]) {
            self.entries.lock().unwrap().insert(
                acl_id.to_string(),
                items
                    .iter()
                    .map(|(id, ip)| AclEntry {
                        id: id.to_string(),
                        ip: ip.to_string(),
                        subnet: Some(32),
                    })
                    .collect(),
            );
        }

        fn patch_count(&self) -> usize {
            self.patches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FastlyApi for RecordingApi {
        async fn list_versions(&self, _: &str) -> Result<Vec<ServiceVersion>, BouncerError> {
            Ok(vec![])
        }
        async fn clone_version(&self, _: &str, _: u64) -> Result<u64, BouncerError> {
            Ok(2)
        }
        async fn list_acls(&self, _: &str, _: u64) -> Result<Vec<AclSummary>, BouncerError> {
            Ok(vec![])
        }
        async fn create_acl(&self, _: &str, _: u64, name: &str) -> Result<AclSummary, BouncerError> {
            Ok(AclSummary {
                id: format!("id-{name}"),
                name: name.to_string(),
            })
        }
        async fn delete_acl(&self, _: &str, _: u64, _: &str) -> Result<(), BouncerError> {
            Ok(())
        }
        async fn list_acl_entries(
            &self,
            _: &str,
            acl_id: &str,
        ) -> Result<Vec<AclEntry>, BouncerError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(acl_id)
                .cloned()
                .unwrap_or_default())
        }
        async fn patch_acl_entries(
            &self,
            _: &str,
            acl_id: &str,
            ops: &[AclOp],
        ) -> Result<(), BouncerError> {
            self.patches
                .lock()
                .unwrap()
                .push((acl_id.to_string(), ops.to_vec()));
            Ok(())
        }
        async fn list_snippets(&self, _: &str, _: u64) -> Result<Vec<SnippetSummary>, BouncerError> {
            Ok(vec![])
        }
        async fn create_snippet(&self, _: &str, _: u64, _: &Snippet) -> Result<String, BouncerError> {
            Ok("snip-1".to_string())
        }
        async fn update_dynamic_snippet(&self, _: &str, _: &str, _: &str) -> Result<(), BouncerError> {
            Ok(())
        }
        async fn delete_snippet(&self, _: &str, _: u64, _: &str) -> Result<(), BouncerError> {
            Ok(())
        }
        async fn list_service_ids(&self) -> Result<Vec<String>, BouncerError> {
            Ok(vec![])
        }
    }

    fn collection(api: &Arc<RecordingApi>, acls: Vec<Acl>) -> AclCollection {
        AclCollection::new(api.clone() as Arc<dyn FastlyApi>, "svc".to_string(), acls)
    }

    fn to_set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn new_items_are_created_and_expired_deleted() {
        let api = Arc::new(RecordingApi::default());
        let mut acl = Acl::new("acl-1".to_string(), "crowdsec_ban_0".to_string());
        acl.entries.insert("1.1.1.1/32".to_string(), "e-1".to_string());
        let mut collection = collection(&api, vec![acl]);
        collection.state = to_set(&["1.1.1.1/32"]);

        collection.transform_state(&to_set(&["2.2.2.2/32"]));
        collection.commit().await.unwrap();

        let patches = api.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        let ops = &patches[0].1;
        assert!(ops.contains(&AclOp::Create {
            ip: "2.2.2.2".to_string(),
            subnet: 32
        }));
        assert!(ops.contains(&AclOp::Delete {
            entry_id: "e-1".to_string()
        }));
    }

    #[tokio::test]
    async fn unchanged_state_commits_nothing() {
        let api = Arc::new(RecordingApi::default());
        let mut acl = Acl::new("acl-1".to_string(), "crowdsec_ban_0".to_string());
        acl.entries.insert("1.1.1.1/32".to_string(), "e-1".to_string());
        let mut collection = collection(&api, vec![acl]);
        collection.state = to_set(&["1.1.1.1/32"]);

        collection.transform_state(&to_set(&["1.1.1.1/32"]));
        collection.commit().await.unwrap();
        assert_eq!(api.patch_count(), 0);
    }

    #[tokio::test]
    async fn remove_then_readd_in_one_tick_is_a_noop() {
        let api = Arc::new(RecordingApi::default());
        let mut acl = Acl::new("acl-1".to_string(), "crowdsec_ban_0".to_string());
        acl.entries.insert("1.1.1.1/32".to_string(), "e-1".to_string());
        let mut collection = collection(&api, vec![acl]);
        collection.state = to_set(&["1.1.1.1/32"]);

        assert!(collection.remove_item("1.1.1.1/32"));
        assert!(collection.insert_item("1.1.1.1/32"));
        collection.commit().await.unwrap();
        assert_eq!(api.patch_count(), 0, "cancelled mutations must not be pushed");
    }

    #[tokio::test]
    async fn items_spill_into_the_next_acl_when_full() {
        let api = Arc::new(RecordingApi::default());
        let mut first = Acl::new("acl-1".to_string(), "crowdsec_ban_0".to_string());
        for i in 0..ACL_CAPACITY {
            first
                .entries
                .insert(format!("10.0.{}.{}/32", i / 256, i % 256), format!("e-{i}"));
        }
        let second = Acl::new("acl-2".to_string(), "crowdsec_ban_1".to_string());
        let mut collection = collection(&api, vec![first, second]);

        assert!(collection.insert_item("9.9.9.9/32"));
        collection.commit().await.unwrap();
        let patches = api.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "acl-2");
    }

    #[test]
    fn conditions_join_all_acls() {
        let api = Arc::new(RecordingApi::default());
        let collection = collection(
            &api,
            vec![
                Acl::new("a".to_string(), "crowdsec_ban_0".to_string()),
                Acl::new("b".to_string(), "crowdsec_ban_1".to_string()),
            ],
        );
        assert_eq!(
            collection.conditions(),
            "(client.ip ~ crowdsec_ban_0) || (client.ip ~ crowdsec_ban_1)"
        );
    }
}
