use edge_bouncer_domain::config::FastlyServiceConfig;
use edge_bouncer_domain::{Action, BouncerError};
use ipnetwork::Ipv4Network;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::acl::{Acl, AclCollection};
use super::api::{FastlyApi, Snippet, ACL_CAPACITY, MANAGED_PREFIX};
use super::vcl;

pub const SUPPORTED_ACTIONS: [Action; 2] = [Action::Ban, Action::Captcha];

/// Per-service reconciler state: one ACL collection, country set, and
/// AS-number set per supported action, plus the dynamic snippet each
/// action's conditional lives in.
pub struct FastlyService {
    api: Arc<dyn FastlyApi>,
    service_id: String,
    pub version: u64,
    acl_collections: HashMap<Action, AclCollection>,
    countries: HashMap<Action, BTreeSet<String>>,
    systems: HashMap<Action, BTreeSet<String>>,
    dynamic_snippets: HashMap<Action, String>,
    current_conditional: HashMap<Action, String>,
}

/// Canonical `ip/len` form for an ACL item; IPv6 and junk yield `None`.
fn normalize_ip(item: &str) -> Option<String> {
    let net: Ipv4Network = item.parse().ok()?;
    Some(format!("{}/{}", net.network(), net.prefix()))
}

/// Crude but sufficient: no separator means country code or AS number.
fn classify(item: &str) -> ItemKind {
    if item.contains('.') || item.contains(':') {
        ItemKind::Address
    } else if item.chars().all(|c| c.is_ascii_digit()) {
        ItemKind::AsNumber
    } else if item.len() == 2 {
        ItemKind::Country
    } else {
        ItemKind::Unknown
    }
}

enum ItemKind {
    Address,
    Country,
    AsNumber,
    Unknown,
}

impl FastlyService {
    /// Set up the managed infrastructure on a fresh draft version: purge
    /// stale managed ACLs/snippets, create the per-action ACL fleets,
    /// install the static captcha VCL and one dynamic snippet per action.
    pub async fn setup(
        api: Arc<dyn FastlyApi>,
        config: &FastlyServiceConfig,
    ) -> Result<Self, BouncerError> {
        let service_id = config.service_id.clone();
        let versions = api.list_versions(&service_id).await?;
        let base = versions
            .iter()
            .filter(|v| v.active)
            .map(|v| v.number)
            .max()
            .or_else(|| versions.iter().map(|v| v.number).max())
            .ok_or_else(|| {
                BouncerError::Preflight(format!("fastly service {service_id} has no versions"))
            })?;
        let version = api.clone_version(&service_id, base).await?;
        info!(service_id = %service_id, version, "cloned new service version");

        for acl in api.list_acls(&service_id, version).await? {
            if acl.name.starts_with(MANAGED_PREFIX) {
                api.delete_acl(&service_id, version, &acl.name).await?;
            }
        }
        for snippet in api.list_snippets(&service_id, version).await? {
            if snippet.name.starts_with(MANAGED_PREFIX) {
                api.delete_snippet(&service_id, version, &snippet.name).await?;
            }
        }

        let acl_count = config.max_items.div_ceil(ACL_CAPACITY);
        let mut acl_collections = HashMap::new();
        for action in SUPPORTED_ACTIONS {
            let mut acls = Vec::with_capacity(acl_count);
            for i in 0..acl_count {
                let name = format!("{MANAGED_PREFIX}_{action}_{i}");
                let created = api.create_acl(&service_id, version, &name).await?;
                acls.push(Acl::new(created.id, created.name));
            }
            info!(
                service_id = %service_id,
                action = %action,
                acls = acl_count,
                "created acl collection"
            );
            acl_collections.insert(
                action,
                AclCollection::new(Arc::clone(&api), service_id.clone(), acls),
            );
        }

        let statics = [
            Snippet {
                name: format!("{MANAGED_PREFIX}_captcha_backend"),
                snippet_type: "init".to_string(),
                dynamic: false,
                content: vcl::google_backend(&service_id),
            },
            Snippet {
                name: format!("{MANAGED_PREFIX}_captcha_recv"),
                snippet_type: "recv".to_string(),
                dynamic: false,
                content: vcl::captcha_recv(&config.recaptcha_secret_key),
            },
            Snippet {
                name: format!("{MANAGED_PREFIX}_captcha_renderer"),
                snippet_type: "error".to_string(),
                dynamic: false,
                content: vcl::captcha_renderer(&config.recaptcha_site_key),
            },
            Snippet {
                name: format!("{MANAGED_PREFIX}_captcha_validator"),
                snippet_type: "deliver".to_string(),
                dynamic: false,
                content: vcl::captcha_validator(),
            },
        ];
        for snippet in &statics {
            api.create_snippet(&service_id, version, snippet).await?;
        }

        let mut dynamic_snippets = HashMap::new();
        for action in SUPPORTED_ACTIONS {
            let snippet = Snippet {
                name: format!("{MANAGED_PREFIX}_{action}_rule"),
                snippet_type: "recv".to_string(),
                dynamic: true,
                content: vcl::dynamic_content("", action),
            };
            let id = api.create_snippet(&service_id, version, &snippet).await?;
            dynamic_snippets.insert(action, id);
        }

        Ok(Self {
            api,
            service_id,
            version,
            acl_collections,
            countries: HashMap::new(),
            systems: HashMap::new(),
            dynamic_snippets,
            current_conditional: HashMap::new(),
        })
    }

    /// One tick: stage ACL diffs per action, commit them, then refresh
    /// each action's dynamic conditional if it changed.
    pub async fn transform_state(
        &mut self,
        decisions: &HashMap<String, Action>,
    ) -> Result<(), BouncerError> {
        let mut addresses: HashMap<Action, HashSet<String>> = HashMap::new();
        let mut countries: HashMap<Action, BTreeSet<String>> = HashMap::new();
        let mut systems: HashMap<Action, BTreeSet<String>> = HashMap::new();
        for (item, action) in decisions {
            match classify(item) {
                ItemKind::Address => match normalize_ip(item) {
                    Some(normalized) => {
                        addresses.entry(*action).or_default().insert(normalized);
                    }
                    None => debug!(item = %item, "non-ipv4 address skipped"),
                },
                ItemKind::Country => {
                    countries
                        .entry(*action)
                        .or_default()
                        .insert(item.to_uppercase());
                }
                ItemKind::AsNumber => {
                    systems.entry(*action).or_default().insert(item.clone());
                }
                ItemKind::Unknown => warn!(item = %item, "unclassifiable decision value"),
            }
        }

        for action in SUPPORTED_ACTIONS {
            let target = addresses.remove(&action).unwrap_or_default();
            let collection = self
                .acl_collections
                .get_mut(&action)
                .ok_or_else(|| BouncerError::Io(format!("no acl collection for {action}")))?;
            collection.transform_state(&target);
            collection.commit().await?;

            self.countries
                .insert(action, countries.remove(&action).unwrap_or_default());
            self.systems
                .insert(action, systems.remove(&action).unwrap_or_default());

            let conditional = self.conditional_for(action);
            if self.current_conditional.get(&action) != Some(&conditional) {
                let snippet_id = self.dynamic_snippets.get(&action).cloned().ok_or_else(
                    || BouncerError::Io(format!("no dynamic snippet for {action}")),
                )?;
                let content = vcl::dynamic_content(&conditional, action);
                self.api
                    .update_dynamic_snippet(&self.service_id, &snippet_id, &content)
                    .await?;
                info!(
                    service_id = %self.service_id,
                    action = %action,
                    "dynamic conditional refreshed"
                );
                self.current_conditional.insert(action, conditional);
            }
        }
        Ok(())
    }

    /// Disjunction of ACL membership, country, and AS-number terms.
    fn conditional_for(&self, action: Action) -> String {
        let mut terms = Vec::new();
        if let Some(collection) = self.acl_collections.get(&action) {
            if !collection.state().is_empty() {
                terms.push(collection.conditions());
            }
        }
        if let Some(countries) = self.countries.get(&action) {
            terms.extend(
                countries
                    .iter()
                    .map(|code| format!("client.geo.country_code == \"{code}\"")),
            );
        }
        if let Some(systems) = self.systems.get(&action) {
            terms.extend(systems.iter().map(|asn| format!("client.as.number == {asn}")));
        }
        if terms.is_empty() {
            String::new()
        } else {
            format!("if ( {} )", terms.join(" || "))
        }
    }
}
