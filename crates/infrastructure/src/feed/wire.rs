use edge_bouncer_domain::{Action, Decision, Scope};
use serde::Deserialize;
use tracing::debug;

/// One decision as serialized by the Local API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireDecision {
    pub value: String,
    pub scope: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(rename = "type")]
    pub decision_type: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub duration: String,
}

/// Body of `GET /v1/decisions/stream`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamBatch {
    #[serde(default)]
    pub new: Option<Vec<WireDecision>>,
    #[serde(default)]
    pub deleted: Option<Vec<WireDecision>>,
}

impl WireDecision {
    /// Map onto the domain model. Unknown scopes and actions, and
    /// filtered origins, are dropped with a debug note; the feed keeps
    /// running.
    pub(crate) fn into_domain(self, origins: &[String]) -> Option<Decision> {
        if !origins.is_empty() && !origins.iter().any(|o| o == &self.origin) {
            debug!(value = %self.value, origin = %self.origin, "decision origin filtered");
            return None;
        }
        let Some(scope) = Scope::parse(&self.scope) else {
            debug!(value = %self.value, scope = %self.scope, "unsupported decision scope");
            return None;
        };
        let Some(action) = Action::parse(&self.decision_type) else {
            debug!(
                value = %self.value,
                decision_type = %self.decision_type,
                "unsupported decision type"
            );
            return None;
        };
        let id = self
            .uuid
            .or_else(|| self.id.map(|n| n.to_string()))
            .unwrap_or_default();
        Some(Decision {
            value: self.value,
            scope,
            origin: self.origin,
            scenario: self.scenario,
            action,
            id,
            duration: self.duration,
        })
    }
}
