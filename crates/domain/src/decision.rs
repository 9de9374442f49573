use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope of a decision value as reported by the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Ip,
    Range,
    Country,
    As,
}

impl Scope {
    /// Case-insensitive parse; the feed reports scopes as `Ip`, `Range`, ...
    pub fn parse(s: &str) -> Option<Scope> {
        if s.eq_ignore_ascii_case("ip") {
            Some(Scope::Ip)
        } else if s.eq_ignore_ascii_case("range") {
            Some(Scope::Range)
        } else if s.eq_ignore_ascii_case("country") {
            Some(Scope::Country)
        } else if s.eq_ignore_ascii_case("as") {
            Some(Scope::As)
        } else {
            None
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Scope::Ip => "ip",
            Scope::Range => "range",
            Scope::Country => "country",
            Scope::As => "as",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remediation requested by a decision.
///
/// Unknown action strings are rejected at the feed boundary instead of
/// being silently mapped to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Ban,
    Captcha,
}

impl Action {
    pub fn parse(s: &str) -> Option<Action> {
        if s.eq_ignore_ascii_case("ban") {
            Some(Action::Ban)
        } else if s.eq_ignore_ascii_case("captcha") {
            Some(Action::Captcha)
        } else {
            None
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Ban => "ban",
            Action::Captcha => "captcha",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record from the upstream decision feed.
///
/// Only `value` drives the projection; the remaining fields are carried
/// through for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub value: String,
    pub scope: Scope,
    pub origin: String,
    pub scenario: String,
    pub action: Action,
    pub id: String,
    pub duration: String,
}

/// One entry of a ledger snapshot handed to backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
    pub value: String,
    pub action: Action,
}

/// Snapshot of the current ban set, newest decision first.
pub type BanList = Vec<BanEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parse_is_case_insensitive() {
        assert_eq!(Scope::parse("Ip"), Some(Scope::Ip));
        assert_eq!(Scope::parse("RANGE"), Some(Scope::Range));
        assert_eq!(Scope::parse("country"), Some(Scope::Country));
        assert_eq!(Scope::parse("bogus"), None);
    }

    #[test]
    fn action_rejects_unknown() {
        assert_eq!(Action::parse("ban"), Some(Action::Ban));
        assert_eq!(Action::parse("Captcha"), Some(Action::Captcha));
        assert_eq!(Action::parse("mfa"), None);
    }
}
