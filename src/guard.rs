//! Destroy guard policy
//!
//! Decides whether a destroy of an indestructible instance may proceed. The
//! decision is pure: it reads the persisted policy fields and the provider
//! bypass flag and nothing else.

/// Environment variable that enables the provider bypass by default
pub const BYPASS_ENV_VAR: &str = "TF_UTIL_BYPASS_INDESTRUCTIBLE";

/// Summary of the warning emitted when a destroy is bypassed
pub const BYPASS_SUMMARY: &str = "Bypassing Destroy Protection";

/// Summary of the error emitted when a destroy is denied
pub const DENY_SUMMARY: &str = "Destruction Not Allowed";

const BYPASS_DETAIL: &str = "Proceeding to destroy util_indestructible instance due to \
bypass_indestructible being true on the provider, and allow_bypass being true on the resource.";

/// Detail of the error emitted when a destroy is denied
pub const DENY_DETAIL: &str = "Cannot destroy indestructible resource unless allow_destroy is set in state.\n\
To continue with destruction, set allow_destroy to true and apply first.\n\
Or, unless otherwise prohibited, set bypass_indestructible on the provider, or set\n\
the TF_UTIL_BYPASS_INDESTRUCTIBLE env var to \"true\".";

/// Persisted policy fields of one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Explicit consent to destruction
    pub allow_destroy: bool,
    /// Whether the provider-wide bypass applies to this instance
    pub allow_bypass: bool,
    /// Appended to the deny message when non-empty
    pub error_message: Option<String>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            allow_destroy: false,
            allow_bypass: true,
            error_message: None,
        }
    }
}

/// Outcome of a destroy attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Destroy proceeds silently
    Allow,
    /// Destroy proceeds with a surfaced warning
    Warn(String),
    /// Destroy is aborted with an error
    Deny(String),
}

impl Decision {
    /// Whether the instance is removed from state
    pub fn permits_destroy(&self) -> bool {
        !matches!(self, Decision::Deny(_))
    }
}

/// Evaluate a destroy attempt
///
/// First match wins: explicit consent, then the provider bypass (if the
/// instance allows it), otherwise deny. `deny_detail` is the base of the deny
/// message; a non-empty `error_message` is appended to it.
pub fn evaluate(policy: &GuardPolicy, provider_bypass: bool, deny_detail: &str) -> Decision {
    if policy.allow_destroy {
        return Decision::Allow;
    }

    if provider_bypass && policy.allow_bypass {
        return Decision::Warn(BYPASS_DETAIL.to_string());
    }

    Decision::Deny(deny_message(deny_detail, policy.error_message.as_deref()))
}

fn deny_message(base: &str, extra: Option<&str>) -> String {
    let mut msg = base.to_string();
    if let Some(extra) = extra.filter(|m| !m.is_empty()) {
        msg.push_str("\n\n");
        msg.push_str(extra);
    }
    msg
}
