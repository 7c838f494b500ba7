//! Router settings.

use std::str::FromStr;

/// What happens when routing is misconfigured (unsupported route type,
/// duplicate registration, illegal lifecycle event, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, notify observers, then panic.
    Panic,
    /// Log, notify observers, and return the error to the caller.
    Report,
}

impl FailurePolicy {
    /// `Panic` in debug builds, `Report` in release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            FailurePolicy::Panic
        } else {
            FailurePolicy::Report
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "panic" => Ok(FailurePolicy::Panic),
            "report" => Ok(FailurePolicy::Report),
            _ => Err(format!(
                "Unknown failure policy: '{}'. Available policies: panic, report",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    pub failure_policy: FailurePolicy,
}

impl RouterSettings {
    pub const FAILURE_POLICY_ENV: &'static str = "RAT_ROUTE_FAILURE_POLICY";

    /// Settings for the current build, overridden by `RAT_ROUTE_FAILURE_POLICY`.
    pub fn from_env() -> Self {
        let value = std::env::var(Self::FAILURE_POLICY_ENV).ok();
        Self::default().with_policy_override(value.as_deref())
    }

    /// Apply a raw policy value; unknown values are logged and ignored.
    fn with_policy_override(mut self, value: Option<&str>) -> Self {
        if let Some(value) = value {
            match value.parse() {
                Ok(policy) => self.failure_policy = policy,
                Err(err) => tracing::warn!(%err, "Ignoring {}", Self::FAILURE_POLICY_ENV),
            }
        }
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::for_build(),
        }
    }
}
