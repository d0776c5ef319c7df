//! Per-endpoint signing policy.
//!
//! A policy can be attached to a single route (method level) or to a group of routes (scope level). The method level
//! wins, then the scope, then the global default from [`SignConfig`](crate::SignConfig).

/// Whether a signature covers the request parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WithParams {
    /// Defer to the enclosing scope, then the global default.
    #[default]
    Default,
    Include,
    Exclude,
}

impl WithParams {
    fn explicit(self) -> Option<bool> {
        match self {
            WithParams::Default => None,
            WithParams::Include => Some(true),
            WithParams::Exclude => Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignPolicy {
    /// No signature required.
    Ignore,
    Require(WithParams),
}

impl SignPolicy {
    pub fn require() -> Self {
        SignPolicy::Require(WithParams::Default)
    }

    pub fn with_params() -> Self {
        SignPolicy::Require(WithParams::Include)
    }

    pub fn without_params() -> Self {
        SignPolicy::Require(WithParams::Exclude)
    }
}

/// The outcome of policy resolution for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivePolicy {
    Skip,
    Verify { with_params: bool },
}

/// Combines method-level and scope-level policies with the global default. An endpoint with no policy at either level
/// still requires a signature.
pub fn resolve_policy(
    method: Option<SignPolicy>,
    scope: Option<SignPolicy>,
    default_with_params: bool,
) -> EffectivePolicy {
    let scope_params = match scope {
        Some(SignPolicy::Require(w)) => w.explicit(),
        _ => None,
    };
    let with_params = match (method, scope) {
        (Some(SignPolicy::Ignore), _) => return EffectivePolicy::Skip,
        (Some(SignPolicy::Require(w)), _) => w.explicit().or(scope_params),
        (None, Some(SignPolicy::Ignore)) => return EffectivePolicy::Skip,
        (None, _) => scope_params,
    };
    EffectivePolicy::Verify { with_params: with_params.unwrap_or(default_with_params) }
}
