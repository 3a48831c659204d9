// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event identity: which (profile, use-case, provider) an emission belongs
//! to, and the listener filter that matches against it (spec §4.3).

/// Identifies the (profile, use-case, provider) triple an event emission
/// belongs to, for filter matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// Profile id the emission is scoped to.
    pub profile: String,
    /// Use-case name the emission is scoped to.
    pub usecase: String,
    /// Provider currently bound, if resolved yet.
    pub provider: Option<String>,
}

impl EventContext {
    /// Construct a context for a given profile/use-case, provider unknown.
    #[must_use]
    pub fn new(profile: impl Into<String>, usecase: impl Into<String>) -> Self {
        EventContext {
            profile: profile.into(),
            usecase: usecase.into(),
            provider: None,
        }
    }

    /// Return a copy scoped to a resolved provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// Optional filter a listener registers with (spec §4.3: `{profile?,
/// usecase?}`); a `None` field matches anything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only match emissions for this profile id.
    pub profile: Option<String>,
    /// Only match emissions for this use-case name.
    pub usecase: Option<String>,
}

impl EventFilter {
    /// A filter that matches every emission.
    #[must_use]
    pub fn any() -> Self {
        EventFilter::default()
    }

    /// Restrict to a single profile.
    #[must_use]
    pub fn for_profile(profile: impl Into<String>) -> Self {
        EventFilter {
            profile: Some(profile.into()),
            usecase: None,
        }
    }

    /// Restrict to a single (profile, use-case) pair.
    #[must_use]
    pub fn for_usecase(profile: impl Into<String>, usecase: impl Into<String>) -> Self {
        EventFilter {
            profile: Some(profile.into()),
            usecase: Some(usecase.into()),
        }
    }

    pub(crate) fn matches(&self, ctx: &EventContext) -> bool {
        if let Some(profile) = &self.profile {
            if profile != &ctx.profile {
                return false;
            }
        }
        if let Some(usecase) = &self.usecase {
            if usecase != &ctx.usecase {
                return false;
            }
        }
        true
    }
}
