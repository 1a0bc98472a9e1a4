//! Caller-supplied facts evaluated against a capability scope.

/// Evaluation context for one `is_enabled` check.
///
/// Empty strings are treated as absent, so `Some("")` behaves like `None`.
/// Whitespace-only values are present and are matched as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationContext {
    pub business_id: Option<String>,
    pub country: Option<String>,
}

impl EvaluationContext {
    /// Context carrying no facts.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_business_id(mut self, business_id: impl Into<String>) -> Self {
        self.business_id = Some(business_id.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Business id, if present and non-empty.
    pub fn business_id(&self) -> Option<&str> {
        non_empty(self.business_id.as_deref())
    }

    /// Country code, if present and non-empty.
    pub fn country(&self) -> Option<&str> {
        non_empty(self.country.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|raw| !raw.is_empty())
}
