//! Correlation IDs for tracing operations across task/transaction boundaries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID attached to a batch/executor span for log correlation
///
/// Uses UUID v4 for guaranteed uniqueness across distributed workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_uuid_string() {
        let id = Uuid::new_v4();
        let correlation: CorrelationId = id.to_string().as_str().into();
        assert_eq!(correlation, CorrelationId::from(id));
    }

    #[test]
    fn falls_back_to_random_on_garbage_input() {
        let correlation: CorrelationId = "not-a-uuid".into();
        assert_ne!(correlation.to_string(), "not-a-uuid");
    }
}
