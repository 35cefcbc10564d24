//! Purge scope, requests, and correlation ids.

use std::fmt;

use cloudflare_purge_api_types::ProviderPurgeBody;
use serde::Serialize;
use uuid::Uuid;

/// Opaque identifier threaded through every log line of one purge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Mint a fresh id. Called once per triggering event or endpoint call.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a single purge attempt invalidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeScope {
    /// Explicit URL list. May be empty, which callers treat as "nothing to purge".
    Files(Vec<String>),
    /// Full-zone purge.
    Everything,
}

impl PurgeScope {
    /// Build a scope from the loose endpoint body; `everything` wins over any file list.
    pub fn from_parts(files: Option<Vec<String>>, everything: bool) -> Self {
        if everything {
            Self::Everything
        } else {
            Self::Files(files.unwrap_or_default())
        }
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Self::Everything)
    }

    pub fn files(&self) -> &[String] {
        match self {
            Self::Files(files) => files,
            Self::Everything => &[],
        }
    }

    /// Number of URLs in a selective scope; `None` for a full-zone purge.
    pub fn file_count(&self) -> Option<usize> {
        match self {
            Self::Files(files) => Some(files.len()),
            Self::Everything => None,
        }
    }

    /// True for a selective scope with no URLs.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Files(files) if files.is_empty())
    }

    pub fn to_provider_body(&self) -> ProviderPurgeBody {
        match self {
            Self::Everything => ProviderPurgeBody::Everything {
                purge_everything: true,
            },
            Self::Files(files) => ProviderPurgeBody::Files {
                files: files.clone(),
            },
        }
    }
}

/// An immutable purge attempt: scope plus the correlation id that traces it.
#[derive(Debug, Clone)]
pub struct PurgeRequest {
    scope: PurgeScope,
    correlation_id: CorrelationId,
}

impl PurgeRequest {
    pub fn new(scope: PurgeScope, correlation_id: CorrelationId) -> Self {
        Self {
            scope,
            correlation_id,
        }
    }

    pub fn scope(&self) -> &PurgeScope {
        &self.scope
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_subsumes_files() {
        let scope = PurgeScope::from_parts(Some(vec!["https://x.com/a".into()]), true);
        assert_eq!(scope, PurgeScope::Everything);
        assert!(scope.files().is_empty());
        assert_eq!(scope.file_count(), None);
        assert!(!scope.is_empty());
    }

    #[test]
    fn missing_files_is_an_empty_selective_scope() {
        let scope = PurgeScope::from_parts(None, false);
        assert!(scope.is_empty());
        assert_eq!(scope.file_count(), Some(0));
    }

    #[test]
    fn correlation_ids_are_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }
}
