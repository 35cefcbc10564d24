//! Lifecycle events delivered by the host.

use std::fmt;

use super::document::Document;

/// Host lifecycle operation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

impl ChangeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an event came from a collection or a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Collection,
    Global,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Global => "global",
        }
    }
}

/// What the plugin knows about the collection or global an event fired on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMeta {
    pub kind: TargetKind,
    pub slug: String,
    /// The target has a draft/published status field.
    pub drafts: bool,
}

impl TargetMeta {
    pub fn collection(slug: impl Into<String>, drafts: bool) -> Self {
        Self {
            kind: TargetKind::Collection,
            slug: slug.into(),
            drafts,
        }
    }

    pub fn global(slug: impl Into<String>, drafts: bool) -> Self {
        Self {
            kind: TargetKind::Global,
            slug: slug.into(),
            drafts,
        }
    }
}

/// One lifecycle trigger, alive for the duration of a single hook invocation.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub operation: ChangeOperation,
    pub target: TargetMeta,
    pub document: Document,
    pub previous_document: Option<Document>,
    pub locale: Option<String>,
}

impl ChangeEvent {
    pub fn collection_slug(&self) -> Option<&str> {
        (self.target.kind == TargetKind::Collection).then_some(self.target.slug.as_str())
    }

    pub fn global_slug(&self) -> Option<&str> {
        (self.target.kind == TargetKind::Global).then_some(self.target.slug.as_str())
    }
}
