//! Plain data shared by the purge pipeline and the host contract.

pub mod document;
pub mod event;
pub mod scope;

pub use document::Document;
pub use event::{ChangeEvent, ChangeOperation, TargetKind, TargetMeta};
pub use scope::{CorrelationId, PurgeRequest, PurgeScope};
