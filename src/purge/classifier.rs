//! Publish-equivalence check for lifecycle events.

use crate::domain::{ChangeEvent, ChangeOperation, Document, TargetMeta};

/// Whether a create/update should purge.
///
/// Targets without drafts purge on every write. Targets with drafts purge only
/// on the transition into `published`; re-saving a published document does not.
pub fn is_purge_worthy(target: &TargetMeta, current: &Document, previous: Option<&Document>) -> bool {
    if !target.drafts {
        return true;
    }
    current.is_published() && !previous.is_some_and(Document::is_published)
}

/// Classify a whole event. Deletes always purge.
pub fn classify(event: &ChangeEvent) -> bool {
    match event.operation {
        ChangeOperation::Delete => true,
        ChangeOperation::Create | ChangeOperation::Update => is_purge_worthy(
            &event.target,
            &event.document,
            event.previous_document.as_ref(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(status: Option<&str>) -> Document {
        match status {
            Some(status) => Document::new(json!({ "id": 1, "_status": status })),
            None => Document::new(json!({ "id": 1 })),
        }
    }

    #[test]
    fn targets_without_drafts_always_purge() {
        let target = TargetMeta::collection("media", false);
        assert!(is_purge_worthy(&target, &doc(None), None));
        assert!(is_purge_worthy(&target, &doc(Some("draft")), Some(&doc(Some("draft")))));
    }

    #[test]
    fn drafts_purge_only_on_transition_to_published() {
        let target = TargetMeta::collection("posts", true);

        assert!(is_purge_worthy(&target, &doc(Some("published")), Some(&doc(Some("draft")))));
        assert!(is_purge_worthy(&target, &doc(Some("published")), None));
        assert!(is_purge_worthy(&target, &doc(Some("published")), Some(&doc(None))));

        assert!(!is_purge_worthy(&target, &doc(Some("draft")), Some(&doc(Some("draft")))));
        assert!(!is_purge_worthy(
            &target,
            &doc(Some("published")),
            Some(&doc(Some("published")))
        ));
        assert!(!is_purge_worthy(&target, &doc(Some("draft")), Some(&doc(Some("published")))));
        assert!(!is_purge_worthy(&target, &doc(None), None));
    }

    #[test]
    fn deletes_always_purge() {
        let event = ChangeEvent {
            operation: ChangeOperation::Delete,
            target: TargetMeta::collection("posts", true),
            document: doc(Some("draft")),
            previous_document: None,
            locale: None,
        };
        assert!(classify(&event));
    }
}
