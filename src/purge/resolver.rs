//! Maps a change to the set of URLs (or the whole zone) to purge.

use tracing::warn;

use crate::domain::{ChangeEvent, ChangeOperation, CorrelationId, Document, PurgeScope};

use super::config::PurgeConfig;

/// Inputs handed to URL builders and computed purge-everything policies.
#[derive(Debug, Clone, Copy)]
pub struct UrlBuilderArgs<'a> {
    pub base_url: &'a str,
    pub doc: &'a Document,
    pub collection_slug: Option<&'a str>,
    pub global_slug: Option<&'a str>,
    pub operation: ChangeOperation,
    /// Present only when localization is enabled and the request carried a locale.
    pub locale: Option<&'a str>,
}

impl<'a> UrlBuilderArgs<'a> {
    pub fn from_event(event: &'a ChangeEvent, base_url: &'a str, localized: bool) -> Self {
        Self {
            base_url,
            doc: &event.document,
            collection_slug: event.collection_slug(),
            global_slug: event.global_slug(),
            operation: event.operation,
            locale: if localized {
                event.locale.as_deref()
            } else {
                None
            },
        }
    }
}

/// `{base}/{path}`, `{base}/{slug}`, `{base}/{id}`, or `{base}/`, in that order of preference.
///
/// An empty base URL resolves to no URLs.
pub fn default_url_builder(args: &UrlBuilderArgs<'_>) -> Vec<String> {
    let base = args.base_url.trim_end_matches('/');
    if base.is_empty() {
        return Vec::new();
    }

    let path = match args.doc.str_field("path").filter(|path| !path.is_empty()) {
        Some(path) => path.to_string(),
        None => match args.doc.str_field("slug").filter(|slug| !slug.is_empty()) {
            Some(slug) => format!("/{slug}"),
            None => match args.doc.id_segment() {
                Some(id) => format!("/{id}"),
                None => "/".to_string(),
            },
        },
    };

    vec![format!("{base}{path}")]
}

pub struct ScopeResolver<'a> {
    config: &'a PurgeConfig,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(config: &'a PurgeConfig) -> Self {
        Self { config }
    }

    pub fn wants_everything(&self, args: &UrlBuilderArgs<'_>) -> bool {
        self.config.purge_everything.evaluate(args)
    }

    /// URL scope from the configured builder, with empty entries dropped.
    pub fn selective(&self, args: &UrlBuilderArgs<'_>, correlation_id: &CorrelationId) -> PurgeScope {
        let Some(builder) = self.config.url_builder.as_ref() else {
            warn!(
                correlation_id = %correlation_id,
                "No URL builder configured; selective purge resolves to no URLs"
            );
            return PurgeScope::Files(Vec::new());
        };

        let files = builder(args)
            .into_iter()
            .filter(|url| !url.is_empty())
            .collect();
        PurgeScope::Files(files)
    }

    /// Full scope resolution: the purge-everything policy first, then the URL builder.
    pub fn resolve(&self, args: &UrlBuilderArgs<'_>, correlation_id: &CorrelationId) -> PurgeScope {
        if self.wants_everything(args) {
            PurgeScope::Everything
        } else {
            self.selective(args, correlation_id)
        }
    }
}
