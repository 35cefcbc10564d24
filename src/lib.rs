//! Cloudflare cache purging driven by content lifecycle events.
//!
//! The [`purge::CloudflarePurgePlugin`] augments a [`host::HostConfig`] with
//! hooks that purge affected URLs (or the whole zone) after publishes and
//! deletes, an authenticated purge endpoint, and an admin "purge everything"
//! control. [`infra::http`] exposes the result as a standalone service.

pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod infra;
pub mod purge;
