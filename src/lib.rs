//! Projtree: project CLI output reconciliation
//!
//! Surfaces the state managed by an external project automation CLI (orgs,
//! tasks, flows, services) as a single consistent, de-duplicated domain
//! model. Live CLI output (JSON when available, human-formatted text
//! otherwise) is parsed shape-tolerantly, merged with on-disk declarative
//! configuration under fixed precedence rules, enriched with derived state,
//! and bucketed into a presentable tree.

pub mod actions;
pub mod declarative;
pub mod derive;
pub mod error;
pub mod listing;
pub mod logging;
pub mod notify;
pub mod parse;
pub mod present;
pub mod reconcile;
pub mod runner;
pub mod settings;
pub mod types;
