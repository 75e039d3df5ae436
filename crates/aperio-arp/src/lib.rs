//! # aperio-arp: Attribute Release Policy model and evaluation
//!
//! An Attribute Release Policy (ARP) decides which identity attributes may be
//! disclosed to a requesting relying party for a given resource, and under
//! which value restrictions. This crate owns the document model and the two
//! pure evaluation steps over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ArpDocument (site-wide or per-identity)     │
//! │  └─ Shar (per requester, or default)         │
//! │     └─ Resource (URL prefix, best-fit)       │
//! │        └─ ReleaseRule (attribute + polarity) │
//! │           └─ Filter / FilterValue            │
//! └──────────────────┬───────────────────────────┘
//!                    │ resolve_release_set
//!                    ▼
//! ┌──────────────────────────────────────────────┐
//! │  admin release set    user release set       │
//! └──────────────────┬───────────────────────────┘
//!                    │ combine
//!                    ▼
//! ┌──────────────────────────────────────────────┐
//! │  authoritative release set                   │
//! │  (exclusion veto applied, filters merged)    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Both steps are pure functions: they never mutate the (possibly shared,
//! cache-resident) documents they read, and always compute into fresh
//! collections.

pub mod combine;
pub mod document;
pub mod pattern;
pub mod resolve;

mod error;

pub use combine::{combine, merge_filters};
pub use document::{ArpDocument, Filter, FilterValue, ReleaseRule, Resource, Shar, SharTarget};
pub use error::ArpError;
pub use resolve::resolve_release_set;
