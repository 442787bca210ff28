//! `hkdecl-recon`: customs declaration reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the reconciled
//! declaration. No CLI or file IO dependencies.

pub mod brand;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod number;
pub mod reconcile;
pub mod sort;
pub mod summary;

pub use config::DeclConfig;
pub use engine::run;
pub use error::DeclError;
pub use model::{DeclarationReport, ReconciledRow, Sources, SummaryRecord, Table};
