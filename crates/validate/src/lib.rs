//! The naming and schema validator pipeline (C4): pluggable validators for
//! naming conventions, structural conformance, semantic-type constraints,
//! struct constraints, link-type constraints, and naming-convention
//! document ingestion.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod convention;
pub mod issue;
pub mod link_constraints;
pub mod naming;
pub mod pipeline;
pub mod semantic;
pub mod struct_constraints;

pub use issue::{Severity, ValidationIssue, ValidationReport};
pub use pipeline::{ValidationPipeline, Validator};
