//! IAM call synthesis.
//!
//! The final stage of the pipeline: resolve `${name}` deployment template
//! variables inside validated policy documents, then assemble the IAM
//! control-plane calls (CreateRole, CreatePolicy, AttachRolePolicy) in
//! deterministic order. Callers run the validation engine first and only
//! synthesize when the report is valid.

mod payload;
mod template;

pub use payload::{synthesize, IamApiCall, SynthesisOutput};
pub use template::{resolve_document, resolve_str, resolve_value, SynthError};
