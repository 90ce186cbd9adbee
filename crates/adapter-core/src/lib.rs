//! MCP adapter core: format-agnostic API model and capability primitives.
//!
//! This crate is the leaf of the adapter workspace. It holds the canonical
//! representation every ingestion format is normalized into ([`Api`],
//! [`Operation`], [`Parameter`]) and the unit of generation the pipeline
//! produces ([`Capability`]). It performs no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod path;
pub mod spec;

pub use capability::{Capability, OperationRef, Provenance, SafetyTier};
pub use path::{PathTemplate, PathTemplateError, Segment, normalize_template};
pub use spec::{
    Api, AuthKind, AuthScheme, HttpMethod, Operation, ParamLocation, ParamType, Parameter,
    to_snake_case,
};
