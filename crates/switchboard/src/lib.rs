//! Switchboard - the dispatch core of the dataportal gateway.
//!
//! Source adapters describe their operations as [`SourceTool`]s and hand them
//! to a [`RegistryBuilder`] through one [`ToolProvider`] per upstream. Once
//! built, the [`Registry`] is immutable and shared behind an `Arc`. The
//! [`Gateway`] resolves invocations against it, validates arguments, calls the
//! adapter and refuses to return any payload that does not satisfy the tool's
//! declared output schema.
//!
//! ```text
//! InvocationRequest
//!   -> Registry::resolve        (Received -> Resolved)
//!   -> validate(args, input)    (Resolved -> Invoking)
//!   -> SourceTool::invoke       (Invoking -> Validating)
//!   -> validate(payload, output)(Validating -> Completed)
//! ```
//!
//! Any step may end in `Failed`, tagged with the stage it happened in.

pub mod failure;
pub mod gateway;
pub mod registry;
pub mod schema;
pub mod tool;
pub mod validate;

pub use failure::{AdapterError, Failure, FailureKind, SchemaViolation, Stage};
pub use gateway::{Gateway, InvocationRequest, InvocationResult};
pub use registry::{Registry, RegistryBuilder, RegistryError};
pub use schema::schema_for;
pub use tool::{ResourceDescriptor, SourceTool, ToolDescriptor, ToolProvider};
pub use validate::validate;
