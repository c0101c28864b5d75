mod assign;
mod custom;
mod deep;
mod error;
mod json;
mod path;
mod report;
mod value;

/// Selective field assignment entry points and options.
pub use assign::{AssignOptions, assign_struct, assign_struct_fields};
/// Self-clone capability and its value handle.
pub use custom::{CustomValue, SelfClone};
/// Deep copy entry points and options.
pub use deep::{CloneOptions, deep_copy, deep_copy_with};
/// Error and result aliases.
pub use error::{CopyError, Result};
/// Typed helpers bridging serde types through the value model.
pub use json::{assign_serde, deep_copy_serde};
/// Field path parser types.
pub use path::{FieldPath, PathStep};
/// Policies, diagnostics, and per-call reports.
pub use report::{AssignReport, CloneOutcome, Diagnostic, DiagnosticKind, FaultPolicy, MismatchPolicy};
/// Runtime value model.
pub use value::{FieldValue, MapEntry, MapValue, Ptr, SeqValue, StructValue, Value, ValueKind, zero_time};
