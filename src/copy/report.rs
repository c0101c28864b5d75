use std::fmt;

use tracing::{debug, warn};

use crate::copy::{CopyError, FieldPath, Result, Value, ValueKind};

/// Handling of source/destination shape disagreements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
	/// Skip silently.
	Ignore,
	/// Skip and record a [`Diagnostic`].
	#[default]
	Report,
	/// Fail with [`CopyError::ShapeMismatch`].
	Error,
}

/// Handling of internal faults during traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
	/// Return the first fault; work done before it stays done.
	#[default]
	Abort,
	/// Record the fault, leave the affected slot alone, and keep going.
	Continue,
}

/// What a [`Diagnostic`] is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
	/// Field kinds differ between source and destination.
	KindMismatch {
		/// Source kind.
		src: ValueKind,
		/// Destination kind.
		dst: ValueKind,
	},
	/// Aggregate sequences differ in length, so nothing was copied.
	SeqLenMismatch {
		/// Source length.
		src: usize,
		/// Destination length.
		dst: usize,
	},
	/// Field is not exported and was left at its zero value.
	UnexportedSkipped,
}

impl fmt::Display for DiagnosticKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::KindMismatch { src, dst } => write!(f, "kind mismatch: source {src}, destination {dst}"),
			Self::SeqLenMismatch { src, dst } => write!(f, "sequence length mismatch: source {src}, destination {dst}"),
			Self::UnexportedSkipped => f.write_str("unexported field skipped"),
		}
	}
}

/// Located note about something that was not copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	/// Location in the source graph.
	pub path: FieldPath,
	/// What happened there.
	pub kind: DiagnosticKind,
}

/// Outcome of one selective assignment.
#[derive(Debug, Default)]
pub struct AssignReport {
	/// Number of leaf fields written.
	pub assigned: usize,
	/// Shape mismatches recorded under [`MismatchPolicy::Report`].
	pub diagnostics: Vec<Diagnostic>,
	/// Faults recorded under [`FaultPolicy::Continue`].
	pub faults: Vec<CopyError>,
}

impl AssignReport {
	/// Whether some fields were not written because of a fault.
	pub fn is_partial(&self) -> bool {
		!self.faults.is_empty()
	}

	/// Whether nothing was skipped for a reason worth reporting.
	pub fn is_clean(&self) -> bool {
		self.diagnostics.is_empty() && self.faults.is_empty()
	}
}

/// Outcome of one deep copy.
#[derive(Debug)]
pub struct CloneOutcome {
	/// The copied graph.
	pub value: Value,
	/// Unexported fields that were zeroed.
	pub diagnostics: Vec<Diagnostic>,
	/// Faults recorded under [`FaultPolicy::Continue`].
	pub faults: Vec<CopyError>,
}

impl CloneOutcome {
	/// Whether parts of the graph were replaced by zero values because of a fault.
	pub fn is_partial(&self) -> bool {
		!self.faults.is_empty()
	}
}

/// Applies mismatch and fault policies while a traversal runs.
#[derive(Debug)]
pub(crate) struct Tracker {
	on_mismatch: MismatchPolicy,
	on_fault: FaultPolicy,
	pub(crate) diagnostics: Vec<Diagnostic>,
	pub(crate) faults: Vec<CopyError>,
}

impl Tracker {
	pub(crate) fn new(on_mismatch: MismatchPolicy, on_fault: FaultPolicy) -> Self {
		Self {
			on_mismatch,
			on_fault,
			diagnostics: Vec::new(),
			faults: Vec::new(),
		}
	}

	/// Apply the mismatch policy; `Ok` means "skip and carry on".
	pub(crate) fn mismatch(&mut self, path: &FieldPath, kind: DiagnosticKind) -> Result<()> {
		match self.on_mismatch {
			MismatchPolicy::Ignore => Ok(()),
			MismatchPolicy::Report => {
				debug!(path = %path, detail = %kind, "shape mismatch skipped");
				self.note(path, kind);
				Ok(())
			}
			MismatchPolicy::Error => Err(CopyError::ShapeMismatch {
				path: path.to_string(),
				detail: kind.to_string(),
			}),
		}
	}

	/// Apply the fault policy; `Ok` means "leave the slot and carry on".
	pub(crate) fn fault(&mut self, err: CopyError) -> Result<()> {
		warn!(error = %err, policy = ?self.on_fault, "copy fault");
		match self.on_fault {
			FaultPolicy::Abort => Err(err),
			FaultPolicy::Continue => {
				self.faults.push(err);
				Ok(())
			}
		}
	}

	/// Record a diagnostic regardless of policy.
	pub(crate) fn note(&mut self, path: &FieldPath, kind: DiagnosticKind) {
		self.diagnostics.push(Diagnostic { path: path.clone(), kind });
	}
}
