//! Selective field assignment.
//!
//! Copies the populated fields of a source aggregate into an existing
//! destination aggregate matched by field name. Zero values mean "not
//! provided" and never clear a destination field.
//!
//! Sequences of aggregates are merged element-by-element only when both sides
//! have the same length. Otherwise the destination sequence is left untouched
//! (or replaced wholesale with [`AssignOptions::replace_mismatched_seqs`]), so
//! callers that want element merging must pre-size destination sequences.

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::copy::report::Tracker;
use crate::copy::{
	AssignReport, CopyError, DiagnosticKind, FaultPolicy, FieldPath, FieldValue, MismatchPolicy, PathStep, Ptr, Result, SeqValue, StructValue, Value, ValueKind,
};

/// Behavior switches for selective assignment.
#[derive(Debug, Clone, Default)]
pub struct AssignOptions {
	/// Handling of kind and sequence-length mismatches.
	pub on_mismatch: MismatchPolicy,
	/// Handling of writes to unexported fields.
	pub on_fault: FaultPolicy,
	/// Replace aggregate sequences of different length wholesale instead of skipping them.
	pub replace_mismatched_seqs: bool,
}

impl AssignOptions {
	/// Fail on the first shape mismatch.
	pub fn strict() -> Self {
		Self {
			on_mismatch: MismatchPolicy::Error,
			on_fault: FaultPolicy::Abort,
			replace_mismatched_seqs: false,
		}
	}

	/// Skip shape mismatches without recording them.
	pub fn lenient() -> Self {
		Self {
			on_mismatch: MismatchPolicy::Ignore,
			on_fault: FaultPolicy::Abort,
			replace_mismatched_seqs: false,
		}
	}
}

/// Assign every non-zero field of `src` into the same-named field of `dst`.
///
/// Both arguments must reference aggregates: a struct, a non-nil pointer to a
/// struct, or a non-nil holder of either. Anything else fails with
/// [`CopyError::InvalidInput`] before `dst` is touched. Other errors may leave
/// `dst` partially assigned.
pub fn assign_struct(src: &Value, dst: &mut Value, opt: &AssignOptions) -> Result<AssignReport> {
	if let (Some(a), Some(b)) = (root_ptr(src), root_ptr(dst))
		&& Rc::ptr_eq(a, b)
	{
		trace!("source and destination share a target");
		return Ok(AssignReport::default());
	}

	let outcome = with_source(src, |src| with_destination(dst, |dst| assign_struct_fields(src, dst, opt)));
	if let Err(err) = &outcome
		&& err.is_invalid_input()
	{
		warn!(error = %err, "selective assignment skipped");
	}
	outcome
}

/// Assign between aggregates the caller already holds.
pub fn assign_struct_fields(src: &StructValue, dst: &mut StructValue, opt: &AssignOptions) -> Result<AssignReport> {
	let mut run = AssignRun {
		opt,
		tracker: Tracker::new(opt.on_mismatch, opt.on_fault),
		path: FieldPath::root(),
		assigned: 0,
	};
	run.assign_fields(src, dst, true)?;

	let report = AssignReport {
		assigned: run.assigned,
		diagnostics: run.tracker.diagnostics,
		faults: run.tracker.faults,
	};
	debug!(
		src = %src.type_name,
		dst = %dst.type_name,
		assigned = report.assigned,
		diagnostics = report.diagnostics.len(),
		faults = report.faults.len(),
		"selective assignment finished"
	);
	Ok(report)
}

struct AssignRun<'o> {
	opt: &'o AssignOptions,
	tracker: Tracker,
	path: FieldPath,
	assigned: usize,
}

impl AssignRun<'_> {
	/// `visible` is false once the walk has passed through an unexported field.
	fn assign_fields(&mut self, src: &StructValue, dst: &mut StructValue, visible: bool) -> Result<()> {
		for field in &src.fields {
			self.path.push(PathStep::Field(field.name.to_string()));
			let outcome = self.assign_field(field, dst, visible);
			self.path.pop();
			outcome?;
		}
		Ok(())
	}

	fn assign_field(&mut self, field: &FieldValue, dst: &mut StructValue, visible: bool) -> Result<()> {
		if field.embedded && dst.lookup(&field.name).is_none() {
			if let Value::Struct(inner) = &field.value {
				trace!(path = %self.path, "promoting embedded fields into destination");
				return self.assign_fields(inner, dst, visible);
			}
			return Ok(());
		}

		let Some(target) = dst.lookup_mut(&field.name) else {
			trace!(path = %self.path, "no destination field");
			return Ok(());
		};

		// nil pointers and holders are zero too
		if field.value.is_zero() {
			return Ok(());
		}

		match &field.value {
			Value::Struct(inner) => {
				let child_visible = visible && field.exported && target.exported;
				if let Value::Struct(nested) = &mut target.value {
					return self.assign_fields(inner, nested, child_visible);
				}
				let dst_kind = target.value.kind();
				if dst_kind == ValueKind::Null {
					return self.set(field, target, visible);
				}
				self.tracker.mismatch(
					&self.path,
					DiagnosticKind::KindMismatch {
						src: ValueKind::Struct,
						dst: dst_kind,
					},
				)
			}
			Value::Seq(seq) => self.assign_seq(seq, field, target, visible),
			// Time is an opaque scalar and falls through to a plain set.
			_ => self.set(field, target, visible),
		}
	}

	fn assign_seq(&mut self, seq: &SeqValue, src_field: &FieldValue, dst_field: &mut FieldValue, visible: bool) -> Result<()> {
		let dst_kind = dst_field.value.kind();
		if dst_kind == ValueKind::Null {
			return self.set(src_field, dst_field, visible);
		}
		let Value::Seq(target) = &dst_field.value else {
			return self.tracker.mismatch(
				&self.path,
				DiagnosticKind::KindMismatch {
					src: ValueKind::Seq,
					dst: dst_kind,
				},
			);
		};
		let dst_len = target.len();

		if seq.elem == ValueKind::Struct {
			if seq.len() == dst_len {
				let child_visible = visible && src_field.exported && dst_field.exported;
				return self.assign_elements(seq, dst_field, child_visible);
			}
			if !self.opt.replace_mismatched_seqs {
				return self.tracker.mismatch(&self.path, DiagnosticKind::SeqLenMismatch { src: seq.len(), dst: dst_len });
			}
		}

		self.set(src_field, dst_field, visible)
	}

	fn assign_elements(&mut self, seq: &SeqValue, dst_field: &mut FieldValue, visible: bool) -> Result<()> {
		let Value::Seq(target) = &mut dst_field.value else {
			return Ok(());
		};
		let pairs = seq.items.iter().flatten().zip(target.items.iter_mut().flatten());

		for (index, (from, to)) in pairs.enumerate() {
			self.path.push(PathStep::Index(index));
			let outcome = match (from, to) {
				(Value::Struct(from), Value::Struct(to)) => self.assign_fields(from, to, visible),
				(from, to) => {
					let kind = DiagnosticKind::KindMismatch {
						src: from.kind(),
						dst: to.kind(),
					};
					self.tracker.mismatch(&self.path, kind)
				}
			};
			self.path.pop();
			outcome?;
		}
		Ok(())
	}

	fn set(&mut self, src_field: &FieldValue, dst_field: &mut FieldValue, visible: bool) -> Result<()> {
		let src_kind = src_field.value.kind();
		let dst_kind = dst_field.value.kind();
		// a nil destination has no declared kind and takes anything
		if src_kind != dst_kind && dst_kind != ValueKind::Null {
			return self.tracker.mismatch(&self.path, DiagnosticKind::KindMismatch { src: src_kind, dst: dst_kind });
		}
		if let Some((src, dst)) = inner_kind_mismatch(&src_field.value, &dst_field.value) {
			return self.tracker.mismatch(&self.path, DiagnosticKind::KindMismatch { src, dst });
		}

		if !(visible && src_field.exported && dst_field.exported) {
			return self.tracker.fault(CopyError::Unexported { path: self.path.to_string() });
		}

		dst_field.value = src_field.value.clone();
		self.assigned += 1;
		trace!(path = %self.path, kind = %src_kind, "assigned");
		Ok(())
	}
}

/// First element, key, or value kind that differs between two containers.
///
/// `Dyn` on either side matches anything.
fn inner_kind_mismatch(src: &Value, dst: &Value) -> Option<(ValueKind, ValueKind)> {
	let pairs = match (src, dst) {
		(Value::Seq(src), Value::Seq(dst)) => vec![(src.elem, dst.elem)],
		(Value::Map(src), Value::Map(dst)) => vec![(src.key, dst.key), (src.value, dst.value)],
		_ => return None,
	};
	pairs
		.into_iter()
		.find(|(src, dst)| src != dst && *src != ValueKind::Dyn && *dst != ValueKind::Dyn)
}

fn root_ptr(value: &Value) -> Option<&Ptr> {
	match value {
		Value::Ptr(target) => target.as_ref(),
		Value::Dyn(Some(inner)) => root_ptr(inner),
		_ => None,
	}
}

fn with_source<R>(src: &Value, f: impl FnOnce(&StructValue) -> Result<R>) -> Result<R> {
	match src {
		Value::Struct(item) => f(item),
		Value::Dyn(Some(inner)) => with_source(inner, f),
		Value::Ptr(Some(target)) => {
			let guard = target.try_borrow().map_err(|_| CopyError::Borrowed {
				path: FieldPath::root().to_string(),
			})?;
			match &*guard {
				Value::Struct(item) => f(item),
				other => Err(CopyError::invalid("source", format!("expected struct behind pointer, got {}", other.kind()))),
			}
		}
		Value::Null | Value::Ptr(None) | Value::Dyn(None) => Err(CopyError::invalid("source", "nil reference")),
		other => Err(CopyError::invalid("source", format!("expected struct, got {}", other.kind()))),
	}
}

fn with_destination<R>(dst: &mut Value, f: impl FnOnce(&mut StructValue) -> Result<R>) -> Result<R> {
	match dst {
		Value::Struct(item) => f(item),
		Value::Dyn(Some(inner)) => with_destination(inner, f),
		Value::Ptr(Some(target)) => {
			let mut guard = target.try_borrow_mut().map_err(|_| CopyError::Borrowed {
				path: FieldPath::root().to_string(),
			})?;
			match &mut *guard {
				Value::Struct(item) => f(item),
				other => Err(CopyError::invalid("destination", format!("expected struct behind pointer, got {}", other.kind()))),
			}
		}
		Value::Null | Value::Ptr(None) | Value::Dyn(None) => Err(CopyError::invalid("destination", "nil reference")),
		other => Err(CopyError::invalid("destination", format!("expected struct, got {}", other.kind()))),
	}
}
