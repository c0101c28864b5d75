use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::copy::report::Tracker;
use crate::copy::{
	CloneOutcome, CopyError, DiagnosticKind, FaultPolicy, FieldPath, FieldValue, MapEntry, MapValue, MismatchPolicy, PathStep, Ptr, Result, SeqValue, StructValue,
	Value,
};

/// Runtime limits and fault handling for deep copies.
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
	/// Maximum recursion depth; unbounded when `None`.
	///
	/// Cycles are caught regardless, so this only guards the call stack.
	pub max_depth: Option<usize>,
	/// Handling of cycles, depth overruns, and borrowed pointer targets.
	pub on_fault: FaultPolicy,
}

impl CloneOptions {
	/// Replace faulting subgraphs with zero values instead of failing.
	pub fn lenient() -> Self {
		Self {
			on_fault: FaultPolicy::Continue,
			..Self::default()
		}
	}
}

/// Deep copy `src` with default options.
///
/// The copy shares no pointer targets with `src`, except whatever
/// [`SelfClone`](crate::copy::SelfClone) implementations hand back.
/// Unexported struct fields come back as zero values.
pub fn deep_copy(src: &Value) -> Result<Value> {
	deep_copy_with(src, &CloneOptions::default()).map(|outcome| outcome.value)
}

/// Deep copy `src`, returning the copy together with its diagnostics.
pub fn deep_copy_with(src: &Value, opt: &CloneOptions) -> Result<CloneOutcome> {
	let mut run = CloneRun {
		opt,
		tracker: Tracker::new(MismatchPolicy::Report, opt.on_fault),
		path: FieldPath::root(),
		ancestors: HashSet::new(),
		depth: 0,
	};
	let value = run.copy(src)?;

	debug!(
		kind = %value.kind(),
		skipped = run.tracker.diagnostics.len(),
		faults = run.tracker.faults.len(),
		"deep copy finished"
	);
	Ok(CloneOutcome {
		value,
		diagnostics: run.tracker.diagnostics,
		faults: run.tracker.faults,
	})
}

struct CloneRun<'o> {
	opt: &'o CloneOptions,
	tracker: Tracker,
	path: FieldPath,
	/// Pointer targets on the path from the root to the current value.
	ancestors: HashSet<*const RefCell<Value>>,
	depth: usize,
}

impl CloneRun<'_> {
	fn copy(&mut self, value: &Value) -> Result<Value> {
		if let Some(max_depth) = self.opt.max_depth
			&& self.depth >= max_depth
		{
			self.tracker.fault(CopyError::DepthExceeded {
				path: self.path.to_string(),
				max_depth,
			})?;
			return Ok(value.zero_like());
		}

		self.depth += 1;
		let out = self.copy_kind(value);
		self.depth -= 1;
		out
	}

	fn copy_kind(&mut self, value: &Value) -> Result<Value> {
		match value {
			Value::Custom(custom) => {
				trace!(path = %self.path, type_name = custom.type_name(), "delegating to self-clone");
				Ok(custom.deep_copy())
			}
			Value::Ptr(None) => Ok(Value::Ptr(None)),
			Value::Ptr(Some(target)) => self.copy_pointer(target),
			Value::Dyn(None) => Ok(Value::Dyn(None)),
			Value::Dyn(Some(inner)) => Ok(Value::dynamic(self.copy(inner)?)),
			Value::Struct(item) => self.copy_struct(item).map(Value::Struct),
			Value::Seq(seq) => self.copy_seq(seq).map(Value::Seq),
			Value::Map(map) => self.copy_map(map).map(Value::Map),
			Value::Null
			| Value::Bool(_)
			| Value::I64(_)
			| Value::U64(_)
			| Value::F32(_)
			| Value::F64(_)
			| Value::String(_)
			| Value::Bytes(_)
			| Value::Time(_) => Ok(value.clone()),
		}
	}

	fn copy_pointer(&mut self, target: &Ptr) -> Result<Value> {
		let key = Rc::as_ptr(target);
		if self.ancestors.contains(&key) {
			self.tracker.fault(CopyError::Cycle { path: self.path.to_string() })?;
			return Ok(Value::Ptr(None));
		}

		let Ok(guard) = target.try_borrow() else {
			self.tracker.fault(CopyError::Borrowed { path: self.path.to_string() })?;
			return Ok(Value::Ptr(None));
		};

		self.ancestors.insert(key);
		let copied = self.copy(&guard);
		self.ancestors.remove(&key);
		Ok(Value::ptr(copied?))
	}

	fn copy_struct(&mut self, item: &StructValue) -> Result<StructValue> {
		let mut fields = Vec::with_capacity(item.fields.len());
		for field in &item.fields {
			self.path.push(PathStep::Field(field.name.to_string()));
			let value = if field.exported {
				self.copy(&field.value)
			} else {
				trace!(path = %self.path, "unexported field left at zero");
				self.tracker.note(&self.path, DiagnosticKind::UnexportedSkipped);
				Ok(field.value.zero_like())
			};
			self.path.pop();

			fields.push(FieldValue {
				name: field.name.clone(),
				value: value?,
				embedded: field.embedded,
				exported: field.exported,
			});
		}

		Ok(StructValue {
			type_name: item.type_name.clone(),
			fields,
		})
	}

	fn copy_seq(&mut self, seq: &SeqValue) -> Result<SeqValue> {
		let Some(items) = &seq.items else {
			return Ok(SeqValue::nil(seq.elem));
		};

		let mut out = Vec::with_capacity(items.capacity());
		for (index, item) in items.iter().enumerate() {
			self.path.push(PathStep::Index(index));
			let copied = self.copy(item);
			self.path.pop();
			out.push(copied?);
		}
		Ok(SeqValue::new(seq.elem, out))
	}

	fn copy_map(&mut self, map: &MapValue) -> Result<MapValue> {
		let Some(entries) = &map.entries else {
			return Ok(MapValue::nil(map.key, map.value));
		};

		let mut out = Vec::with_capacity(entries.len());
		for entry in entries {
			self.path.push(PathStep::Key(key_label(&entry.key)));
			let copied = self.copy_entry(entry);
			self.path.pop();
			out.push(copied?);
		}
		Ok(MapValue {
			key: map.key,
			value: map.value,
			entries: Some(out),
		})
	}

	// Source keys are already distinct, so copies are pushed without a lookup.
	fn copy_entry(&mut self, entry: &MapEntry) -> Result<MapEntry> {
		let key = self.copy(&entry.key)?;
		let value = self.copy(&entry.value)?;
		Ok(MapEntry { key, value })
	}
}

fn key_label(key: &Value) -> String {
	match key {
		Value::String(value) => value.to_string(),
		Value::I64(value) => value.to_string(),
		Value::U64(value) => value.to_string(),
		Value::Bool(value) => value.to_string(),
		other => other.kind().to_string(),
	}
}

#[cfg(test)]
mod tests;
