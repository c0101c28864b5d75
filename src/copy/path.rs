use std::fmt;

use crate::copy::{CopyError, Result};

/// One parsed operation in a field path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
	/// Select a named struct field.
	Field(String),
	/// Select a sequence element by zero-based index.
	Index(usize),
	/// Select a map entry by key label.
	Key(String),
}

/// Parsed field path expression.
///
/// Paths double as locations in diagnostics and render as `a.b[2].c{key}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
	/// Ordered sequence of path steps.
	pub steps: Vec<PathStep>,
}

impl FieldPath {
	/// Empty path addressing the root value.
	pub fn root() -> Self {
		Self::default()
	}

	/// Parse dotted field syntax with optional `[index]` and `{key}` selectors.
	pub fn parse(input: &str) -> Result<Self> {
		if input.is_empty() {
			return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
		}

		let bytes = input.as_bytes();
		let mut idx = 0_usize;
		let mut steps = Vec::new();

		while idx < bytes.len() {
			let start = idx;
			while idx < bytes.len() {
				let byte = bytes[idx];
				if byte.is_ascii_alphanumeric() || byte == b'_' {
					idx += 1;
				} else {
					break;
				}
			}

			if idx == start {
				return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
			}

			steps.push(PathStep::Field(input[start..idx].to_owned()));

			while idx < bytes.len() && matches!(bytes[idx], b'[' | b'{') {
				if bytes[idx] == b'{' {
					idx += 1;
					let k_start = idx;
					while idx < bytes.len() && bytes[idx] != b'}' {
						idx += 1;
					}
					if idx >= bytes.len() {
						return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
					}
					steps.push(PathStep::Key(input[k_start..idx].to_owned()));
					idx += 1;
					continue;
				}

				idx += 1;
				let n_start = idx;
				while idx < bytes.len() && bytes[idx].is_ascii_digit() {
					idx += 1;
				}
				if idx == n_start || idx >= bytes.len() || bytes[idx] != b']' {
					return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
				}

				let number = input[n_start..idx]
					.parse::<usize>()
					.map_err(|_| CopyError::InvalidFieldPath { path: input.to_owned() })?;
				steps.push(PathStep::Index(number));
				idx += 1;
			}

			if idx < bytes.len() {
				if bytes[idx] != b'.' {
					return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
				}
				idx += 1;
				if idx >= bytes.len() {
					return Err(CopyError::InvalidFieldPath { path: input.to_owned() });
				}
			}
		}

		Ok(Self { steps })
	}

	/// Whether this path addresses the root value.
	pub fn is_root(&self) -> bool {
		self.steps.is_empty()
	}

	pub(crate) fn push(&mut self, step: PathStep) {
		self.steps.push(step);
	}

	pub(crate) fn pop(&mut self) {
		self.steps.pop();
	}
}

impl fmt::Display for FieldPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.steps.is_empty() {
			return f.write_str("<root>");
		}

		for (pos, step) in self.steps.iter().enumerate() {
			match step {
				PathStep::Field(name) if pos == 0 => f.write_str(name)?,
				PathStep::Field(name) => write!(f, ".{name}")?,
				PathStep::Index(index) => write!(f, "[{index}]")?,
				PathStep::Key(key) => write!(f, "{{{key}}}")?,
			}
		}
		Ok(())
	}
}
