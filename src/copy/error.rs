use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, CopyError>;

/// Errors produced while assigning, copying, or addressing value graphs.
#[derive(Debug, Error)]
pub enum CopyError {
	/// Entry point received a nil reference or a non-aggregate value.
	///
	/// Reported before any mutation happens.
	#[error("invalid {role}: {reason}")]
	InvalidInput {
		/// Which argument was rejected (`source` or `destination`).
		role: &'static str,
		/// Human-readable rejection reason.
		reason: String,
	},
	/// Source and destination shapes disagree under a strict mismatch policy.
	#[error("shape mismatch at {path}: {detail}")]
	ShapeMismatch {
		/// Location of the mismatching field or element.
		path: String,
		/// Description of the mismatch.
		detail: String,
	},
	/// Assignment reached a field that is not exported on one side.
	#[error("field {path} is not exported")]
	Unexported {
		/// Location of the unexported field.
		path: String,
	},
	/// Pointer target was already mutably borrowed by the caller.
	#[error("pointer at {path} is already mutably borrowed")]
	Borrowed {
		/// Location of the pointer.
		path: String,
	},
	/// Pointer refers back to one of its own ancestors.
	#[error("cycle detected at {path}")]
	Cycle {
		/// Location of the pointer closing the cycle.
		path: String,
	},
	/// Recursion exceeded the configured depth ceiling.
	#[error("copy depth exceeded at {path} (max={max_depth})")]
	DepthExceeded {
		/// Location where the limit was hit.
		path: String,
		/// Configured depth ceiling.
		max_depth: usize,
	},
	/// Path expression syntax is invalid.
	#[error("invalid field path: {path}")]
	InvalidFieldPath {
		/// Original user-provided path string.
		path: String,
	},
	/// Conversion between a serde type and the value model failed.
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
}

impl CopyError {
	/// Whether this error was raised before the destination could be touched.
	pub fn is_invalid_input(&self) -> bool {
		matches!(self, Self::InvalidInput { .. } | Self::InvalidFieldPath { .. } | Self::Json(_))
	}

	pub(crate) fn invalid(role: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidInput { role, reason: reason.into() }
	}
}
