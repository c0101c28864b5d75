use std::fmt;
use std::rc::Rc;

use crate::copy::Value;

/// Capability for types that produce their own deep copy.
///
/// The deep copier checks for this before any structural recursion and
/// trusts the returned value as-is.
pub trait SelfClone: fmt::Debug {
	/// Type label used in diagnostics.
	fn type_name(&self) -> &str;

	/// Produce an independent copy.
	fn deep_copy(&self) -> Value;

	/// Whether selective assignment should treat this value as not provided.
	fn is_zero(&self) -> bool {
		false
	}

	/// Zero value substituted when this value cannot be copied.
	fn zero_value(&self) -> Value {
		Value::Null
	}
}

/// Shared handle to a [`SelfClone`] implementation.
///
/// Equality is identity: two handles are equal when they share a target.
#[derive(Clone)]
pub struct CustomValue(Rc<dyn SelfClone>);

impl CustomValue {
	/// Wrap a self-cloning value.
	pub fn new(inner: impl SelfClone + 'static) -> Self {
		Self(Rc::new(inner))
	}

	/// Borrow the wrapped implementation.
	pub fn inner(&self) -> &dyn SelfClone {
		self.0.as_ref()
	}

	/// See [`SelfClone::type_name`].
	pub fn type_name(&self) -> &str {
		self.0.type_name()
	}

	/// See [`SelfClone::deep_copy`].
	pub fn deep_copy(&self) -> Value {
		self.0.deep_copy()
	}

	/// See [`SelfClone::is_zero`].
	pub fn is_zero(&self) -> bool {
		self.0.is_zero()
	}

	/// See [`SelfClone::zero_value`].
	pub fn zero_value(&self) -> Value {
		self.0.zero_value()
	}
}

impl fmt::Debug for CustomValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("CustomValue").field(&self.0).finish()
	}
}

impl PartialEq for CustomValue {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
