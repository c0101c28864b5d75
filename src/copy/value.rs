use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::copy::{CustomValue, FieldPath, PathStep, SelfClone};

/// Seconds between `0001-01-01T00:00:00Z` and the unix epoch.
const ZERO_TIME_UNIX_SECS: i64 = -62_135_596_800;

/// Shared, interior-mutable pointer target.
pub type Ptr = Rc<RefCell<Value>>;

/// The zero date-time, `0001-01-01T00:00:00Z`.
pub fn zero_time() -> DateTime<Utc> {
	DateTime::from_timestamp(ZERO_TIME_UNIX_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Runtime value with its kind discoverable at call time.
///
/// `Clone` behaves like a by-value assignment: pointer targets and custom
/// handles are shared, everything stored inline is duplicated.
#[derive(Debug, Clone)]
pub enum Value {
	/// Untyped nil.
	Null,
	/// Boolean scalar.
	Bool(bool),
	/// Signed integer scalar.
	I64(i64),
	/// Unsigned integer scalar.
	U64(u64),
	/// 32-bit float scalar.
	F32(f32),
	/// 64-bit float scalar.
	F64(f64),
	/// UTF-8 string scalar.
	String(Box<str>),
	/// Opaque byte payload; `None` is the nil payload.
	Bytes(Option<Vec<u8>>),
	/// Date-time, treated as an opaque scalar.
	Time(DateTime<Utc>),
	/// Optional reference to a shared target.
	Ptr(Option<Ptr>),
	/// Dynamically-typed holder.
	Dyn(Option<Box<Value>>),
	/// Struct-shaped aggregate.
	Struct(StructValue),
	/// Sequence of values.
	Seq(SeqValue),
	/// Key-value map.
	Map(MapValue),
	/// Value whose type supplies its own deep copy.
	Custom(CustomValue),
}

/// Kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
	/// See [`Value::Null`].
	Null,
	/// See [`Value::Bool`].
	Bool,
	/// See [`Value::I64`].
	Int,
	/// See [`Value::U64`].
	Uint,
	/// See [`Value::F32`].
	Float32,
	/// See [`Value::F64`].
	Float64,
	/// See [`Value::String`].
	String,
	/// See [`Value::Bytes`].
	Bytes,
	/// See [`Value::Time`].
	Time,
	/// See [`Value::Ptr`].
	Ptr,
	/// See [`Value::Dyn`].
	Dyn,
	/// See [`Value::Struct`].
	Struct,
	/// See [`Value::Seq`].
	Seq,
	/// See [`Value::Map`].
	Map,
	/// See [`Value::Custom`].
	Custom,
}

impl ValueKind {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool => "bool",
			Self::Int => "int",
			Self::Uint => "uint",
			Self::Float32 => "float32",
			Self::Float64 => "float64",
			Self::String => "string",
			Self::Bytes => "bytes",
			Self::Time => "time",
			Self::Ptr => "ptr",
			Self::Dyn => "dyn",
			Self::Struct => "struct",
			Self::Seq => "seq",
			Self::Map => "map",
			Self::Custom => "custom",
		}
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Struct value with field descriptors preserved in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
	/// Struct type name.
	pub type_name: Box<str>,
	/// Fields in declaration order.
	pub fields: Vec<FieldValue>,
}

/// Named struct field and its descriptor flags.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
	/// Field identifier.
	pub name: Box<str>,
	/// Field payload; its kind is the field's declared kind.
	pub value: Value,
	/// Anonymous member whose fields are promoted into the parent.
	pub embedded: bool,
	/// Externally visible member.
	pub exported: bool,
}

/// Sequence with a declared element kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqValue {
	/// Declared element kind.
	pub elem: ValueKind,
	/// Elements; `None` is the nil sequence.
	pub items: Option<Vec<Value>>,
}

/// Map with declared key and value kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
	/// Declared key kind.
	pub key: ValueKind,
	/// Declared value kind.
	pub value: ValueKind,
	/// Entries; `None` is the nil map.
	pub entries: Option<Vec<MapEntry>>,
}

/// One key-value pair of a [`MapValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
	/// Entry key.
	pub key: Value,
	/// Entry value.
	pub value: Value,
}

impl Value {
	/// Kind tag of this value.
	pub fn kind(&self) -> ValueKind {
		match self {
			Self::Null => ValueKind::Null,
			Self::Bool(_) => ValueKind::Bool,
			Self::I64(_) => ValueKind::Int,
			Self::U64(_) => ValueKind::Uint,
			Self::F32(_) => ValueKind::Float32,
			Self::F64(_) => ValueKind::Float64,
			Self::String(_) => ValueKind::String,
			Self::Bytes(_) => ValueKind::Bytes,
			Self::Time(_) => ValueKind::Time,
			Self::Ptr(_) => ValueKind::Ptr,
			Self::Dyn(_) => ValueKind::Dyn,
			Self::Struct(_) => ValueKind::Struct,
			Self::Seq(_) => ValueKind::Seq,
			Self::Map(_) => ValueKind::Map,
			Self::Custom(_) => ValueKind::Custom,
		}
	}

	/// String scalar.
	pub fn string(value: impl Into<Box<str>>) -> Self {
		Self::String(value.into())
	}

	/// Pointer to a freshly allocated target.
	pub fn ptr(target: Value) -> Self {
		Self::Ptr(Some(Rc::new(RefCell::new(target))))
	}

	/// Pointer sharing an existing target.
	pub fn ptr_to(target: &Ptr) -> Self {
		Self::Ptr(Some(Rc::clone(target)))
	}

	/// Dynamically-typed holder wrapping `inner`.
	pub fn dynamic(inner: Value) -> Self {
		Self::Dyn(Some(Box::new(inner)))
	}

	/// Value backed by a self-cloning type.
	pub fn custom(inner: impl SelfClone + 'static) -> Self {
		Self::Custom(CustomValue::new(inner))
	}

	/// Whether this value is its type's zero value, i.e. "not provided".
	///
	/// Floats are zero only when their bit pattern is, so `-0.0` counts as set.
	/// Byte payloads, sequences, and maps are zero only when nil; empty ones are set.
	pub fn is_zero(&self) -> bool {
		match self {
			Self::Null => true,
			Self::Bool(value) => !value,
			Self::I64(value) => *value == 0,
			Self::U64(value) => *value == 0,
			Self::F32(value) => value.to_bits() == 0,
			Self::F64(value) => value.to_bits() == 0,
			Self::String(value) => value.is_empty(),
			Self::Bytes(value) => value.is_none(),
			Self::Time(value) => *value == zero_time(),
			Self::Ptr(target) => target.is_none(),
			Self::Dyn(inner) => inner.is_none(),
			Self::Struct(item) => item.is_zero(),
			Self::Seq(seq) => seq.items.is_none(),
			Self::Map(map) => map.entries.is_none(),
			Self::Custom(custom) => custom.is_zero(),
		}
	}

	/// Zero value with the same shape as `self`.
	pub fn zero_like(&self) -> Self {
		match self {
			Self::Null => Self::Null,
			Self::Bool(_) => Self::Bool(false),
			Self::I64(_) => Self::I64(0),
			Self::U64(_) => Self::U64(0),
			Self::F32(_) => Self::F32(0.0),
			Self::F64(_) => Self::F64(0.0),
			Self::String(_) => Self::String(Box::from("")),
			Self::Bytes(_) => Self::Bytes(None),
			Self::Time(_) => Self::Time(zero_time()),
			Self::Ptr(_) => Self::Ptr(None),
			Self::Dyn(_) => Self::Dyn(None),
			Self::Struct(item) => Self::Struct(item.zero_like()),
			Self::Seq(seq) => Self::Seq(SeqValue::nil(seq.elem)),
			Self::Map(map) => Self::Map(MapValue::nil(map.key, map.value)),
			Self::Custom(custom) => custom.zero_value(),
		}
	}

	/// Borrow as a struct without following pointers.
	pub fn as_struct(&self) -> Option<&StructValue> {
		match self {
			Self::Struct(item) => Some(item),
			_ => None,
		}
	}

	/// Mutably borrow as a struct without following pointers.
	pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
		match self {
			Self::Struct(item) => Some(item),
			_ => None,
		}
	}

	/// Borrow as a string scalar.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	/// Read a signed integer scalar.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(value) => Some(*value),
			_ => None,
		}
	}

	/// Pointer target, if this is a non-nil pointer.
	pub fn as_ptr(&self) -> Option<&Ptr> {
		match self {
			Self::Ptr(target) => target.as_ref(),
			_ => None,
		}
	}

	/// Resolve `path` against this value, following pointers and holders.
	///
	/// Returns a by-value clone since pointer targets cannot be borrowed past
	/// their guard. Field steps use promoted lookup.
	pub fn get_path(&self, path: &FieldPath) -> Option<Value> {
		let mut current = self.clone();
		for step in &path.steps {
			current = current.deref_holders()?;
			current = match (step, &current) {
				(PathStep::Field(name), Value::Struct(item)) => item.lookup(name)?.value.clone(),
				(PathStep::Index(index), Value::Seq(seq)) => seq.items.as_ref()?.get(*index)?.clone(),
				(PathStep::Key(key), Value::Map(map)) => map.get(&Value::string(key.as_str()))?.clone(),
				_ => return None,
			};
		}
		Some(current)
	}

	fn deref_holders(self) -> Option<Value> {
		let mut current = self;
		loop {
			current = match current {
				Value::Ptr(Some(target)) => target.try_borrow().ok().map(|guard| guard.clone())?,
				Value::Dyn(Some(inner)) => *inner,
				Value::Ptr(None) | Value::Dyn(None) => return None,
				other => return Some(other),
			};
		}
	}
}

impl PartialEq for Value {
	/// Structural equality; pointers compare their targets and floats compare bit patterns.
	///
	/// Comparing pointer cycles recurses without bound.
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::I64(a), Self::I64(b)) => a == b,
			(Self::U64(a), Self::U64(b)) => a == b,
			(Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
			(Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
			(Self::String(a), Self::String(b)) => a == b,
			(Self::Bytes(a), Self::Bytes(b)) => a == b,
			(Self::Time(a), Self::Time(b)) => a == b,
			(Self::Ptr(a), Self::Ptr(b)) => match (a, b) {
				(None, None) => true,
				(Some(a), Some(b)) => Rc::ptr_eq(a, b) || matches!((a.try_borrow(), b.try_borrow()), (Ok(a), Ok(b)) if *a == *b),
				_ => false,
			},
			(Self::Dyn(a), Self::Dyn(b)) => a == b,
			(Self::Struct(a), Self::Struct(b)) => a == b,
			(Self::Seq(a), Self::Seq(b)) => a == b,
			(Self::Map(a), Self::Map(b)) => a == b,
			(Self::Custom(a), Self::Custom(b)) => a == b,
			_ => false,
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Self::I64(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::I64(i64::from(value))
	}
}

impl From<u64> for Value {
	fn from(value: u64) -> Self {
		Self::U64(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::F64(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::string(value)
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value.into_boxed_str())
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(value: DateTime<Utc>) -> Self {
		Self::Time(value)
	}
}

impl From<StructValue> for Value {
	fn from(value: StructValue) -> Self {
		Self::Struct(value)
	}
}

impl From<SeqValue> for Value {
	fn from(value: SeqValue) -> Self {
		Self::Seq(value)
	}
}

impl From<MapValue> for Value {
	fn from(value: MapValue) -> Self {
		Self::Map(value)
	}
}

impl StructValue {
	/// Empty struct of the given type.
	pub fn new(type_name: impl Into<Box<str>>) -> Self {
		Self {
			type_name: type_name.into(),
			fields: Vec::new(),
		}
	}

	/// Append an exported field.
	pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.fields.push(FieldValue::new(name, value.into()));
		self
	}

	/// Append an embedded (anonymous) field.
	pub fn with_embedded(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.fields.push(FieldValue::embedded(name, value.into()));
		self
	}

	/// Append a field that is not exported.
	pub fn with_private(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.fields.push(FieldValue::private(name, value.into()));
		self
	}

	/// Direct field by name, ignoring promotion.
	pub fn field(&self, name: &str) -> Option<&FieldValue> {
		self.fields.iter().find(|candidate| candidate.name.as_ref() == name)
	}

	/// Direct field value by name.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.field(name).map(|field| &field.value)
	}

	/// Field by name, including fields promoted from embedded structs.
	pub fn lookup(&self, name: &str) -> Option<&FieldValue> {
		let route = self.promoted_route(name)?;
		let (last, parents) = route.split_last()?;
		let mut current = self;
		for idx in parents {
			current = current.fields.get(*idx)?.value.as_struct()?;
		}
		current.fields.get(*last)
	}

	/// Mutable variant of [`StructValue::lookup`].
	pub fn lookup_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
		let route = self.promoted_route(name)?;
		let (last, parents) = route.split_last()?;
		let mut current = self;
		for idx in parents {
			current = current.fields.get_mut(*idx)?.value.as_struct_mut()?;
		}
		current.fields.get_mut(*last)
	}

	/// Index route to `name`, searching embedded structs breadth-first.
	///
	/// The shallowest match wins; two matches at the same depth are ambiguous
	/// and resolve to nothing.
	fn promoted_route(&self, name: &str) -> Option<Vec<usize>> {
		let mut frontier: Vec<(Vec<usize>, &StructValue)> = vec![(Vec::new(), self)];

		while !frontier.is_empty() {
			let mut found: Option<Vec<usize>> = None;
			let mut ambiguous = false;
			let mut next = Vec::new();

			for (route, item) in &frontier {
				for (idx, field) in item.fields.iter().enumerate() {
					if field.name.as_ref() == name {
						if found.is_some() {
							ambiguous = true;
						}
						let mut hit = route.clone();
						hit.push(idx);
						found = Some(hit);
					} else if field.embedded
						&& let Value::Struct(inner) = &field.value
					{
						let mut deeper = route.clone();
						deeper.push(idx);
						next.push((deeper, inner));
					}
				}
			}

			if ambiguous {
				return None;
			}
			if found.is_some() {
				return found;
			}
			frontier = next;
		}

		None
	}

	/// Whether every field, exported or not, holds its zero value.
	pub fn is_zero(&self) -> bool {
		self.fields.iter().all(|field| field.value.is_zero())
	}

	/// Same type and descriptors with every field zeroed.
	pub fn zero_like(&self) -> Self {
		Self {
			type_name: self.type_name.clone(),
			fields: self
				.fields
				.iter()
				.map(|field| FieldValue {
					name: field.name.clone(),
					value: field.value.zero_like(),
					embedded: field.embedded,
					exported: field.exported,
				})
				.collect(),
		}
	}
}

impl FieldValue {
	/// Exported, non-embedded field.
	pub fn new(name: &str, value: Value) -> Self {
		Self {
			name: Box::from(name),
			value,
			embedded: false,
			exported: true,
		}
	}

	/// Exported embedded field.
	pub fn embedded(name: &str, value: Value) -> Self {
		Self {
			embedded: true,
			..Self::new(name, value)
		}
	}

	/// Field hidden from callers outside the owning type.
	pub fn private(name: &str, value: Value) -> Self {
		Self {
			exported: false,
			..Self::new(name, value)
		}
	}
}

impl SeqValue {
	/// Non-nil sequence holding `items`.
	pub fn new(elem: ValueKind, items: Vec<Value>) -> Self {
		Self { elem, items: Some(items) }
	}

	/// Nil sequence.
	pub fn nil(elem: ValueKind) -> Self {
		Self { elem, items: None }
	}

	/// Whether this is the nil sequence.
	pub fn is_nil(&self) -> bool {
		self.items.is_none()
	}

	/// Element count; nil sequences are empty.
	pub fn len(&self) -> usize {
		self.items.as_ref().map_or(0, Vec::len)
	}

	/// Whether the sequence has no elements.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl MapValue {
	/// Empty, non-nil map.
	pub fn new(key: ValueKind, value: ValueKind) -> Self {
		Self {
			key,
			value,
			entries: Some(Vec::new()),
		}
	}

	/// Nil map.
	pub fn nil(key: ValueKind, value: ValueKind) -> Self {
		Self { key, value, entries: None }
	}

	/// Whether this is the nil map.
	pub fn is_nil(&self) -> bool {
		self.entries.is_none()
	}

	/// Entry count; nil maps are empty.
	pub fn len(&self) -> usize {
		self.entries.as_ref().map_or(0, Vec::len)
	}

	/// Whether the map has no entries.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Value stored under a structurally equal key.
	pub fn get(&self, key: &Value) -> Option<&Value> {
		self.iter().find(|entry| entry.key == *key).map(|entry| &entry.value)
	}

	/// Insert or replace the entry for `key`, allocating a nil map first.
	///
	/// Returns the replaced value.
	pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
		let entries = self.entries.get_or_insert_with(Vec::new);
		if let Some(existing) = entries.iter_mut().find(|entry| entry.key == key) {
			return Some(std::mem::replace(&mut existing.value, value));
		}
		entries.push(MapEntry { key, value });
		None
	}

	/// Builder form of [`MapValue::insert`].
	pub fn with(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
		self.insert(key.into(), value.into());
		self
	}

	/// Iterate entries in storage order.
	pub fn iter(&self) -> impl Iterator<Item = &MapEntry> {
		self.entries.iter().flatten()
	}
}
