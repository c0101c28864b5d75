//! Bridge between serde types and the runtime value model.
//!
//! JSON objects become exported structs named `object`, arrays become
//! sequences, and `null` becomes [`Value::Null`], which selective assignment
//! treats as an untyped slot that accepts any kind.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};

use crate::copy::{AssignOptions, AssignReport, FieldValue, MapValue, Result, SeqValue, StructValue, Value, ValueKind, assign_struct, deep_copy};

/// Type name given to structs built from JSON objects.
const OBJECT_TYPE_NAME: &str = "object";

impl Value {
	/// Build a value graph from parsed JSON.
	pub fn from_json(json: &JsonValue) -> Self {
		match json {
			JsonValue::Null => Self::Null,
			JsonValue::Bool(value) => Self::Bool(*value),
			JsonValue::Number(number) => number_value(number),
			JsonValue::String(value) => Self::string(value.as_str()),
			JsonValue::Array(items) => {
				let items: Vec<Value> = items.iter().map(Self::from_json).collect();
				Self::Seq(SeqValue::new(common_kind(&items), items))
			}
			JsonValue::Object(object) => {
				let fields = object.iter().map(|(name, value)| FieldValue::new(name, Self::from_json(value))).collect();
				Self::Struct(StructValue {
					type_name: Box::from(OBJECT_TYPE_NAME),
					fields,
				})
			}
		}
	}

	/// Render this value graph as JSON.
	///
	/// Pointers and holders render their target, or `null` when nil, borrowed,
	/// or closing a cycle. Maps with string keys render as objects, other maps
	/// as arrays of `[key, value]` pairs.
	pub fn to_json(&self) -> JsonValue {
		let mut ancestors = Vec::new();
		render(self, &mut ancestors)
	}
}

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

/// Selectively assign between two serde types through the value model.
///
/// `dst` is only overwritten once the assigned graph deserializes back into `D`.
pub fn assign_serde<S, D>(src: &S, dst: &mut D, opt: &AssignOptions) -> Result<AssignReport>
where
	S: Serialize,
	D: Serialize + DeserializeOwned,
{
	let src_value = Value::from_json(&serde_json::to_value(src)?);
	let mut dst_value = Value::from_json(&serde_json::to_value(&*dst)?);
	let report = assign_struct(&src_value, &mut dst_value, opt)?;
	*dst = serde_json::from_value(dst_value.to_json())?;
	Ok(report)
}

/// Deep copy a serde type through the value model.
pub fn deep_copy_serde<T>(src: &T) -> Result<T>
where
	T: Serialize + DeserializeOwned,
{
	let value = Value::from_json(&serde_json::to_value(src)?);
	let copied = deep_copy(&value)?;
	Ok(serde_json::from_value(copied.to_json())?)
}

fn number_value(number: &Number) -> Value {
	if let Some(value) = number.as_i64() {
		Value::I64(value)
	} else if let Some(value) = number.as_u64() {
		Value::U64(value)
	} else {
		Value::F64(number.as_f64().unwrap_or(f64::NAN))
	}
}

fn common_kind(items: &[Value]) -> ValueKind {
	let mut kinds = items.iter().map(Value::kind);
	let Some(first) = kinds.next() else {
		return ValueKind::Dyn;
	};
	if kinds.all(|kind| kind == first) { first } else { ValueKind::Dyn }
}

fn render(value: &Value, ancestors: &mut Vec<*const RefCell<Value>>) -> JsonValue {
	match value {
		Value::Null | Value::Ptr(None) | Value::Dyn(None) => JsonValue::Null,
		Value::Bool(value) => JsonValue::Bool(*value),
		Value::I64(value) => JsonValue::from(*value),
		Value::U64(value) => JsonValue::from(*value),
		Value::F32(value) => float_json(f64::from(*value)),
		Value::F64(value) => float_json(*value),
		Value::String(value) => JsonValue::String(value.to_string()),
		Value::Bytes(None) => JsonValue::Null,
		Value::Bytes(Some(bytes)) => JsonValue::Array(bytes.iter().map(|byte| JsonValue::from(*byte)).collect()),
		Value::Time(time) => JsonValue::String(time.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
		Value::Ptr(Some(target)) => {
			let key = Rc::as_ptr(target);
			if ancestors.contains(&key) {
				return JsonValue::Null;
			}
			let Ok(guard) = target.try_borrow() else {
				return JsonValue::Null;
			};
			ancestors.push(key);
			let out = render(&guard, ancestors);
			ancestors.pop();
			out
		}
		Value::Dyn(Some(inner)) => render(inner, ancestors),
		Value::Struct(item) => {
			let mut object = Map::new();
			for field in &item.fields {
				object.insert(field.name.to_string(), render(&field.value, ancestors));
			}
			JsonValue::Object(object)
		}
		Value::Seq(seq) => match &seq.items {
			Some(items) => JsonValue::Array(items.iter().map(|item| render(item, ancestors)).collect()),
			None => JsonValue::Null,
		},
		Value::Map(map) => render_map(map, ancestors),
		Value::Custom(custom) => render(&custom.deep_copy(), ancestors),
	}
}

fn render_map(map: &MapValue, ancestors: &mut Vec<*const RefCell<Value>>) -> JsonValue {
	if map.is_nil() {
		return JsonValue::Null;
	}

	if map.iter().all(|entry| matches!(entry.key, Value::String(_))) {
		let mut object = Map::new();
		for entry in map.iter() {
			if let Value::String(key) = &entry.key {
				object.insert(key.to_string(), render(&entry.value, ancestors));
			}
		}
		return JsonValue::Object(object);
	}

	JsonValue::Array(
		map.iter()
			.map(|entry| JsonValue::Array(vec![render(&entry.key, ancestors), render(&entry.value, ancestors)]))
			.collect(),
	)
}

fn float_json(value: f64) -> JsonValue {
	Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}
