use std::cell::Cell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};

use crate::copy::{
	CloneOptions, CopyError, DiagnosticKind, FieldPath, MapValue, SelfClone, SeqValue, StructValue, Value, ValueKind, deep_copy, deep_copy_with,
};

#[derive(Debug)]
struct Handle {
	label: &'static str,
	copies: Rc<Cell<usize>>,
}

impl SelfClone for Handle {
	fn type_name(&self) -> &str {
		"Handle"
	}

	fn deep_copy(&self) -> Value {
		self.copies.set(self.copies.get() + 1);
		Value::string(format!("reopened {}", self.label))
	}
}

fn sample_graph() -> Value {
	let address = Value::ptr(Value::Struct(StructValue::new("Address").with("City", "Oslo")));
	let scores = MapValue::new(ValueKind::String, ValueKind::Int).with("math", 90).with("art", 75);
	Value::Struct(
		StructValue::new("Student")
			.with("Name", "Ada")
			.with("Enrolled", Utc.with_ymd_and_hms(2020, 9, 1, 8, 0, 0).unwrap())
			.with("Home", address)
			.with("Scores", scores)
			.with("Notes", SeqValue::new(ValueKind::Ptr, vec![Value::ptr("first".into()), Value::Ptr(None)]))
			.with("Extra", Value::dynamic(Value::U64(7)))
			.with("Mentor", Value::Ptr(None))
			.with("Clubs", SeqValue::nil(ValueKind::String)),
	)
}

#[test]
fn null_copies_to_null() {
	assert_eq!(deep_copy(&Value::Null).expect("copy succeeds"), Value::Null);
}

#[test]
fn copy_is_structurally_equal() {
	let original = sample_graph();
	let copy = deep_copy(&original).expect("copy succeeds");
	assert_eq!(copy, original);
}

#[test]
fn copy_shares_no_pointer_targets() {
	let original = sample_graph();
	let copy = deep_copy(&original).expect("copy succeeds");

	let home = |value: &Value| value.as_struct().and_then(|item| item.get("Home")).and_then(Value::as_ptr).cloned().expect("home pointer");
	let original_home = home(&original);
	let copied_home = home(&copy);
	assert!(!Rc::ptr_eq(&original_home, &copied_home));

	if let Value::Struct(address) = &mut *copied_home.borrow_mut() {
		address.lookup_mut("City").expect("city field").value = Value::string("Tromsø");
	}
	let city = original.get_path(&FieldPath::parse("Home.City").expect("path parses"));
	assert_eq!(city, Some(Value::string("Oslo")));
}

#[test]
fn nil_containers_stay_nil_and_empty_ones_stay_empty() {
	let original = Value::Struct(
		StructValue::new("Bag")
			.with("NilSeq", SeqValue::nil(ValueKind::Int))
			.with("EmptySeq", SeqValue::new(ValueKind::Int, Vec::new()))
			.with("NilMap", MapValue::nil(ValueKind::String, ValueKind::Int))
			.with("NilHolder", Value::Dyn(None)),
	);
	let copy = deep_copy(&original).expect("copy succeeds");
	let item = copy.as_struct().expect("struct copy");

	assert!(matches!(item.get("NilSeq"), Some(Value::Seq(seq)) if seq.is_nil()));
	assert!(matches!(item.get("EmptySeq"), Some(Value::Seq(seq)) if !seq.is_nil() && seq.is_empty()));
	assert!(matches!(item.get("NilMap"), Some(Value::Map(map)) if map.is_nil()));
	assert_eq!(item.get("NilHolder"), Some(&Value::Dyn(None)));
}

#[test]
fn sequence_capacity_is_preserved() {
	let mut items = Vec::with_capacity(16);
	items.push(Value::I64(1));
	let copy = deep_copy(&Value::Seq(SeqValue::new(ValueKind::Int, items))).expect("copy succeeds");

	let Value::Seq(seq) = copy else {
		panic!("expected sequence");
	};
	let copied = seq.items.expect("non-nil sequence");
	assert_eq!(copied.len(), 1);
	assert!(copied.capacity() >= 16);
}

#[test]
fn map_copy_is_independent_of_later_mutation() {
	let mut original = MapValue::new(ValueKind::String, ValueKind::Int).with("a", 1).with("b", 2);
	let copy = deep_copy(&Value::Map(original.clone())).expect("copy succeeds");

	original.insert("a".into(), 100.into());
	original.insert("c".into(), 3.into());

	let Value::Map(copy) = copy else {
		panic!("expected map");
	};
	assert_eq!(copy.len(), 2);
	assert_eq!(copy.get(&"a".into()), Some(&Value::I64(1)));
	assert_eq!(copy.get(&"b".into()), Some(&Value::I64(2)));
}

#[test]
fn composite_map_keys_are_copied() {
	let key_target = Value::ptr(Value::string("k"));
	let map = MapValue::new(ValueKind::Ptr, ValueKind::Bool).with(key_target.clone(), true);

	let Value::Map(copy) = deep_copy(&Value::Map(map)).expect("copy succeeds") else {
		panic!("expected map");
	};
	let copied_key = copy.iter().next().map(|entry| entry.key.clone()).expect("one entry");
	assert_eq!(copied_key, key_target);
	assert!(!Rc::ptr_eq(copied_key.as_ptr().expect("pointer key"), key_target.as_ptr().expect("pointer key")));
}

#[test]
fn self_clone_override_is_trusted() {
	let copies = Rc::new(Cell::new(0));
	let original = Value::Struct(StructValue::new("Conn").with(
		"Socket",
		Value::custom(Handle {
			label: "db",
			copies: Rc::clone(&copies),
		}),
	));

	let copy = deep_copy(&original).expect("copy succeeds");

	assert_eq!(copies.get(), 1);
	let socket = copy.as_struct().and_then(|item| item.get("Socket")).cloned();
	assert_eq!(socket, Some(Value::string("reopened db")));
}

#[test]
fn unexported_fields_are_zeroed_and_reported() {
	let original = Value::Struct(StructValue::new("Session").with("User", "ada").with_private("token", "s3cr3t"));

	let outcome = deep_copy_with(&original, &CloneOptions::default()).expect("copy succeeds");
	let item = outcome.value.as_struct().expect("struct copy");

	assert_eq!(item.get("User"), Some(&Value::string("ada")));
	assert_eq!(item.get("token"), Some(&Value::string("")));
	assert!(!item.fields[1].exported);
	assert_eq!(outcome.diagnostics.len(), 1);
	assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::UnexportedSkipped);
	assert_eq!(outcome.diagnostics[0].path.to_string(), "token");
	assert!(!outcome.is_partial());
}

#[test]
fn cycles_fail_with_a_dedicated_error() {
	let node = Value::ptr(Value::Struct(StructValue::new("Node").with("Next", Value::Ptr(None))));
	let target = node.as_ptr().cloned().expect("pointer");
	if let Value::Struct(item) = &mut *target.borrow_mut() {
		item.lookup_mut("Next").expect("next field").value = node.clone();
	}

	let err = deep_copy(&node).expect_err("cycle is rejected");
	assert!(matches!(err, CopyError::Cycle { ref path } if path == "Next"));

	// break the cycle so the Rc pair is freed
	if let Value::Struct(item) = &mut *target.borrow_mut() {
		item.lookup_mut("Next").expect("next field").value = Value::Ptr(None);
	}
}

#[test]
fn cycles_become_nil_when_continuing() {
	let node = Value::ptr(Value::Struct(StructValue::new("Node").with("Label", "a").with("Next", Value::Ptr(None))));
	let target = node.as_ptr().cloned().expect("pointer");
	if let Value::Struct(item) = &mut *target.borrow_mut() {
		item.lookup_mut("Next").expect("next field").value = node.clone();
	}

	let outcome = deep_copy_with(&node, &CloneOptions::lenient()).expect("copy continues");

	assert!(outcome.is_partial());
	let next = outcome.value.get_path(&FieldPath::parse("Next").expect("path parses"));
	assert_eq!(next, Some(Value::Ptr(None)));
	let label = outcome.value.get_path(&FieldPath::parse("Label").expect("path parses"));
	assert_eq!(label, Some(Value::string("a")));

	if let Value::Struct(item) = &mut *target.borrow_mut() {
		item.lookup_mut("Next").expect("next field").value = Value::Ptr(None);
	}
}

#[test]
fn shared_acyclic_targets_are_copied_per_reference() {
	let shared = Value::ptr(Value::I64(5));
	let original = Value::Seq(SeqValue::new(ValueKind::Ptr, vec![shared.clone(), shared]));

	let Value::Seq(copy) = deep_copy(&original).expect("diamond is not a cycle") else {
		panic!("expected sequence");
	};
	let items = copy.items.expect("non-nil");
	let (Some(a), Some(b)) = (items[0].as_ptr(), items[1].as_ptr()) else {
		panic!("expected pointers");
	};
	assert!(!Rc::ptr_eq(a, b));
	assert_eq!(*a.borrow(), Value::I64(5));
}

#[test]
fn depth_limit_is_enforced() {
	let mut value = Value::I64(1);
	for _ in 0..10 {
		value = Value::dynamic(value);
	}
	let opt = CloneOptions {
		max_depth: Some(4),
		..CloneOptions::default()
	};

	let err = deep_copy_with(&value, &opt).expect_err("depth limit trips");
	assert!(matches!(err, CopyError::DepthExceeded { max_depth: 4, .. }));
}

#[test]
fn mutably_borrowed_targets_fault() {
	let node = Value::ptr(Value::I64(1));
	let target = node.as_ptr().cloned().expect("pointer");
	let _guard = target.borrow_mut();

	let err = deep_copy(&node).expect_err("borrowed target faults");
	assert!(matches!(err, CopyError::Borrowed { .. }));
}

#[test]
fn long_acyclic_lists_copy_with_default_options() {
	let mut head = Value::Ptr(None);
	for id in (0..300_i64).rev() {
		head = Value::ptr(Value::Struct(StructValue::new("Node").with("Id", id).with("Next", head)));
	}

	let copy = deep_copy(&head).expect("long list copies");

	assert_eq!(copy, head);
	let path = FieldPath::parse(&format!("{}Id", "Next.".repeat(299))).expect("path parses");
	assert_eq!(copy.get_path(&path), Some(Value::I64(299)));
}

#[test]
fn not_a_number_survives_as_equal() {
	let original = Value::Struct(StructValue::new("Reading").with("Celsius", f64::NAN).with("Raw", Value::Bytes(Some(Vec::new()))));
	let copy = deep_copy(&original).expect("copy succeeds");
	assert_eq!(copy, original);
}
