#![allow(missing_docs)]

use reflcopy::copy::{AssignOptions, DiagnosticKind, FieldPath, SeqValue, Value, ValueKind, assign_struct, deep_copy};
use reflcopy_testkit::{init_tracing, load_json_fixture};

fn fixture_section(name: &str, section: &str) -> serde_json::Value {
	let fixture = load_json_fixture(name);
	fixture.get(section).cloned().unwrap_or_else(|| panic!("{name} has no {section} section"))
}

#[test]
fn profile_patch_merges_into_current_profile() {
	init_tracing();
	let patch = Value::from_json(&fixture_section("profile_update.json", "patch"));
	let mut current = Value::from_json(&fixture_section("profile_update.json", "current"));

	let report = assign_struct(&patch, &mut current, &AssignOptions::default()).expect("assignment succeeds");

	assert!(report.is_clean(), "unexpected diagnostics: {:?}", report.diagnostics);
	assert_eq!(current.to_json(), fixture_section("profile_update.json", "expected"));
}

#[test]
fn profile_patch_with_extra_order_leaves_orders_alone() {
	init_tracing();
	let mut patch = Value::from_json(&fixture_section("profile_update.json", "patch"));
	let mut current = Value::from_json(&fixture_section("profile_update.json", "current"));

	let orders = patch.as_struct_mut().and_then(|item| item.lookup_mut("orders")).expect("orders field");
	if let Value::Seq(SeqValue { items: Some(items), .. }) = &mut orders.value {
		items.push(Value::from_json(&serde_json::json!({"id": 3, "status": "new"})));
	}

	let report = assign_struct(&patch, &mut current, &AssignOptions::default()).expect("assignment succeeds");

	assert_eq!(report.diagnostics.len(), 1);
	assert_eq!(report.diagnostics[0].path, FieldPath::parse("orders").expect("path parses"));
	assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SeqLenMismatch { src: 3, dst: 2 });

	let expected_orders = fixture_section("profile_update.json", "current").get("orders").cloned();
	assert_eq!(current.to_json().get("orders").cloned(), expected_orders);
	assert_eq!(current.get_path(&FieldPath::parse("name").expect("path parses")), Some(Value::string("Alice")));
}

#[test]
fn profile_patch_with_wrong_kind_is_reported() {
	init_tracing();
	let mut patch = Value::from_json(&fixture_section("profile_update.json", "patch"));
	let mut current = Value::from_json(&fixture_section("profile_update.json", "current"));
	patch.as_struct_mut().and_then(|item| item.lookup_mut("age")).expect("age field").value = Value::string("thirty");

	let report = assign_struct(&patch, &mut current, &AssignOptions::default()).expect("assignment succeeds");

	assert_eq!(report.diagnostics.len(), 1);
	assert_eq!(
		report.diagnostics[0].kind,
		DiagnosticKind::KindMismatch {
			src: ValueKind::String,
			dst: ValueKind::Int,
		}
	);
	assert_eq!(current.get_path(&FieldPath::parse("age").expect("path parses")), Some(Value::I64(30)));

	let err = assign_struct(&patch, &mut current, &AssignOptions::strict()).expect_err("strict rejects mismatch");
	assert!(err.to_string().contains("age"), "error names the field: {err}");
}

#[test]
fn order_graph_deep_copy_renders_identically() {
	init_tracing();
	let json = load_json_fixture("order_graph.json");
	let original = Value::from_json(&json);

	let copy = deep_copy(&original).expect("copy succeeds");

	assert_eq!(copy, original);
	assert_eq!(copy.to_json(), json);
}

#[test]
fn order_graph_copy_survives_changes_to_the_original() {
	init_tracing();
	let mut original = Value::from_json(&load_json_fixture("order_graph.json"));
	let copy = deep_copy(&original).expect("copy succeeds");

	let lines = original.as_struct_mut().and_then(|item| item.lookup_mut("lines")).expect("lines field");
	if let Value::Seq(SeqValue { items: Some(items), .. }) = &mut lines.value {
		items.clear();
	}

	let first_sku = copy.get_path(&FieldPath::parse("lines[0].sku").expect("path parses"));
	assert_eq!(first_sku, Some(Value::string("A-1")));
	let region = copy.get_path(&FieldPath::parse("labels.region").expect("path parses"));
	assert_eq!(region, Some(Value::string("eu-north")));
}
