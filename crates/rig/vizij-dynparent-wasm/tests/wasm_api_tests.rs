#![cfg(target_arch = "wasm32")]
use serde::Serialize;
use serde_json::json;
use serde_wasm_bindgen as swb;
use vizij_dynparent_wasm::{abi_version, VizijDynParent};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

// Plain JS objects (not Maps), as a host would pass them.
fn to_js(v: &serde_json::Value) -> JsValue {
    v.serialize(&swb::Serializer::json_compatible()).unwrap()
}

fn two_objects() -> JsValue {
    let scene = json!({
        "frame_current": 1,
        "mode": "object",
        "selection": {
            "active": { "kind": "object", "object": "Parent" },
            "selected": [
                { "kind": "object", "object": "Child" },
                { "kind": "object", "object": "Parent" }
            ]
        },
        "objects": [
            { "name": "Parent", "channels": { "location": [2.0, 0.0, 0.0] } },
            { "name": "Child", "channels": { "location": [0.0, 1.0, 0.0] } }
        ]
    });
    to_js(&scene)
}

fn child() -> JsValue {
    to_js(&json!({ "kind": "object", "object": "Child" }))
}

fn affected(report: JsValue) -> u64 {
    let v: serde_json::Value = swb::from_value(report).unwrap();
    v["affected"].as_u64().unwrap()
}

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn abi_is_1() {
    assert_eq!(abi_version(), 1);
}

#[wasm_bindgen_test]
fn construct_with_defaults() {
    assert!(VizijDynParent::new(JsValue::UNDEFINED).is_ok());
}

#[wasm_bindgen_test]
fn create_disable_clear_roundtrip() {
    let mut dp = VizijDynParent::new(JsValue::NULL).unwrap();
    dp.load_scene(two_objects()).unwrap();
    let before = dp.world_matrix(child()).unwrap();

    assert_eq!(affected(dp.create().unwrap()), 1);
    let after = dp.world_matrix(child()).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-4);
    }

    dp.set_frame(5);
    assert_eq!(affected(dp.disable().unwrap()), 1);
    assert_eq!(affected(dp.clear().unwrap()), 1);

    let scene: serde_json::Value = swb::from_value(dp.scene().unwrap()).unwrap();
    let child = scene["objects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["name"] == "Child")
        .unwrap();
    assert_eq!(child["constraints"].as_array().unwrap().len(), 0);
}

#[wasm_bindgen_test]
fn selection_error_is_reported() {
    let mut dp = VizijDynParent::new(JsValue::NULL).unwrap();
    dp.load_scene(two_objects()).unwrap();
    let selection = to_js(&json!({
        "active": { "kind": "object", "object": "Parent" },
        "selected": [{ "kind": "object", "object": "Parent" }]
    }));
    dp.set_selection(selection, JsValue::UNDEFINED).unwrap();
    assert!(dp.create().is_err());
}
