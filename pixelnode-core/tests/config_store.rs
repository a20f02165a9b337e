mod common;

use core::sync::atomic::AtomicUsize;

use common::*;
use pixelnode_core::config::{Callback, ConfigError, LoadReport, Value};
use pixelnode_core::{ErrorResponse, Resource};
use pixelnode_hal::mock::FlashOp;
use pixelnode_record::{RecordValue, RecordWriter};
use proptest::prelude::*;

#[test]
fn test_basic_persistence() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.add_param("enabled", Value::Bool(false), None, None, None).unwrap();
    store.add_param("name", str("x"), None, None, None).unwrap();
    store.save().unwrap();

    let mut fresh = reopen(store);
    fresh.add_param("count", Value::Int(1), None, None, None).unwrap();
    fresh.add_param("enabled", Value::Bool(false), None, None, None).unwrap();
    fresh.add_param("name", str("x"), None, None, None).unwrap();
    let report = fresh.load().unwrap();

    assert_eq!(report, LoadReport { loaded: 3, skipped: 0 });
    assert_eq!(fresh.int("count"), Some(1));
    assert_eq!(fresh.bool("enabled"), Some(false));
    assert_eq!(fresh.str("name"), Some("x"));
}

#[test]
fn test_changed_values_survive_reload() {
    let mut store = new_store(true);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.add_param("offset", Value::Int(0), None, None, None).unwrap();
    store.add_param("name", str("x"), None, None, None).unwrap();
    store
        .update(&[("count", Value::Int(7)), ("offset", Value::Int(-300)), ("name", str("hall"))])
        .unwrap();

    let mut fresh = reopen(store);
    fresh.add_param("count", Value::Int(1), None, None, None).unwrap();
    fresh.add_param("offset", Value::Int(0), None, None, None).unwrap();
    fresh.add_param("name", str("x"), None, None, None).unwrap();
    fresh.load().unwrap();

    assert_eq!(fresh.int("count"), Some(7));
    assert_eq!(fresh.int("offset"), Some(-300));
    assert_eq!(fresh.str("name"), Some("hall"));
}

#[test]
fn test_load_from_erased_region_keeps_defaults() {
    let hits_wifi = AtomicUsize::new(0);
    let on_wifi = bump(&hits_wifi);

    let mut store = new_store(false);
    store
        .add_param("wifi_ssid", str(""), None, Some(&on_wifi as Callback), Some("wifi"))
        .unwrap();
    store.add_param("count", Value::Int(4), None, None, None).unwrap();

    let report = store.load().unwrap();
    assert_eq!(report, LoadReport { loaded: 0, skipped: 0 });
    assert_eq!(store.int("count"), Some(4));
    // Every group is notified once after load
    assert_eq!(hits(&hits_wifi), 1);
}

#[test]
fn test_duplicate_name_rejected_without_mutation() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();

    assert_eq!(
        store.add_param("count", Value::Int(99), None, None, None),
        Err(ConfigError::DuplicateName)
    );
    assert_eq!(store.int("count"), Some(1));
    assert_eq!(store.params().len(), 1);
}

#[test]
fn test_invalid_names() {
    let long = "n".repeat(33);
    let mut store = new_store(false);
    for name in ["", "_internal", "has space", long.as_str()] {
        assert_eq!(
            store.add_param(name, Value::Null, None, None, None),
            Err(ConfigError::InvalidName)
        );
    }
    assert!(store.params().is_empty());
}

#[test]
fn test_validator_runs_on_default() {
    let mut store = new_store(false);
    assert_eq!(
        store.add_param("count", Value::Int(0), Some(positive), None, None),
        Err(ConfigError::ValidationFailed)
    );
    assert!(store.add_param("count", Value::Int(1), Some(positive), None, None).is_ok());
}

#[test]
fn test_update_type_mismatch() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.add_param("enabled", Value::Bool(false), None, None, None).unwrap();

    assert_eq!(
        store.update(&[("count", str("1"))]),
        Err(ConfigError::TypeMismatch)
    );
    assert_eq!(
        store.update(&[("enabled", Value::Int(1))]),
        Err(ConfigError::TypeMismatch)
    );
    assert_eq!(store.int("count"), Some(1));
}

#[test]
fn test_batch_is_atomic() {
    let hits_cb = AtomicUsize::new(0);
    let cb = bump(&hits_cb);

    let mut store = new_store(true);
    store
        .add_param("count", Value::Int(1), Some(positive), Some(&cb as Callback), Some("grp"))
        .unwrap();
    store.add_param("name", str("x"), None, None, Some("grp")).unwrap();

    // Valid first entry, invalid second entry
    let result = store.update(&[("name", str("changed")), ("count", Value::Int(-1))]);
    assert_eq!(result, Err(ConfigError::ValidationFailed));
    assert_eq!(store.str("name"), Some("x"));
    assert_eq!(store.int("count"), Some(1));
    assert_eq!(hits(&hits_cb), 0);
    // No flash write either
    assert!(store.region().inner().operations().is_empty());

    // First error in batch order wins
    let result = store.update(&[("missing", Value::Int(1)), ("count", str("x"))]);
    assert_eq!(result, Err(ConfigError::UnknownParam));
}

#[test]
fn test_grouped_wifi_update() {
    let hits_wifi = AtomicUsize::new(0);
    let on_wifi = bump(&hits_wifi);

    let mut store = new_store(false);
    store
        .add_param("ssid", str(""), None, Some(&on_wifi as Callback), Some("wifi"))
        .unwrap();
    store.add_param("password", str(""), None, None, Some("wifi")).unwrap();

    store.update(&[("ssid", str("A")), ("password", str("B"))]).unwrap();
    assert_eq!(hits(&hits_wifi), 1);

    store.update(&[("ssid", str("A"))]).unwrap();
    assert_eq!(hits(&hits_wifi), 2);
}

#[test]
fn test_callbacks_fire_once_per_group_in_registration_order() {
    use std::sync::Mutex;

    let order = Mutex::new(Vec::new());
    let first = |_: &pixelnode_core::ParamTable| order.lock().unwrap().push("first");
    let second = |_: &pixelnode_core::ParamTable| order.lock().unwrap().push("second");

    let mut store = new_store(false);
    store.add_param("a", Value::Int(0), None, Some(&first as Callback), Some("g1")).unwrap();
    store.add_param("b", Value::Int(0), None, Some(&second as Callback), Some("g2")).unwrap();
    store.add_param("c", Value::Int(0), None, None, Some("g1")).unwrap();
    store.add_param("plain", Value::Int(0), None, None, None).unwrap();

    store
        .update(&[("b", Value::Int(1)), ("c", Value::Int(1)), ("a", Value::Int(1))])
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

    order.lock().unwrap().clear();
    store.update(&[("plain", Value::Int(2))]).unwrap();
    assert!(order.lock().unwrap().is_empty());
}

#[test]
fn test_callback_sees_applied_values() {
    use std::sync::Mutex;

    let seen = Mutex::new(None);
    let cb = |p: &pixelnode_core::ParamTable| {
        *seen.lock().unwrap() = Some((p.int("cnt"), p.int("colors")));
    };

    let mut store = new_store(false);
    store.add_param("cnt", Value::Int(1), None, Some(&cb as Callback), Some("neopix")).unwrap();
    store.add_param("colors", Value::Int(3), None, None, Some("neopix")).unwrap();
    store.update(&[("cnt", Value::Int(10)), ("colors", Value::Int(4))]).unwrap();

    assert_eq!(*seen.lock().unwrap(), Some((Some(10), Some(4))));
}

#[test]
fn test_group_rules() {
    let hits_a = AtomicUsize::new(0);
    let cb_a = bump(&hits_a);
    let hits_b = AtomicUsize::new(0);
    let cb_b = bump(&hits_b);

    let mut store = new_store(false);
    assert_eq!(
        store.add_param("orphan", Value::Int(0), None, None, Some("nowhere")),
        Err(ConfigError::UnknownGroup)
    );

    // Callback without group: the parameter's own name is the group
    store.add_param("wifi_mode", str("802.11n"), None, Some(&cb_a as Callback), None).unwrap();
    store.add_param("mode_extra", Value::Int(0), None, None, Some("wifi_mode")).unwrap();

    // A group has exactly one callback
    assert_eq!(
        store.add_param("other", Value::Int(0), None, Some(&cb_b as Callback), Some("wifi_mode")),
        Err(ConfigError::GroupConflict)
    );
    assert!(store.get("other").is_none());

    store.update(&[("mode_extra", Value::Int(1))]).unwrap();
    assert_eq!(hits(&hits_a), 1);
    assert_eq!(hits(&hits_b), 0);
}

#[test]
fn test_autosave_writes_after_update() {
    let mut store = new_store(true);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.update(&[("count", Value::Int(2))]).unwrap();

    let ops = store.region().inner().operations();
    assert!(matches!(ops[0], FlashOp::Erase { offset: REGION_OFFSET, .. }));
    assert!(matches!(ops[1], FlashOp::Write { offset: REGION_OFFSET, .. }));
}

#[test]
fn test_oversized_store_leaves_flash_unchanged() {
    let mut store = new_store(false);
    store.add_param("seed", Value::Int(1), None, None, None).unwrap();
    store.save().unwrap();
    let before = region_bytes(&store);

    // 20 x (3 + 4 + 1 + 255) bytes is well past the region budget
    let long = "v".repeat(255);
    for i in 0..20 {
        store
            .add_param(&format!("big_{}", i), str(&long), None, None, None)
            .unwrap();
    }

    let writes_before = store.region().inner().operations().len();
    assert_eq!(store.save(), Err(ConfigError::StoreTooLarge));
    assert_eq!(store.region().inner().operations().len(), writes_before);
    assert_eq!(region_bytes(&store), before);
}

#[test]
fn test_autosave_overflow_applies_nothing() {
    let callbacks = AtomicUsize::new(0);
    let cb = bump(&callbacks);
    let mut store = new_store(true);
    store
        .add_param("big_0", str(""), None, Some(&cb), Some("big"))
        .unwrap();
    for i in 1..16 {
        store
            .add_param(&format!("big_{}", i), str(""), None, None, Some("big"))
            .unwrap();
    }
    store.save().unwrap();
    let before = region_bytes(&store);
    let ops_before = store.region().inner().operations().len();

    // 16 x (3 + 5 + 1 + 255) bytes does not fit the region
    let long = str(&"v".repeat(255));
    let names: Vec<String> = (0..16).map(|i| format!("big_{}", i)).collect();
    let changes: Vec<(&str, Value)> = names
        .iter()
        .map(|name| (name.as_str(), long.clone()))
        .collect();

    assert_eq!(store.update(&changes), Err(ConfigError::StoreTooLarge));
    assert_eq!(store.str("big_0"), Some(""));
    assert_eq!(hits(&callbacks), 0);
    assert_eq!(store.region().inner().operations().len(), ops_before);
    assert_eq!(region_bytes(&store), before);

    // The same batch through the JSON path
    let mut body = String::from("{");
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(&format!(r#""{}":"{}""#, name, "v".repeat(255)));
    }
    body.push('}');
    assert_eq!(
        store.update_json(body.as_bytes()),
        Err(ConfigError::StoreTooLarge)
    );
    assert_eq!(store.str("big_15"), Some(""));
    assert_eq!(hits(&callbacks), 0);

    // A batch that fits is still saved
    store.update(&[("big_3", str("small"))]).unwrap();
    assert_eq!(hits(&callbacks), 1);
    let mut reopened = reopen(store);
    reopened.add_param("big_3", str(""), None, None, None).unwrap();
    reopened.load().unwrap();
    assert_eq!(reopened.str("big_3"), Some("small"));
}

#[test]
fn test_corrupt_region_aborts_load() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(5), None, None, None).unwrap();
    store.add_param("name", str("abc"), None, None, None).unwrap();
    store.save().unwrap();

    let mut flash = store.into_region().into_inner();
    // Flip the second record's type tag
    let second = REGION_OFFSET as usize + 3 + 5 + 4;
    flash.buf[second + 1] ^= 0x01;

    let mut fresh = pixelnode_core::ConfigStore::new(region(flash), false);
    fresh.add_param("count", Value::Int(1), None, None, None).unwrap();
    fresh.add_param("name", str("x"), None, None, None).unwrap();

    assert_eq!(fresh.load(), Err(ConfigError::StoreCorrupt));
    // Nothing applied, not even the intact first record
    assert_eq!(fresh.int("count"), Some(1));
    assert_eq!(fresh.str("name"), Some("x"));
}

/// Write raw records straight into the region of a fresh flash
fn flash_with(records: &[(&str, RecordValue<'_>)]) -> Flash {
    let mut flash = Flash::new();
    let start = REGION_OFFSET as usize;
    let mut writer = RecordWriter::new(&mut flash.buf[start..start + pixelnode_hal::BLOCK_SIZE]);
    for (name, value) in records {
        writer.push(name, *value).unwrap();
    }
    writer.finish().unwrap();
    flash
}

#[test]
fn test_load_skips_unknown_names() {
    let flash = flash_with(&[
        ("retired_param", RecordValue::Int(3)),
        ("count", RecordValue::Int(9)),
    ]);
    let mut store = pixelnode_core::ConfigStore::new(region(flash), false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();

    let report = store.load().unwrap();
    assert_eq!(report, LoadReport { loaded: 1, skipped: 1 });
    assert_eq!(store.int("count"), Some(9));
}

#[test]
fn test_load_type_mismatch_applies_nothing() {
    let flash = flash_with(&[
        ("count", RecordValue::Int(9)),
        ("enabled", RecordValue::Int(1)),
    ]);
    let mut store = pixelnode_core::ConfigStore::new(region(flash), false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.add_param("enabled", Value::Bool(false), None, None, None).unwrap();

    assert_eq!(store.load(), Err(ConfigError::TypeMismatch));
    assert_eq!(store.int("count"), Some(1));
}

#[test]
fn test_load_validator_rejection() {
    let flash = flash_with(&[("count", RecordValue::Int(-4))]);
    let mut store = pixelnode_core::ConfigStore::new(region(flash), false);
    store.add_param("count", Value::Int(1), Some(positive), None, None).unwrap();

    assert_eq!(store.load(), Err(ConfigError::ValidationFailed));
    assert_eq!(store.int("count"), Some(1));
}

#[test]
fn test_erase_resets_to_defaults_on_next_boot() {
    let mut store = new_store(true);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.update(&[("count", Value::Int(42))]).unwrap();
    store.erase().unwrap();

    let mut fresh = reopen(store);
    fresh.add_param("count", Value::Int(1), None, None, None).unwrap();
    fresh.load().unwrap();
    assert_eq!(fresh.int("count"), Some(1));
}

#[test]
fn test_json_snapshot() {
    let mut store = new_store(false);
    store.add_param("configured", Value::Bool(true), None, None, None).unwrap();
    store.add_param("neopixel_cnt", Value::Int(30), None, None, None).unwrap();
    store.add_param("hostname", str("strip"), None, None, None).unwrap();

    let mut out = [0u8; 128];
    let n = store.write_json(&mut out).unwrap();
    assert_eq!(
        &out[..n],
        br#"{"configured":true,"neopixel_cnt":30,"hostname":"strip"}"#
    );

    let mut small = [0u8; 8];
    assert_eq!(store.write_json(&mut small), Err(ConfigError::OutputTooSmall));
}

#[test]
fn test_json_update() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(1), None, None, None).unwrap();
    store.add_param("enabled", Value::Bool(false), None, None, None).unwrap();
    store.add_param("name", str("x"), None, None, None).unwrap();

    store
        .update_json(br#"{"count": -3, "enabled": true, "name": "y"}"#)
        .unwrap();
    assert_eq!(store.int("count"), Some(-3));
    assert_eq!(store.bool("enabled"), Some(true));
    assert_eq!(store.str("name"), Some("y"));

    assert_eq!(
        store.update_json(br#"{"count": 1.5}"#),
        Err(ConfigError::UnsupportedType)
    );
    assert_eq!(
        store.update_json(br#"{"count": [1]}"#),
        Err(ConfigError::TypeMismatch)
    );
    assert_eq!(
        store.update_json(br#"{"count": "5"}"#),
        Err(ConfigError::TypeMismatch)
    );
    assert_eq!(store.update_json(b"nope"), Err(ConfigError::InvalidJson));
    assert_eq!(store.int("count"), Some(-3));
}

#[test]
fn test_json_update_is_one_batch() {
    let hits_wifi = AtomicUsize::new(0);
    let cb = bump(&hits_wifi);
    let mut store = new_store(false);
    store
        .add_param("ssid", str(""), None, Some(&cb), Some("wifi"))
        .unwrap();
    store.add_param("password", str(""), None, None, Some("wifi")).unwrap();
    store.add_param("count", Value::Int(1), Some(positive), None, None).unwrap();

    store
        .update_json(br#"{"ssid": "home", "password": "secret"}"#)
        .unwrap();
    assert_eq!(hits(&hits_wifi), 1);

    // A later entry fails validation, so the earlier one is not applied
    assert_eq!(
        store.update_json(br#"{"ssid": "other", "count": 0}"#),
        Err(ConfigError::ValidationFailed)
    );
    assert_eq!(store.str("ssid"), Some("home"));
    assert_eq!(hits(&hits_wifi), 1);
}

#[test]
fn test_json_escaped_string_roundtrip() {
    let mut store = new_store(false);
    store.add_param("password", str(""), None, None, None).unwrap();

    store
        .update_json(br#"{"password": "a\"b\\c"}"#)
        .unwrap();
    assert_eq!(store.str("password"), Some("a\"b\\c"));

    let mut out = [0u8; 64];
    let n = Resource::get(&mut store, &mut out).unwrap();
    assert_eq!(&out[..n], br#"{"password":"a\"b\\c"}"#);
}

#[test]
fn test_resource_post_and_errors() {
    let mut store = new_store(false);
    store.add_param("count", Value::Int(1), Some(positive), None, None).unwrap();

    let mut out = [0u8; 64];
    let n = store.post(br#"{"count": 2}"#, &mut out).unwrap();
    assert_eq!(&out[..n], br#"{"message":"config updated"}"#);

    let n = Resource::get(&mut store, &mut out).unwrap();
    assert_eq!(&out[..n], br#"{"count":2}"#);

    let err = store.post(br#"{"count": 0}"#, &mut out).unwrap_err();
    assert_eq!(err, ErrorResponse::new("invalid value", 400));

    let err = store.post(br#"{"missing": 1}"#, &mut out).unwrap_err();
    assert_eq!(err.code, 404);
}

proptest! {
    #[test]
    fn prop_save_load_roundtrip(
        ints in proptest::collection::vec(any::<i32>(), 1..8),
        strs in proptest::collection::vec("[a-zA-Z0-9/#._ -]{0,40}", 1..8),
        flags in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        let mut store = new_store(false);
        let mut expected = Vec::new();
        for (i, v) in ints.iter().enumerate() {
            expected.push((format!("int_{}", i), Value::Int(*v)));
        }
        for (i, s) in strs.iter().enumerate() {
            expected.push((format!("str_{}", i), str(s)));
        }
        for (i, b) in flags.iter().enumerate() {
            expected.push((format!("flag_{}", i), Value::Bool(*b)));
        }
        for (name, value) in &expected {
            store.add_param(name, value.clone(), None, None, None).unwrap();
        }
        store.save().unwrap();

        // Same registrations, different defaults
        let mut fresh = reopen(store);
        for (name, value) in &expected {
            let default = match value {
                Value::Int(_) => Value::Int(0),
                Value::Str(_) => str(""),
                Value::Bool(b) => Value::Bool(!b),
                Value::Null => Value::Null,
            };
            fresh.add_param(name, default, None, None, None).unwrap();
        }
        fresh.load().unwrap();

        for (name, value) in &expected {
            prop_assert_eq!(fresh.get(name), Some(value));
        }
    }

    #[test]
    fn prop_header_corruption_detected(
        flip in 1u8..=255,
        field in 0usize..2,
    ) {
        let mut store = new_store(false);
        store.add_param("count", Value::Int(5), None, None, None).unwrap();
        store.save().unwrap();

        let mut flash = store.into_region().into_inner();
        flash.buf[REGION_OFFSET as usize + field] ^= flip;

        let mut fresh = pixelnode_core::ConfigStore::new(region(flash), false);
        fresh.add_param("count", Value::Int(1), None, None, None).unwrap();
        prop_assert_eq!(fresh.load(), Err(ConfigError::StoreCorrupt));
        prop_assert_eq!(fresh.int("count"), Some(1));
    }
}
