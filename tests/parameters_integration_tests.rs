//! Integration tests for parameter record persistence
//!
//! These tests verify:
//! - The on-disk format (flat JSON object, stable key order)
//! - Tolerant loading of hand-edited spacing
//! - The warn-and-default path for missing records
//! - The save/load round-trip law over arbitrary flat records

use camino::Utf8PathBuf;
use imagebatch::models::ParamValue;
use imagebatch::models::ParametersRecord;
use proptest::prelude::*;
use tempfile::TempDir;

fn temp_record_path(temp_dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(temp_dir.path().join("Parameters.txt")).unwrap()
}

#[test]
fn test_observed_record_shape_round_trips() {
    // The shape written by the per-file step: a quoted string and a bare
    // integer, in insertion order
    let temp_dir = TempDir::new().unwrap();
    let path = temp_record_path(&temp_dir);

    let mut record = ParametersRecord::new();
    record.set("File suffix", "tif");
    record.set("Threshold intensity", 3000);
    record.save(&path).unwrap();

    let loaded = ParametersRecord::load(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get_str("File suffix"), Some("tif"));
    assert_eq!(loaded.get_int("Threshold intensity"), Some(3000));
}

#[test]
fn test_loads_hand_edited_spacing() {
    // Records are sometimes adjusted by hand; whitespace and a missing
    // space before a value must not matter
    let temp_dir = TempDir::new().unwrap();
    let path = temp_record_path(&temp_dir);

    std::fs::write(
        &path,
        "{\"File suffix\":   \"tif\"  ,\n    \"Threshold intensity\":3000}",
    )
    .unwrap();

    let loaded = ParametersRecord::load(&path).unwrap();
    assert_eq!(loaded.get_str("File suffix"), Some("tif"));
    assert_eq!(loaded.get_int("Threshold intensity"), Some(3000));
}

#[test]
fn test_missing_record_is_default_not_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_record_path(&temp_dir);

    let loaded = ParametersRecord::load(&path).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn test_stable_bytes_for_identical_records() {
    let temp_dir = TempDir::new().unwrap();
    let path_a = Utf8PathBuf::try_from(temp_dir.path().join("a.txt")).unwrap();
    let path_b = Utf8PathBuf::try_from(temp_dir.path().join("b.txt")).unwrap();

    let mut record = ParametersRecord::new();
    record.set("Mode", "whole folder");
    record.set("File suffix", "nd2");
    record.set("Threshold intensity", 800);
    record.set("Reuse stored parameters", true);

    record.save(&path_a).unwrap();
    record.save(&path_b).unwrap();

    assert_eq!(
        std::fs::read_to_string(&path_a).unwrap(),
        std::fs::read_to_string(&path_b).unwrap()
    );
}

fn param_value() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        any::<bool>().prop_map(ParamValue::Bool),
        any::<i64>().prop_map(ParamValue::Int),
        // Strings without embedded quotes; the formats in the wild are
        // suffixes, paths, and mode names
        "[a-zA-Z0-9 ._/-]{0,24}".prop_map(ParamValue::Text),
    ]
}

proptest! {
    #[test]
    fn prop_save_load_round_trip(
        entries in prop::collection::vec(("[a-zA-Z][a-zA-Z0-9 _-]{0,16}", param_value()), 0..8)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_record_path(&temp_dir);

        let mut record = ParametersRecord::new();
        for (key, value) in &entries {
            record.set(key, value.clone());
        }

        record.save(&path).unwrap();
        let loaded = ParametersRecord::load(&path).unwrap();
        prop_assert_eq!(loaded, record);
    }
}
