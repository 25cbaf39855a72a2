use cfgdiff::{document_from_value, load_document, parse_document, FormatHint, ParseError};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[test]
fn test_load_yaml_fixture() {
    let doc = load_document(Path::new("tests/fixtures/firewall_old.yaml")).unwrap();

    let names: Vec<&str> = doc.collection_names().collect();
    assert_eq!(names, vec!["interfaces", "rules", "users"]);
    assert_eq!(doc.entity_count(), 5);

    let r1 = &doc.collection("rules").unwrap()[0];
    assert_eq!(r1.get("id"), Some("r1"));
    assert_eq!(r1.get("source"), Some("192.168.001.0/24"));
    assert_eq!(r1.get("destination_port"), Some("0443"));
}

#[test]
fn test_load_json_fixture() {
    let doc = load_document(Path::new("tests/fixtures/cosmetic_new.json")).unwrap();
    assert_eq!(
        doc.collection("interfaces").unwrap()[0].get("ipv6_address"),
        Some("2001:db8::1")
    );
}

#[test]
fn test_load_toml_fixture() {
    let doc = load_document(Path::new("tests/fixtures/vlans_old.toml")).unwrap();
    let vlans = doc.collection("vlans").unwrap();
    assert_eq!(vlans.len(), 2);
    assert_eq!(vlans[1].get("description"), Some("guests"));
}

#[test]
fn test_load_invalid_json() {
    let err = load_document(Path::new("tests/fixtures/invalid.json")).unwrap_err();
    assert!(matches!(err, ParseError::JsonError { .. }));
    assert!(err.to_string().contains("tests/fixtures/invalid.json"));
}

#[test]
fn test_load_non_map_entities() {
    let err = load_document(Path::new("tests/fixtures/not_a_map.json")).unwrap_err();
    match err {
        ParseError::InvalidDocument { path, message } => {
            assert!(path.ends_with("not_a_map.json"));
            assert_eq!(message, "rules[0] must be a map, found string");
        }
        other => panic!("Expected InvalidDocument, got {:?}", other),
    }
}

#[test]
fn test_load_missing_file() {
    let result = load_document(Path::new("tests/fixtures/missing.yaml"));
    assert!(matches!(result, Err(ParseError::FileNotFound { .. })));
}

#[test]
fn test_unknown_extension_detects_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "routes:\n  - id: default\n    network: 0.0.0.0/0").unwrap();
    let path = file.path().with_extension("backup");
    fs::copy(file.path(), &path).unwrap();

    let doc = load_document(&path).unwrap();
    assert_eq!(
        doc.collection("routes").unwrap()[0].get("network"),
        Some("0.0.0.0/0")
    );

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_unknown_format() {
    let result = parse_document("rules: [unclosed", None);
    assert!(matches!(result, Err(ParseError::UnknownFormat { .. })));
}

#[test]
fn test_document_from_value_flattening() {
    let doc = document_from_value(json!({
        "gateways": [{
            "name": "wan_gw",
            "address": "203.0.113.1",
            "monitor": {"enabled": true, "target": "1.1.1.1"},
            "weight": 1,
            "tags": ["primary", 2, false],
            "monitors": [{"host": "a"}, "b"],
            "comment": null
        }]
    }))
    .unwrap();

    let gw = &doc.collection("gateways").unwrap()[0];
    assert_eq!(gw.get("monitor.enabled"), Some("true"));
    assert_eq!(gw.get("monitor.target"), Some("1.1.1.1"));
    assert_eq!(gw.get("weight"), Some("1"));
    assert_eq!(gw.get("tags"), Some("primary,2,false"));
    assert_eq!(gw.get("monitors[0].host"), Some("a"));
    assert_eq!(gw.get("monitors[1]"), Some("b"));
    assert_eq!(gw.get("comment"), None);
}

#[test]
fn test_explicit_format_hint() {
    let doc = parse_document("{\"users\": [{\"name\": \"admin\"}]}", Some(FormatHint::Yaml));
    assert_eq!(doc.unwrap().collection("users").unwrap().len(), 1);

    let err = parse_document("users:\n  - name: admin\n", Some(FormatHint::Json)).unwrap_err();
    assert!(matches!(err, ParseError::JsonError { .. }));
}
