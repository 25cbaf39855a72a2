use cfgdiff::{
    compare_collection, compute_diff, parse_document, Change, CollectionStatus,
    ConfigurationDocument, Diagnostic, DiffConfig, Entity, EntitySchema, FormatHint, NormKind,
    ReorderBasis, SchemaRegistry, Side,
};

fn rule(id: &str, source: &str) -> Entity {
    Entity::from_pairs([("id", id), ("source", source)])
}

fn rules(entities: Vec<Entity>) -> ConfigurationDocument {
    ConfigurationDocument::new().with_collection("rules", entities)
}

fn diff(old: &ConfigurationDocument, new: &ConfigurationDocument) -> cfgdiff::ChangeSet {
    compute_diff(old, new, &SchemaRegistry::builtin(), &DiffConfig::default())
}

#[test]
fn test_normalized_equal_is_unchanged() {
    let old = rules(vec![rule("r1", "192.168.001.1")]);
    let new = rules(vec![rule("r1", "192.168.1.1")]);

    let config = DiffConfig {
        include_unchanged: true,
        ..Default::default()
    };
    let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &config);

    assert!(set.is_empty());
    assert_eq!(
        set.collection("rules").unwrap().change_for("r1"),
        Some(&Change::Unchanged {
            id: "r1".to_string(),
            position: 0
        })
    );
}

#[test]
fn test_pure_move_is_reordered_only() {
    let old = rules(vec![
        rule("r1", "10.0.0.1"),
        rule("r2", "10.0.0.2"),
        rule("r3", "10.0.0.3"),
    ]);
    let new = rules(vec![
        rule("r2", "10.0.0.2"),
        rule("r3", "10.0.0.3"),
        rule("r1", "010.000.000.001"),
    ]);

    let set = diff(&old, &new);
    let r1: Vec<&Change> = set
        .changes()
        .filter(|(_, c)| c.id() == "r1")
        .map(|(_, c)| c)
        .collect();

    assert_eq!(
        r1,
        vec![&Change::ReorderedOnly {
            id: "r1".to_string(),
            old_position: 0,
            new_position: 2
        }]
    );
    assert_eq!(set.summary.modified, 0);
}

#[test]
fn test_removed_independent_of_other_collections() {
    let old = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")])
        .with_collection("users", vec![Entity::from_pairs([("id", "x")])])
        .with_collection("aliases", vec![Entity::from_pairs([("type", "host")])]);
    let new = rules(vec![rule("r1", "10.0.0.1")])
        .with_collection(
            "users",
            vec![
                Entity::from_pairs([("name", "admin")]),
                Entity::from_pairs([("name", "admin")]),
            ],
        );

    let set = diff(&old, &new);
    let rules = set.collection("rules").unwrap();
    let removed: Vec<&Change> = rules
        .changes
        .iter()
        .filter(|c| matches!(c, Change::Removed { .. }))
        .collect();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id(), "r2");
    assert!(rules.diagnostics.is_empty());
    assert!(!set.collection("users").unwrap().diagnostics.is_empty());
    assert_eq!(
        set.collection("aliases").unwrap().status,
        CollectionStatus::AbsentInNew
    );
}

#[test]
fn test_modified_reports_raw_values() {
    let old = rules(vec![rule("r1", "192.168.001.0/24")]);
    let new = rules(vec![rule("r1", "192.168.002.0/24")]);

    let set = diff(&old, &new);
    match set.collection("rules").unwrap().change_for("r1") {
        Some(Change::Modified { fields, .. }) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "source");
            assert_eq!(fields[0].kind, NormKind::Ip);
            assert_eq!(fields[0].old.as_deref(), Some("192.168.001.0/24"));
            assert_eq!(fields[0].new.as_deref(), Some("192.168.002.0/24"));
        }
        other => panic!("expected Modified, got {:?}", other),
    }
}

#[test]
fn test_modification_wins_over_move() {
    let old = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")]);
    let new = rules(vec![rule("r2", "10.0.0.2"), rule("r1", "10.0.0.9")]);

    let set = diff(&old, &new);
    let rules = set.collection("rules").unwrap();
    assert!(matches!(
        rules.change_for("r1"),
        Some(Change::Modified {
            old_position: 0,
            new_position: 1,
            ..
        })
    ));
    assert!(matches!(
        rules.change_for("r2"),
        Some(Change::ReorderedOnly { .. })
    ));
}

#[test]
fn test_no_reorders_option() {
    let old = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")]);
    let new = rules(vec![rule("r2", "10.0.0.2"), rule("r1", "10.0.0.1")]);

    let config = DiffConfig {
        report_reorders: false,
        ..Default::default()
    };
    let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &config);
    assert!(set.is_empty());
    assert_eq!(set.summary.unchanged, 2);
}

#[test]
fn test_relative_basis_ignores_insertions() {
    let old = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")]);
    let new = rules(vec![
        rule("r0", "10.0.0.0"),
        rule("r1", "10.0.0.1"),
        rule("r2", "10.0.0.2"),
    ]);

    let absolute = diff(&old, &new);
    assert_eq!(absolute.summary.reordered, 2);

    let config = DiffConfig {
        reorder_basis: ReorderBasis::Relative,
        ..Default::default()
    };
    let relative = compute_diff(&old, &new, &SchemaRegistry::builtin(), &config);
    assert_eq!(relative.summary.reordered, 0);
    assert_eq!(relative.summary.added, 1);
}

#[test]
fn test_relative_basis_reports_absolute_positions() {
    let old = rules(vec![
        rule("r1", "10.0.0.1"),
        rule("gone", "10.0.0.5"),
        rule("r2", "10.0.0.2"),
    ]);
    let new = rules(vec![rule("r2", "10.0.0.2"), rule("r1", "10.0.0.1")]);

    let config = DiffConfig {
        reorder_basis: ReorderBasis::Relative,
        ..Default::default()
    };
    let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &config);
    assert_eq!(
        set.collection("rules").unwrap().change_for("r2"),
        Some(&Change::ReorderedOnly {
            id: "r2".to_string(),
            old_position: 2,
            new_position: 0
        })
    );
}

#[test]
fn test_missing_as_empty_option() {
    let old = rules(vec![Entity::from_pairs([("id", "r1"), ("description", "")])]);
    let new = rules(vec![Entity::from_pairs([("id", "r1")])]);

    assert_eq!(diff(&old, &new).summary.modified, 1);

    let config = DiffConfig {
        treat_missing_as_empty: true,
        ..Default::default()
    };
    assert!(compute_diff(&old, &new, &SchemaRegistry::builtin(), &config).is_empty());
}

#[test]
fn test_duplicate_ids_excluded_and_reported() {
    let old = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")]);
    let new = rules(vec![
        rule("r1", "10.0.0.1"),
        rule("r2", "10.0.0.3"),
        rule("r1", "10.0.0.4"),
    ]);

    let set = diff(&old, &new);
    let rules = set.collection("rules").unwrap();

    assert_eq!(
        rules.diagnostics,
        vec![Diagnostic::AmbiguousIdentity {
            id: "r1".to_string(),
            side: Side::New,
            positions: vec![0, 2],
        }]
    );
    assert!(rules.change_for("r1").is_none());
    assert!(matches!(rules.change_for("r2"), Some(Change::Modified { .. })));
}

#[test]
fn test_missing_ids_reported() {
    let old = rules(vec![rule("r1", "10.0.0.1")]);
    let new = rules(vec![
        rule("r1", "10.0.0.1"),
        Entity::from_pairs([("source", "10.0.0.2")]),
    ]);

    let set = diff(&old, &new);
    assert!(set.is_empty());
    assert_eq!(
        set.collection("rules").unwrap().diagnostics,
        vec![Diagnostic::MissingIdentity {
            side: Side::New,
            position: 1
        }]
    );
}

#[test]
fn test_absent_collection_is_diagnostic_only() {
    let old = ConfigurationDocument::new();
    let new = rules(vec![rule("r1", "10.0.0.1")]);

    let set = diff(&old, &new);
    let rules = set.collection("rules").unwrap();
    assert_eq!(rules.status, CollectionStatus::AbsentInOld);
    assert!(rules.changes.is_empty());
    assert_eq!(
        rules.diagnostics,
        vec![Diagnostic::CollectionAbsent { side: Side::Old }]
    );
    assert!(set.is_empty());
    assert!(set.has_diagnostics());
}

#[test]
fn test_no_schema_without_fallback() {
    let registry = SchemaRegistry::new().with(EntitySchema::keyed_by("rules", "id"));
    let doc = ConfigurationDocument::new()
        .with_collection("rules", vec![rule("r1", "10.0.0.1")])
        .with_collection("vlans", vec![Entity::from_pairs([("tag", "10")])]);

    let set = compute_diff(&doc, &doc, &registry, &DiffConfig::default());
    let vlans = set.collection("vlans").unwrap();
    assert_eq!(vlans.status, CollectionStatus::Unsupported);
    assert_eq!(vlans.diagnostics, vec![Diagnostic::NoSchema]);
    assert_eq!(
        set.collection("rules").unwrap().status,
        CollectionStatus::Compared
    );
}

#[test]
fn test_fallback_schema_compares_all_fields_as_text() {
    let old = ConfigurationDocument::new().with_collection(
        "dhcp_leases",
        vec![Entity::from_pairs([("id", "l1"), ("hostname", "printer  01")])],
    );
    let new = ConfigurationDocument::new().with_collection(
        "dhcp_leases",
        vec![Entity::from_pairs([("id", "l1"), ("hostname", "printer 02")])],
    );

    let set = diff(&old, &new);
    assert_eq!(set.summary.modified, 1);
}

#[test]
fn test_unlisted_fields_compared_by_builtin_schema() {
    let old = rules(vec![Entity::from_pairs([
        ("id", "r1"),
        ("enabled", "yes"),
        ("statetype", "keep state"),
    ])]);
    let new = rules(vec![Entity::from_pairs([
        ("id", "r1"),
        ("enabled", "no"),
        ("statetype", "keep   state"),
    ])]);

    let set = diff(&old, &new);
    match set.collection("rules").unwrap().change_for("r1") {
        Some(Change::Modified { fields, .. }) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "enabled");
            assert_eq!(fields[0].kind, NormKind::Text);
            assert_eq!(fields[0].old.as_deref(), Some("yes"));
            assert_eq!(fields[0].new.as_deref(), Some("no"));
        }
        other => panic!("expected Modified, got {:?}", other),
    }
}

#[test]
fn test_nested_field_change_from_parsed_snapshot() {
    let old = parse_document(
        "rules:\n  - id: r1\n    protocol: TCP\n    source: { address: 192.168.001.0/24 }\n    destination: { port: \"0443\" }\n",
        Some(FormatHint::Yaml),
    )
    .unwrap();
    let new = parse_document(
        r#"{"rules": [{"id": "r1", "protocol": "tcp", "source": {"address": "10.9.9.0/24"}, "destination": {"port": "443"}}]}"#,
        Some(FormatHint::Json),
    )
    .unwrap();

    let set = diff(&old, &new);
    assert_eq!(set.summary.modified, 1);
    match set.collection("rules").unwrap().change_for("r1") {
        Some(Change::Modified { fields, .. }) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "source.address");
            assert_eq!(fields[0].kind, NormKind::Ip);
            assert_eq!(fields[0].old.as_deref(), Some("192.168.001.0/24"));
            assert_eq!(fields[0].new.as_deref(), Some("10.9.9.0/24"));
        }
        other => panic!("expected Modified, got {:?}", other),
    }
}

#[test]
fn test_nested_cosmetic_change_from_parsed_snapshot() {
    let old = parse_document(
        "rules:\n  - id: r1\n    source: { address: 192.168.001.0/24, port: \"0022\" }\n    schedule: { days: [mon, tue] }\n",
        Some(FormatHint::Yaml),
    )
    .unwrap();
    let new = parse_document(
        "[[rules]]\nid = \"r1\"\nsource = { address = \"192.168.1.0/24\", port = \"22\" }\nschedule = { days = [\"mon\", \"tue\"] }\n",
        Some(FormatHint::Toml),
    )
    .unwrap();

    assert!(diff(&old, &new).is_empty());
}

#[test]
fn test_identity_faults_do_not_shift_ordinals() {
    let old = rules(vec![
        rule("r1", "10.0.0.1"),
        rule("r1", "10.0.0.1"),
        rule("r2", "10.0.0.2"),
    ]);
    let new = rules(vec![rule("r1", "10.0.0.1"), rule("r2", "10.0.0.2")]);

    let config = DiffConfig {
        include_unchanged: true,
        ..Default::default()
    };
    let set = compute_diff(&old, &new, &SchemaRegistry::builtin(), &config);
    assert!(set.is_empty());
    assert_eq!(
        set.collection("rules").unwrap().change_for("r2"),
        Some(&Change::Unchanged {
            id: "r2".to_string(),
            position: 1
        })
    );

    let old = rules(vec![
        Entity::from_pairs([("source", "10.0.0.9")]),
        rule("r3", "10.0.0.3"),
        rule("r4", "10.0.0.4"),
    ]);
    let new = rules(vec![rule("r4", "10.0.0.4"), rule("r3", "10.0.0.3")]);
    let set = diff(&old, &new);
    assert_eq!(
        set.collection("rules").unwrap().change_for("r3"),
        Some(&Change::ReorderedOnly {
            id: "r3".to_string(),
            old_position: 1,
            new_position: 1,
        })
    );
    assert_eq!(set.summary.reordered, 2);
}

#[test]
fn test_result_order() {
    let old = ConfigurationDocument::new()
        .with_collection("users", vec![Entity::from_pairs([("name", "a")])])
        .with_collection(
            "rules",
            vec![rule("b", "1.1.1.1"), rule("a", "1.1.1.1"), rule("c", "1.1.1.1")],
        );
    let new = ConfigurationDocument::new()
        .with_collection("users", vec![Entity::from_pairs([("name", "b")])])
        .with_collection(
            "rules",
            vec![rule("z", "1.1.1.1"), rule("a", "1.1.1.1"), rule("y", "1.1.1.1")],
        );

    let set = diff(&old, &new);
    let ordered: Vec<(&str, &str)> = set.changes().map(|(c, ch)| (c, ch.id())).collect();
    assert_eq!(
        ordered,
        vec![
            ("rules", "b"),
            ("rules", "c"),
            ("rules", "z"),
            ("rules", "y"),
            ("users", "a"),
            ("users", "b"),
        ]
    );
}

#[test]
fn test_parallel_matches_sequential() {
    let mut old = ConfigurationDocument::new();
    let mut new = ConfigurationDocument::new();
    for n in 0..12 {
        let name = format!("collection_{:02}", n);
        old.insert_collection(
            name.clone(),
            (0..20)
                .map(|i| Entity::from_pairs([("id", format!("e{}", i)), ("v", i.to_string())]))
                .collect(),
        );
        new.insert_collection(
            name,
            (0..20)
                .rev()
                .map(|i| {
                    Entity::from_pairs([("id", format!("e{}", i)), ("v", (i % 7).to_string())])
                })
                .collect(),
        );
    }

    let registry = SchemaRegistry::builtin();
    let sequential = compute_diff(&old, &new, &registry, &DiffConfig::default());
    let parallel = compute_diff(
        &old,
        &new,
        &registry,
        &DiffConfig {
            parallel: true,
            ..Default::default()
        },
    );
    assert_eq!(sequential, parallel);
    assert!(!sequential.is_empty());
}

#[test]
fn test_compare_collection_with_custom_schema() {
    let schema = EntitySchema::with_extractor("vlans", |e: &Entity| {
        Some(format!("{}.{}", e.get("parent")?, e.get("tag")?))
    })
    .field("description", NormKind::Text);

    let old = vec![Entity::from_pairs([
        ("parent", "em0"),
        ("tag", "10"),
        ("description", "office"),
    ])];
    let new = vec![Entity::from_pairs([
        ("parent", "em0"),
        ("tag", "10"),
        ("description", "  office "),
    ])];

    let result = compare_collection(&schema, &old, &new, &DiffConfig::default());
    assert_eq!(result.collection, "vlans");
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(
        result.change_for("em0.10"),
        Some(&Change::Unchanged {
            id: "em0.10".to_string(),
            position: 0
        })
    );
}
