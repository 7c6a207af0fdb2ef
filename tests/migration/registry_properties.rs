use strata::catalog;
use strata::schema::{FieldDef, FieldKind, Revision, SchemaRegistry, SchemaSet, TableDef};

fn shape(name: &str, column: &str) -> TableDef {
    TableDef::new(
        name,
        vec![
            FieldDef::new("id", FieldKind::Integer).primary_key(),
            FieldDef::new(column, FieldKind::Text).nullable(),
        ],
    )
}

#[test]
fn removed_table_never_resurfaces_after_its_removal() {
    let registry = SchemaRegistry::builder(10, 16)
        .table(
            "Receipt",
            vec![
                Revision::explicit(shape("Receipt", "a")),
                Revision::Inherit,
                Revision::explicit(shape("Receipt", "b")),
                Revision::Removed,
                Revision::Inherit,
                Revision::Inherit,
                Revision::Inherit,
            ],
        )
        .build()
        .unwrap();

    for version in 10..13 {
        assert!(registry.resolve("Receipt", version).is_some(), "{version}");
    }
    for version in 13..=16 {
        assert!(registry.resolve("Receipt", version).is_none(), "{version}");
        assert!(!registry.schema_at(version).unwrap().contains("Receipt"));
    }
}

#[test]
fn explicit_definition_after_removal_reintroduces_table() {
    let registry = SchemaRegistry::builder(1, 5)
        .history("Archive")
        .define(1, shape("Archive", "old"))
        .remove(2)
        .define(4, shape("Archive", "new"))
        .done()
        .unwrap()
        .build()
        .unwrap();

    assert!(registry.resolve("Archive", 3).is_none());
    let back = registry.resolve("Archive", 5).unwrap();
    assert!(back.has_field("new"));
}

#[test]
fn resolution_is_stable_across_calls() {
    let registry = catalog::registry().unwrap();
    for table in registry.table_names().collect::<Vec<_>>() {
        for version in registry.first_version()..=registry.current_version() {
            assert_eq!(
                registry.resolve(table, version),
                registry.resolve(table, version),
                "{table}@{version}"
            );
        }
    }
}

#[test]
fn drift_between_registry_and_current_schema_is_reported() {
    let registry = SchemaRegistry::builder(1, 2)
        .history("Member")
        .define(1, shape("Member", "name"))
        .done()
        .unwrap()
        .current(SchemaSet::new().with(shape("Member", "display_name")))
        .build()
        .unwrap();

    let drift = registry.drift();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].0, "Member");
    assert!(registry.target_schema(2).unwrap().get("Member").unwrap().has_field("display_name"));
    assert!(registry.schema_at(2).unwrap().get("Member").unwrap().has_field("name"));
}
