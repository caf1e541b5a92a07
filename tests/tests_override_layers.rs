//! Override Tests - Inject/Replace Across Mod Layers
//!
//! Base files define objects; mod files layer marker-prefixed blocks on top
//! of them. Covers the merge semantics, the tri-state missing-target policy,
//! and minimal-diff re-saves of override files.

mod helpers;

use std::path::Path;

use rstest::rstest;

use modforge::model::{OverrideKind, Value};
use modforge::persist::{SaveOptions, save_file};

const BASE: &str = "\
sword = {
\tdamage = 3
\tname = \"Iron Sword\"
\ttags = { melee starter }
}
bow = {
\tdamage = 2
\tname = \"Short Bow\"
\tweight = 1.5
}
";

fn write_layers(dir: &Path, mod_content: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let base = dir.join("base.txt");
    let layer = dir.join("mod.txt");
    std::fs::write(&base, BASE).unwrap();
    std::fs::write(&layer, mod_content).unwrap();
    (base, layer)
}

#[test]
fn test_inject_merges_supplied_properties_only() {
    let dir = tempfile::tempdir().unwrap();
    let (base, layer) = write_layers(dir.path(), "INJECT sword = {\n\tdamage = 10\n}\n");

    let (set, type_id) = helpers::equipment_schemas();
    let (registry, sink) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);
    assert!(!sink.has_errors());

    let sword = registry.get(registry.find(type_id, "sword").unwrap()).unwrap();
    assert_eq!(sword.get("damage"), Some(&Value::Int(10)));
    // Untouched base properties survive the merge.
    assert_eq!(sword.get("name"), Some(&Value::Str("Iron Sword".into())));
    assert!(sword.get("tags").is_some());
}

#[test]
fn test_replace_substitutes_whole_property_set() {
    let dir = tempfile::tempdir().unwrap();
    let (base, layer) = write_layers(
        dir.path(),
        "REPLACE bow = {\n\tdamage = 9\n\tname = \"Longbow\"\n}\n",
    );

    let (set, type_id) = helpers::equipment_schemas();
    let (registry, sink) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);
    assert!(!sink.has_errors());

    let bow = registry.get(registry.find(type_id, "bow").unwrap()).unwrap();
    assert_eq!(bow.get("damage"), Some(&Value::Int(9)));
    assert_eq!(bow.get("name"), Some(&Value::Str("Longbow".into())));
    // The base weight did not carry over.
    assert_eq!(bow.get("weight"), None);
}

#[rstest]
#[case::plain_inject("INJECT", true)]
#[case::plain_replace("REPLACE", true)]
#[case::try_inject("TRY_INJECT", false)]
#[case::try_replace("TRY_REPLACE", false)]
fn test_missing_target_policy(#[case] marker: &str, #[case] is_error: bool) {
    let dir = tempfile::tempdir().unwrap();
    let (base, layer) = write_layers(
        dir.path(),
        &format!("{marker} ghost = {{\n\tdamage = 1\n}}\n"),
    );

    let (set, type_id) = helpers::equipment_schemas();
    let (registry, sink) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);
    assert_eq!(sink.has_errors(), is_error);
    assert!(registry.find(type_id, "ghost").is_none());
}

#[rstest]
#[case::inject("INJECT_OR_CREATE", OverrideKind::InjectOrCreate)]
#[case::replace("REPLACE_OR_CREATE", OverrideKind::ReplaceOrCreate)]
fn test_or_create_registers_missing_target(
    #[case] marker: &str,
    #[case] kind: OverrideKind,
) {
    let dir = tempfile::tempdir().unwrap();
    let (base, layer) = write_layers(
        dir.path(),
        &format!("{marker} ghost = {{\n\tdamage = 1\n\tname = \"Ghost Blade\"\n}}\n"),
    );

    let (set, type_id) = helpers::equipment_schemas();
    let (registry, sink) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);
    assert!(!sink.has_errors());

    let ghost = registry.get(registry.find(type_id, "ghost").unwrap()).unwrap();
    assert_eq!(ghost.override_kind, kind);
    assert_eq!(ghost.get("damage"), Some(&Value::Int(1)));
}

#[test]
fn test_later_layer_wins_on_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.txt");
    let first = dir.path().join("mod_a.txt");
    let second = dir.path().join("mod_b.txt");
    std::fs::write(&base, BASE).unwrap();
    std::fs::write(&first, "INJECT sword = {\n\tdamage = 10\n}\n").unwrap();
    std::fs::write(&second, "INJECT sword = {\n\tdamage = 20\n}\n").unwrap();

    let (set, type_id) = helpers::equipment_schemas();
    let (registry, _) = helpers::load_layers(
        &[(&base, false), (&first, true), (&second, true)],
        &set,
        type_id,
    );
    let sword = registry.get(registry.find(type_id, "sword").unwrap()).unwrap();
    assert_eq!(sword.get("damage"), Some(&Value::Int(20)));
}

#[test]
fn test_saving_override_file_emits_minimal_diff() {
    let dir = tempfile::tempdir().unwrap();
    let (base, layer) = write_layers(dir.path(), "INJECT sword = {\n\tdamage = 10\n}\n");

    let (set, type_id) = helpers::equipment_schemas();
    let (mut registry, sink) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);

    // Edit the injected property on the merged object.
    let id = registry.find(type_id, "sword").unwrap();
    registry.get_mut(id).unwrap().set("damage", Value::Int(12));

    let layer_file = registry.file_by_path(&layer).unwrap();
    let report = save_file(&mut registry, layer_file, &SaveOptions::default(), &sink).unwrap();
    assert_eq!(report.patched, 1);

    let saved = std::fs::read_to_string(&layer).unwrap();
    // The layer still carries only what it supplied, under its marker.
    assert!(saved.contains("INJECT sword = {"));
    assert!(saved.contains("damage = 12"));
    assert!(!saved.contains("name"));
    assert!(!saved.contains("tags"));

    // The base file is untouched by the layer save.
    assert_eq!(std::fs::read_to_string(&base).unwrap(), BASE);

    // Reloading both layers reproduces the edited effective value.
    let (reloaded, _) =
        helpers::load_layers(&[(&base, false), (&layer, true)], &set, type_id);
    let sword = reloaded.get(reloaded.find(type_id, "sword").unwrap()).unwrap();
    assert_eq!(sword.get("damage"), Some(&Value::Int(12)));
}
