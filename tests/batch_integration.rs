//! Integration tests for whole-project and single-file runs

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use inspector_ids::{InstrumentConfig, InstrumentError, Instrumenter, RegistryScope};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/App.jsx", "export default () => <main><Header /></main>;\n");
    write(dir.path(), "src/Header.jsx", "export const Header = () => <h1>Hello</h1>;\n");
    write(dir.path(), "src/Broken.jsx", "export const Broken = () => <div><span></div>;\n");
    write(dir.path(), "dist/Bundle.jsx", "<p />\n");
    dir
}

#[test]
fn test_parse_failure_does_not_abort_run() {
    let dir = project();
    let mut inst = Instrumenter::new(InstrumentConfig::default().with_project_root(dir.path()));
    let report = inst.process_all().unwrap();

    assert_eq!(report.modified.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("Broken.jsx"));

    let broken = fs::read_to_string(dir.path().join("src/Broken.jsx")).unwrap();
    assert_eq!(broken, "export const Broken = () => <div><span></div>;\n");

    let header = fs::read_to_string(dir.path().join("src/Header.jsx")).unwrap();
    assert_eq!(
        header,
        "export const Header = () => <h1 id=\"h1-1\" data-component=\"Header\" data-file=\"src/Header.jsx\">Hello</h1>;\n"
    );
}

#[test]
fn test_second_run_changes_nothing() {
    let dir = project();
    let config = InstrumentConfig::default().with_project_root(dir.path());
    Instrumenter::new(config.clone()).process_all().unwrap();
    let app = fs::read_to_string(dir.path().join("src/App.jsx")).unwrap();

    let report = Instrumenter::new(config).process_all().unwrap();
    assert!(report.modified.is_empty());
    assert_eq!(report.unchanged.len(), 2);
    assert_eq!(fs::read_to_string(dir.path().join("src/App.jsx")).unwrap(), app);
}

#[test]
fn test_missing_source_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut inst = Instrumenter::new(InstrumentConfig::default().with_project_root(dir.path()));
    match inst.process_all() {
        Err(InstrumentError::MissingRoot(path)) => assert!(path.ends_with("src")),
        other => panic!("expected missing root, got {:?}", other),
    }
}

#[test]
fn test_single_file_run() {
    let dir = project();
    let mut inst = Instrumenter::new(InstrumentConfig::default().with_project_root(dir.path()));
    let outcome = inst.process_file(&dir.path().join("src/Header.jsx")).unwrap();
    assert!(outcome.modified);
    assert_eq!(outcome.records[0].file_path, "src/Header.jsx");

    let err = inst.process_file(&dir.path().join("src/Broken.jsx")).unwrap_err();
    assert!(matches!(err, InstrumentError::Parse { .. }));
}

#[test]
fn test_scope_controls_id_reuse() {
    let per_file = project();
    let report = Instrumenter::new(InstrumentConfig::default().with_project_root(per_file.path()))
        .process_all()
        .unwrap();
    let ids: Vec<_> = report.records.iter().map(|r| r.id.concrete(0)).collect();
    assert_eq!(ids, vec!["main-1", "h1-1"]);

    let global = project();
    let config = InstrumentConfig::default()
        .with_project_root(global.path())
        .with_scope(RegistryScope::Global);
    let report = Instrumenter::new(config).process_all().unwrap();
    let ids: Vec<_> = report.records.iter().map(|r| r.id.concrete(0)).collect();
    assert_eq!(ids, vec!["main-1", "h1-2"]);
}

#[test]
fn test_config_file_is_discovered() {
    let dir = project();
    write(
        dir.path(),
        "inspector-ids.toml",
        "source-dir = \"app\"\nextensions = [\"tsx\"]\n",
    );
    write(dir.path(), "app/Widget.tsx", "export const W = () => <b>x</b>;\n");
    write(dir.path(), "app/Skip.jsx", "export const S = () => <i>x</i>;\n");

    let config = InstrumentConfig::discover(dir.path()).unwrap();
    let report = Instrumenter::new(config).process_all().unwrap();
    assert_eq!(report.modified.len(), 1);
    assert!(report.modified[0].ends_with("Widget.tsx"));
    assert_eq!(report.records[0].file_path, "app/Widget.tsx");
}
