//! End-to-end tests for the catdiff binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const ETCD_CATALOG: &str = r#"{"schema": "olm.package", "name": "etcd", "defaultChannel": "stable"}
{"schema": "olm.channel", "package": "etcd", "name": "stable", "entries": [
  {"name": "etcd.v0.9.0"},
  {"name": "etcd.v0.9.2", "replaces": "etcd.v0.9.0"},
  {"name": "etcd.v1.0.0", "replaces": "etcd.v0.9.2", "skips": ["etcd.v0.9.0"]}
]}
{"schema": "olm.bundle", "package": "etcd", "name": "etcd.v0.9.0", "image": "reg/etcd-bundle:v0.9.0",
 "properties": [{"type": "olm.package", "value": {"packageName": "etcd", "version": "0.9.0"}}]}
{"schema": "olm.bundle", "package": "etcd", "name": "etcd.v0.9.2", "image": "reg/etcd-bundle:v0.9.2",
 "properties": [{"type": "olm.package", "value": {"packageName": "etcd", "version": "0.9.2"}}]}
{"schema": "olm.bundle", "package": "etcd", "name": "etcd.v1.0.0", "image": "reg/etcd-bundle:v1.0.0",
 "properties": [{"type": "olm.package", "value": {"packageName": "etcd", "version": "1.0.0"}}],
 "relatedImages": [{"name": "operator", "image": "reg/etcd-operator:v1.0.0"}]}
"#;

/// Temporary workspace holding catalog fixtures
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self { temp_dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, content).expect("failed to write fixture");
        path
    }

    fn catdiff(&self, args: &[&str]) -> Output {
        let bin_path = env!("CARGO_BIN_EXE_catdiff");
        Command::new(bin_path)
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("RUST_LOG")
            .env_remove("CATDIFF_CONFIG")
            .output()
            .expect("failed to run catdiff")
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 temp path")
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.catdiff(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("diff"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.catdiff(&["--version"]);
    assert!(output.status.success());
}

#[test]
fn test_diff_heads_only_to_stdout() {
    let ctx = TestContext::new();
    let catalog = ctx.write("catalog/index.json", ETCD_CATALOG);
    let output = ctx.catdiff(&["diff", "--new", arg(&catalog), "--heads-only"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("etcd.v1.0.0"));
    assert!(!stdout.contains("reg/etcd-bundle:v0.9.2"));
}

#[test]
fn test_diff_writes_index_with_config() {
    let ctx = TestContext::new();
    ctx.write("catalog/index.json", ETCD_CATALOG);
    let config = ctx.write(
        "mirror.yaml",
        "packages:\n  - name: etcd\n    channels:\n      - name: stable\n        minVersion: 0.9.2\n",
    );
    let out_dir = ctx.path("out");
    let output = ctx.catdiff(&[
        "diff",
        "--new",
        arg(&ctx.path("catalog")),
        "--config",
        arg(&config),
        "--output",
        arg(&out_dir),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let index = std::fs::read_to_string(out_dir.join("index.json")).expect("index.json written");
    assert!(index.contains("reg/etcd-bundle:v0.9.2"));
    assert!(index.contains("reg/etcd-bundle:v1.0.0"));
    assert!(!index.contains("reg/etcd-bundle:v0.9.0"));
}

#[test]
fn test_diff_against_itself_is_empty() {
    let ctx = TestContext::new();
    let catalog = ctx.write("index.json", ETCD_CATALOG);
    let output = ctx.catdiff(&["diff", "--new", arg(&catalog), "--old", arg(&catalog)]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_diff_unknown_package_fails() {
    let ctx = TestContext::new();
    let catalog = ctx.write("index.json", ETCD_CATALOG);
    let config = ctx.write("mirror.toml", "[[packages]]\nname = \"foo\"\n");
    let output = ctx.catdiff(&["diff", "--new", arg(&catalog), "--config", arg(&config)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("package \"foo\" not found in catalog"));
}

#[test]
fn test_validate_reports_counts() {
    let ctx = TestContext::new();
    let catalog = ctx.write("index.json", ETCD_CATALOG);
    let output = ctx.catdiff(&["validate", arg(&catalog)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 packages, 1 channels, 3 bundles"));
}

#[test]
fn test_validate_rejects_two_heads() {
    let ctx = TestContext::new();
    let broken = ETCD_CATALOG.replace(
        r#"{"name": "etcd.v1.0.0", "replaces": "etcd.v0.9.2", "skips": ["etcd.v0.9.0"]}"#,
        r#"{"name": "etcd.v1.0.0"}"#,
    );
    let catalog = ctx.write("index.json", &broken);
    let output = ctx.catdiff(&["validate", arg(&catalog)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("multiple channel heads found in graph"));
}

#[test]
fn test_images_lists_related_images() {
    let ctx = TestContext::new();
    let catalog = ctx.write("index.json", ETCD_CATALOG);
    let output = ctx.catdiff(&["images", arg(&catalog)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reg/etcd-operator:v1.0.0"));
    assert!(stdout.contains("4 images"));
}

#[test]
fn test_include_init_and_update() {
    let ctx = TestContext::new();
    let catalog = ctx.write("index.json", ETCD_CATALOG);
    let output = ctx.catdiff(&["include", "init", arg(&catalog)]);
    assert!(output.status.success());
    let init = String::from_utf8_lossy(&output.stdout);
    assert!(init.contains("minVersion"));
    assert!(init.contains("0.9.0"));

    let previous = ctx.write(
        "previous.yaml",
        "packages:\n  - name: etcd\n    channels:\n      - name: stable\n        minVersion: 0.9.1\n",
    );
    let output = ctx.catdiff(&["include", "update", arg(&catalog), "--previous", arg(&previous)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let updated = String::from_utf8_lossy(&output.stdout);
    assert!(updated.contains("0.9.2"));
    assert!(!updated.contains("0.9.1"));
}

#[test]
fn test_diff_overlays_catalogs() {
    let ctx = TestContext::new();
    let base = ctx.write("base/index.json", ETCD_CATALOG);
    let overlay = ctx.write(
        "overlay/index.json",
        r#"{"schema": "olm.package", "name": "foo", "defaultChannel": "stable"}
{"schema": "olm.channel", "package": "foo", "name": "stable", "entries": [{"name": "foo.v0.1.0"}]}
{"schema": "olm.bundle", "package": "foo", "name": "foo.v0.1.0", "image": "reg/foo-bundle:v0.1.0",
 "properties": [{"type": "olm.package", "value": {"packageName": "foo", "version": "0.1.0"}}]}
"#,
    );
    let output = ctx.catdiff(&[
        "diff",
        "--new",
        arg(&base),
        "--new",
        arg(&overlay),
        "--heads-only",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reg/foo-bundle:v0.1.0"));
    assert!(stdout.contains("reg/etcd-bundle:v1.0.0"));
}
