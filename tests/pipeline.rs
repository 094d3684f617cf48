//! Full-pipeline tests over a scaffolded source tree.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use assetforge::{AssetKind, Paths, TaskId, build, clean, run_task};

fn scaffold(root: &Utf8Path) {
    let src = root.join("src");

    fs::create_dir_all(src.join("assets/scss")).unwrap();
    fs::create_dir_all(src.join("assets/js/lib")).unwrap();
    fs::create_dir_all(src.join("assets/images/icons")).unwrap();
    fs::create_dir_all(src.join("assets/fonts")).unwrap();
    fs::create_dir_all(src.join("assets/video")).unwrap();

    fs::write(
        src.join("index.html"),
        "<!doctype html><title>demo</title>\n",
    )
    .unwrap();

    fs::write(
        src.join("assets/scss/styles.scss"),
        "$accent: red;\nbody {\n  color: $accent;\n}\n",
    )
    .unwrap();

    fs::write(src.join("assets/js/app.js"), "//= lib/util.js\nmain();\n").unwrap();
    fs::write(
        src.join("assets/js/lib/util.js"),
        "// helper\nfunction main() {}\n",
    )
    .unwrap();

    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 128, 255, 255]));
    img.save(src.join("assets/images/logo.png").as_std_path())
        .unwrap();
    fs::write(
        src.join("assets/images/icons/close.svg"),
        "<svg>\n  <!-- close icon -->\n  <path d=\"M0 0\"/>\n</svg>\n",
    )
    .unwrap();

    fs::write(src.join("assets/fonts/body.woff2"), b"\0wOF2").unwrap();
    fs::write(src.join("assets/video/intro.mp4"), b"\0mp4").unwrap();
}

fn paths_for(root: &Utf8Path) -> Paths {
    Paths::new(root.join("src"), root.join("dist"))
        .unwrap()
        .with_cache(root.join(".cache"))
}

/// Snapshot of every file under a directory, keyed by relative path.
fn snapshot(dir: &Utf8Path) -> BTreeMap<Utf8PathBuf, Vec<u8>> {
    let mut map = BTreeMap::new();
    collect(dir, dir, &mut map);
    map
}

fn collect(root: &Utf8Path, dir: &Utf8Path, map: &mut BTreeMap<Utf8PathBuf, Vec<u8>>) {
    for entry in dir.read_dir_utf8().unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if entry.file_type().unwrap().is_dir() {
            collect(root, path, map);
        } else {
            map.insert(
                path.strip_prefix(root).unwrap().to_owned(),
                fs::read(path).unwrap(),
            );
        }
    }
}

#[test]
fn build_produces_expected_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    let paths = paths_for(root);
    let reports = build(&paths).unwrap();
    assert!(reports.iter().all(|r| r.skipped.is_empty()));

    let dist = root.join("dist");
    assert!(dist.join("index.html").exists());

    let full = fs::read_to_string(dist.join("assets/css/styles.css")).unwrap();
    let min = fs::read_to_string(dist.join("assets/css/styles.min.css")).unwrap();
    assert!(full.contains("color: red"));
    assert!(min.contains("color:red"));
    assert!(min.len() <= full.len());

    let app = fs::read_to_string(dist.join("assets/js/app.js")).unwrap();
    assert!(app.contains("function main"));
    assert!(app.contains("main();"));
    let app_min = fs::read_to_string(dist.join("assets/js/app.min.js")).unwrap();
    assert!(!app_min.contains("// helper"));

    assert!(dist.join("assets/images/logo.png").exists());
    assert!(dist.join("assets/images/logo.webp").exists());
    let svg = fs::read_to_string(dist.join("assets/images/icons/close.svg")).unwrap();
    assert!(!svg.contains("<!--"));

    assert_eq!(fs::read(dist.join("assets/fonts/body.woff2")).unwrap(), b"\0wOF2");
    assert_eq!(fs::read(dist.join("assets/video/intro.mp4")).unwrap(), b"\0mp4");
}

#[test]
fn build_is_deterministic_and_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    let paths = paths_for(root);

    build(&paths).unwrap();
    let first = snapshot(&root.join("dist"));

    build(&paths).unwrap();
    let second = snapshot(&root.join("dist"));

    assert_eq!(first, second);
}

#[test]
fn every_minified_stylesheet_has_a_smaller_sibling() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    let paths = paths_for(root);
    build(&paths).unwrap();

    let mut seen = 0;
    for (path, bytes) in snapshot(&root.join("dist")) {
        let Some(name) = path.file_name() else { continue };
        if !name.ends_with(".min.css") {
            continue;
        }

        let sibling = path
            .as_str()
            .strip_suffix(".min.css")
            .map(|stem| root.join("dist").join(format!("{stem}.css")))
            .unwrap();
        assert!(sibling.exists(), "missing unminified sibling for {path}");
        assert!(bytes.len() <= fs::read(sibling).unwrap().len());
        seen += 1;
    }
    assert!(seen > 0);
}

#[test]
fn clean_removes_stale_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    let paths = paths_for(root);
    build(&paths).unwrap();

    // A file no build would produce survives until the next clean.
    fs::write(root.join("dist/stale.txt"), b"old").unwrap();
    let with_stale = snapshot(&root.join("dist"));
    assert!(with_stale.contains_key(Utf8Path::new("stale.txt")));

    build(&paths).unwrap();
    let rebuilt = snapshot(&root.join("dist"));
    assert!(!rebuilt.contains_key(Utf8Path::new("stale.txt")));

    clean(&paths).unwrap();
    assert_eq!(root.join("dist").read_dir_utf8().unwrap().count(), 0);
}

#[test]
fn empty_sources_build_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();

    let paths = paths_for(root);
    let reports = build(&paths).unwrap();

    assert!(reports.iter().all(|r| r.written.is_empty() && r.skipped.is_empty()));
}

#[test]
fn malformed_stylesheet_does_not_block_the_build() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    fs::write(
        root.join("src/assets/scss/broken.scss"),
        "body { color: \n",
    )
    .unwrap();

    let paths = paths_for(root);
    let reports = build(&paths).unwrap();

    let styles = reports.iter().find(|r| r.id == TaskId::Styles).unwrap();
    assert_eq!(styles.skipped.len(), 1);
    assert!(styles.skipped[0].path.as_str().ends_with("broken.scss"));

    let dist = root.join("dist");
    assert!(!dist.join("assets/css/broken.css").exists());
    assert!(!dist.join("assets/css/broken.min.css").exists());
    assert!(dist.join("assets/css/styles.css").exists());
    // Other categories are untouched by the failure.
    assert!(dist.join("index.html").exists());
    assert!(dist.join("assets/js/app.js").exists());
}

#[test]
fn single_task_touches_only_its_subtree() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(tmp.path()).unwrap();
    scaffold(root);

    let paths = paths_for(root);
    build(&paths).unwrap();
    let before = snapshot(&root.join("dist"));

    fs::write(
        root.join("src/assets/js/app.js"),
        "//= lib/util.js\nmain();\nmain();\n",
    )
    .unwrap();
    run_task(TaskId::Scripts, &paths).unwrap();
    let after = snapshot(&root.join("dist"));

    for (path, bytes) in &after {
        let expected_change = path.starts_with("assets/js");
        let changed = before.get(path) != Some(bytes);
        assert_eq!(
            changed, expected_change,
            "unexpected state for {path}: changed={changed}"
        );
    }

    let entry = paths.entry(AssetKind::Scripts);
    assert_eq!(entry.out, root.join("dist/assets/js"));
}
