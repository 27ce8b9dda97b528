use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vb_career::config::PipelineConfig;

fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("data");
    path
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("create fixture copy dir");
    for entry in fs::read_dir(from).expect("fixture dir should be readable") {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("copy fixture file");
        }
    }
}

/// A scratch copy of the fixture data dir and a config pointing at it.
pub fn fixture_workspace() -> (TempDir, PipelineConfig) {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("data");
    copy_tree(&fixture_dir(), &data);
    let cfg = PipelineConfig {
        data_dir: data,
        ..PipelineConfig::default()
    };
    (tmp, cfg)
}
