#![no_main]

use std::sync::LazyLock;

use aegis_license::{LicenseConfig, LicenseGate, LicenseQueryApi};
use libfuzzer_sys::fuzz_target;
use tempfile::TempDir;

static WORKDIR: LazyLock<Option<TempDir>> = LazyLock::new(|| tempfile::tempdir().ok());

fuzz_target!(|data: &[u8]| {
    let Some(dir) = WORKDIR.as_ref() else {
        return;
    };
    let path = dir.path().join("auth.token");
    if std::fs::write(&path, data).is_err() {
        return;
    }

    let config = LicenseConfig {
        token_path: path,
        ..LicenseConfig::default()
    };
    let Ok(gate) = LicenseGate::new(config) else {
        return;
    };

    gate.init();
    assert!(!gate.is_licensed());
    assert!(gate.current_features().is_empty());
});
