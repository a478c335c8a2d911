//! Integration tests for configuration loading.

use std::io::Write;

use gpu_device_rm::config::Config;

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(cfg.sharing.replicas, 1);
    assert!(cfg.devices.is_empty());
}

#[test]
fn test_load_and_build() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "sharing": {{"replicas": 5, "strict_replica_ids": true}},
            "devices": [
                {{"index": "0", "uuid": "GPU-a", "paths": ["/dev/nvidia0"], "numa_node": 0}},
                {{"index": "1", "uuid": "GPU-b", "paths": ["/dev/nvidia1"], "numa_node": 1}}
            ]
        }}"#
    )
    .unwrap();

    let cfg = Config::load(file.path()).unwrap();
    assert_eq!(cfg.sharing.replicas, 5);
    assert!(cfg.sharing.strict_replica_ids);

    let devices = cfg.build_devices().unwrap();
    assert_eq!(devices.plugin_devices(cfg.sharing.replicas).len(), 10);
    assert!(cfg.parse_replica_id("GPU-a::nope").is_err());
}

#[test]
fn test_load_rejects_zero_replicas() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"sharing": {{"replicas": 0}}}}"#).unwrap();
    assert!(Config::load(file.path()).is_err());
}

#[test]
fn test_load_rejects_malformed_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(Config::load(file.path()).is_err());
}
