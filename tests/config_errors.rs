// tests/config_errors.rs

use std::io::Write;
use tempfile::NamedTempFile;
use chaindag::config::load_and_validate;
use chaindag::errors::SchedulerError;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_chain_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[chain.A]
after = ["B"]
ops = [ { type = "X" } ]

[chain.B]
after = ["A"]
ops = [ { type = "Y" } ]
"#,
    );

    match load_and_validate(file.path()) {
        Err(SchedulerError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = write_config(
        r#"
[chain.A]
after = ["NonExistent"]
ops = [ { type = "X" } ]
"#,
    );

    match load_and_validate(file.path()) {
        Err(SchedulerError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_chain_is_rejected() {
    let file = write_config(
        r#"
[chain.A]
ops = []
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SchedulerError::ConfigError(msg) if msg.contains("at least one op")));
}

#[test]
fn test_net_without_chains_is_rejected() {
    let file = write_config(
        r#"
[net]
name = "empty"
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SchedulerError::ConfigError(_)));
}

#[test]
fn test_zero_streams_per_gpu_is_rejected() {
    let file = write_config(
        r#"
[executor]
streams_per_gpu = 0

[chain.A]
ops = [ { type = "X" } ]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SchedulerError::ConfigError(msg) if msg.contains("streams_per_gpu")));
}

#[test]
fn test_unknown_device_and_net_type_are_toml_errors() {
    let device = write_config(
        r#"
[chain.A]
ops = [ { type = "X", device = "tpu" } ]
"#,
    );
    assert!(matches!(
        load_and_validate(device.path()),
        Err(SchedulerError::TomlError(_))
    ));

    let net_type = write_config(
        r#"
[net]
type = "fancy"

[chain.A]
ops = [ { type = "X" } ]
"#,
    );
    assert!(matches!(
        load_and_validate(net_type.path()),
        Err(SchedulerError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, SchedulerError::IoError(_)));
}

#[test]
fn test_defaults_are_applied() {
    let file = write_config(
        r#"
[chain.only]
ops = [ { type = "X" } ]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.net.name, "net");
    assert_eq!(cfg.executor.streams_per_gpu, 1);
    assert_eq!(cfg.executor.max_gpus, 16);
    assert_eq!(cfg.executor.max_numa_nodes, 8);
    assert!(!cfg.executor.use_single_pool);
    assert_eq!(cfg.num_ops(), 1);
}
