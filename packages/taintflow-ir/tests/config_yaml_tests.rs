//! YAML configuration loading (schema v1)

use std::io::Write;

use pretty_assertions::assert_eq;
use taintflow_ir::config::{ConfigError, EngineConfig, EngineSettings, Preset};
use taintflow_ir::features::address_routing::FieldRange;
use taintflow_ir::{AddressRouter, HostRoute, TaintEngine};
use taintflow_shadow::{MemoryShadow, Region};
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const FULL: &str = r#"
version: 1
preset: precise
overrides:
  unreliable_warning_limit: 50
  max_constraint_depth: 64
cpu_layout:
  state_size: 1024
  regs: { offset: 64, len: 32 }
  reg_size: 4
  labels_per_reg: 4
shadow:
  temporaries: 4096
  registers: 128
  special_state: 1024
  ram: 65536
"#;

#[test]
fn test_load_full_file() {
    let file = write_yaml(FULL);
    let settings = EngineSettings::from_yaml(file.path()).unwrap();

    assert_eq!(settings.preset, Preset::Precise);
    assert_eq!(
        settings.engine,
        EngineConfig::from_preset(Preset::Precise)
            .unreliable_warning_limit(50)
            .max_constraint_depth(64)
    );
    let layout = settings.cpu_layout.clone().unwrap();
    assert_eq!(layout.regs, FieldRange::new(64, 32));
    assert_eq!(settings.shadow.unwrap().ram, 65536);
}

#[test]
fn test_loaded_settings_drive_an_engine() {
    let file = write_yaml(FULL);
    let settings = EngineSettings::from_yaml(file.path()).unwrap();

    let store = MemoryShadow::new(settings.shadow.unwrap()).unwrap();
    let engine = TaintEngine::new(store, settings.engine.clone()).unwrap();
    assert!(engine.config().detaint_cb0_bytes);

    let router = AddressRouter::state_only(settings.cpu_layout.unwrap());
    assert_eq!(
        router.classify(0x1000, 0x1000 + 64),
        HostRoute::State {
            region: Region::Registers,
            offset: 0
        }
    );
}

#[test]
fn test_minimal_file_uses_balanced() {
    let file = write_yaml("version: 1\n");
    let settings = EngineSettings::from_yaml(file.path()).unwrap();
    assert_eq!(settings.preset, Preset::Balanced);
    assert_eq!(settings.engine, EngineConfig::default());
    assert!(settings.cpu_layout.is_none());
}

#[test]
fn test_rejected_files() {
    let cases = [
        ("preset: fast\n", "missing version"),
        ("version: 2\n", "unsupported version"),
        ("version: 1\npreset: paranoid\n", "unknown preset"),
        ("version: 1\ncolour: blue\n", "unknown field"),
        (
            "version: 1\noverrides:\n  max_constraint_depth: 0\n",
            "depth out of range",
        ),
        (
            "version: 1\noverrides:\n  tainted_pointer: false\n  pointer_check: true\n",
            "pointer_check without tainted_pointer",
        ),
    ];
    for (yaml, why) in cases {
        let file = write_yaml(yaml);
        assert!(EngineSettings::from_yaml(file.path()).is_err(), "{}", why);
    }

    let file = write_yaml("version: 2\n");
    assert!(matches!(
        EngineSettings::from_yaml(file.path()),
        Err(ConfigError::UnsupportedVersion { found: 2, .. })
    ));
    let file = write_yaml("preset: fast\n");
    assert!(matches!(
        EngineSettings::from_yaml(file.path()),
        Err(ConfigError::MissingVersion)
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineSettings::from_yaml(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_to_yaml_round_trips() {
    let file = write_yaml(FULL);
    let settings = EngineSettings::from_yaml(file.path()).unwrap();
    let yaml = settings.to_yaml().unwrap();
    assert!(yaml.contains("preset: precise"));
    assert!(!yaml.contains("detaint_cb0_bytes"));

    let again = EngineSettings::from_yaml_str(&yaml).unwrap();
    assert_eq!(again, settings);
}
