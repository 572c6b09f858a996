// tests/config_load.rs
use econ_calendar_csv::config::batch::{BatchConfig, ENV_CONFIG_PATH};
use std::{env, fs, path::PathBuf};

#[test]
fn parse_toml_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("calendar.toml");
    fs::write(
        &p,
        r#"
base_dir = "pages"
output = "out/all.csv"
strict = false

[[sources]]
file = "Dec 2025.html"
year = 2025

[[sources]]
file = "Jan 2026.html"
year = 2026
"#,
    )
    .unwrap();

    let cfg = BatchConfig::load_from(&p).unwrap();
    assert!(!cfg.strict);
    assert_eq!(cfg.resolved_output(), PathBuf::from("pages/out/all.csv"));
    let srcs = cfg.resolved_sources();
    assert_eq!(srcs.len(), 2);
    assert_eq!(srcs[1].path, PathBuf::from("pages/Jan 2026.html"));
    assert_eq!(srcs[1].year, 2026);
}

#[test]
fn malformed_toml_is_an_error_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("calendar.toml");
    fs::write(&p, "sources = 3").unwrap();
    let err = BatchConfig::load_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("calendar.toml"));
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallback() {
    // Isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);

    // 1) Nothing → None
    assert!(BatchConfig::load_default().unwrap().is_none());

    // 2) Fallback config/calendar.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/calendar.toml"),
        "[[sources]]\nfile = \"a.html\"\nyear = 2025\n",
    )
    .unwrap();
    let cfg = BatchConfig::load_default().unwrap().unwrap();
    assert_eq!(cfg.sources.len(), 1);

    // 3) Env wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "output = \"x.csv\"\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let cfg = BatchConfig::load_default().unwrap().unwrap();
    assert!(cfg.sources.is_empty());
    assert_eq!(cfg.output, PathBuf::from("x.csv"));

    // 4) Env pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(BatchConfig::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}
