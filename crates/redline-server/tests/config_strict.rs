#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::io::Write;

use redline_server::config;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  host: "0.0.0.0"
  prot: 8080 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.shutdown.drain_timeout_ms, 30000);
    assert!(!cfg.is_production());
}

#[test]
fn rejects_unsupported_version_and_bad_buckets() {
    assert!(config::load_from_str("version: 2\n").is_err());
    assert!(
        config::load_from_str("version: 1\nmetrics:\n  duration_buckets: [0.5, 0.1]\n").is_err()
    );
    assert!(config::load_from_str("version: 1\nmetrics:\n  duration_buckets: []\n").is_err());
}

#[test]
fn rejects_out_of_range_shutdown_timeouts() {
    assert!(config::load_from_str("version: 1\nshutdown:\n  drain_timeout_ms: 500\n").is_err());

    let bad = "version: 1\nshutdown:\n  drain_timeout_ms: 2000\n  flush_timeout_ms: 2000\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn env_overrides_apply() {
    let cfg = config::load_with(env(&[
        ("HOST", "127.0.0.1"),
        ("PORT", "8081"),
        ("LOG_LEVEL", "debug"),
        ("DEPLOYMENT_TYPE", "green"),
        ("APP_ENV", "production"),
        ("APP_VERSION", "9.9.9"),
    ]))
    .unwrap();
    assert_eq!(cfg.server.socket_addr().unwrap().to_string(), "127.0.0.1:8081");
    assert_eq!(cfg.log.level, "debug");
    assert_eq!(cfg.deployment.label, "green");
    assert_eq!(cfg.deployment.version, "9.9.9");
    assert!(cfg.is_production());
}

#[test]
fn invalid_port_is_fatal() {
    for port in ["abc", "0", "70000", "-1"] {
        let err = config::load_with(env(&[("PORT", port)])).expect_err(port);
        assert_eq!(err.client_code().as_str(), "CONFIG", "{port}");
    }
}

#[test]
fn invalid_host_or_level_is_fatal() {
    assert!(config::load_with(env(&[("HOST", "not an ip")])).is_err());
    assert!(config::load_with(env(&[("LOG_LEVEL", "redline=loud")])).is_err());
    assert!(config::load_with(env(&[("DEPLOYMENT_TYPE", "  ")])).is_err());
}

#[test]
fn file_then_env_precedence() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "version: 1\nserver:\n  port: 9000\ndeployment:\n  label: blue\nenvironment: staging"
    )
    .unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let cfg = config::load_with(env(&[
        ("REDLINE_CONFIG", path.as_str()),
        ("DEPLOYMENT_TYPE", "canary"),
    ]))
    .unwrap();
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.deployment.label, "canary");
    assert_eq!(cfg.environment, "staging");
}

#[test]
fn missing_file_is_fatal() {
    let err = config::load_with(env(&[("REDLINE_CONFIG", "/definitely/not/here.yaml")]))
        .unwrap_err();
    assert_eq!(err.client_code().as_str(), "CONFIG");
}
