//! Configuration file loading tests.

use std::fs;

use sitedeploy::config::Config;
use sitedeploy::error::{ConfigError, Error};

fn load(contents: &str) -> sitedeploy::error::Result<Config> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.toml");
    fs::write(&path, contents).unwrap();
    Config::load(&path)
}

#[test]
fn full_config_round_trips_every_section() {
    let config = load(
        r#"
[site]
domain = "Example.org"
alt_domains = ["www.example.org"]
upstream = "http://127.0.0.1:9000"
location_prefix = "/give/"
static_root = "/srv/www"

[logging]
level = "debug"
format = "json"

[dependencies]
installer = "apt-get"
packages = ["nginx", "certbot", "python3-venv"]

[service]
name = "giving"
user = "app"
working_dir = "/srv/app"
exec_start = "/srv/app/venv/bin/gunicorn app:app"

[certificate]
email = "ops@example.org"
staging = true

[runner]
command_timeout_secs = 60
probe_timeout_secs = 5

[[verify.probes]]
url = "https://example.org/give/health"
expect = 200
"#,
    )
    .expect("valid config");

    assert_eq!(config.site.location_prefix, "/give");
    assert_eq!(config.site.upstream_url(), "http://127.0.0.1:9000");
    assert!(config.logging.is_json());
    assert_eq!(config.dependencies.packages.len(), 3);
    assert!(config.service.unit_path().ends_with("giving.service"));
    assert!(config.certificate.staging);
    assert_eq!(config.probes().len(), 1);
    assert_eq!(config.probes()[0].expect, 200);
}

#[test]
fn default_probes_check_redirect_and_app() {
    let config = load("[site]\ndomain = \"example.org\"\nupstream = \"127.0.0.1:8000\"\n").unwrap();
    let probes = config.probes();

    assert_eq!(probes[0].url, "http://example.org/");
    assert_eq!(probes[0].expect, 301);
    assert_eq!(probes[1].url, "https://example.org/donation/");
    assert_eq!(probes[1].expect, 200);
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load("/nonexistent/sitedeploy/site.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = load("[site\ndomain = 1").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn unsupported_probe_status_is_rejected() {
    let err = load(
        r#"
[site]
domain = "example.org"
upstream = "127.0.0.1:8000"

[[verify.probes]]
url = "https://example.org/"
expect = 404
"#,
    )
    .unwrap_err();

    match err {
        Error::Config(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "verify.probes.expect");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn zero_timeout_is_rejected() {
    let err = load(
        "[site]\ndomain = \"example.org\"\nupstream = \"127.0.0.1:8000\"\n[runner]\ncommand_timeout_secs = 0\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("runner.command_timeout_secs"));
}

#[test]
fn duplicate_domains_are_rejected() {
    let err = load(
        "[site]\ndomain = \"example.org\"\nalt_domains = [\"EXAMPLE.org\"]\nupstream = \"127.0.0.1:8000\"\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn static_root_with_app_at_root_is_rejected() {
    let err = load(
        r#"
[site]
domain = "example.org"
upstream = "127.0.0.1:8000"
location_prefix = "/"
static_root = "/srv/www"
"#,
    )
    .unwrap_err();

    match err {
        Error::Config(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "site.static_root");
        }
        other => panic!("expected invalid value, got {other:?}"),
    }
}

#[test]
fn wildcard_alternate_is_rejected() {
    let err = load(
        "[site]\ndomain = \"example.org\"\nalt_domains = [\"*.example.org\"]\nupstream = \"127.0.0.1:8000\"\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("wildcard"));
}
