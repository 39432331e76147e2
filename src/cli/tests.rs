//! Argument parsing and configuration tests for the CLI.

use clap::Parser;

use super::{Cli, CliConfig, Commands};

#[test]
fn test_cli_parsing() {
    assert!(Cli::try_parse_from(["cms", "--help"]).is_err());
    assert!(Cli::try_parse_from(["cms", "types"]).is_ok());
    assert!(Cli::try_parse_from(["cms", "render", "3"]).is_ok());
    assert!(Cli::try_parse_from(["cms", "render"]).is_err());
}

#[test]
fn test_verbose_and_quiet_conflict() {
    assert!(Cli::try_parse_from(["cms", "--verbose", "--quiet", "types"]).is_err());
}

#[test]
fn test_build_config_log_levels() {
    let cli = Cli::try_parse_from(["cms", "--verbose", "types"]).unwrap();
    assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

    let cli = Cli::try_parse_from(["cms", "-q", "types"]).unwrap();
    assert_eq!(cli.build_config().log_level.as_deref(), Some("error"));

    let cli = Cli::try_parse_from(["cms", "types"]).unwrap();
    assert_eq!(cli.build_config().log_level, None);
}

#[test]
fn test_global_paths_after_subcommand() {
    let cli =
        Cli::try_parse_from(["cms", "export", "2", "--store", "site.json", "--config", "c.toml"])
            .unwrap();
    let config = cli.build_config();
    assert_eq!(config.store_path.as_deref(), Some(std::path::Path::new("site.json")));
    assert_eq!(config.config_path.as_deref(), Some(std::path::Path::new("c.toml")));
    assert!(matches!(cli.command, Commands::Export(_)));
}

#[test]
fn test_content_create_arguments() {
    let cli = Cli::try_parse_from([
        "cms",
        "content",
        "create",
        "--type-id",
        "4",
        "--data",
        r#"{"userlist_rows": []}"#,
    ]);
    assert!(cli.is_ok());
    assert!(Cli::try_parse_from(["cms", "content", "create"]).is_err());
}

#[test]
fn test_env_filter_prefers_explicit_level() {
    let config = CliConfig {
        log_level: Some("debug".to_string()),
        ..CliConfig::new()
    };
    assert_eq!(config.env_filter().to_string(), "debug");
}

#[test]
#[serial_test::serial]
fn test_env_filter_falls_back_to_rust_log_then_warn() {
    let original = std::env::var("RUST_LOG").ok();
    let config = CliConfig::new();

    // SAFETY: every test touching the process environment is serialised.
    unsafe { std::env::set_var("RUST_LOG", "cms_engine=trace") };
    let from_env = config.env_filter().to_string();
    unsafe { std::env::remove_var("RUST_LOG") };
    let fallback = config.env_filter().to_string();

    if let Some(value) = original {
        unsafe { std::env::set_var("RUST_LOG", value) };
    }
    assert_eq!(from_env, "cms_engine=trace");
    assert_eq!(fallback, "warn");
}
