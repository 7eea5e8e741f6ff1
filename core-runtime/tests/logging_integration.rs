//! Integration tests for the logging configuration surface
//!
//! The global subscriber can only be installed once per process, so these
//! tests exercise the configuration builder and helpers rather than
//! re-initializing logging per test.

use core_runtime::logging::{strip_path, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_pipeline=debug,core_worker=trace")
        .with_target(false);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(
        config.filter,
        Some("core_pipeline=debug,core_worker=trace".to_string())
    );
    assert!(!config.display_target);
}

#[test]
fn test_format_selection_tracks_build_profile() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}

#[test]
fn test_path_stripping() {
    // Unix paths
    assert_eq!(strip_path("/home/user/documents/report.pdf"), "report.pdf");
    assert_eq!(strip_path("/var/log/app.log"), "app.log");

    // Windows paths
    assert_eq!(strip_path("C:\\Users\\Jo\\Pictures\\scan.png"), "scan.png");
    assert_eq!(strip_path("D:\\data\\file.txt"), "file.txt");

    // Already basename
    assert_eq!(strip_path("photo.jpg"), "photo.jpg");

    // Edge cases
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}
