//! Tests for tracing setup

use super::*;

#[test]
fn test_build_filter_accepts_configured_level() {
    let config = LoggingConfig {
        level: "offline_queue_core=debug".to_string(),
        json_format: false,
    };
    assert!(build_filter(&config).is_ok());
}

#[test]
fn test_second_install_is_reported_not_panicking() {
    let config = LoggingConfig {
        level: "warn".to_string(),
        json_format: true,
    };

    // Another test in this binary may have installed a subscriber first, so
    // only the second call's outcome is predictable.
    let _ = init_tracing(&config);
    let second = init_tracing(&config);

    assert!(matches!(second, Err(QueueError::Configuration { .. })));
}
