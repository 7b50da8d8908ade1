use harvest_core::{ConfigError, HarvestConfig, DEFAULT_PROJECT_ID};

#[test]
fn defaults_are_valid() {
    let config = HarvestConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.page_size, 5000);
    assert_eq!(config.items_per_file, 50_000);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.effective_project_id(), DEFAULT_PROJECT_ID);
}

#[test]
fn english_project_takes_precedence_when_set() {
    let config = HarvestConfig {
        english_project_id: Some("999".to_string()),
        ..HarvestConfig::default()
    };
    assert_eq!(config.effective_project_id(), "999");

    let blank = HarvestConfig {
        english_project_id: Some("  ".to_string()),
        ..HarvestConfig::default()
    };
    assert_eq!(blank.effective_project_id(), DEFAULT_PROJECT_ID);
}

#[test]
fn validate_rejects_bad_settings() {
    let bad_url = HarvestConfig {
        endpoint: "not a url".to_string(),
        ..HarvestConfig::default()
    };
    assert!(matches!(
        bad_url.validate(),
        Err(ConfigError::InvalidEndpoint { .. })
    ));

    let zero_threshold = HarvestConfig {
        items_per_file: 0,
        ..HarvestConfig::default()
    };
    assert_eq!(
        zero_threshold.validate(),
        Err(ConfigError::Zero("items_per_file"))
    );

    let no_domain = HarvestConfig {
        domain: " ".to_string(),
        ..HarvestConfig::default()
    };
    assert_eq!(no_domain.validate(), Err(ConfigError::Empty("domain")));
}

#[test]
fn checkpoint_file_follows_prefix() {
    let config = HarvestConfig {
        file_prefix: "catalog".to_string(),
        ..HarvestConfig::default()
    };
    assert_eq!(config.checkpoint_filename(), "catalog.checkpoint.json");
}

#[test]
fn validate_rejects_zero_timeouts() {
    let no_connect = HarvestConfig {
        connect_timeout_secs: 0,
        ..HarvestConfig::default()
    };
    assert_eq!(
        no_connect.validate(),
        Err(ConfigError::Zero("connect_timeout_secs"))
    );

    let no_read = HarvestConfig {
        read_timeout_secs: 0,
        ..HarvestConfig::default()
    };
    assert_eq!(
        no_read.validate(),
        Err(ConfigError::Zero("read_timeout_secs"))
    );
}

#[test]
fn validate_rejects_unusable_backoff_factor() {
    for factor in [f64::NAN, f64::INFINITY, -0.5] {
        let config = HarvestConfig {
            transport_backoff_factor: factor,
            ..HarvestConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotFinite("transport_backoff_factor")),
            "factor {factor}"
        );
    }

    let disabled = HarvestConfig {
        transport_backoff_factor: 0.0,
        ..HarvestConfig::default()
    };
    assert_eq!(disabled.validate(), Ok(()));
}
