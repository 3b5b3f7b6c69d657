//! Loading scan configuration from disk.

use std::io::Write;
use std::path::PathBuf;

use dipwatch_core::data::Lookback;
use dipwatch_core::params::StrategyPreset;
use dipwatch_runner::{ConfigError, ScanConfig};

#[test]
fn bundled_sample_config_is_valid() {
    // Given the sample config shipped at the workspace root
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../scan.toml");

    // When it is loaded
    let config = ScanConfig::from_file(&path).unwrap();

    // Then it matches the built-in defaults
    assert_eq!(config, ScanConfig::default());
    assert_eq!(config.params().unwrap(), StrategyPreset::Ma60Dip.params());
}

#[test]
fn written_file_round_trips() {
    // Given a config file written to a temp dir
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[scan]\nwatchlist = [\"SPY\"]\nlookback = \"6mo\"\npacing_delay_secs = 0\n\n\
         [strategy]\npreset = \"ma60_dip_wide\""
    )
    .unwrap();

    // When it is loaded
    let config = ScanConfig::from_file(file.path()).unwrap();

    // Then the overrides are applied on top of the defaults
    assert_eq!(config.scan.watchlist, vec!["SPY".to_string()]);
    assert_eq!(config.scan.lookback, Lookback::Months(6));
    assert!(config.pacing_delay().is_zero());
    assert_eq!(config.params().unwrap().proximity_threshold, 0.025);
    assert_eq!(config.scan.chart_window, 120);
}

#[test]
fn missing_file_reports_path() {
    // Given a path that does not exist
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    // When it is loaded
    let err = ScanConfig::from_file(&path).unwrap_err();

    // Then the error names the file
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
