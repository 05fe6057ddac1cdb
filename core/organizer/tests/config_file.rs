use code_organizer::{OrganizerConfig, OrganizerError};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"max_groups": 4, "suggest_names": false, "search_threshold": 0.35}}"#).unwrap();

    let config = OrganizerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.max_groups, 4);
    assert!(!config.suggest_names);
    assert_eq!(config.search_threshold, 0.35);
    assert_eq!(config.max_merge_candidates, 5);
}

#[test]
fn test_malformed_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_groups = 4").unwrap();

    let err = OrganizerConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, OrganizerError::ConfigParse { .. }));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = OrganizerConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, OrganizerError::ConfigRead { .. }));
}

#[test]
fn test_out_of_range_threshold_fails_validation() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"search_threshold": 2.0}}"#).unwrap();

    let config = OrganizerConfig::from_file(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(OrganizerError::InvalidConfig(_))));
}
