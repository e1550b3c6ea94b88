use super::Config;
use crate::document::DocumentOptions;
use crate::names::NameFolding;

#[test]
fn test_empty_file_gives_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.document_options(), DocumentOptions::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let config = Config::from_toml("case_insensitive = true\nchunk_size = 512\n").unwrap();
    assert!(config.case_insensitive);
    assert_eq!(config.chunk_size, 512);
    assert!(config.spaces_around_assignment);
    assert!(config.detect_conventions);
}

#[test]
fn test_folding_follows_case_setting() {
    let config = Config {
        case_insensitive: true,
        ..Config::default()
    };
    assert_eq!(config.folding().fold("HoSt"), "host");
    assert_eq!(Config::default().folding().fold("HoSt"), "HoSt");
}

#[test]
fn test_document_options_carry_formatting() {
    let config = Config {
        spaces_around_assignment: false,
        empty_lines_between_properties: true,
        detect_conventions: false,
        ..Config::default()
    };
    let options = config.document_options();
    assert!(!options.spaces_around_assignment);
    assert!(options.empty_lines_between_properties);
    assert!(!options.detect_conventions);
}
