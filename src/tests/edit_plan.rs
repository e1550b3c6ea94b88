use super::{Edit, EditPlan, Operation};
use crate::config::Config;
use crate::error::Error;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

fn ini_file(contents: &str) -> (NamedTempFile, String) {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file.flush().unwrap();
    let path = file.path().to_string_lossy().to_string();
    (file, path)
}

fn set(file_name: &str, section: &str, name: &str, value: &str) -> Edit {
    Edit {
        file_name: file_name.to_string(),
        operation: Operation::Set {
            section: section.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        },
    }
}

#[test]
fn test_plan_edits_files_in_place() {
    let (_file, path) = ini_file("; keep me\n[Server]\nhost = localhost\nport = 80\n");

    let plan = EditPlan {
        edits: vec![
            set(&path, "Server", "port", "8080"),
            set(&path, "Client", "retries", "3"),
            Edit {
                file_name: path.clone(),
                operation: Operation::RemoveProperty {
                    section: "Server".to_string(),
                    name: "host".to_string(),
                },
            },
        ],
    };
    plan.apply(&Config::default()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "; keep me\n[Server]\nport = 8080\n\n[Client]\nretries = 3\n"
    );
}

#[test]
fn test_plan_touches_several_files() {
    let (_first, first) = ini_file("[A]\nx = 1\n");
    let (_second, second) = ini_file("[B]\ny = 2\n[C]\nz = 3\n");

    let plan = EditPlan {
        edits: vec![
            set(&first, "A", "x", "10"),
            Edit {
                file_name: second.clone(),
                operation: Operation::RemoveSection {
                    section: "B".to_string(),
                },
            },
        ],
    };
    plan.apply(&Config::default()).unwrap();

    assert_eq!(fs::read_to_string(&first).unwrap(), "[A]\nx = 10\n");
    assert_eq!(fs::read_to_string(&second).unwrap(), "[C]\nz = 3\n");
}

#[test]
fn test_plan_without_changes_leaves_file_alone() {
    let original = "[A]\r\nx=1\r\n";
    let (_file, path) = ini_file(original);

    let plan = EditPlan {
        edits: vec![
            set(&path, "A", "x", "1"),
            Edit {
                file_name: path.clone(),
                operation: Operation::RemoveSection {
                    section: "Missing".to_string(),
                },
            },
        ],
    };
    plan.apply(&Config::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_case_insensitive_config_reaches_the_document() {
    let (_file, path) = ini_file("[Server]\nHost = a\n");
    let config = Config {
        case_insensitive: true,
        ..Config::default()
    };

    EditPlan {
        edits: vec![set(&path, "server", "host", "b")],
    }
    .apply(&config)
    .unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "[Server]\nHost = b\n");
}

#[test]
fn test_plan_json_shape() {
    let json = r#"{
        "edits": [
            {"file_name": "a.ini", "op": "set", "section": "S", "name": "k", "value": "v"},
            {"file_name": "a.ini", "op": "remove_property", "section": "S", "name": "old"},
            {"file_name": "b.ini", "op": "remove_section", "section": "T"}
        ]
    }"#;
    let plan: EditPlan = serde_json::from_str(json).unwrap();

    assert_eq!(plan.edits.len(), 3);
    assert_eq!(plan.edits[0], set("a.ini", "S", "k", "v"));
    assert_eq!(
        plan.edits[2].operation,
        Operation::RemoveSection {
            section: "T".to_string()
        }
    );

    let back: EditPlan = serde_json::from_str(&serde_json::to_string(&plan).unwrap()).unwrap();
    assert_eq!(back, plan);
}

#[test]
fn test_load_rejects_invalid_plans() {
    let (_file, path) = ini_file("{\"edits\": [{\"file_name\": \"a.ini\", \"op\": \"rename\"}]}");
    assert!(matches!(EditPlan::load(&path), Err(Error::Plan(_))));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let plan = EditPlan {
        edits: vec![set("/nonexistent/dir/config.ini", "A", "x", "1")],
    };
    assert!(matches!(plan.apply(&Config::default()), Err(Error::Io(_))));
}
