//! Command tree tests
//!
//! Tests verify:
//! - Directory trees on disk resolve lazily into nested loaders
//! - User trees merge under the builtin commands
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partcad-tests --test command_tree
//! ```

use partcad_cli::commands::{builtin_tree, root_loader};
use partcad_cli::config::UserConfig;
use partcad_cli::loader::{CommandHandle, CommandLoader, DirectoryConfig, DirectoryLoader};
use partcad_core::ErrorCode;
use partcad_tests::fixtures::write_file;
use pretty_assertions::assert_eq;

fn user_tree(root: &std::path::Path) -> DirectoryLoader {
    DirectoryLoader::new(DirectoryConfig::new(root, builtin_tree))
}

/// The canonical layout: two files and a folder holding one more file.
#[test]
fn test_nested_directory_tree() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.cmd", "run: version");
    write_file(dir.path(), "b.cmd", "run: list parts");
    write_file(dir.path(), "c/d.cmd", "run: list all");

    let root = user_tree(dir.path());
    assert_eq!(root.list_commands(), vec!["a", "b", "c"]);

    match root.get_command("c").unwrap() {
        CommandHandle::Group(c) => {
            assert_eq!(c.list_commands(), vec!["d"]);
            assert!(matches!(c.get_command("d").unwrap(), CommandHandle::Leaf(_)));
        }
        CommandHandle::Leaf(_) => panic!("'c' should be a group"),
    }
}

/// Aliases are checked against the real builtin tree.
#[test]
fn test_aliases_resolve_against_builtin_commands() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "to-step.cmd", "run: convert bracket -t step");
    write_file(dir.path(), "listing.cmd", "run: list");
    write_file(dir.path(), "typo.cmd", "run: lsit parts");

    let root = user_tree(dir.path());
    assert!(root.get_command("to-step").is_ok());

    let err = root.get_command("listing").unwrap_err();
    assert_eq!(err.code(), "LOADER_003");
    assert!(err.to_string().contains("command group"));

    let err = root.get_command("typo").unwrap_err();
    assert_eq!(err.name, "typo");
    assert!(err.to_string().contains("'lsit' is not a known command"));
}

/// Builtin names win; user-only names are added.
#[test]
fn test_user_tree_merges_under_builtins() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "list.cmd", "run: version");
    write_file(dir.path(), "team/index.cmd", "help: Team shortcuts");
    write_file(dir.path(), "team/parts.cmd", "run: list parts");

    let config = UserConfig {
        commands_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let root = root_loader(&config);

    let names = root.list_commands();
    assert!(names.contains(&"team".to_string()));
    assert_eq!(names.iter().filter(|n| n.as_str() == "list").count(), 1);

    // `list` is still the builtin group, not the user alias.
    assert!(matches!(root.get_command("list").unwrap(), CommandHandle::Group(_)));
    assert_eq!(root.describe("team").as_deref(), Some("Team shortcuts"));
}

/// Enumeration never fails, even when a definition is broken.
#[test]
fn test_listing_tolerates_broken_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "broken.cmd", "run: [");
    write_file(dir.path(), "fine.cmd", "run: version");

    let root = user_tree(dir.path());
    assert_eq!(root.list_commands(), vec!["broken", "fine"]);
    assert_eq!(root.get_command("broken").unwrap_err().code(), "LOADER_002");
    assert!(root.get_command("fine").is_ok());
}
