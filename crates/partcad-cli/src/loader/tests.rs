//! Tests for the command loaders.

use super::*;
use crate::config::UserConfig;
use clap::ArgAction;
use partcad_core::FormatRegistry;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;

thread_local! {
    static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn calls() -> Vec<String> {
    CALLS.with(|c| c.borrow().clone())
}

struct Echo;

impl CliCommand for Echo {
    fn command(&self) -> clap::Command {
        clap::Command::new("echo")
            .arg(Arg::new("words").num_args(0..))
            .arg(Arg::new("loud").long("loud").action(ArgAction::SetTrue))
    }

    fn run(&self, matches: &ArgMatches, _ctx: &mut CliContext) -> anyhow::Result<ExitCode> {
        let words: Vec<String> = matches
            .get_many::<String>("words")
            .map(|w| w.cloned().collect())
            .unwrap_or_default();
        let mut line = words.join(" ");
        if matches.get_flag("loud") {
            line = line.to_uppercase();
        }
        CALLS.with(|c| c.borrow_mut().push(line));
        Ok(ExitCode::SUCCESS)
    }
}

fn echo() -> Box<dyn CliCommand> {
    Box::new(Echo)
}

fn pkg() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new("Package commands", PKG))
}

static PKG: &[StaticEntry] = &[StaticEntry::leaf("show", "Show words", echo)];

static ROOT: &[StaticEntry] = &[
    StaticEntry::leaf("echo", "Print words", echo),
    StaticEntry::group("pkg", "Package commands", pkg),
];

fn test_root() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new("test tree", ROOT))
}

fn context(dir: &Path) -> CliContext {
    CliContext::new(
        Arc::new(FormatRegistry::builtin().unwrap()),
        UserConfig::default(),
        dir,
    )
}

fn directory(root: &Path) -> DirectoryLoader {
    DirectoryLoader::new(DirectoryConfig::new(root, test_root))
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn is_success(code: ExitCode) -> bool {
    format!("{:?}", code) == format!("{:?}", ExitCode::SUCCESS)
}

fn args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

#[test]
fn test_files_and_folders_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.cmd", "run: echo a");
    write(dir.path(), "b.cmd", "run: echo b");
    write(dir.path(), "c/d.cmd", "run: echo d");

    let loader = directory(dir.path());
    assert_eq!(loader.list_commands(), vec!["a", "b", "c"]);

    let CommandHandle::Group(c) = loader.get_command("c").unwrap() else {
        panic!("expected a group");
    };
    assert_eq!(c.list_commands(), vec!["d"]);
    assert!(matches!(c.get_command("d").unwrap(), CommandHandle::Leaf(_)));
}

#[test]
fn test_listing_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["zeta", "alpha", "mid"] {
        write(dir.path(), &format!("{name}.cmd"), "run: echo x");
    }
    let loader = directory(dir.path());
    let first = loader.list_commands();
    assert_eq!(first, vec!["alpha", "mid", "zeta"]);
    assert_eq!(loader.list_commands(), first);
}

#[test]
fn test_index_and_hidden_entries_are_not_commands() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "index.cmd", "help: Team shortcuts");
    write(dir.path(), ".secret.cmd", "run: echo hidden");
    write(dir.path(), "_draft.cmd", "run: echo draft");
    write(dir.path(), "notes.txt", "not a command");
    write(dir.path(), "real.cmd", "run: echo real");

    let loader = directory(dir.path());
    assert_eq!(loader.list_commands(), vec!["real"]);
    assert_eq!(loader.about().as_deref(), Some("Team shortcuts"));
    assert!(loader.get_command("index").unwrap_err().is_not_found());
    assert!(loader.get_command("_draft").unwrap_err().is_not_found());
    assert!(loader.get_command("../real").unwrap_err().is_not_found());
}

#[test]
fn test_folder_wins_over_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "tools.cmd", "run: echo file");
    write(dir.path(), "tools/index.cmd", "help: Tool group");
    write(dir.path(), "tools/lint.cmd", "run: echo lint");

    let loader = directory(dir.path());
    assert_eq!(loader.list_commands(), vec!["tools"]);
    assert_eq!(loader.describe("tools").as_deref(), Some("Tool group"));
    assert!(matches!(
        loader.get_command("tools").unwrap(),
        CommandHandle::Group(_)
    ));
}

#[test]
fn test_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loader = directory(&dir.path().join("absent"));
    assert!(loader.list_commands().is_empty());
    let err = loader.get_command("anything").unwrap_err();
    assert_eq!(err.code(), "LOADER_001");
    assert_eq!(err.name, "anything");
}

#[test]
fn test_parse_error_names_the_command() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.cmd", "run: [echo, unclosed");
    write(dir.path(), "script.cmd", "script: build.py");

    let loader = directory(dir.path());
    let err = loader.get_command("broken").unwrap_err();
    assert_eq!(err.code(), "LOADER_002");
    assert!(err.to_string().contains("'broken'"));

    // Only declarative aliases are accepted.
    let err = loader.get_command("script").unwrap_err();
    assert!(matches!(err.kind, LoadErrorKind::Parse(_)));
}

#[test]
fn test_missing_run_entry() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "empty.cmd", "");
    write(dir.path(), "help-only.cmd", "help: Does nothing");

    let loader = directory(dir.path());
    for name in ["empty", "help-only"] {
        let err = loader.get_command(name).unwrap_err();
        assert_eq!(err.code(), "LOADER_004");
        assert_eq!(err.name, name);
    }
}

#[test]
fn test_alias_target_must_be_a_command() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "unknown.cmd", "run: frobnicate now");
    write(dir.path(), "nested-unknown.cmd", "run: pkg frobnicate");
    write(dir.path(), "group.cmd", "run: pkg");

    let loader = directory(dir.path());

    let err = loader.get_command("unknown").unwrap_err();
    assert_eq!(err.code(), "LOADER_003");
    assert!(err.to_string().contains("'frobnicate' is not a known command"));

    let err = loader.get_command("nested-unknown").unwrap_err();
    assert!(err.to_string().contains("'pkg frobnicate' is not a known command"));

    let err = loader.get_command("group").unwrap_err();
    assert!(err.to_string().contains("command group"));
}

#[test]
fn test_alias_help_and_list_form() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "hello.cmd",
        "help: Say hello\nrun: [echo, \"hello there\"]\n",
    );
    let loader = directory(dir.path());
    assert_eq!(loader.describe("hello").as_deref(), Some("Say hello"));

    let CommandHandle::Leaf(leaf) = loader.get_command("hello").unwrap() else {
        panic!("expected a leaf");
    };
    let about = leaf.command().get_long_about().map(|s| s.to_string());
    assert!(about.unwrap().contains("Runs: partcad echo hello there"));
}

#[test]
fn test_static_loader() {
    let loader = test_root();
    assert_eq!(loader.list_commands(), vec!["echo", "pkg"]);
    assert_eq!(loader.describe("pkg").as_deref(), Some("Package commands"));
    assert!(loader.get_command("nope").unwrap_err().is_not_found());
}

#[test]
fn test_composite_earlier_layer_wins() {
    let dir = tempfile::tempdir().unwrap();
    // Would fail to load if the directory layer owned the name.
    write(dir.path(), "echo.cmd", "run: nope");
    write(dir.path(), "greet.cmd", "help: Greets\nrun: echo hello");

    let loader = CompositeLoader::new()
        .layer(test_root())
        .layer(Box::new(directory(dir.path())));

    assert_eq!(loader.list_commands(), vec!["echo", "greet", "pkg"]);
    assert_eq!(loader.describe("echo").as_deref(), Some("Print words"));
    assert_eq!(loader.describe("greet").as_deref(), Some("Greets"));
    assert!(matches!(
        loader.get_command("echo").unwrap(),
        CommandHandle::Leaf(_)
    ));
    assert!(loader.get_command("missing").unwrap_err().is_not_found());
}

#[test]
fn test_run_tree_dispatches_nested_commands() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    let root = test_root();

    let code = run_tree(root.as_ref(), "partcad", &args(&["echo", "one", "two"]), &mut ctx).unwrap();
    assert!(is_success(code));
    let code = run_tree(root.as_ref(), "partcad", &args(&["pkg", "show", "--loud", "x"]), &mut ctx).unwrap();
    assert!(is_success(code));

    assert_eq!(calls(), vec!["one two", "X"]);
}

#[test]
fn test_run_tree_rejects_unknown_and_bad_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    let root = test_root();

    let code = run_tree(root.as_ref(), "partcad", &args(&["nope"]), &mut ctx).unwrap();
    assert!(!is_success(code));
    let code = run_tree(root.as_ref(), "partcad", &args(&["echo", "--bogus"]), &mut ctx).unwrap();
    assert!(!is_success(code));
    let code = run_tree(root.as_ref(), "partcad", &[], &mut ctx).unwrap();
    assert!(!is_success(code));

    assert!(calls().is_empty());
}

#[test]
fn test_alias_runs_with_extra_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let commands = dir.path().join("commands");
    write(&commands, "greet.cmd", "run: echo hello");
    let mut ctx = context(dir.path());

    let loader = CompositeLoader::new()
        .layer(test_root())
        .layer(Box::new(directory(&commands)));
    let code = run_tree(&loader, "partcad", &args(&["greet", "world", "--loud"]), &mut ctx).unwrap();

    assert!(is_success(code));
    assert_eq!(calls(), vec!["HELLO WORLD"]);
}

#[test]
fn test_broken_alias_surfaces_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.cmd", "run: frobnicate");
    let mut ctx = context(dir.path());

    let loader = directory(dir.path());
    let err = run_tree(&loader, "partcad", &args(&["bad"]), &mut ctx).unwrap_err();
    let load_error = err.downcast_ref::<CommandLoadError>().unwrap();
    assert_eq!(load_error.name, "bad");
}

#[test]
fn test_user_command_named_help() {
    let dir = tempfile::tempdir().unwrap();
    let commands = dir.path().join("commands");
    write(&commands, "help.cmd", "run: echo assistance");
    write(&commands, "parts.cmd", "run: echo parts");
    let mut ctx = context(dir.path());

    let loader = CompositeLoader::new()
        .layer(test_root())
        .layer(Box::new(directory(&commands)));
    assert!(group_command(&loader, "partcad")
        .try_get_matches_from(["partcad", "parts"])
        .is_ok());

    let code = run_tree(&loader, "partcad", &args(&["help"]), &mut ctx).unwrap();
    assert!(is_success(code));
    let code = run_tree(&loader, "partcad", &args(&["parts"]), &mut ctx).unwrap();
    assert!(is_success(code));
    assert_eq!(calls(), vec!["assistance", "parts"]);
}

/// Loader that counts full enumerations.
struct Counting {
    inner: Box<dyn CommandLoader>,
    listed: std::rc::Rc<std::cell::Cell<usize>>,
}

impl CommandLoader for Counting {
    fn list_commands(&self) -> Vec<String> {
        self.listed.set(self.listed.get() + 1);
        self.inner.list_commands()
    }

    fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    fn describe(&self, name: &str) -> Option<String> {
        self.inner.describe(name)
    }

    fn get_command(&self, name: &str) -> Result<CommandHandle, CommandLoadError> {
        self.inner.get_command(name)
    }
}

#[test]
fn test_composite_enumerates_each_layer_once_per_level() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a", "b", "c", "d"] {
        write(dir.path(), &format!("{name}.cmd"), "help: x\nrun: echo x");
    }
    let builtin = std::rc::Rc::new(std::cell::Cell::new(0));
    let user = std::rc::Rc::new(std::cell::Cell::new(0));

    let loader = CompositeLoader::new()
        .layer(Box::new(Counting {
            inner: test_root(),
            listed: builtin.clone(),
        }))
        .layer(Box::new(Counting {
            inner: Box::new(directory(dir.path())),
            listed: user.clone(),
        }));
    let cmd = group_command(&loader, "partcad");

    assert_eq!(cmd.get_subcommands().count(), 6);
    assert_eq!((builtin.get(), user.get()), (1, 1));
}

#[test]
fn test_directory_contains_matches_listing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.cmd", "run: echo a");
    write(dir.path(), "g/b.cmd", "run: echo b");
    write(dir.path(), "_private.cmd", "run: echo p");

    let loader = directory(dir.path());
    for name in loader.list_commands() {
        assert!(loader.contains(&name), "{name}");
    }
    assert!(!loader.contains("_private"));
    assert!(!loader.contains("index"));
    assert!(!loader.contains("missing"));
}
