//! End-to-End Test Suite: Engine Permission Workflow
//!
//! Drives the library the way a host engine does: load defaults from disk,
//! admit subjects as they join, attach group hierarchies, gate commands and
//! react to operators editing the defaults file.

use std::sync::Arc;
use tempfile::TempDir;
use warden_permissions::{
    CommandExecutionResult, CommandPermissions, DefaultPermissions, Error, FileDefaultsRepository,
    MemoryDatabase, PermissionContext, PermissionState, SimpleContext, SubjectRegistry,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn write_defaults(dir: &TempDir, body: &str) -> Arc<FileDefaultsRepository> {
    let repo = FileDefaultsRepository::with_defaults(dir.path());
    std::fs::write(repo.path(), body).expect("Failed to write defaults file");
    Arc::new(repo)
}

/// Complete workflow: load operator defaults, admit players, layer groups on
/// top, and gate commands on the result.
#[test]
fn test_complete_engine_workflow() {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let repo = write_defaults(
        &temp_dir,
        "enabled: true\ndefaults:\n  - chat.*\n  - -chat.broadcast\n  - warp.use\n",
    );

    let registry = SubjectRegistry::new(Arc::new(DefaultPermissions::new(repo.clone())));
    let steve = registry.admit("steve");
    let alex = registry.admit("alex");

    // everyone gets the defaults
    for player in [&steve, &alex] {
        assert!(player.has_permission("chat.send"));
        assert!(!player.has_permission("chat.broadcast"));
        assert!(player.has_permission("WARP.USE"));
    }

    // staff group overrides the defaults for alex only
    let staff = Arc::new(SimpleContext::new("staff"));
    staff.databases().add_last(Arc::new(MemoryDatabase::from_states([
        PermissionState::allow("chat.broadcast"),
        PermissionState::allow("server.*"),
    ])));
    assert!(alex.add_parent_first(staff));
    alex.invalidate_all();

    let mut broadcast = CommandPermissions::new("broadcast");
    broadcast.add_permission("chat.broadcast");

    let (result, output) = broadcast
        .execute_with_permission(&alex, || Ok("sent".to_string()))
        .expect("command should run");
    assert_eq!(result, CommandExecutionResult::Executed);
    assert_eq!(output.as_deref(), Some("sent"));

    let (result, output) = broadcast
        .execute_with_permission(&steve, || Ok("sent".to_string()))
        .expect("denial is not an error");
    assert_eq!(result, CommandExecutionResult::Denied);
    assert!(output.is_none());

    assert!(matches!(
        broadcast.check(&steve),
        Err(Error::PermissionDenied { ref subject, .. }) if subject == "steve"
    ));

    let mut stop = CommandPermissions::new("stop");
    stop.add_permission("server.stop")
        .add_permission("server.admin")
        .set_require_all(true);
    assert!(stop.is_permitted(&alex));
    assert!(!stop.is_permitted(&steve));

    let holders: Vec<String> = registry
        .subjects_with_node("chat.broadcast")
        .iter()
        .map(|subject| subject.name().to_string())
        .collect();
    assert_eq!(holders, vec!["alex"]);

    // leaving drops the subject
    assert!(registry.remove("alex").is_some());
    assert_eq!(registry.len(), 1);
}

/// Operators edit the file while the engine runs, then reload.
#[test]
fn test_operator_edits_defaults_file() {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let repo = write_defaults(&temp_dir, "defaults:\n  - build.*\n");

    let defaults = Arc::new(DefaultPermissions::new(repo.clone()));
    let registry = SubjectRegistry::new(defaults.clone());
    let steve = registry.admit("steve");
    assert!(steve.has_permission("build.place"));

    // the reload on startup wrote the header back
    let text = std::fs::read_to_string(repo.path()).expect("Failed to read defaults file");
    assert!(text.starts_with('#'));

    std::fs::write(repo.path(), "enabled: false\ndefaults:\n  - build.*\n")
        .expect("Failed to rewrite defaults file");
    defaults.reload();
    registry.invalidate_all();
    assert!(!defaults.is_enabled());
    assert!(!steve.has_permission("build.place"));

    defaults.set_enabled(true).expect("Failed to save defaults");
    registry.invalidate_all();
    assert!(steve.has_permission("build.place"));

    // a broken edit keeps what was loaded before
    std::fs::write(repo.path(), "defaults: [unclosed\n").expect("Failed to corrupt file");
    defaults.reload();
    registry.invalidate_all();
    assert!(steve.has_permission("build.place"));
}

/// Plugins register defaults at runtime; removing them only affects
/// subjects whose cache no longer holds the old answer.
#[test]
fn test_plugin_defaults_lifecycle() {
    init_tracing();
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let repo = Arc::new(FileDefaultsRepository::with_defaults(temp_dir.path()));
    let registry = SubjectRegistry::new(Arc::new(DefaultPermissions::new(repo.clone())));

    registry.defaults().add_default_permission("economy.balance");
    let before = std::fs::read_to_string(repo.path()).expect("Failed to read defaults file");

    let steve = registry.admit("steve");
    assert!(steve.has_permission("economy.balance"));

    assert!(registry
        .defaults()
        .remove_default_permission("economy.balance")
        .expect("Failed to remove default"));

    // plugin defaults never reach the file
    let after = std::fs::read_to_string(repo.path()).expect("Failed to read defaults file");
    assert_eq!(before, after);

    assert!(steve.has_permission("economy.balance"));
    let fresh = registry.admit("alex");
    assert!(!fresh.has_permission("economy.balance"));
}
