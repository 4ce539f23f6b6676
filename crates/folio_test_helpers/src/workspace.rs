//! Temporary Folio workspaces for tests

use assert_fs::TempDir;
use std::fs;
use std::path::PathBuf;

/// Create a temporary directory, removed when the `TempDir` is dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Initialize a Folio workspace: `.folio/` with an empty `cache/`
///
/// ```rust
/// use folio_test_helpers::workspace::init_workspace;
///
/// let workspace = init_workspace();
/// assert!(workspace.path().join(".folio/cache").exists());
/// ```
pub fn init_workspace() -> TempDir {
    let temp = temp_dir();
    fs::create_dir_all(temp.path().join(".folio").join("cache"))
        .expect("Failed to create .folio/cache directory");
    temp
}

/// Workspace whose `.folio/config.toml` holds `config`
///
/// ```rust
/// use folio_test_helpers::workspace::workspace_with_config;
///
/// let workspace = workspace_with_config("[rag]\nenabled = true\n");
/// assert!(workspace.path().join(".folio/config.toml").exists());
/// ```
pub fn workspace_with_config(config: &str) -> TempDir {
    let workspace = init_workspace();
    fs::write(workspace.path().join(".folio").join("config.toml"), config)
        .expect("Failed to write config.toml");
    workspace
}

/// Workspace with extra files, given as `(relative path, content)` pairs
pub fn workspace_with_files(files: &[(&str, &str)]) -> TempDir {
    let workspace = init_workspace();
    for (name, content) in files {
        let path = workspace.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write workspace file");
    }
    workspace
}

/// Single file in a fresh temp directory
///
/// Returns the directory guard along with the file path.
pub fn temp_file(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
    let temp = temp_dir();
    let path = temp.path().join(name);
    fs::write(&path, content).expect("Failed to write temp file");
    (temp, path)
}
