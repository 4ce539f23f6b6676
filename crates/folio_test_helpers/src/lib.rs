//! Shared test utilities for Folio test suites
//!
//! # Modules
//!
//! - [`workspace`]: Temp workspaces with a `.folio` directory and config
//! - [`cli`]: Command builders with pre-configured environments
//! - [`logging`]: Test logging configuration
//! - [`assertions`]: Domain-specific predicates
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_test_helpers::prelude::*;
//!
//! let workspace = init_workspace();
//! folio_mcp_command()
//!     .arg("--workspace")
//!     .arg(workspace.path())
//!     .write_stdin("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
//!     .assert()
//!     .success();
//! ```

pub mod assertions;
pub mod cli;
pub mod logging;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::cli::{command_for, folio_mcp_command};
    pub use crate::logging::{init_test_logging, suppress_logs};
    pub use crate::workspace::{init_workspace, temp_dir, workspace_with_config, workspace_with_files};
}
