//! Binary command builders for tests
//!
//! Commands come with `RUST_LOG=error` so logs stay out of test output, and
//! without the caller's `FOLIO_WORKSPACE`.

use assert_cmd::Command;

/// Command for the `folio_mcp` server binary
pub fn folio_mcp_command() -> Command {
    command_for("folio_mcp")
}

/// Command for any binary of the workspace
#[allow(deprecated)]
pub fn command_for(bin_name: &str) -> Command {
    let mut cmd = Command::cargo_bin(bin_name)
        .unwrap_or_else(|_| panic!("Failed to find {} binary", bin_name));
    cmd.env("RUST_LOG", "error");
    cmd.env_remove("FOLIO_WORKSPACE");
    cmd
}
