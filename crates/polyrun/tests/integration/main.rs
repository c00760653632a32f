//! Integration tests for polyrun against real language toolchains
//!
//! These tests spawn the interpreters and compilers named in the built-in
//! configuration. Run with: cargo test -p polyrun --features integration-tests
//!
//! Languages whose toolchain is rarely installed are marked `#[ignore]`. To
//! include them:
//!    cargo test -p polyrun --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::path::Path;

use polyrun::config::Config;
use polyrun::runner::Runner;
use polyrun::templates::TemplateLibrary;

mod hello_world;
mod scenarios;

/// Runner over the built-in languages with workspaces under `root`
pub(crate) fn test_runner(root: &Path) -> Runner {
    let mut config = Config::default();
    config.workspace_root = root.to_path_buf();
    Runner::new(config).expect("default config should build a runner")
}

pub(crate) fn hello_world_source(language: &str) -> String {
    TemplateLibrary::default()
        .get(language, "hello_world")
        .unwrap_or_else(|e| panic!("missing hello_world template: {e}"))
        .to_owned()
}

pub(crate) fn workspace_count(root: &Path) -> usize {
    std::fs::read_dir(root).map(|dir| dir.count()).unwrap_or(0)
}
