//! A library for bounded multi-language code execution.
//!
//! Polyrun runs untrusted snippets in twelve languages, each execution in its
//! own throwaway workspace under a watchdog, and reports a structured result.
//!
//! # Features
//!
//! - **Language registry**: TOML-defined interpreters and compilers, twelve built in.
//! - **Compile then run**: separate time budgets, no run after a failed compile.
//! - **Process control**: process groups and address-space limits on Unix, console-less spawn on Windows.
//! - **Bounded output**: per-stream caps with truncation flags.
//! - **Templates**: starter snippets for every language.
//!
//! Isolation is a private directory, a cleared environment and resource
//! ceilings. It is not a security boundary against hostile code.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language, LanguageRegistry};
pub use runner::{
    CompileError, CompileResult, ExecuteError, ExecutionError, ExecutionRecorder, Runner,
};
pub use sandbox::{ProcessOutput, ProcessRunner, SandboxError, Workspace, WorkspaceManager};
pub use templates::{TemplateEntry, TemplateError, TemplateLibrary};
pub use types::{
    ExecutionRequest, ExecutionResult, ExecutionStatus, ResourceLimits, SENTINEL_EXIT_CODE,
};

pub mod config;
pub mod runner;
pub mod sandbox;
pub mod templates;
pub mod types;
