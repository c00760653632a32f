//! Shared application state for the HTTP handlers

use std::sync::Arc;

use polyrun::runner::Runner;
use polyrun::templates::TemplateLibrary;

/// Extra request-body room on top of `max_code_bytes` for JSON framing and escapes
const BODY_OVERHEAD: usize = 16 * 1024;

/// Application state, cheap to clone into every handler
#[derive(Debug, Clone)]
pub struct AppState {
    runner: Arc<Runner>,
    templates: Arc<TemplateLibrary>,
}

impl AppState {
    pub fn new(runner: Runner, templates: TemplateLibrary) -> Self {
        Self {
            runner: Arc::new(runner),
            templates: Arc::new(templates),
        }
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Largest request body accepted before JSON parsing
    pub fn body_limit(&self) -> usize {
        // JSON escaping can grow source text up to six times (\uXXXX).
        self.runner
            .config()
            .max_code_bytes
            .saturating_mul(6)
            .saturating_add(BODY_OVERHEAD)
    }
}
