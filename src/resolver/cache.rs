//! Per-module session cache.

use super::session::{ResolverConfig, Session};
use super::Symbolizer;
use crate::parser::Frame;
use log::debug;
use std::collections::HashMap;

/// Resolves frames of the main executable and of any shared objects named
/// in module-qualified frames.
///
/// Sessions are opened on first use and kept until the resolver is dropped.
pub struct BacktraceResolver {
    executable: String,
    config: ResolverConfig,
    sessions: HashMap<String, Session>,
}

impl BacktraceResolver {
    pub fn new(executable: impl Into<String>, config: ResolverConfig) -> Self {
        Self {
            executable: executable.into(),
            config,
            sessions: HashMap::new(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Resolve `address` in `module` (the executable when `None`)
    pub fn resolve_address(&mut self, address: &str, module: Option<&str>) -> Vec<String> {
        let module = module.unwrap_or(&self.executable).to_string();
        let verbose = self.config.verbose;

        let session = self.session(&module);
        let mut lines = session.resolve(address);
        if verbose {
            if let Some(first) = lines.first_mut() {
                *first = format!("{{{}}} {}: {}", module, address, first);
            }
        }
        lines
    }

    fn session(&mut self, module: &str) -> &mut Session {
        let config = &self.config;
        self.sessions.entry(module.to_string()).or_insert_with(|| {
            debug!("First address in {}, starting a resolver", module);
            Session::open(module, config)
        })
    }

    /// Number of modules a session has been opened for
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the session for `module` is answering; `None` if never opened
    pub fn is_available(&self, module: &str) -> Option<bool> {
        self.sessions.get(module).map(Session::is_available)
    }
}

impl Symbolizer for BacktraceResolver {
    fn resolve(&mut self, frame: &Frame) -> Vec<String> {
        self.resolve_address(&frame.address, frame.module.as_deref())
    }
}
