//! A pluggable logging capability, supplementing the `log` facade macros and
//! the `tracing::instrument` spans on the endpoint driver and `Client`'s
//! async entry points.
//!
//! Most diagnostic output in this crate goes through `log::{trace, debug,
//! warn, error}` directly, exactly as in the compiler/endpoint modules. The
//! [`Logger`] trait exists for the smaller set of call sites where a test
//! wants to assert on what was logged without depending on global `log`
//! state: [`ClientConfig`](crate::config::ClientConfig) accepts one, and
//! [`Client`](crate::client::Client) calls it at the start and end of
//! compilation.

use std::collections::HashMap;
use std::fmt::Debug;

/// A single structured field attached to a log call.
pub type Fields = HashMap<String, String>;

/// A pluggable logging sink.
///
/// The default implementation simply forwards to the `log` facade, so a
/// `Client` configured with no explicit logger behaves exactly as if it
/// called `log::debug!` etc. directly.
pub trait Logger: Debug + Send + Sync {
    fn debug(&self, message: &str, fields: &Fields) {
        let _ = fields;
        log::debug!("{}", message);
    }

    fn info(&self, message: &str, fields: &Fields) {
        let _ = fields;
        log::info!("{}", message);
    }

    fn warn(&self, message: &str, fields: &Fields) {
        let _ = fields;
        log::warn!("{}", message);
    }

    fn error(&self, message: &str, fields: &Fields) {
        let _ = fields;
        log::error!("{}", message);
    }
}

/// The logger used when [`ClientConfig`](crate::config::ClientConfig)
/// specifies none.
#[derive(Clone, Debug, Default)]
pub struct DefaultLogger;

impl Logger for DefaultLogger {}

/// A [`Logger`] that records every call in memory instead of emitting it,
/// for tests that want to assert on what the compiler logged.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    entries: std::sync::Mutex<Vec<(String, String, Fields)>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every `(level, message, fields)` entry recorded so
    /// far.
    pub fn entries(&self) -> Vec<(String, String, Fields)> {
        self.entries.lock().unwrap().clone()
    }

    fn record(&self, level: &str, message: &str, fields: &Fields) {
        self.entries
            .lock()
            .unwrap()
            .push((level.to_string(), message.to_string(), fields.clone()));
    }
}

impl Logger for CapturingLogger {
    fn debug(&self, message: &str, fields: &Fields) {
        self.record("debug", message, fields);
    }

    fn info(&self, message: &str, fields: &Fields) {
        self.record("info", message, fields);
    }

    fn warn(&self, message: &str, fields: &Fields) {
        self.record("warn", message, fields);
    }

    fn error(&self, message: &str, fields: &Fields) {
        self.record("error", message, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::{CapturingLogger, Fields, Logger};

    #[test]
    fn capturing_logger_records_calls() {
        let logger = CapturingLogger::new();
        let fields: Fields = Fields::new();
        logger.debug("compiling mutation", &fields);
        logger.warn("context item not found, falling back to vocab", &fields);

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "debug");
        assert_eq!(entries[1].0, "warn");
    }

    #[test]
    fn default_logger_does_not_panic() {
        let logger = super::DefaultLogger;
        let fields = Fields::new();
        logger.info("client initialized", &fields);
    }
}
