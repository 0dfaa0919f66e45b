//! Per-link error aggregation controlling retry (spec §4.8).

/// One recorded failure: the operation name, the error text, and whatever
/// arguments identify the object involved.
#[derive(Clone, Debug)]
pub struct ExceptionEntry {
    pub op: String,
    pub error: String,
    pub args: Vec<String>,
    pub errno: Option<i32>,
}

/// `code 17 = EEXIST` triggers one retry (spec §4.8).
pub const EEXIST: i32 = 17;

#[derive(Clone, Debug, Default)]
pub struct ExceptionCollector {
    entries: Vec<ExceptionEntry>,
    /// Quiet mode: an early pre-flight apply doesn't emit user-visible
    /// warnings when the engine expects to recreate anyway (spec §4.8).
    quiet: bool,
}

impl ExceptionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn record(&mut self, op: impl Into<String>, error: impl Into<String>, args: Vec<String>, errno: Option<i32>) {
        let op = op.into();
        let error = error.into();
        if !self.quiet {
            tracing::warn!(op = %op, error = %error, "recoverable error recorded");
        }
        self.entries.push(ExceptionEntry { op, error, args, errno });
    }

    pub fn has_op(&self, op: &str) -> bool {
        self.entries.iter().any(|e| e.op == op)
    }

    pub fn has_errno(&self, code: i32) -> bool {
        self.entries.iter().any(|e| e.errno == Some(code))
    }

    pub fn should_retry_recreate(&self) -> bool {
        self.has_errno(EEXIST)
    }

    pub fn entries(&self) -> &[ExceptionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eexist_triggers_retry() {
        let mut c = ExceptionCollector::new();
        c.record("link_set", "file exists", vec!["eth0".into()], Some(EEXIST));
        assert!(c.has_errno(EEXIST));
        assert!(c.should_retry_recreate());
        assert!(c.has_op("link_set"));
    }

    #[test]
    fn quiet_mode_suppresses_nothing_structurally() {
        let mut c = ExceptionCollector::new();
        c.set_quiet(true);
        c.record("route_add", "oif unresolved", vec![], None);
        assert!(!c.is_empty());
        assert!(c.is_quiet());
    }
}
