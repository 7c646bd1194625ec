/// Options passed to `run` controlling cross-cutting behavior for one
/// query. Built with the same chained-builder convention as the rest of
/// this crate's configuration surface.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct ExecutionOptions {
    /// When set, an `Unexpected` error classified by the record driver has
    /// a captured backtrace appended to its message.
    debug: bool,
}

impl ExecutionOptions {
    /// Create a new `ExecutionOptions` object.
    pub fn new() -> ExecutionOptions {
        ExecutionOptions::default()
    }

    /// Set the debug flag, with support for chaining.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_non_debug() {
        let opts = ExecutionOptions::new();
        assert!(!opts.debug());
    }

    #[test]
    fn with_debug_chains() {
        let opts = ExecutionOptions::new().with_debug(true);
        assert!(opts.debug());
    }
}
