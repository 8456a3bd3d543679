//! Pass configuration.

/// Options controlling a rationalization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalizeConfig {
    /// Check the tree-form input before the pass and the linear output after it
    pub check_invariants: bool,
    /// Log every block's linear form at trace level once it is rewritten
    pub dump_ir: bool,
}

impl Default for RationalizeConfig {
    fn default() -> Self {
        Self {
            check_invariants: cfg!(debug_assertions),
            dump_ir: false,
        }
    }
}

impl RationalizeConfig {
    /// Configuration for tests and tooling: every check on.
    pub fn checked() -> Self {
        Self {
            check_invariants: true,
            dump_ir: false,
        }
    }

    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    pub fn with_dump(mut self, enabled: bool) -> Self {
        self.dump_ir = enabled;
        self
    }
}
