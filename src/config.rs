#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Knowledge base settings, fixed at construction time.
///
/// `verbosity` controls how chatty the reasoner is on the `log` facade:
///
/// - `0`: top-level `assert` and `retract` calls are reported at `info`
/// - `1`: every `add` and attempted inference is reported at `debug`
/// - `2`: each entity dropped during a retraction cascade is reported at `trace`
///
/// Logging never changes what the knowledge base derives or returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Diagnostic verbosity level
    pub verbosity: u8,
}

impl Config {
    /// Create the default configuration (verbosity 0)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verbosity level
    #[must_use]
    pub fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = level;
        self
    }

    pub(crate) fn reports_inference(self) -> bool {
        self.verbosity >= 1
    }

    pub(crate) fn reports_cascade(self) -> bool {
        self.verbosity >= 2
    }
}
