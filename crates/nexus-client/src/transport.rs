use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Which backend strategy serves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// PostgREST + postgres-meta over HTTP.
    Remote,
    /// A direct database connection through an injected SQL gateway.
    Direct,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// A transport mode decided once and fixed afterwards.
#[derive(Debug, Default)]
pub struct ModeCell {
    mode: OnceLock<TransportMode>,
}

impl ModeCell {
    pub const fn new() -> Self {
        Self {
            mode: OnceLock::new(),
        }
    }

    /// Return the decided mode, running `has_direct` only on the first call.
    ///
    /// `has_direct` reports whether a direct-connection capability is present.
    pub fn detect(&self, has_direct: impl FnOnce() -> bool) -> TransportMode {
        *self.mode.get_or_init(|| {
            let mode = if has_direct() {
                TransportMode::Direct
            } else {
                TransportMode::Remote
            };
            tracing::info!(mode = %mode, "Transport mode selected");
            mode
        })
    }

    pub fn get(&self) -> Option<TransportMode> {
        self.mode.get().copied()
    }
}

static PROCESS_MODE: ModeCell = ModeCell::new();

/// Process-wide transport detection. The first check wins; later calls
/// return the same mode without running theirs.
pub fn detect_mode(has_direct: impl FnOnce() -> bool) -> TransportMode {
    PROCESS_MODE.detect(has_direct)
}

/// The process-wide mode, if it has been detected.
pub fn current_mode() -> Option<TransportMode> {
    PROCESS_MODE.get()
}
