//! How a sync pass ended.

use std::fmt;

/// The two operating modes of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// From the newest page until a page adds nothing new.
    CatchUp,
    /// From the furthest stored position until the platform runs out of pages.
    Backlog,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatchUp => write!(f, "catch-up"),
            Self::Backlog => write!(f, "backlog"),
        }
    }
}

/// Terminal state of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Catch-up reached a page with no new submissions.
    Converged,
    /// Backlog fetched an empty page.
    ReachedEnd,
    /// Shutdown was requested.
    Cancelled,
}

/// Summary of a finished pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Which pass produced this outcome.
    pub mode: SyncMode,
    /// How the pass ended.
    pub termination: Termination,
    /// Pages fetched successfully.
    pub pages: u64,
    /// New rows written (replacements are not counted).
    pub inserted: u64,
}

impl SyncOutcome {
    /// Create an outcome with no progress recorded.
    pub fn new(mode: SyncMode, termination: Termination) -> Self {
        Self {
            mode,
            termination,
            pages: 0,
            inserted: 0,
        }
    }

    /// Whether the pass stopped because shutdown was requested.
    pub fn is_cancelled(&self) -> bool {
        self.termination == Termination::Cancelled
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} after {} pages ({} new)",
            self.mode, self.termination, self.pages, self.inserted
        )
    }
}
