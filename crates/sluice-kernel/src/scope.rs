//! Cancellation scopes.
//!
//! A [`Scope`] is an explicit stop signal handed to every stage of a run.
//! Scopes nest: a child is cancelled whenever its parent is, and can be
//! cancelled on its own without touching the parent.
//!
//! ```text
//!   caller scope
//!     └── run scope                 ← cancelled on failure / deadline
//!           └── stage[n-1] scope
//!                 └── stage[n-2] scope
//!                       └── ...
//!                             └── stage[0] scope
//! ```
//!
//! Upstream stage scopes are children of downstream ones, so a consumer that
//! cancels its own scope stops everything upstream of it and nothing
//! downstream.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Lifecycle state of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Work may proceed.
    Active,
    /// Stop requested. Permanent.
    Cancelled,
    /// The owning run finished without being cancelled.
    Done,
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeState::Active => write!(f, "active"),
            ScopeState::Cancelled => write!(f, "cancelled"),
            ScopeState::Done => write!(f, "done"),
        }
    }
}

/// A monotonic, nestable cancellation signal.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct Scope {
    token: CancellationToken,
    done: Arc<AtomicBool>,
}

impl Scope {
    /// Create a new root scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of this scope and all of its children. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether this scope, or any ancestor, has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Create a scope cancelled whenever this one is.
    pub fn child_scope(&self) -> Scope {
        Scope {
            token: self.token.child_token(),
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wait until the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Mark the owning run as finished.
    pub fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Current state. Cancellation wins over completion.
    pub fn state(&self) -> ScopeState {
        if self.token.is_cancelled() {
            ScopeState::Cancelled
        } else if self.done.load(Ordering::Acquire) {
            ScopeState::Done
        } else {
            ScopeState::Active
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("state", &self.state()).finish()
    }
}
