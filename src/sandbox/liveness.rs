//! Liveness state machine for agent output.
//!
//! The agent prints a styled `exec` token when it starts a tool invocation and
//! `succeeded in 12ms:` / `failed in 3s:` when the invocation ends. A phase
//! that stays open longer than the timeout while no output arrives means the
//! agent is stuck, usually behind a dev server that never exits.

use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::debug;

static PHASE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\x1b\[35m(?:\x1b)?\[3mexec\x1b\[0m\x1b\[0m|\bexec\b.*\bbash\s+-lc\b")
        .expect("phase start pattern is valid")
});

static PHASE_COMPLETE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)succeeded in \d+m?s:|failed in \d+m?s:")
        .expect("phase complete pattern is valid")
});

/// Where the agent is in its command cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    InCommand { started_at: Instant },
}

/// Whether a streaming session was abandoned as stuck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StuckVerdict {
    pub stuck: bool,
    /// Time spent in the open phase when the verdict was reached.
    pub elapsed: Duration,
}

impl StuckVerdict {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn stuck(elapsed: Duration) -> Self {
        Self {
            stuck: true,
            elapsed,
        }
    }
}

/// Tracks the phase across chunks of one streaming session.
///
/// Markers are matched against each new chunk only. A start marker seen while
/// a phase is already open keeps the original start time.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    phase: ExecutionPhase,
    timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            phase: ExecutionPhase::Idle,
            timeout,
        }
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    /// Feeds one freshly received chunk.
    pub fn observe(&mut self, chunk: &str, now: Instant) {
        if PHASE_START.is_match(chunk) && self.phase == ExecutionPhase::Idle {
            debug!("Agent command phase started");
            self.phase = ExecutionPhase::InCommand { started_at: now };
        }

        if matches!(self.phase, ExecutionPhase::InCommand { .. }) && PHASE_COMPLETE.is_match(chunk)
        {
            debug!("Agent command phase completed");
            self.phase = ExecutionPhase::Idle;
        }
    }

    /// Time spent in the open phase, if it exceeds the timeout.
    pub fn overdue(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            ExecutionPhase::InCommand { started_at } => {
                let elapsed = now.saturating_duration_since(started_at);
                (elapsed > self.timeout).then_some(elapsed)
            }
            ExecutionPhase::Idle => None,
        }
    }
}
