//! Debounced quiescence detection for the host's turn list.
//!
//! The host renders its chat list in bursts with no "done" signal. Each
//! structural change pushes the deadline out by the idle window; the first
//! timer that finds the deadline passed declares the list settled. A max-wait
//! cap bounds how long a never-quiet page can postpone reconciliation.
//!
//! The watcher is a plain state machine over caller-supplied timestamps so it
//! can be driven by `setTimeout` in the browser and by hand in tests.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettleConfig {
    pub idle_window_ms: i64,
    pub max_wait_ms: i64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            idle_window_ms: 400,
            max_wait_ms: 15_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleEvent {
    /// No structural change for a full idle window.
    Settled { waited_ms: i64 },
    /// Changes kept arriving until the max-wait cap.
    GaveUp { waited_ms: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Observing { deadline: i64 },
    Done,
}

#[derive(Clone, Debug)]
pub struct SettleWatcher {
    config: SettleConfig,
    attached_at: i64,
    phase: Phase,
    changes: u32,
}

impl SettleWatcher {
    /// Start observing at `now`. The caller runs one reconciliation right away;
    /// the watcher covers the turns that arrive afterwards.
    pub fn attach(config: SettleConfig, now: i64) -> Self {
        Self {
            config,
            attached_at: now,
            phase: Phase::Observing {
                deadline: now + config.idle_window_ms,
            },
            changes: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn changes_seen(&self) -> u32 {
        self.changes
    }

    /// Restart the idle window. Returns the new time the timer should fire at,
    /// or `None` once the watcher has finished.
    pub fn on_structural_change(&mut self, now: i64) -> Option<i64> {
        let Phase::Observing { .. } = self.phase else {
            return None;
        };
        self.changes = self.changes.saturating_add(1);
        self.phase = Phase::Observing {
            deadline: now + self.config.idle_window_ms,
        };
        self.next_deadline()
    }

    /// When the timer should next fire: the idle deadline, capped by max wait.
    pub fn next_deadline(&self) -> Option<i64> {
        match self.phase {
            Phase::Observing { deadline } => {
                Some(deadline.min(self.attached_at + self.config.max_wait_ms))
            }
            Phase::Done => None,
        }
    }

    /// Timer callback. Emits at most one event over the watcher's lifetime.
    pub fn on_timer(&mut self, now: i64) -> Option<SettleEvent> {
        let Phase::Observing { deadline } = self.phase else {
            return None;
        };
        let waited_ms = now - self.attached_at;

        if now >= deadline {
            self.phase = Phase::Done;
            return Some(SettleEvent::Settled { waited_ms });
        }
        if waited_ms >= self.config.max_wait_ms {
            self.phase = Phase::Done;
            return Some(SettleEvent::GaveUp { waited_ms });
        }
        None
    }
}
