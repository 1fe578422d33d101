//! Session lifecycle — gates sampling on the host's background-execution
//! window.
//!
//! The host platform grants only bounded, explicitly-renewed background run
//! time. Sampling must not run outside an active window, so the sampling
//! timer is started and stopped by this state machine rather than living for
//! the whole process. The machine is driven by an abstract event enum,
//! decoupled from any specific host API.

// ─── States and events ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  /// No execution window; the sampling timer is stopped.
  Inactive,
  /// An execution window is open and sampling runs.
  Active,
  /// The window is about to be revoked; pending state should be persisted.
  Expiring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
  /// The host granted an execution window.
  Started,
  /// Expiry warning — invalidation is imminent.
  WillExpire,
  /// The window was revoked.
  Invalidated,
}

/// What the owner of the sampling timer should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
  /// Start the sampling timer.
  StartSampling,
  /// Persist any in-flight assembler state before forced invalidation.
  FlushPending,
  /// Stop the sampling timer and release the periodic resource.
  StopSampling,
  /// The event does not apply in the current state.
  Ignore,
}

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SessionLifecycle {
  state: SessionState,
}

impl Default for SessionState {
  fn default() -> Self { Self::Inactive }
}

impl SessionLifecycle {
  pub fn new() -> Self { Self::default() }

  pub fn state(&self) -> SessionState { self.state }

  /// Apply one lifecycle event and return the action the caller must take.
  /// Events that do not apply in the current state are ignored.
  pub fn handle(&mut self, event: SessionEvent) -> SessionAction {
    use SessionAction as A;
    use SessionEvent as E;
    use SessionState as S;

    match (self.state, event) {
      (S::Inactive, E::Started) => {
        self.state = S::Active;
        A::StartSampling
      }
      (S::Active, E::WillExpire) => {
        self.state = S::Expiring;
        A::FlushPending
      }
      (S::Active | S::Expiring, E::Invalidated) => {
        self.state = S::Inactive;
        A::StopSampling
      }
      _ => A::Ignore,
    }
  }
}
