//! # Session State
//!
//! The state the control loop reads and mutates: running/paused flags, the
//! goal text, the thought log, accepted command history, and the credit
//! balance. One session object is constructed per run and shared with the
//! loop by reference - there is no global store.

use scenecraft_scene::CommandEnvelope;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Inter-step delay between accepted commands
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(1500);

/// Lifecycle of one thought entry. Transitions are forward-only:
/// Pending -> Executing -> Completed | Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtStatus {
    Pending,
    Executing,
    Completed,
    Error,
}

impl ThoughtStatus {
    fn rank(self) -> u8 {
        match self {
            ThoughtStatus::Pending => 0,
            ThoughtStatus::Executing => 1,
            ThoughtStatus::Completed => 2,
            ThoughtStatus::Error => 2,
        }
    }
}

/// One loop iteration's record: what the model thought, what it proposed,
/// and how execution went. Appended once, mutated only in status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ThoughtEntry {
    pub id: String,
    pub thought: String,
    pub command: CommandEnvelope,
    /// Unix milliseconds
    pub timestamp: u64,
    pub status: ThoughtStatus,
}

/// Mutable session state for one agent run
#[derive(Debug, Clone)]
pub struct SessionState {
    pub is_running: bool,
    /// Pause persists independently of running; the loop only honors it
    /// while running
    pub is_paused: bool,
    pub goal: String,
    pub thoughts: Vec<ThoughtEntry>,
    /// Accepted commands only - failed steps never land here
    pub command_history: Vec<CommandEnvelope>,
    pub step_delay: Duration,
    pub error: Option<String>,
    pub credits: u32,
    pub max_credits: u32,
    next_thought_seq: u64,
}

impl SessionState {
    pub fn new(credits: u32) -> Self {
        Self {
            is_running: false,
            is_paused: false,
            goal: String::new(),
            thoughts: Vec::new(),
            command_history: Vec::new(),
            step_delay: DEFAULT_STEP_DELAY,
            error: None,
            credits,
            max_credits: credits,
            next_thought_seq: 0,
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn start(&mut self) {
        self.is_running = true;
        self.is_paused = false;
        self.error = None;
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        self.is_paused = false;
    }

    pub fn stop(&mut self) {
        self.is_running = false;
        self.is_paused = false;
    }

    /// Record a terminal error and stop the session
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.is_running = false;
    }

    /// Clear run state for a fresh session. Credits are reloaded by the
    /// caller from the ledger; thought and command history are discarded.
    pub fn reset(&mut self, credits: u32) {
        self.is_running = false;
        self.is_paused = false;
        self.goal.clear();
        self.thoughts.clear();
        self.command_history.clear();
        self.error = None;
        self.credits = credits;
        self.max_credits = credits;
        self.next_thought_seq = 0;
    }

    // =========================================================================
    // Goal
    // =========================================================================

    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
    }

    /// Intervention: append a user instruction to the active goal. The
    /// caller pauses the loop first so this never races a request.
    pub fn append_instruction(&mut self, instruction: &str) {
        self.goal = format!("{}\n\nAdditional instruction: {}", self.goal, instruction);
    }

    // =========================================================================
    // Thought log
    // =========================================================================

    /// Append a pending thought entry, returning its id
    pub fn add_thought(&mut self, thought: &str, command: CommandEnvelope) -> String {
        self.next_thought_seq += 1;
        let id = format!("thought_{}", self.next_thought_seq);
        self.thoughts.push(ThoughtEntry {
            id: id.clone(),
            thought: thought.to_string(),
            command,
            timestamp: unix_millis(),
            status: ThoughtStatus::Pending,
        });
        id
    }

    /// Advance a thought entry's status. Backward transitions are ignored.
    pub fn update_thought_status(&mut self, id: &str, status: ThoughtStatus) {
        if let Some(entry) = self.thoughts.iter_mut().find(|t| t.id == id) {
            if status.rank() > entry.status.rank() {
                entry.status = status;
            }
        }
    }

    pub fn latest_thought(&self) -> Option<&ThoughtEntry> {
        self.thoughts.last()
    }

    pub fn completed_commands(&self) -> usize {
        self.thoughts
            .iter()
            .filter(|t| t.status == ThoughtStatus::Completed)
            .count()
    }

    // =========================================================================
    // Command history and credits
    // =========================================================================

    pub fn add_command(&mut self, command: CommandEnvelope) {
        self.command_history.push(command);
    }

    pub fn has_credits(&self) -> bool {
        self.credits > 0
    }

    /// Consume one credit; returns false if none remain
    pub fn use_credit(&mut self) -> bool {
        if self.credits > 0 {
            self.credits -= 1;
            true
        } else {
            false
        }
    }

    pub fn credit_percentage(&self) -> u32 {
        if self.max_credits == 0 {
            return 0;
        }
        (self.credits * 100 + self.max_credits / 2) / self.max_credits
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(action: &str) -> CommandEnvelope {
        CommandEnvelope::new(action)
    }

    #[test]
    fn test_lifecycle_flags() {
        let mut session = SessionState::new(10);
        assert!(!session.is_running);

        session.start();
        assert!(session.is_running);
        assert!(!session.is_paused);

        session.pause();
        assert!(session.is_paused);
        assert!(session.is_running);

        session.stop();
        assert!(!session.is_running);
        assert!(!session.is_paused);
    }

    #[test]
    fn test_error_stops_session() {
        let mut session = SessionState::new(10);
        session.start();
        session.set_error("proposal endpoint unreachable");

        assert!(!session.is_running);
        assert_eq!(session.error.as_deref(), Some("proposal endpoint unreachable"));

        // start clears the error
        session.start();
        assert!(session.error.is_none());
    }

    #[test]
    fn test_thought_ids_are_sequential() {
        let mut session = SessionState::new(10);
        let a = session.add_thought("first", envelope("createBox"));
        let b = session.add_thought("second", envelope("createSphere"));
        assert_eq!(a, "thought_1");
        assert_eq!(b, "thought_2");
        assert_eq!(session.thoughts.len(), 2);
        assert_eq!(session.latest_thought().unwrap().id, b);
    }

    #[test]
    fn test_thought_status_is_forward_only() {
        let mut session = SessionState::new(10);
        let id = session.add_thought("place a box", envelope("createBox"));

        session.update_thought_status(&id, ThoughtStatus::Executing);
        session.update_thought_status(&id, ThoughtStatus::Completed);
        assert_eq!(session.thoughts[0].status, ThoughtStatus::Completed);

        // attempts to move backwards are ignored
        session.update_thought_status(&id, ThoughtStatus::Executing);
        assert_eq!(session.thoughts[0].status, ThoughtStatus::Completed);
        session.update_thought_status(&id, ThoughtStatus::Pending);
        assert_eq!(session.thoughts[0].status, ThoughtStatus::Completed);
    }

    #[test]
    fn test_completed_commands_counts_only_completed() {
        let mut session = SessionState::new(10);
        let a = session.add_thought("one", envelope("createBox"));
        let b = session.add_thought("two", envelope("moveObject"));
        session.update_thought_status(&a, ThoughtStatus::Completed);
        session.update_thought_status(&b, ThoughtStatus::Error);

        assert_eq!(session.completed_commands(), 1);
    }

    #[test]
    fn test_use_credit() {
        let mut session = SessionState::new(2);
        assert!(session.use_credit());
        assert!(session.use_credit());
        assert!(!session.use_credit());
        assert_eq!(session.credits, 0);
        assert!(!session.has_credits());
    }

    #[test]
    fn test_credit_percentage() {
        let mut session = SessionState::new(10);
        assert_eq!(session.credit_percentage(), 100);
        session.use_credit();
        assert_eq!(session.credit_percentage(), 90);

        let empty = SessionState::new(0);
        assert_eq!(empty.credit_percentage(), 0);
    }

    #[test]
    fn test_append_instruction() {
        let mut session = SessionState::new(10).with_goal("build a castle");
        session.append_instruction("add a moat");
        assert_eq!(
            session.goal,
            "build a castle\n\nAdditional instruction: add a moat"
        );
    }

    #[test]
    fn test_reset_clears_run_state() {
        let mut session = SessionState::new(10).with_goal("build a castle");
        session.start();
        session.add_thought("x", envelope("createBox"));
        session.add_command(envelope("createBox"));
        session.use_credit();
        session.set_error("boom");

        session.reset(10);

        assert!(!session.is_running);
        assert!(session.goal.is_empty());
        assert!(session.thoughts.is_empty());
        assert!(session.command_history.is_empty());
        assert!(session.error.is_none());
        assert_eq!(session.credits, 10);

        // thought ids restart after reset
        let id = session.add_thought("fresh", envelope("createBox"));
        assert_eq!(id, "thought_1");
    }
}
