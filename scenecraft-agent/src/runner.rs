//! # Agent Control Loop
//!
//! The state machine that drives observe -> propose -> execute -> wait.
//! States: Idle, Running, Paused, Stopped(Completed | Aborted | Error).
//!
//! One logical thread of control, suspending cooperatively at three points:
//! the proposal call, the inter-step delay, and the pause wait. External
//! control (pause/resume/stop/intervene) arrives over a watch channel; the
//! loop awaits changes instead of polling, and a stop cancels an in-flight
//! proposal so a stale response is never recorded.

use crate::ledger::CreditStore;
use crate::provider::{ProposalProvider, ProposalRequest};
use crate::session::{SessionState, ThoughtStatus};
use scenecraft_error::Error;
use scenecraft_scene::{execute, observe, render, Command, ExecOutcome, SceneStore};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Hard ceiling on accepted commands per session
pub const MAX_COMMANDS: usize = 50;

/// How many trailing history entries each proposal request carries
pub const HISTORY_WINDOW: usize = 10;

/// Externally driven control state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Run,
    Pause,
    Stop,
}

/// Why a start never entered Running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The scene store was not initialized
    SceneNotReady,
    /// The session had zero credits; no proposal call was made
    NoCredits,
}

/// Why the loop ended
#[derive(Debug)]
pub enum StopReason {
    /// Preconditions unmet; the loop never ran
    Blocked(BlockReason),
    /// The model issued the completion sentinel
    Completed,
    /// External stop; never surfaced as an error
    Aborted,
    /// Credits ran out between steps
    CreditsExhausted,
    /// The accepted-command ceiling was hit
    SafetyLimitReached,
    /// A terminal error (malformed proposal, transport failure, ...)
    Failed(Error),
}

impl StopReason {
    /// Whether this outcome should set a session-level error message
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StopReason::Blocked(BlockReason::SceneNotReady)
                | StopReason::CreditsExhausted
                | StopReason::SafetyLimitReached
                | StopReason::Failed(_)
        )
    }
}

/// Outcome of a finished loop: the reason plus the store handed back for
/// inspection or export
pub struct LoopResult {
    pub reason: StopReason,
    pub store: SceneStore,
}

/// Loop policy knobs (the defaults are the product behavior)
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_commands: usize,
    pub history_window: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_commands: MAX_COMMANDS,
            history_window: HISTORY_WINDOW,
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// External control surface for a running loop. Cloneable; all clones drive
/// the same session.
#[derive(Clone)]
pub struct AgentHandle {
    control: Arc<watch::Sender<ControlState>>,
    session: Arc<Mutex<SessionState>>,
}

impl AgentHandle {
    /// Suspend the loop at its next pause point. No step begins while paused.
    pub fn pause(&self) {
        self.session.lock().unwrap().pause();
        self.control.send_if_modified(|state| {
            if *state == ControlState::Run {
                *state = ControlState::Pause;
                true
            } else {
                false
            }
        });
    }

    /// Resume a paused loop. A stopped loop stays stopped.
    pub fn resume(&self) {
        self.session.lock().unwrap().resume();
        self.control.send_if_modified(|state| {
            if *state == ControlState::Pause {
                *state = ControlState::Run;
                true
            } else {
                false
            }
        });
    }

    /// Stop the loop, cancelling any in-flight proposal. The response of a
    /// cancelled call is discarded, never recorded.
    pub fn stop(&self) {
        self.session.lock().unwrap().stop();
        self.control.send_replace(ControlState::Stop);
    }

    /// Append an instruction to the active goal without tearing the session
    /// down: pause, mutate, resume.
    pub fn intervene(&self, instruction: &str) {
        if !self.session.lock().unwrap().is_running {
            return;
        }
        self.pause();
        self.session.lock().unwrap().append_instruction(instruction);
        self.resume();
    }

    /// Clone of the current session state, for display or assertions
    pub fn snapshot(&self) -> SessionState {
        self.session.lock().unwrap().clone()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().unwrap().is_running
    }

    pub fn is_paused(&self) -> bool {
        self.session.lock().unwrap().is_paused
    }
}

// ============================================================================
// The loop
// ============================================================================

/// The agent loop: owns the store and the provider for the duration of a
/// session, shares the session state with its handle.
pub struct AgentLoop<P> {
    store: SceneStore,
    provider: P,
    session: Arc<Mutex<SessionState>>,
    ledger: Arc<dyn CreditStore>,
    control: watch::Receiver<ControlState>,
    config: LoopConfig,
}

impl<P: ProposalProvider> AgentLoop<P> {
    /// Build a loop and its control handle.
    pub fn new(
        store: SceneStore,
        provider: P,
        session: SessionState,
        ledger: Arc<dyn CreditStore>,
    ) -> (Self, AgentHandle) {
        Self::with_config(store, provider, session, ledger, LoopConfig::default())
    }

    pub fn with_config(
        store: SceneStore,
        provider: P,
        session: SessionState,
        ledger: Arc<dyn CreditStore>,
        config: LoopConfig,
    ) -> (Self, AgentHandle) {
        let session = Arc::new(Mutex::new(session));
        let (tx, rx) = watch::channel(ControlState::Run);

        let handle = AgentHandle {
            control: Arc::new(tx),
            session: Arc::clone(&session),
        };
        let agent_loop = Self {
            store,
            provider,
            session,
            ledger,
            control: rx,
            config,
        };
        (agent_loop, handle)
    }

    /// Run the session to a terminal state and hand the store back.
    pub async fn run(mut self) -> LoopResult {
        let reason = self.drive().await;

        {
            let mut session = self.session.lock().unwrap();
            match &reason {
                StopReason::Blocked(BlockReason::SceneNotReady) => {
                    session.set_error("Scene not initialized");
                }
                StopReason::Blocked(BlockReason::NoCredits) => {
                    // Distinguishable via the reason; the session itself
                    // carries no error (the UI opens the credit flow)
                    session.stop();
                }
                StopReason::Completed | StopReason::Aborted => session.stop(),
                StopReason::CreditsExhausted => session.set_error("No credits remaining"),
                StopReason::SafetyLimitReached => {
                    session.set_error(format!(
                        "Reached maximum command limit ({})",
                        self.config.max_commands
                    ));
                }
                StopReason::Failed(err) => session.set_error(err.to_string()),
            }
        }

        tracing::debug!(reason = ?reason, "agent loop finished");
        LoopResult {
            reason,
            store: self.store,
        }
    }

    async fn drive(&mut self) -> StopReason {
        // Start preconditions, checked before any proposal call
        if !self.store.is_initialized() {
            return StopReason::Blocked(BlockReason::SceneNotReady);
        }
        if !self.session.lock().unwrap().has_credits() {
            return StopReason::Blocked(BlockReason::NoCredits);
        }

        self.session.lock().unwrap().start();
        tracing::debug!("agent loop started");

        loop {
            if *self.control.borrow() == ControlState::Stop {
                return StopReason::Aborted;
            }

            // (a) credits, re-checked before any work each iteration
            if !self.session.lock().unwrap().has_credits() {
                return StopReason::CreditsExhausted;
            }

            // (b) observe
            let scene_text = render(&observe(&self.store));

            // (c) propose, cancellable by stop
            let request = {
                let session = self.session.lock().unwrap();
                let history = session.command_history.iter().rev().take(self.config.history_window);
                let mut history: Vec<_> = history.cloned().collect();
                history.reverse();
                ProposalRequest {
                    scene: scene_text,
                    goal: session.goal.clone(),
                    history,
                }
            };

            let proposal = tokio::select! {
                result = self.provider.propose(request) => match result {
                    Ok(proposal) => proposal,
                    Err(err) => return StopReason::Failed(err.into()),
                },
                _ = wait_for_stop(&mut self.control) => {
                    // (d) stopped while in flight: discard the response
                    return StopReason::Aborted;
                }
            };
            // (d) the stop may have landed just as the response did
            if *self.control.borrow() == ControlState::Stop {
                return StopReason::Aborted;
            }

            if let Err(err) = proposal.validate() {
                return StopReason::Failed(err.into());
            }
            tracing::debug!(action = %proposal.command.action, "proposal received");

            // (e) record the thought, mark it executing
            let thought_id = {
                let mut session = self.session.lock().unwrap();
                let id = session.add_thought(&proposal.thought, proposal.command.clone());
                session.update_thought_status(&id, ThoughtStatus::Executing);
                id
            };

            // (f) completion sentinel: terminate without executing anything
            if proposal.command.is_complete() {
                self.session
                    .lock()
                    .unwrap()
                    .update_thought_status(&thought_id, ThoughtStatus::Completed);
                return StopReason::Completed;
            }

            // (g) execute; success costs a credit, failure is step-level
            let outcome = match Command::from_envelope(&proposal.command) {
                Ok(command) => execute(&mut self.store, &command),
                Err(rejection) => ExecOutcome::Failed(rejection.into()),
            };

            match outcome {
                ExecOutcome::Created(_) | ExecOutcome::Applied => {
                    let credits = {
                        let mut session = self.session.lock().unwrap();
                        session.update_thought_status(&thought_id, ThoughtStatus::Completed);
                        session.add_command(proposal.command.clone());
                        session.use_credit();
                        session.credits
                    };
                    if let Err(err) = self.ledger.save(credits) {
                        tracing::warn!(error = %err, "failed to persist credit balance");
                    }
                }
                ExecOutcome::Failed(failure) => {
                    tracing::warn!(action = %proposal.command.action, failure = %failure, "command failed");
                    self.session
                        .lock()
                        .unwrap()
                        .update_thought_status(&thought_id, ThoughtStatus::Error);
                }
            }

            // (h) inter-step delay, cancellable
            let delay = self.session.lock().unwrap().step_delay;
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = wait_for_stop(&mut self.control) => return StopReason::Aborted,
                }
            }

            // (i) while paused, await control changes (no polling, no steps)
            loop {
                let state = *self.control.borrow_and_update();
                match state {
                    ControlState::Run => break,
                    ControlState::Stop => return StopReason::Aborted,
                    ControlState::Pause => {
                        if self.control.changed().await.is_err() {
                            return StopReason::Aborted;
                        }
                    }
                }
            }

            // (j) safety ceiling on accepted commands
            if self.session.lock().unwrap().command_history.len() >= self.config.max_commands {
                return StopReason::SafetyLimitReached;
            }
        }
    }
}

/// Resolve once the control state becomes Stop. If every handle is dropped
/// the loop can never be resumed, so that also counts as a stop.
async fn wait_for_stop(control: &mut watch::Receiver<ControlState>) {
    loop {
        if *control.borrow_and_update() == ControlState::Stop {
            return;
        }
        if control.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryCreditStore;
    use crate::provider::{Proposal, ProviderError, ScriptedProvider};
    use scenecraft_scene::CommandEnvelope;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::{mpsc, Semaphore};

    fn fast_session(credits: u32, goal: &str) -> SessionState {
        SessionState::new(credits)
            .with_goal(goal)
            .with_step_delay(Duration::ZERO)
    }

    fn create_box(thought: &str) -> (String, CommandEnvelope) {
        (thought.to_string(), CommandEnvelope::new("createBox"))
    }

    fn complete() -> (String, CommandEnvelope) {
        (
            "done".to_string(),
            CommandEnvelope::new("complete")
                .with_params(json!({"summary": "finished"})),
        )
    }

    fn scripted(steps: Vec<(String, CommandEnvelope)>) -> ScriptedProvider {
        let provider = ScriptedProvider::new();
        for (thought, command) in steps {
            provider.push(&thought, command);
        }
        provider
    }

    #[tokio::test]
    async fn test_blocked_start_without_credits_makes_no_proposal_call() {
        let (provider, mut seen, _gate) = GatedProvider::new(vec![create_box("never asked")]);
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(0, "a box"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        assert!(matches!(
            result.reason,
            StopReason::Blocked(BlockReason::NoCredits)
        ));
        assert!(seen.try_recv().is_err()); // the endpoint was never contacted
        assert!(handle.snapshot().thoughts.is_empty());
    }

    #[tokio::test]
    async fn test_blocked_start_with_uninitialized_scene() {
        let (agent, handle) = AgentLoop::new(
            SceneStore::new(),
            scripted(vec![]),
            fast_session(10, "a box"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        assert!(matches!(
            result.reason,
            StopReason::Blocked(BlockReason::SceneNotReady)
        ));
        assert_eq!(
            handle.snapshot().error.as_deref(),
            Some("Scene not initialized")
        );
    }

    #[tokio::test]
    async fn test_complete_sentinel_stops_without_mutation() {
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            scripted(vec![complete()]),
            fast_session(10, "nothing to build"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::Completed));
        assert_eq!(result.store.len(), 3); // scaffolding only

        let session = handle.snapshot();
        assert_eq!(session.thoughts.len(), 1);
        assert_eq!(session.thoughts[0].status, ThoughtStatus::Completed);
        assert!(session.command_history.is_empty());
        assert_eq!(session.credits, 10); // completion costs nothing
        assert!(session.error.is_none());
    }

    #[tokio::test]
    async fn test_successful_command_consumes_credit_and_persists() {
        let ledger = Arc::new(MemoryCreditStore::new());
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            scripted(vec![create_box("a box to start"), complete()]),
            fast_session(10, "a single box"),
            Arc::clone(&ledger) as Arc<dyn CreditStore>,
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::Completed));

        let session = handle.snapshot();
        assert_eq!(session.command_history.len(), 1);
        assert_eq!(session.command_history[0].action, "createBox");
        assert_eq!(session.credits, 9);
        assert_eq!(ledger.saved(), vec![9]); // persisted once, on success
        assert_eq!(session.thoughts.len(), 2);
        assert!(session
            .thoughts
            .iter()
            .all(|t| t.status == ThoughtStatus::Completed));

        // the box landed in the store
        assert_eq!(result.store.len(), 4); // 3 scaffolding + the box
    }

    #[tokio::test]
    async fn test_failed_step_costs_nothing_and_loop_continues() {
        let ledger = Arc::new(MemoryCreditStore::new());
        let provider = scripted(vec![
            (
                "move something that isn't there".to_string(),
                CommandEnvelope::new("moveObject").with_params(
                    json!({"objectId": "obj_404_0", "position": {"x": 0, "y": 0, "z": 0}}),
                ),
            ),
            complete(),
        ]);
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "move the box"),
            Arc::clone(&ledger) as Arc<dyn CreditStore>,
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::Completed));

        let session = handle.snapshot();
        assert!(session.command_history.is_empty());
        assert_eq!(session.credits, 10);
        assert!(ledger.saved().is_empty());
        assert_eq!(session.thoughts[0].status, ThoughtStatus::Error);
        assert_eq!(session.thoughts[1].status, ThoughtStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_action_is_step_level() {
        let provider = scripted(vec![
            (
                "try something unsupported".to_string(),
                CommandEnvelope::new("explodeObject").with_params(json!({"objectId": "x"})),
            ),
            complete(),
        ]);
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "whatever"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::Completed));
        assert_eq!(handle.snapshot().thoughts[0].status, ThoughtStatus::Error);
    }

    #[tokio::test]
    async fn test_malformed_proposal_is_terminal() {
        let provider = ScriptedProvider::new();
        provider.push_err(ProviderError::Malformed("not json".to_string()));

        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "goal"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        match result.reason {
            StopReason::Failed(err) => {
                assert_eq!(err.kind(), scenecraft_error::ErrorKind::MalformedProposal);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
        let session = handle.snapshot();
        assert!(!session.is_running);
        assert!(session.error.is_some());
        assert!(session.thoughts.is_empty()); // nothing recorded for a bad call
    }

    #[tokio::test]
    async fn test_credits_exhausted_between_steps() {
        let provider = scripted(vec![create_box("one"), create_box("two")]);
        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(1, "two boxes"),
            Arc::new(MemoryCreditStore::new()),
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::CreditsExhausted));

        let session = handle.snapshot();
        assert_eq!(session.command_history.len(), 1);
        assert_eq!(session.credits, 0);
        assert_eq!(session.error.as_deref(), Some("No credits remaining"));
    }

    #[tokio::test]
    async fn test_safety_ceiling_counts_accepted_commands_only() {
        let provider = scripted(vec![
            create_box("one"),
            create_box("two"),
            create_box("never reached"),
        ]);
        let config = LoopConfig {
            max_commands: 2,
            ..LoopConfig::default()
        };
        let (agent, handle) = AgentLoop::with_config(
            SceneStore::initialized(),
            provider,
            fast_session(10, "boxes forever"),
            Arc::new(MemoryCreditStore::new()),
            config,
        );

        let result = agent.run().await;
        assert!(matches!(result.reason, StopReason::SafetyLimitReached));

        let session = handle.snapshot();
        assert_eq!(session.command_history.len(), 2);
        assert_eq!(
            session.error.as_deref(),
            Some("Reached maximum command limit (2)")
        );
    }

    #[test]
    fn test_default_ceiling_is_fifty() {
        assert_eq!(LoopConfig::default().max_commands, 50);
        assert_eq!(LoopConfig::default().history_window, 10);
    }

    #[tokio::test]
    async fn test_history_window_bounds_request() {
        let mut steps: Vec<_> = (0..12).map(|i| create_box(&format!("box {}", i))).collect();
        steps.push(complete());
        let (provider, mut seen, gate) = GatedProvider::new(steps);

        let (agent, _handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(20, "many boxes"),
            Arc::new(MemoryCreditStore::new()),
        );
        let task = tokio::spawn(agent.run());

        // 12 creations then the completion: request N carries min(N, 10)
        // trailing history entries
        for i in 0..13usize {
            let request = seen.recv().await.unwrap();
            assert_eq!(request.history.len(), i.min(10));
            gate.add_permits(1);
        }

        let result = task.await.unwrap();
        assert!(matches!(result.reason, StopReason::Completed));
        assert_eq!(result.store.len(), 3 + 12);
    }

    // ------------------------------------------------------------------
    // Gated provider: lets a test hold a request in flight until released
    // ------------------------------------------------------------------

    struct GatedProvider {
        responses: Mutex<VecDeque<Proposal>>,
        seen: mpsc::UnboundedSender<ProposalRequest>,
        gate: Arc<Semaphore>,
    }

    impl GatedProvider {
        fn new(
            steps: Vec<(String, CommandEnvelope)>,
        ) -> (Self, mpsc::UnboundedReceiver<ProposalRequest>, Arc<Semaphore>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let gate = Arc::new(Semaphore::new(0));
            let responses = steps
                .into_iter()
                .map(|(thought, command)| Proposal { thought, command })
                .collect();
            (
                Self {
                    responses: Mutex::new(responses),
                    seen: tx,
                    gate: Arc::clone(&gate),
                },
                rx,
                gate,
            )
        }
    }

    impl ProposalProvider for GatedProvider {
        fn name(&self) -> &str {
            "gated"
        }

        async fn propose(&self, request: ProposalRequest) -> Result<Proposal, ProviderError> {
            self.seen.send(request).ok();
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| ProviderError::Network("gate closed".to_string()))?;
            permit.forget();
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Malformed("script exhausted".to_string()))
        }
    }

    #[tokio::test]
    async fn test_intervention_appends_instruction_exactly_once() {
        let (provider, mut seen, gate) = GatedProvider::new(vec![
            create_box("first"),
            ("all done".to_string(), CommandEnvelope::new("complete").with_params(json!({}))),
        ]);

        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "build a castle"),
            Arc::new(MemoryCreditStore::new()),
        );
        let task = tokio::spawn(agent.run());

        // First request is now in flight, blocked on the gate
        let first = seen.recv().await.unwrap();
        assert_eq!(first.goal, "build a castle");

        // Pause, intervene, resume while the request is held
        handle.pause();
        handle.intervene("add a moat");
        handle.resume();

        // Release the first response; the loop executes and asks again
        gate.add_permits(1);
        let second = seen.recv().await.unwrap();
        assert_eq!(
            second.goal,
            "build a castle\n\nAdditional instruction: add a moat"
        );
        assert_eq!(second.goal.matches("Additional instruction").count(), 1);
        assert_eq!(second.history.len(), 1);

        gate.add_permits(1);
        let result = task.await.unwrap();
        assert!(matches!(result.reason, StopReason::Completed));
    }

    #[tokio::test]
    async fn test_stop_mid_request_discards_response() {
        let (provider, mut seen, _gate) = GatedProvider::new(vec![create_box("never recorded")]);

        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "a box"),
            Arc::new(MemoryCreditStore::new()),
        );
        let task = tokio::spawn(agent.run());

        // Wait until the request is in flight, then stop without releasing it
        seen.recv().await.unwrap();
        handle.stop();

        let result = task.await.unwrap();
        assert!(matches!(result.reason, StopReason::Aborted));

        let session = handle.snapshot();
        assert!(session.thoughts.is_empty()); // no orphan entry
        assert!(session.command_history.is_empty());
        assert!(session.error.is_none()); // aborts are not errors
        assert!(!session.is_running);
        assert_eq!(result.store.len(), 3);
    }

    #[tokio::test]
    async fn test_pause_defers_next_step_until_resume() {
        let (provider, mut seen, gate) =
            GatedProvider::new(vec![create_box("first"), complete()]);

        let (agent, handle) = AgentLoop::new(
            SceneStore::initialized(),
            provider,
            fast_session(10, "slow build"),
            Arc::new(MemoryCreditStore::new()),
        );
        let task = tokio::spawn(agent.run());

        seen.recv().await.unwrap();
        handle.pause();
        gate.add_permits(1); // first command executes, then the loop parks

        // While paused, no second request may arrive
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.try_recv().is_err());
        assert!(handle.is_paused());

        handle.resume();
        let second = seen.recv().await.unwrap();
        assert_eq!(second.history.len(), 1);

        gate.add_permits(1);
        let result = task.await.unwrap();
        assert!(matches!(result.reason, StopReason::Completed));
    }
}
