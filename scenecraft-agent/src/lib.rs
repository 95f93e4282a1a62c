//! # Scenecraft Agent
//!
//! The agent drives the observe -> propose -> execute loop:
//! 1. User provides a build goal
//! 2. The scene store is serialized into a bounded observation
//! 3. The proposal endpoint returns one thought + one command
//! 4. The command is validated and executed against the store
//! 5. Credits, history, and the thought log are updated
//! 6. Repeat until `complete`, abort, credit exhaustion, or the safety ceiling
//!
//! The model proposes, the executor disposes.

pub mod claude;
pub mod ledger;
pub mod prompts;
pub mod provider;
pub mod runner;
pub mod session;

pub use claude::{ClaudeProvider, ProviderConfig};
pub use ledger::{CreditStore, FileCreditStore, MemoryCreditStore, DEFAULT_CREDITS};
pub use provider::{Proposal, ProposalProvider, ProposalRequest, ProviderError, ScriptedProvider};
pub use runner::{
    AgentHandle, AgentLoop, BlockReason, ControlState, LoopConfig, LoopResult, StopReason,
};
pub use session::{SessionState, ThoughtEntry, ThoughtStatus};
