//! Handoff-routed multi-agent conversations with human-in-the-loop
//! suspension and per-thread checkpointing.
//!
//! A fixed set of agents is wired into a static routing graph. Each agent
//! turn runs a [`ReasoningEngine`](engine::ReasoningEngine) and produces a
//! single [`Command`](graph::Command): hand the conversation to a declared
//! peer, or — when no handoff is requested — suspend to the human node for
//! input. Suspension is not an in-process wait: the thread's full state is
//! written to a [`CheckpointStore`](checkpoint::CheckpointStore), and a
//! later call resumes it from the checkpoint alone, routing the new input
//! back to the agent that asked for it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use travel_graph::checkpoint::InMemoryCheckpointStore;
//! use travel_graph::engine::ScriptedEngine;
//! use travel_graph::runner::{ThreadRunner, TurnOutput};
//! use travel_graph::travel;
//!
//! # async fn run() -> travel_graph::Result<()> {
//! let graph = travel::travel_graph(
//!     Arc::new(ScriptedEngine::new().transfer("flights can help", "flights_advisor")),
//!     Arc::new(ScriptedEngine::new().say("which dates?")),
//!     Arc::new(ScriptedEngine::new()),
//! )?;
//! let runner = ThreadRunner::new(graph, Arc::new(InMemoryCheckpointStore::new()));
//!
//! let output = runner
//!     .start_or_continue(&"thread-1".into(), Some("find me a flight"))
//!     .await?;
//! if let TurnOutput::Suspended { prompt, agent } = output {
//!     println!("{} asks: {}", agent, prompt.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod handoff;
pub mod human;
pub mod items;
pub mod node;
pub mod runner;
pub mod sqlite_store;
pub mod tool;
pub mod travel;

pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, ThreadId};
pub use engine::{Decision, OpenAiEngine, ReasoningEngine, ScriptedEngine};
pub use error::{GraphError, Result};
pub use graph::{AgentGraph, AgentName, Command, NodeId};
pub use handoff::{Handoff, HandoffAction};
pub use human::{HumanNode, ResumeContext, Suspension};
pub use items::{Conversation, Message, Role};
pub use node::AgentNode;
pub use runner::{ThreadRunner, TurnOutput};
pub use sqlite_store::SqliteCheckpointStore;
pub use tool::{FunctionTool, Tool};
