//! Human suspension node
//!
//! The one point where the machine stops advancing in-process and returns
//! control to the external caller. Suspension and resumption are two
//! explicit operations on persisted state rather than a coroutine yield:
//! [`HumanNode::suspend`] yields the latest message plus a [`ResumeContext`]
//! recording which agent transferred control here, and
//! [`HumanNode::resume`] turns external input back into a routing command
//! aimed at that same agent.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GraphError, Result};
use crate::graph::{AgentName, Command};
use crate::items::{Conversation, Message};

/// Opaque context captured at suspension time, recovered on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeContext {
    /// The agent that transferred control into the suspension point.
    pub agent: AgentName,
}

/// What a suspension yields to the caller.
#[derive(Debug, Clone)]
pub struct Suspension {
    /// The most recently appended message, shown to the human as the prompt.
    pub prompt: Message,
    pub resume: ResumeContext,
}

/// The human suspension node.
pub struct HumanNode;

impl HumanNode {
    /// Suspends the machine, yielding the latest message and the resume
    /// context.
    ///
    /// `triggers` is the set of edges that transferred control here in this
    /// step. Exactly one active predecessor is a structural invariant of
    /// the graph; anything else is a fatal consistency violation, as is an
    /// empty transcript (there would be nothing to prompt the human with).
    pub fn suspend(conversation: &Conversation, triggers: &[AgentName]) -> Result<Suspension> {
        if triggers.len() != 1 {
            return Err(GraphError::consistency(format!(
                "expected exactly 1 trigger at the human node, found {}",
                triggers.len()
            )));
        }
        let agent = triggers[0].clone();

        let prompt = conversation
            .last()
            .cloned()
            .ok_or_else(|| GraphError::consistency("suspended with an empty transcript"))?;

        info!(agent = %agent, "Suspending for human input");
        Ok(Suspension {
            prompt,
            resume: ResumeContext { agent },
        })
    }

    /// Resumes from external input: appends a human message and routes back
    /// to the agent recovered from the context.
    pub fn resume(input: impl Into<String>, context: &ResumeContext) -> Command {
        info!(agent = %context.agent, "Resuming with human input");
        Command::to_agent(vec![Message::human(input)], context.agent.clone())
    }
}
