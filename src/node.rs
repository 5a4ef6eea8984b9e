//! Agent nodes
//!
//! An [`AgentNode`] wraps one reasoning engine and turns its decision into a
//! routing [`Command`]. Per invocation there is at most one outgoing
//! transition: if the engine requests several handoffs in one turn, only the
//! first takes effect. A decision with no handoff routes to the human
//! suspension node, so every agent turn ends with control going to exactly
//! one peer or back to the human.

use std::sync::Arc;

use tracing::{info, warn};

use crate::engine::ReasoningEngine;
use crate::error::{GraphError, Result};
use crate::graph::{AgentName, Command};
use crate::handoff::{Handoff, HandoffAction};
use crate::items::Conversation;

/// One agent in the routing graph.
pub struct AgentNode {
    name: AgentName,
    engine: Arc<dyn ReasoningEngine>,
    handoffs: Vec<Handoff>,
}

impl AgentNode {
    pub fn new(
        name: impl Into<AgentName>,
        engine: Arc<dyn ReasoningEngine>,
        handoffs: Vec<Handoff>,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            handoffs,
        }
    }

    pub fn name(&self) -> &AgentName {
        &self.name
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    fn actions(&self) -> Vec<HandoffAction> {
        self.handoffs.iter().map(Handoff::action).collect()
    }

    /// Runs the reasoning engine once and maps its decision onto a command.
    ///
    /// Engine failure surfaces as a turn execution error, never as an empty
    /// command. An engine naming a handoff target this node never declared
    /// is a consistency violation.
    pub async fn execute(&self, conversation: &Conversation) -> Result<Command> {
        let actions = self.actions();
        let decision = self
            .engine
            .decide(&self.name, conversation, &actions)
            .await
            .map_err(|e| match e {
                err @ GraphError::TurnExecution { .. } => err,
                other => GraphError::TurnExecution {
                    agent: self.name.to_string(),
                    message: other.to_string(),
                },
            })?;

        let mut requested = decision.handoffs.into_iter();
        let target = requested.next();
        let dropped = requested.count();
        if dropped > 0 {
            warn!(
                agent = %self.name,
                dropped,
                "Engine requested multiple handoffs in one turn; keeping the first"
            );
        }

        match target {
            Some(target) => {
                let handoff = self
                    .handoffs
                    .iter()
                    .find(|h| h.target() == &target)
                    .ok_or_else(|| {
                        GraphError::consistency(format!(
                            "agent '{}' requested handoff to undeclared target '{}'",
                            self.name, target
                        ))
                    })?;
                info!(from = %self.name, to = %target, "Handoff");
                Ok(handoff.command(decision.messages))
            }
            None => Ok(Command::to_human(decision.messages)),
        }
    }
}

impl std::fmt::Debug for AgentNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentNode")
            .field("name", &self.name)
            .field(
                "handoffs",
                &self.handoffs.iter().map(|h| h.target()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedEngine;
    use crate::graph::NodeId;
    use crate::items::Message;
    use pretty_assertions::assert_eq;

    fn conversation() -> Conversation {
        let mut convo = Conversation::new();
        convo.push(Message::human("find me a flight"));
        convo
    }

    #[tokio::test]
    async fn test_no_handoff_routes_to_human() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().say("how can I help?")),
            vec![Handoff::to("flights_advisor")],
        );

        let command = node.execute(&conversation()).await.unwrap();
        assert_eq!(command.destination, NodeId::Human);
        assert_eq!(command.updates.len(), 1);
        assert_eq!(command.updates[0].content, "how can I help?");
    }

    #[tokio::test]
    async fn test_handoff_routes_to_target() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().transfer("over to flights", "flights_advisor")),
            vec![Handoff::to("flights_advisor")],
        );

        let command = node.execute(&conversation()).await.unwrap();
        assert_eq!(
            command.destination,
            NodeId::Agent("flights_advisor".into())
        );
    }

    #[tokio::test]
    async fn test_multiple_handoffs_first_wins() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().transfer_all(
                "delegating",
                &["flights_advisor", "hotel_advisor"],
            )),
            vec![Handoff::to("flights_advisor"), Handoff::to("hotel_advisor")],
        );

        let command = node.execute(&conversation()).await.unwrap();
        assert_eq!(
            command.destination,
            NodeId::Agent("flights_advisor".into())
        );
    }

    #[tokio::test]
    async fn test_undeclared_target_is_consistency_violation() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().transfer("sending you on", "billing_advisor")),
            vec![Handoff::to("flights_advisor")],
        );

        let err = node.execute(&conversation()).await.unwrap_err();
        assert!(matches!(err, GraphError::Consistency { .. }));
    }

    #[tokio::test]
    async fn test_engine_failure_is_turn_error() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().fail("model timed out")),
            vec![],
        );

        let err = node.execute(&conversation()).await.unwrap_err();
        match err {
            GraphError::TurnExecution { agent, message } => {
                assert_eq!(agent, "supervisor");
                assert!(message.contains("model timed out"));
            }
            other => panic!("expected TurnExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_decision_still_routes_to_human() {
        let node = AgentNode::new(
            "supervisor",
            Arc::new(ScriptedEngine::new().silent()),
            vec![],
        );

        let command = node.execute(&conversation()).await.unwrap();
        assert_eq!(command.destination, NodeId::Human);
        assert!(command.updates.is_empty());
    }
}
