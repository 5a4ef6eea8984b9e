//! Handoff capabilities
//!
//! A handoff is an explicit transfer of control from one agent to a named
//! peer, carrying the conversation forward unmodified. Targets are bound at
//! graph-assembly time and validated against the declared node set; an
//! unknown target is a construction-time error, never a call-time one.

use serde::{Deserialize, Serialize};

use crate::graph::{AgentName, Command};
use crate::items::Message;

/// A unit of work an agent can invoke to transfer control to a peer.
///
/// Invoking a handoff performs no I/O; it only yields a [`Command`] whose
/// destination is the target and whose updates are the acting agent's own
/// messages, unchanged.
#[derive(Debug, Clone)]
pub struct Handoff {
    target: AgentName,
    description: String,
}

impl Handoff {
    /// Creates a handoff to `target` with a default description.
    pub fn to(target: impl Into<AgentName>) -> Self {
        let target = target.into();
        let description = format!("Transfer the conversation to {}.", target);
        Self {
            target,
            description,
        }
    }

    /// Creates a handoff with a custom description, shown to the reasoning
    /// engine when it decides whether to delegate.
    pub fn with_description(target: impl Into<AgentName>, description: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            description: description.into(),
        }
    }

    pub fn target(&self) -> &AgentName {
        &self.target
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name under which this capability is advertised to the reasoning
    /// engine, e.g. `transfer_to_flights_advisor`.
    pub fn action_name(&self) -> String {
        format!("transfer_to_{}", self.target)
    }

    /// Descriptor handed to the reasoning engine as an available action.
    pub fn action(&self) -> HandoffAction {
        HandoffAction {
            name: self.action_name(),
            target: self.target.clone(),
            description: self.description.clone(),
        }
    }

    /// Produces the routing command for this handoff: a pure control
    /// transfer carrying `updates` forward untouched.
    pub fn command(&self, updates: Vec<Message>) -> Command {
        Command::to_agent(updates, self.target.clone())
    }
}

/// What a reasoning engine sees of a handoff capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffAction {
    pub name: String,
    pub target: AgentName,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handoff_creation() {
        let handoff = Handoff::to("flights_advisor");
        assert_eq!(handoff.target().as_str(), "flights_advisor");
        assert_eq!(handoff.action_name(), "transfer_to_flights_advisor");

        let custom = Handoff::with_description("hotel_advisor", "Finds hotels.");
        assert_eq!(custom.description(), "Finds hotels.");
    }

    #[test]
    fn test_handoff_is_pure_control_transfer() {
        let handoff = Handoff::to("hotel_advisor");
        let updates = vec![
            Message::agent("let me check hotels", "supervisor"),
            Message::agent("transferring you now", "supervisor"),
        ];
        let contents: Vec<String> = updates.iter().map(|m| m.content.clone()).collect();

        let command = handoff.command(updates);
        assert_eq!(command.destination, NodeId::Agent("hotel_advisor".into()));
        assert_eq!(command.updates.len(), 2);
        for (msg, original) in command.updates.iter().zip(contents) {
            assert_eq!(msg.content, original);
        }
    }

    #[test]
    fn test_action_descriptor() {
        let action = Handoff::to("supervisor").action();
        assert_eq!(action.name, "transfer_to_supervisor");
        assert_eq!(action.target.as_str(), "supervisor");
    }
}
