//! Static routing graph: node identities, commands, and topology
//!
//! The set of agents and their handoff wiring is fixed when the graph is
//! built. [`GraphBuilder::build`] validates the topology once; after that,
//! every destination a node can name is known to exist, so routing never has
//! to guess at request time.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::items::Message;
use crate::node::AgentNode;

/// Stable name of an agent, used both as a graph node id and as a handoff
/// target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifier of a node in the routing graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "node", content = "agent")]
pub enum NodeId {
    /// One of the statically declared agents.
    Agent(AgentName),
    /// The human suspension node.
    Human,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Agent(name) => write!(f, "{}", name),
            NodeId::Human => f.write_str("human"),
        }
    }
}

/// A navigation decision produced by one node execution: append `updates`
/// to the transcript, then transition to `destination`.
#[derive(Debug, Clone)]
pub struct Command {
    pub updates: Vec<Message>,
    pub destination: NodeId,
}

impl Command {
    pub fn to_agent(updates: Vec<Message>, target: AgentName) -> Self {
        Self {
            updates,
            destination: NodeId::Agent(target),
        }
    }

    pub fn to_human(updates: Vec<Message>) -> Self {
        Self {
            updates,
            destination: NodeId::Human,
        }
    }
}

/// The compiled, validated routing graph.
pub struct AgentGraph {
    entry: AgentName,
    nodes: HashMap<AgentName, AgentNode>,
}

impl AgentGraph {
    /// Starts building a graph with the given entry agent (the node a fresh
    /// thread begins at).
    pub fn builder(entry: impl Into<AgentName>) -> GraphBuilder {
        GraphBuilder {
            entry: entry.into(),
            nodes: Vec::new(),
        }
    }

    pub fn entry(&self) -> &AgentName {
        &self.entry
    }

    pub fn node(&self, name: &AgentName) -> Option<&AgentNode> {
        self.nodes.get(name)
    }

    pub fn agent_names(&self) -> impl Iterator<Item = &AgentName> {
        self.nodes.keys()
    }
}

impl fmt::Debug for AgentGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentGraph")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder that assembles and validates the static topology.
pub struct GraphBuilder {
    entry: AgentName,
    nodes: Vec<AgentNode>,
}

impl GraphBuilder {
    pub fn node(mut self, node: AgentNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Validates the declared topology and compiles the graph.
    ///
    /// Fails fast on a duplicate node name, a missing entry node, or a
    /// handoff capability whose target is not a declared node.
    pub fn build(self) -> Result<AgentGraph> {
        let mut nodes = HashMap::new();
        for node in self.nodes {
            let name = node.name().clone();
            if nodes.insert(name.clone(), node).is_some() {
                return Err(GraphError::configuration(format!(
                    "duplicate node name '{}'",
                    name
                )));
            }
        }

        if !nodes.contains_key(&self.entry) {
            return Err(GraphError::configuration(format!(
                "entry node '{}' is not declared",
                self.entry
            )));
        }

        // Every handoff target must name a declared node.
        for node in nodes.values() {
            for handoff in node.handoffs() {
                if !nodes.contains_key(handoff.target()) {
                    return Err(GraphError::configuration(format!(
                        "agent '{}' declares handoff to unknown agent '{}'",
                        node.name(),
                        handoff.target()
                    )));
                }
            }
        }

        Ok(AgentGraph {
            entry: self.entry,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptedEngine;
    use crate::handoff::Handoff;
    use std::sync::Arc;

    fn node(name: &str, handoffs: Vec<Handoff>) -> AgentNode {
        AgentNode::new(name, Arc::new(ScriptedEngine::new()), handoffs)
    }

    #[test]
    fn test_valid_graph_builds() {
        let graph = AgentGraph::builder("supervisor")
            .node(node(
                "supervisor",
                vec![Handoff::to("flights_advisor"), Handoff::to("hotel_advisor")],
            ))
            .node(node("flights_advisor", vec![Handoff::to("supervisor")]))
            .node(node("hotel_advisor", vec![Handoff::to("supervisor")]))
            .build()
            .unwrap();

        assert_eq!(graph.entry().as_str(), "supervisor");
        assert_eq!(graph.agent_names().count(), 3);
        assert!(graph.node(&"hotel_advisor".into()).is_some());
    }

    #[test]
    fn test_dangling_handoff_target_rejected() {
        let err = AgentGraph::builder("supervisor")
            .node(node("supervisor", vec![Handoff::to("billing_advisor")]))
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphError::Configuration { .. }));
        assert!(err.to_string().contains("billing_advisor"));
    }

    #[test]
    fn test_missing_entry_rejected() {
        let err = AgentGraph::builder("supervisor")
            .node(node("flights_advisor", vec![]))
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphError::Configuration { .. }));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = AgentGraph::builder("supervisor")
            .node(node("supervisor", vec![]))
            .node(node("supervisor", vec![]))
            .build()
            .unwrap_err();

        assert!(matches!(err, GraphError::Configuration { .. }));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_node_id_serialization() {
        let id = NodeId::Agent("flights_advisor".into());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"node":"agent","agent":"flights_advisor"}"#);

        let human: NodeId = serde_json::from_str(r#"{"node":"human"}"#).unwrap();
        assert_eq!(human, NodeId::Human);
    }
}
