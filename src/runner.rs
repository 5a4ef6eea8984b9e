//! Thread execution engine
//!
//! [`ThreadRunner`] drives the routing graph for one conversation thread at
//! a time: it loads (or initializes) the thread's checkpoint, feeds external
//! input in — either as a resume of a pending suspension or as a fresh
//! human message — and then auto-advances agent nodes until control reaches
//! the human suspension node again. A checkpoint is written after every
//! applied command, so a failing node aborts the turn with all earlier
//! progress durable and nothing from the failing step persisted.
//!
//! Steps for one thread are strictly serialized behind a per-thread lock;
//! distinct threads share nothing and may run in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, CheckpointStore, ThreadId};
use crate::error::{GraphError, Result};
use crate::graph::{AgentGraph, AgentName, NodeId};
use crate::human::HumanNode;
use crate::items::{Conversation, Message};

/// What one call to [`ThreadRunner::start_or_continue`] yields.
#[derive(Debug, Clone)]
pub enum TurnOutput {
    /// The machine suspended awaiting human input. `prompt` is the latest
    /// message; `agent` is where resumption will continue.
    Suspended { prompt: Message, agent: AgentName },
    /// A node terminated the thread without routing to the human. Not
    /// produced by the fixed travel topology, but representable.
    Final { message: Option<Message> },
}

/// Drives the node graph for conversation threads against a checkpoint
/// store.
pub struct ThreadRunner {
    graph: Arc<AgentGraph>,
    store: Arc<dyn CheckpointStore>,
    max_hops: usize,
    locks: Mutex<HashMap<ThreadId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ThreadRunner {
    pub fn new(graph: AgentGraph, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            graph: Arc::new(graph),
            store,
            max_hops: 25,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Cap on node executions within a single turn, a safeguard against
    /// agents handing off in a cycle without ever reaching the human.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }

    fn thread_lock(&self, thread_id: &ThreadId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(thread_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// The single public entry point: starts a fresh thread, continues a
    /// suspended one, or — with no input — replays the pending suspension.
    ///
    /// Called with `None` on a suspended thread this re-yields the same
    /// prompt without touching any state, so replay is idempotent.
    pub async fn start_or_continue(
        &self,
        thread_id: &ThreadId,
        input: Option<&str>,
    ) -> Result<TurnOutput> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let checkpoint = self.store.get(thread_id).await?;

        let (mut conversation, mut current) = match checkpoint {
            Some(cp) if cp.pending == NodeId::Human => {
                let resume = cp.resume.clone().ok_or_else(|| {
                    GraphError::consistency("suspended checkpoint has no resume context")
                })?;

                let Some(input) = input else {
                    // Idempotent replay of the pending suspension.
                    let prompt = cp.conversation.last().cloned().ok_or_else(|| {
                        GraphError::consistency("suspended with an empty transcript")
                    })?;
                    return Ok(TurnOutput::Suspended {
                        prompt,
                        agent: resume.agent,
                    });
                };

                info!(thread = %thread_id, agent = %resume.agent, "Resuming thread");
                let command = HumanNode::resume(input, &resume);
                let mut conversation = cp.conversation;
                conversation.extend(command.updates);
                let NodeId::Agent(next) = command.destination else {
                    return Err(GraphError::consistency(
                        "resume command must target an agent",
                    ));
                };
                (conversation, next)
            }
            Some(cp) => {
                // Pending at an agent with no suspension: a previous turn
                // aborted mid-flight. New input restarts from the entry node
                // over the preserved transcript.
                let input = input.ok_or_else(|| GraphError::User {
                    message: "thread is not suspended; input is required".to_string(),
                })?;
                let mut conversation = cp.conversation;
                conversation.push(Message::human(input));
                (conversation, self.graph.entry().clone())
            }
            None => {
                let input = input.ok_or_else(|| GraphError::User {
                    message: "new thread requires input".to_string(),
                })?;
                info!(thread = %thread_id, entry = %self.graph.entry(), "Starting thread");
                let mut conversation = Conversation::new();
                conversation.push(Message::human(input));
                (conversation, self.graph.entry().clone())
            }
        };

        // Persist the applied input before executing any node.
        self.persist(thread_id, &conversation, NodeId::Agent(current.clone()), None)
            .await?;

        let mut hops = 0;
        loop {
            hops += 1;
            if hops > self.max_hops {
                return Err(GraphError::HopBudgetExceeded {
                    max_hops: self.max_hops,
                });
            }

            let node = self.graph.node(&current).ok_or_else(|| {
                GraphError::consistency(format!("command targeted unknown node '{}'", current))
            })?;

            debug!(thread = %thread_id, agent = %current, hop = hops, "Executing node");
            let command = node.execute(&conversation).await?;
            conversation.extend(command.updates);

            match command.destination {
                NodeId::Human => {
                    let suspension = HumanNode::suspend(&conversation, &[current.clone()])?;
                    self.persist(
                        thread_id,
                        &conversation,
                        NodeId::Human,
                        Some(suspension.resume.clone()),
                    )
                    .await?;
                    return Ok(TurnOutput::Suspended {
                        prompt: suspension.prompt,
                        agent: suspension.resume.agent,
                    });
                }
                NodeId::Agent(next) => {
                    self.persist(thread_id, &conversation, NodeId::Agent(next.clone()), None)
                        .await?;
                    current = next;
                }
            }
        }
    }

    async fn persist(
        &self,
        thread_id: &ThreadId,
        conversation: &Conversation,
        pending: NodeId,
        resume: Option<crate::human::ResumeContext>,
    ) -> Result<()> {
        debug!(thread = %thread_id, pending = %pending, "Writing checkpoint");
        self.store
            .put(Checkpoint {
                thread_id: thread_id.clone(),
                conversation: conversation.clone(),
                pending,
                resume,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use crate::engine::ScriptedEngine;
    use crate::handoff::Handoff;
    use crate::node::AgentNode;
    use pretty_assertions::assert_eq;

    fn travel_topology(
        supervisor: ScriptedEngine,
        flights: ScriptedEngine,
        hotels: ScriptedEngine,
    ) -> AgentGraph {
        AgentGraph::builder("supervisor")
            .node(AgentNode::new(
                "supervisor",
                Arc::new(supervisor),
                vec![Handoff::to("flights_advisor"), Handoff::to("hotel_advisor")],
            ))
            .node(AgentNode::new(
                "flights_advisor",
                Arc::new(flights),
                vec![Handoff::to("supervisor")],
            ))
            .node(AgentNode::new(
                "hotel_advisor",
                Arc::new(hotels),
                vec![Handoff::to("supervisor")],
            ))
            .build()
            .unwrap()
    }

    fn suspended(output: TurnOutput) -> (Message, AgentName) {
        match output {
            TurnOutput::Suspended { prompt, agent } => (prompt, agent),
            other => panic!("expected suspension, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fresh_thread_starts_at_entry() {
        let graph = travel_topology(
            ScriptedEngine::new().say("hello, I can help with flights and hotels"),
            ScriptedEngine::new(),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store.clone());

        let output = runner
            .start_or_continue(&"t1".into(), Some("hi"))
            .await
            .unwrap();
        let (prompt, agent) = suspended(output);

        assert_eq!(prompt.content, "hello, I can help with flights and hotels");
        assert_eq!(agent.as_str(), "supervisor");

        let cp = store.get(&"t1".into()).await.unwrap().unwrap();
        assert_eq!(cp.pending, NodeId::Human);
        assert_eq!(cp.conversation.len(), 2); // human + supervisor reply
    }

    #[tokio::test]
    async fn test_handoff_then_resume_returns_to_advisor() {
        let graph = travel_topology(
            ScriptedEngine::new().transfer("flights can help with that", "flights_advisor"),
            ScriptedEngine::new()
                .say("which dates?")
                .say("here are your options"),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store.clone());
        let thread: ThreadId = "t1".into();

        let output = runner
            .start_or_continue(&thread, Some("find me a flight"))
            .await
            .unwrap();
        let (prompt, agent) = suspended(output);
        assert_eq!(prompt.content, "which dates?");
        assert_eq!(agent.as_str(), "flights_advisor");

        let cp = store.get(&thread).await.unwrap().unwrap();
        assert_eq!(cp.pending, NodeId::Human);
        assert_eq!(cp.resume.as_ref().unwrap().agent.as_str(), "flights_advisor");

        // Resume goes back to the advisor, not the supervisor.
        let output = runner
            .start_or_continue(&thread, Some("June 1 to June 8"))
            .await
            .unwrap();
        let (prompt, agent) = suspended(output);
        assert_eq!(prompt.content, "here are your options");
        assert_eq!(agent.as_str(), "flights_advisor");
    }

    #[tokio::test]
    async fn test_replay_without_input_is_idempotent() {
        let graph = travel_topology(
            ScriptedEngine::new().say("how can I help?"),
            ScriptedEngine::new(),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store.clone());
        let thread: ThreadId = "t1".into();

        runner.start_or_continue(&thread, Some("hi")).await.unwrap();
        let before = store.get(&thread).await.unwrap().unwrap();

        for _ in 0..3 {
            let (prompt, agent) = suspended(
                runner.start_or_continue(&thread, None).await.unwrap(),
            );
            assert_eq!(prompt.content, "how can I help?");
            assert_eq!(agent.as_str(), "supervisor");
        }

        let after = store.get(&thread).await.unwrap().unwrap();
        assert_eq!(after.conversation.len(), before.conversation.len());
        assert_eq!(after.pending, before.pending);
    }

    #[tokio::test]
    async fn test_fresh_thread_without_input_is_user_error() {
        let graph = travel_topology(
            ScriptedEngine::new(),
            ScriptedEngine::new(),
            ScriptedEngine::new(),
        );
        let runner = ThreadRunner::new(graph, Arc::new(InMemoryCheckpointStore::new()));

        let err = runner
            .start_or_continue(&"t1".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::User { .. }));
    }

    #[tokio::test]
    async fn test_node_failure_preserves_partial_progress() {
        let graph = travel_topology(
            ScriptedEngine::new().transfer("over to flights", "flights_advisor"),
            ScriptedEngine::new().fail("search backend down"),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store.clone());
        let thread: ThreadId = "t1".into();

        let err = runner
            .start_or_continue(&thread, Some("find me a flight"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::TurnExecution { .. }));

        // The supervisor's handoff was applied and persisted; the failing
        // advisor step was not.
        let cp = store.get(&thread).await.unwrap().unwrap();
        assert_eq!(cp.pending, NodeId::Agent("flights_advisor".into()));
        assert_eq!(cp.conversation.len(), 2); // human + supervisor message
        assert_eq!(cp.conversation.last().unwrap().content, "over to flights");
    }

    #[tokio::test]
    async fn test_handoff_cycle_exhausts_hop_budget() {
        let graph = travel_topology(
            ScriptedEngine::new()
                .transfer("to flights", "flights_advisor")
                .transfer("to flights again", "flights_advisor"),
            ScriptedEngine::new()
                .transfer("back to supervisor", "supervisor")
                .transfer("back again", "supervisor"),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store).with_max_hops(3);

        let err = runner
            .start_or_continue(&"t1".into(), Some("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::HopBudgetExceeded { max_hops: 3 }));
    }

    #[tokio::test]
    async fn test_distinct_threads_are_isolated() {
        let graph = travel_topology(
            ScriptedEngine::new().say("reply one").say("reply two"),
            ScriptedEngine::new(),
            ScriptedEngine::new(),
        );
        let store = Arc::new(InMemoryCheckpointStore::new());
        let runner = ThreadRunner::new(graph, store.clone());

        runner
            .start_or_continue(&"t1".into(), Some("first thread"))
            .await
            .unwrap();
        runner
            .start_or_continue(&"t2".into(), Some("second thread"))
            .await
            .unwrap();

        let t1 = store.get(&"t1".into()).await.unwrap().unwrap();
        let t2 = store.get(&"t2".into()).await.unwrap().unwrap();

        assert_eq!(t1.conversation.messages()[0].content, "first thread");
        assert_eq!(t2.conversation.messages()[0].content, "second thread");
        assert_eq!(t1.conversation.len(), 2);
        assert_eq!(t2.conversation.len(), 2);
    }
}
