//! Reasoning engine seam
//!
//! A [`ReasoningEngine`] is the opaque function behind each agent node:
//! given the transcript and the set of available handoff actions, it decides
//! what to say and whether to delegate. The routing core never looks inside;
//! it only consumes the resulting [`Decision`].
//!
//! Two implementations ship with the crate: [`OpenAiEngine`], which runs a
//! ReAct-style loop against the OpenAI chat API with domain tools, and
//! [`ScriptedEngine`], a deterministic double for tests and offline replay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::graph::AgentName;
use crate::handoff::HandoffAction;
use crate::items::{Conversation, Message, Role};
use crate::tool::Tool;

/// What a reasoning engine decided for one turn: messages to emit and any
/// transfer-of-control actions it requested. Requesting more than one
/// handoff is legal at this layer; the agent node keeps only the first.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub messages: Vec<Message>,
    pub handoffs: Vec<AgentName>,
}

/// Trait for the externally supplied reasoning engine behind an agent node.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Produces a decision for the acting agent given the transcript and
    /// the handoff actions it may invoke.
    async fn decide(
        &self,
        agent: &AgentName,
        conversation: &Conversation,
        actions: &[HandoffAction],
    ) -> Result<Decision>;
}

/// OpenAI-backed reasoning engine.
///
/// Runs the model with the agent's instructions, the transcript, its domain
/// tools, and the handoff actions advertised as function tools. Domain tool
/// calls are executed in-loop; a handoff call short-circuits the loop and is
/// reported on the decision instead of being executed.
pub struct OpenAiEngine {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    instructions: String,
    tools: Vec<Arc<dyn Tool>>,
    temperature: Option<f32>,
    max_steps: usize,
}

impl OpenAiEngine {
    pub fn new(
        client: Arc<Client<OpenAIConfig>>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
            temperature: None,
            max_steps: 8,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap on model round trips within a single decision.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    fn convert_transcript(&self, conversation: &Conversation) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestSystemMessageArgs::default()
                .content(self.instructions.clone())
                .build()?
                .into()];

        for msg in conversation.messages() {
            let converted: ChatCompletionRequestMessage = match msg.role {
                Role::Human => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()?
                    .into(),
                // Tool exchanges from earlier turns carry no call ids, so
                // they re-enter the model as plain assistant content.
                Role::Agent | Role::ToolResult => {
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(msg.content.clone())
                        .build()?
                        .into()
                }
            };
            messages.push(converted);
        }

        Ok(messages)
    }

    fn convert_tools(&self, actions: &[HandoffAction]) -> Result<Vec<ChatCompletionTool>> {
        let mut tools = Vec::new();

        for tool in &self.tools {
            tools.push(
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(
                        FunctionObjectArgs::default()
                            .name(tool.name())
                            .description(tool.description())
                            .parameters(tool.parameters_schema())
                            .build()?,
                    )
                    .build()?,
            );
        }

        for action in actions {
            tools.push(
                ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(
                        FunctionObjectArgs::default()
                            .name(action.name.clone())
                            .description(action.description.clone())
                            .parameters(serde_json::json!({
                                "type": "object",
                                "properties": {
                                    "reason": {
                                        "type": "string",
                                        "description": "Reason for the transfer"
                                    }
                                }
                            }))
                            .build()?,
                    )
                    .build()?,
            );
        }

        Ok(tools)
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }
}

#[async_trait]
impl ReasoningEngine for OpenAiEngine {
    async fn decide(
        &self,
        agent: &AgentName,
        conversation: &Conversation,
        actions: &[HandoffAction],
    ) -> Result<Decision> {
        let mut scratch = self.convert_transcript(conversation)?;
        let tools = self.convert_tools(actions)?;

        let mut decision = Decision::default();
        let mut steps = 0;

        loop {
            steps += 1;
            if steps > self.max_steps {
                return Err(GraphError::TurnExecution {
                    agent: agent.to_string(),
                    message: format!("reasoning loop exceeded {} steps", self.max_steps),
                });
            }

            let mut request = CreateChatCompletionRequestArgs::default();
            request.model(&self.model).messages(scratch.clone());
            if !tools.is_empty() {
                request.tools(tools.clone());
            }
            if let Some(temperature) = self.temperature {
                request.temperature(temperature);
            }

            let response = self.client.chat().create(request.build()?).await?;
            let choice = response
                .choices
                .first()
                .ok_or_else(|| GraphError::TurnExecution {
                    agent: agent.to_string(),
                    message: "no choices in model response".to_string(),
                })?;

            let content = choice.message.content.clone().unwrap_or_default();
            let tool_calls: Vec<ChatCompletionMessageToolCall> =
                choice.message.tool_calls.clone().unwrap_or_default();

            // Handoff short-circuit: record every requested transfer and stop
            // reasoning. The node enforces the single-transition guarantee.
            let requested: Vec<AgentName> = tool_calls
                .iter()
                .filter_map(|tc| {
                    actions
                        .iter()
                        .find(|a| a.name == tc.function.name)
                        .map(|a| a.target.clone())
                })
                .collect();
            if !requested.is_empty() {
                if !content.is_empty() {
                    decision.messages.push(Message::agent(content, agent.as_str()));
                }
                decision.handoffs = requested;
                return Ok(decision);
            }

            if tool_calls.is_empty() {
                if !content.is_empty() {
                    decision.messages.push(Message::agent(content, agent.as_str()));
                }
                return Ok(decision);
            }

            // Domain tool calls: execute sequentially and feed results back.
            scratch.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content)
                    .tool_calls(tool_calls.clone())
                    .build()?
                    .into(),
            );

            for call in &tool_calls {
                let tool =
                    self.find_tool(&call.function.name)
                        .ok_or_else(|| GraphError::TurnExecution {
                            agent: agent.to_string(),
                            message: format!("model called unknown tool '{}'", call.function.name),
                        })?;
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);

                debug!(agent = %agent, tool = %tool.name(), "Executing tool");
                let output = tool.execute(arguments).await?;

                scratch.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(output.to_string())
                        .tool_call_id(call.id.clone())
                        .build()?
                        .into(),
                );
                decision
                    .messages
                    .push(Message::tool_result(output.to_string(), agent.as_str()));
            }
        }
    }
}

/// Deterministic reasoning engine backed by a fixed script.
///
/// Each call to [`ReasoningEngine::decide`] consumes the next scripted step;
/// an exhausted script yields an empty decision (no messages, no handoff),
/// which routes to the human suspension node.
#[derive(Default)]
pub struct ScriptedEngine {
    steps: Mutex<VecDeque<ScriptStep>>,
}

enum ScriptStep {
    Reply {
        content: Option<String>,
        handoffs: Vec<AgentName>,
    },
    Fail(String),
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a message and suspend to the human.
    pub fn say(self, content: impl Into<String>) -> Self {
        self.push(ScriptStep::Reply {
            content: Some(content.into()),
            handoffs: vec![],
        })
    }

    /// Emit a message and hand off to `target`.
    pub fn transfer(self, content: impl Into<String>, target: impl Into<AgentName>) -> Self {
        self.push(ScriptStep::Reply {
            content: Some(content.into()),
            handoffs: vec![target.into()],
        })
    }

    /// Emit a message and request several handoffs at once. Only the first
    /// one survives the agent node; this exists to exercise that guarantee.
    pub fn transfer_all(self, content: impl Into<String>, targets: &[&str]) -> Self {
        self.push(ScriptStep::Reply {
            content: Some(content.into()),
            handoffs: targets.iter().map(|t| AgentName::new(*t)).collect(),
        })
    }

    /// Emit nothing and suspend to the human.
    pub fn silent(self) -> Self {
        self.push(ScriptStep::Reply {
            content: None,
            handoffs: vec![],
        })
    }

    /// Fail the turn with the given message.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(ScriptStep::Fail(message.into()))
    }

    fn push(self, step: ScriptStep) -> Self {
        self.steps.lock().unwrap().push_back(step);
        self
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn decide(
        &self,
        agent: &AgentName,
        _conversation: &Conversation,
        _actions: &[HandoffAction],
    ) -> Result<Decision> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(Decision::default()),
            Some(ScriptStep::Reply { content, handoffs }) => Ok(Decision {
                messages: content
                    .map(|c| vec![Message::agent(c, agent.as_str())])
                    .unwrap_or_default(),
                handoffs,
            }),
            Some(ScriptStep::Fail(message)) => Err(GraphError::TurnExecution {
                agent: agent.to_string(),
                message,
            }),
        }
    }
}
