use async_trait::async_trait;
use rw_core::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, ChatModel, ToolCall, ToolDefinition};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// A function the agent can hand to the chat model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Natural-language description the model uses to decide when to call it
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

/// Drives a tool-calling conversation until the model answers in text.
pub struct AgentExecutor {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
    verbose: bool,
}

impl fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("model", &self.model.name())
            .field("tools", &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl AgentExecutor {
    pub fn new(model: Arc<dyn ChatModel>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            model,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            verbose: false,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub async fn run(&self, input: &str) -> Result<String> {
        let definitions = self.tool_definitions();
        let mut messages = vec![
            ChatMessage::system(DEFAULT_SYSTEM_PROMPT),
            ChatMessage::user(input),
        ];

        for iteration in 0..self.max_iterations {
            debug!("Agent iteration {}/{}", iteration + 1, self.max_iterations);
            let reply = self.model.complete(&messages, &definitions).await?;

            let tool_calls = match &reply {
                ChatMessage::Assistant { tool_calls, .. } if !tool_calls.is_empty() => tool_calls.clone(),
                ChatMessage::Assistant { content, .. } => {
                    return Ok(content.clone().unwrap_or_default());
                }
                other => {
                    return Err(Error::Inference(format!("Unexpected reply from chat model: {:?}", other)));
                }
            };

            messages.push(reply);
            for call in &tool_calls {
                let output = self.invoke(call).await;
                messages.push(ChatMessage::tool(call.id.as_str(), output));
            }
        }

        Err(Error::Inference(format!(
            "Agent stopped after {} iterations without a final answer",
            self.max_iterations
        )))
    }

    /// Run one tool call. Failures are reported back to the model as text so
    /// it can recover.
    async fn invoke(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!("Model requested unknown tool: {}", name);
            return format!("Error: {} is not a valid tool", name);
        };

        let raw_args = call.function.arguments.trim();
        let args = if raw_args.is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(raw_args) {
                Ok(args) => args,
                Err(e) => {
                    warn!("Invalid arguments for {}: {}", name, e);
                    return format!("Error: could not parse arguments for {}: {}", name, e);
                }
            }
        };

        if self.verbose {
            info!("🛠️ Invoking `{}` with {}", name, args);
        }

        match tool.call(args).await {
            Ok(value) => {
                let output = value.to_string();
                if self.verbose {
                    info!("📦 `{}` returned {} bytes", name, output.len());
                }
                output
            }
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::FunctionCall;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned replies and records what it was sent.
    #[derive(Debug)]
    struct ScriptedModel {
        replies: Mutex<Vec<ChatMessage>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<ChatMessage>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ChatMessage> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| Error::Inference("script exhausted".to_string()))
        }
    }

    struct EchoTool {
        calls: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn call(&self, args: Value) -> Result<Value> {
            self.calls.lock().unwrap().push(args.clone());
            Ok(json!([args]))
        }
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> ChatMessage {
        ChatMessage::Assistant {
            content: None,
            tool_calls: vec![ToolCall {
                id: id.to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                },
            }],
        }
    }

    fn answer(text: &str) -> ChatMessage {
        ChatMessage::Assistant {
            content: Some(text.to_string()),
            tool_calls: vec![],
        }
    }

    #[tokio::test]
    async fn test_run_executes_tool_then_answers() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("call_1", "echo", r#"{"text": "ivy lee"}"#),
            answer("Found one article."),
        ]));
        let tool = Arc::new(EchoTool { calls: Mutex::new(Vec::new()) });
        let agent = AgentExecutor::new(model.clone(), vec![tool.clone() as Arc<dyn Tool>]).with_verbose(true);

        let output = agent.run("articles about the ivy lee method").await.unwrap();
        assert_eq!(output, "Found one article.");
        assert_eq!(*tool.calls.lock().unwrap(), vec![json!({"text": "ivy lee"})]);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0][0], ChatMessage::system(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(seen[0][1], ChatMessage::user("articles about the ivy lee method"));
        assert_eq!(
            seen[1].last().unwrap(),
            &ChatMessage::tool("call_1", r#"[{"text":"ivy lee"}]"#)
        );
    }

    #[tokio::test]
    async fn test_tool_errors_are_returned_to_the_model() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("call_1", "missing", "{}"),
            tool_call("call_2", "echo", "not json"),
            answer("done"),
        ]));
        let tool = Arc::new(EchoTool { calls: Mutex::new(Vec::new()) });
        let agent = AgentExecutor::new(model.clone(), vec![tool.clone() as Arc<dyn Tool>]);

        assert_eq!(agent.run("hi").await.unwrap(), "done");
        assert!(tool.calls.lock().unwrap().is_empty());

        let seen = model.seen.lock().unwrap();
        match seen[1].last().unwrap() {
            ChatMessage::Tool { content, .. } => assert!(content.contains("not a valid tool")),
            other => panic!("unexpected message: {:?}", other),
        }
        match seen[2].last().unwrap() {
            ChatMessage::Tool { content, .. } => assert!(content.contains("could not parse")),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_call("call_1", "echo", "{}"),
            tool_call("call_2", "echo", ""),
            tool_call("call_3", "echo", "{}"),
        ]));
        let tool = Arc::new(EchoTool { calls: Mutex::new(Vec::new()) });
        let agent = AgentExecutor::new(model, vec![tool.clone() as Arc<dyn Tool>]).with_max_iterations(2);

        assert!(agent.run("loop forever").await.is_err());
        assert_eq!(tool.calls.lock().unwrap().len(), 2);
    }
}
