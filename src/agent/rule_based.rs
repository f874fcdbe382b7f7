//! Rule-based executor
//!
//! Picks a behavior by matching the task text against an ordered list of
//! regular expressions. The first matching rule wins. A rule either answers
//! with a canned response or fails with its message.
//!
//! ```yaml
//! rules:
//!   - pattern: "(?i)security"
//!     response: "security review complete"
//!     delay_ms: 50
//!   - pattern: "(?i)broken"
//!     fail: "cannot review broken input"
//! default_response: "review complete"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{AgentFailure, AgentOutput, Executor, ExecutorDescriptor, TaskInput};

/// A single keyword rule as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Regular expression matched against the task text
    pub pattern: String,

    /// Text returned when the rule matches
    #[serde(default)]
    pub response: Option<String>,

    /// Failure message; takes precedence over `response`
    #[serde(default)]
    pub fail: Option<String>,

    /// Simulated work before answering
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl ResponseRule {
    pub fn respond(pattern: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            response: Some(response.into()),
            fail: None,
            delay_ms: None,
        }
    }

    pub fn fail(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            response: None,
            fail: Some(message.into()),
            delay_ms: None,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}

#[derive(Debug)]
struct CompiledRule {
    regex: Regex,
    rule: ResponseRule,
}

/// Executor that branches on keywords in the task description
#[derive(Debug)]
pub struct RuleExecutor {
    descriptor: ExecutorDescriptor,
    rules: Vec<CompiledRule>,
    default_response: Option<String>,
}

impl RuleExecutor {
    /// Compile the rules; fails on the first invalid pattern
    pub fn new(
        descriptor: ExecutorDescriptor,
        rules: Vec<ResponseRule>,
        default_response: Option<String>,
    ) -> Result<Self, regex::Error> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                Ok(CompiledRule {
                    regex: Regex::new(&rule.pattern)?,
                    rule,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            descriptor,
            rules,
            default_response,
        })
    }

    /// Executor that answers every task with the same text
    pub fn constant(descriptor: ExecutorDescriptor, response: impl Into<String>) -> Self {
        Self {
            descriptor,
            rules: Vec::new(),
            default_response: Some(response.into()),
        }
    }

    fn matching_rule(&self, task: &str) -> Option<&ResponseRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.regex.is_match(task))
            .map(|compiled| &compiled.rule)
    }
}

#[async_trait]
impl Executor for RuleExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn run(&self, input: &TaskInput) -> Result<AgentOutput, AgentFailure> {
        if input.task.trim().is_empty() {
            return Err(AgentFailure::InvalidInput("task is empty".to_string()));
        }

        let rule = self.matching_rule(&input.task);

        if let Some(delay) = rule.and_then(|r| r.delay_ms) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let (output, matched) = match rule {
            Some(rule) => {
                debug!(
                    agent = %self.descriptor.agent_type,
                    pattern = %rule.pattern,
                    "Rule matched"
                );
                if let Some(message) = &rule.fail {
                    return Err(AgentFailure::failed(message.clone()));
                }
                let text = rule
                    .response
                    .clone()
                    .or_else(|| self.default_response.clone())
                    .unwrap_or_default();
                (text, Some(rule.pattern.clone()))
            }
            None => match &self.default_response {
                Some(text) => (text.clone(), None),
                None => {
                    return Err(AgentFailure::failed(format!(
                        "no rule of '{}' matches task",
                        self.descriptor.agent_type
                    )))
                }
            },
        };

        let tokens = input.task.split_whitespace().count() as u64;

        Ok(AgentOutput::new(json!({
            "agent": self.descriptor.name,
            "task": input.task,
            "output": output,
            "matchedRule": matched,
        }))
        .with_tokens(tokens))
    }
}
