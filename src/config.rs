//! Orchestrator configuration
//!
//! Loaded from `orchestrator.yaml`:
//!
//! ```yaml
//! enforcement:
//!   timeouts: true
//!
//! store:
//!   type: jsonl
//!   path: .orchestrator/records.jsonl
//!
//! agents:
//!   - type: reviewer
//!     name: Code Reviewer
//!     role: review
//!     timeout_ms: 30000
//!     rules:
//!       - pattern: "(?i)security"
//!         response: "security review complete"
//!     default_response: "review complete"
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{
    default_max_concurrent, default_timeout_ms, ExecutorDescriptor, ResponseRule, RuleExecutor,
};
use crate::engine::{
    AgentRegistry, EnforcementPolicy, ExecutionRecordStore, InMemoryRecordStore,
    JsonlRecordStore, StoreError,
};
use crate::workflow::loader::{load_yaml, LoadError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] LoadError),

    #[error("Invalid rule pattern for agent '{agent}': {error}")]
    InvalidPattern { agent: String, error: regex::Error },

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

/// Where execution records are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    #[default]
    Memory,
    Jsonl {
        #[serde(default = "default_jsonl_path")]
        path: String,
    },
}

fn default_jsonl_path() -> String {
    ".orchestrator/records.jsonl".to_string()
}

fn default_true() -> bool {
    true
}

/// One rule-based agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(rename = "type")]
    pub agent_type: String,

    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub retry_attempts: u32,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default)]
    pub rules: Vec<ResponseRule>,

    #[serde(default)]
    pub default_response: Option<String>,
}

impl AgentConfig {
    pub fn descriptor(&self) -> ExecutorDescriptor {
        ExecutorDescriptor {
            name: self.name.clone(),
            agent_type: self.agent_type.clone(),
            enabled: self.enabled,
            role: self.role.clone(),
            description: self.description.clone(),
            timeout_ms: self.timeout_ms,
            retry_attempts: self.retry_attempts,
            max_concurrent: self.max_concurrent,
        }
    }

    pub fn build(&self) -> Result<RuleExecutor, ConfigError> {
        RuleExecutor::new(
            self.descriptor(),
            self.rules.clone(),
            self.default_response.clone(),
        )
        .map_err(|error| ConfigError::InvalidPattern {
            agent: self.agent_type.clone(),
            error,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub enforcement: EnforcementPolicy,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

impl OrchestratorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(load_yaml(path.as_ref())?)
    }

    /// Open the configured record store
    pub async fn open_store(&self) -> Result<Arc<dyn ExecutionRecordStore>, ConfigError> {
        let store: Arc<dyn ExecutionRecordStore> = match &self.store {
            StoreConfig::Memory => Arc::new(InMemoryRecordStore::new()),
            StoreConfig::Jsonl { path } => {
                info!("Using JSONL record store at {}", path);
                Arc::new(JsonlRecordStore::open(path).await?)
            }
        };
        Ok(store)
    }

    /// Build a registry with every configured agent registered
    ///
    /// Disabled agents are skipped by the registry; later entries with the
    /// same type replace earlier ones.
    pub async fn build_registry(&self) -> Result<AgentRegistry, ConfigError> {
        let registry = AgentRegistry::new(self.open_store().await?).with_policy(self.enforcement);

        for agent in &self.agents {
            let executor = agent.build()?;
            registry
                .register(agent.agent_type.clone(), Arc::new(executor))
                .await;
        }

        Ok(registry)
    }
}
