//! Agent discovery
//!
//! An actor spawned with an [`AgentProfile`] is registered with the system's
//! [`Discovery`] service before its startup hook runs, and the resulting
//! [`AgentRegistration`] is kept in the actor's own state under
//! [`REGISTRATION_KEY`]. Stopping the actor marks the registration stopped.
//! A failed registration is logged; the actor still starts.

use crate::{ActorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use types::{Address, Role};

/// State key holding the actor's registration record
pub const REGISTRATION_KEY: &str = "registration_info";

/// What an actor advertises about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub display_name: String,
    pub role: Role,
    pub capabilities: Vec<String>,
    pub description: String,
    pub protocols: Vec<String>,
}

impl AgentProfile {
    pub fn new(display_name: impl Into<String>, role: Role) -> Self {
        Self {
            display_name: display_name.into(),
            role,
            capabilities: Vec::new(),
            description: String::new(),
            protocols: vec!["local".to_string()],
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Stopped,
}

/// A profile as recorded by the discovery service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub address: Address,
    #[serde(flatten)]
    pub profile: AgentProfile,
    pub registered_at: DateTime<Utc>,
    pub status: AgentStatus,
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn register(&self, address: &Address, profile: &AgentProfile) -> Result<AgentRegistration>;

    async fn update_status(&self, address: &Address, status: AgentStatus) -> Result<AgentRegistration>;

    async fn get(&self, address: &Address) -> Option<AgentRegistration>;

    async fn list(&self) -> Vec<AgentRegistration>;
}

/// Process-local discovery directory
#[derive(Debug, Default)]
pub struct InMemoryDiscovery {
    agents: Mutex<HashMap<Address, AgentRegistration>>,
}

impl InMemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Discovery for InMemoryDiscovery {
    async fn register(&self, address: &Address, profile: &AgentProfile) -> Result<AgentRegistration> {
        let registration = AgentRegistration {
            address: address.clone(),
            profile: profile.clone(),
            registered_at: Utc::now(),
            status: AgentStatus::Active,
        };
        self.agents
            .lock()
            .insert(address.clone(), registration.clone());
        info!(
            agent = %profile.display_name,
            role = %profile.role,
            address = %address,
            "Agent registered"
        );
        Ok(registration)
    }

    async fn update_status(&self, address: &Address, status: AgentStatus) -> Result<AgentRegistration> {
        let mut agents = self.agents.lock();
        let Some(registration) = agents.get_mut(address) else {
            warn!(address = %address, "Status update for unregistered agent");
            return Err(ActorError::discovery(address, "agent not registered"));
        };
        registration.status = status;
        Ok(registration.clone())
    }

    async fn get(&self, address: &Address) -> Option<AgentRegistration> {
        self.agents.lock().get(address).cloned()
    }

    async fn list(&self) -> Vec<AgentRegistration> {
        let mut agents: Vec<_> = self.agents.lock().values().cloned().collect();
        agents.sort_by(|a, b| a.profile.role.cmp(&b.profile.role));
        agents
    }
}
