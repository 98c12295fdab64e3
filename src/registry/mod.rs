//! Capability registry: the tools, resources and prompts a server exposes.
//!
//! Each category is a concurrent map keyed by name. Registering an existing
//! name replaces the previous entry. Listings are sorted by name so repeated
//! calls return the same sequence.

pub mod prompt;
pub mod resource;
pub mod tool;

pub use prompt::{PromptEntry, substitute};
pub use resource::{FnResource, ResourceBody, ResourceEntry, ResourceHandler};
pub use tool::{AsyncFnTool, FnTool, ToolEntry, ToolHandler};

use crate::error::{CapabilityKind, RegistryError};
use crate::protocol::{
    ListChangedCapability, Prompt, PromptArgument, Resource, ServerCapabilities, Tool,
};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::debug;

pub struct CapabilityRegistry {
    tools: DashMap<String, Arc<ToolEntry>>,
    resources: DashMap<String, Arc<ResourceEntry>>,
    prompts: DashMap<String, Arc<PromptEntry>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            resources: DashMap::new(),
            prompts: DashMap::new(),
        }
    }

    pub fn register_tool<H: ToolHandler + 'static>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: H,
    ) {
        let name = name.into();
        debug!("Registering tool: {}", name);
        let entry = ToolEntry {
            definition: Tool {
                name: name.clone(),
                description: description.into(),
                input_schema,
            },
            handler: Arc::new(handler),
        };
        self.tools.insert(name, Arc::new(entry));
    }

    /// Register a resource. The name doubles as its URI.
    pub fn register_resource<H: ResourceHandler + 'static>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
        handler: H,
    ) {
        let name = name.into();
        debug!("Registering resource: {}", name);
        let entry = ResourceEntry {
            definition: Resource {
                uri: name.clone(),
                name: name.clone(),
                description: description.into(),
                mime_type: mime_type.into(),
            },
            handler: Arc::new(handler),
        };
        self.resources.insert(name, Arc::new(entry));
    }

    /// Register a prompt template. Every described parameter is required.
    pub fn register_prompt<I, K, D>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
        parameters: I,
    ) where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<String>,
    {
        let name = name.into();
        debug!("Registering prompt: {}", name);
        let entry = PromptEntry {
            name: name.clone(),
            description: description.into(),
            template: template.into(),
            arguments: parameters
                .into_iter()
                .map(|(param, description)| PromptArgument {
                    name: param.into(),
                    description: description.into(),
                    required: true,
                })
                .collect(),
        };
        self.prompts.insert(name, Arc::new(entry));
    }

    pub fn get_tool(&self, name: &str) -> Result<Arc<ToolEntry>, RegistryError> {
        self.tools
            .get(name)
            .map(|r| Arc::clone(&*r))
            .ok_or_else(|| RegistryError::not_found(CapabilityKind::Tool, name))
    }

    pub fn get_resource(&self, name: &str) -> Result<Arc<ResourceEntry>, RegistryError> {
        self.resources
            .get(name)
            .map(|r| Arc::clone(&*r))
            .ok_or_else(|| RegistryError::not_found(CapabilityKind::Resource, name))
    }

    pub fn get_prompt(&self, name: &str) -> Result<Arc<PromptEntry>, RegistryError> {
        self.prompts
            .get(name)
            .map(|r| Arc::clone(&*r))
            .ok_or_else(|| RegistryError::not_found(CapabilityKind::Prompt, name))
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .iter()
            .map(|r| r.value().definition.clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .resources
            .iter()
            .map(|r| r.value().definition.clone())
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        resources
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self.prompts.iter().map(|r| r.value().definition()).collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }

    /// Capabilities advertised by `initialize`: one entry per non-empty category.
    pub fn capabilities(&self) -> ServerCapabilities {
        let advertise = |present: bool| present.then(ListChangedCapability::default);
        ServerCapabilities {
            tools: advertise(!self.tools.is_empty()),
            resources: advertise(!self.resources.is_empty()),
            prompts: advertise(!self.prompts.is_empty()),
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable reason a spawned handler task did not finish.
pub(crate) fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".into();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".into()
    }
}
