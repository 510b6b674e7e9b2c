//! Tool registry
//!
//! Aggregates the tools of every connected provider into one addressable
//! collection for a session. Populated once at connect time and read-only
//! afterwards: lookups never race with mutation, so no lock is needed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::logging::Logger;
use crate::mcp::{
    ProviderConnection, ProviderError, ProviderResult, ProviderSpec, ToolContent, ToolInvoker,
};
use crate::types::ToolDescriptor;

/// Registry construction errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A required provider could not be connected
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Two providers exposed the same namespaced id. Configuration error;
    /// fail fast at connect time.
    #[error("Duplicate tool id: {0}")]
    DuplicateTool(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// One registered tool: its descriptor plus the handle that can invoke it
#[derive(Clone)]
pub struct RegisteredTool {
    descriptor: Arc<ToolDescriptor>,
    invoker: Arc<dyn ToolInvoker>,
}

impl RegisteredTool {
    /// Create a registered tool from a descriptor and an invoker
    pub fn new(descriptor: ToolDescriptor, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            invoker,
        }
    }

    /// Namespaced registry id
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// The tool's descriptor
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Invoke the tool under its provider-local name
    pub async fn invoke(&self, input: Value) -> ProviderResult<ToolContent> {
        self.invoker
            .invoke(&self.descriptor.local_name, input)
            .await
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("id", &self.descriptor.id)
            .field("provider_url", &self.descriptor.provider_url)
            .finish()
    }
}

/// Session-scoped collection of every registered tool
pub struct ToolRegistry {
    /// Tools in provider/discovery order
    tools: Vec<RegisteredTool>,
    /// Registry id -> index into `tools`
    by_id: HashMap<String, usize>,
    /// (provider_url, local_name) -> index into `tools`
    by_origin: HashMap<(String, String), usize>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            tools: Vec::new(),
            by_id: HashMap::new(),
            by_origin: HashMap::new(),
            logger,
        }
    }

    /// Connect every configured provider and aggregate their tools
    ///
    /// Providers are connected in parallel. A required provider that cannot
    /// be reached fails the whole session; an optional one is skipped with a
    /// warning.
    pub async fn connect(
        specs: &[ProviderSpec],
        logger: Arc<dyn Logger>,
    ) -> RegistryResult<Self> {
        let connects = specs.iter().map(|spec| {
            let logger = Arc::clone(&logger);
            async move {
                let connection = ProviderConnection::connect(&spec.url, logger).await?;
                let descriptors = connection.discover().await?;
                Ok::<_, ProviderError>((Arc::new(connection), descriptors))
            }
        });

        let mut registry = Self::new(Arc::clone(&logger));
        for (spec, outcome) in specs.iter().zip(futures::future::join_all(connects).await) {
            match outcome {
                Ok((connection, descriptors)) => {
                    registry.add_provider(descriptors, connection)?;
                }
                Err(e) if spec.required => return Err(e.into()),
                Err(e) => {
                    logger.warn(&format!(
                        "[ToolRegistry] Skipping optional provider {}: {}",
                        spec.url, e
                    ));
                }
            }
        }

        logger.info(&format!(
            "[ToolRegistry] Registered {} tools from {} provider(s)",
            registry.len(),
            specs.len()
        ));

        Ok(registry)
    }

    /// Add one provider's tools, failing fast on an id collision
    pub fn add_provider(
        &mut self,
        descriptors: Vec<ToolDescriptor>,
        invoker: Arc<dyn ToolInvoker>,
    ) -> RegistryResult<()> {
        for descriptor in descriptors {
            if self.by_id.contains_key(&descriptor.id) {
                return Err(RegistryError::DuplicateTool(descriptor.id));
            }

            let index = self.tools.len();
            let origin = (
                descriptor.provider_url.clone(),
                descriptor.local_name.clone(),
            );
            self.by_id.insert(descriptor.id.clone(), index);
            self.by_origin.insert(origin, index);
            self.tools
                .push(RegisteredTool::new(descriptor, Arc::clone(&invoker)));
        }
        Ok(())
    }

    /// Look up a tool by its namespaced id
    pub fn get(&self, id: &str) -> Option<&RegisteredTool> {
        self.by_id.get(id).map(|&i| &self.tools[i])
    }

    /// Look up a tool by its provider endpoint and provider-local name
    pub fn find_by_origin(&self, provider_url: &str, local_name: &str) -> Option<&RegisteredTool> {
        self.by_origin
            .get(&(provider_url.to_string(), local_name.to_string()))
            .map(|&i| &self.tools[i])
    }

    /// Resolve a set of registry ids, silently ignoring unknown ones
    pub fn resolve<'a, I>(&self, ids: I) -> Vec<RegisteredTool>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter()
            .filter_map(|id| {
                let tool = self.get(id);
                if tool.is_none() {
                    self.logger
                        .debug(&format!("[ToolRegistry] Unknown tool id ignored: {}", id));
                }
                tool.cloned()
            })
            .collect()
    }

    /// Every registered tool, in discovery order
    pub fn all(&self) -> Vec<RegisteredTool> {
        self.tools.clone()
    }

    /// Every tool descriptor, in discovery order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| t.descriptor().clone())
            .collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
