//! deployment state discovery
//!
//! A [StateResolver] finds the state file belonging to a configuration document, parses it once and serves its
//! outputs as [RuntimeValue]s. Per document location there are two outcomes:
//!
//! - a state file was found: the parsed [StateDocument] is cached under the *document's* location until
//!   [StateResolver::invalidate] is called
//! - nothing was found: nothing is cached, the next call probes again (state files appear after `apply`)
//!
//! Missing or broken state files are never an error for the caller, they only show up in the logs.
use crate::host::{FileSystem, LocalFileSystem};
use crate::value::{coerce, RuntimeValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum StateLoadError {
    #[error("State file not found")]
    NotFound,
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse state file")]
    Parse(#[from] serde_json::Error),
}

/// Parsed `terraform.tfstate`
///
/// Unknown fields are ignored, missing ones take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDocument {
    pub version: u64,
    pub terraform_version: String,
    pub serial: u64,
    pub lineage: String,
    pub outputs: IndexMap<String, StateOutput>,
    pub resources: Vec<StateResource>,
}

impl StateDocument {
    pub fn from_json(contents: &str) -> Result<Self, StateLoadError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// First resource with the given type and name
    pub fn resource(&self, resource_type: &str, name: &str) -> Option<&StateResource> {
        self.resources
            .iter()
            .find(|resource| resource.resource_type == resource_type && resource.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateOutput {
    #[serde(default)]
    pub value: serde_json::Value,
    /// `"string"`, `["map", "string"]`, `["object", {...}]`
    #[serde(rename = "type", default)]
    pub type_expression: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
}

impl StateOutput {
    /// Type name handed to [coerce]
    pub fn declared_type(&self) -> String {
        use serde_json::Value as Json;
        match &self.type_expression {
            Json::String(name) => name.clone(),
            Json::Array(parts) => match parts.first() {
                Some(Json::String(name)) => name.clone(),
                _ => self.type_expression.to_string(),
            },
            other => other.to_string(),
        }
    }

    pub fn to_runtime_value(&self) -> RuntimeValue {
        coerce(&self.value, &self.declared_type())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    pub instances: Vec<ResourceInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_key: Option<serde_json::Value>,
    pub schema_version: u64,
    pub attributes: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Probed in order, relative to the document's directory
    pub state_candidates: Vec<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            state_candidates: vec![
                PathBuf::from("terraform.tfstate"),
                PathBuf::from(".terraform/terraform.tfstate"),
            ],
        }
    }
}

/// Session scoped state cache
///
/// Concurrent use needs external locking. Two lookups of the same uncached location simply both read the file.
pub struct StateResolver {
    config: ResolverConfig,
    fs: Option<Arc<dyn FileSystem>>,
    cache: HashMap<PathBuf, Arc<StateDocument>>,
}

impl StateResolver {
    pub fn new(config: ResolverConfig, fs: Option<Arc<dyn FileSystem>>) -> Self {
        Self {
            config,
            fs,
            cache: HashMap::new(),
        }
    }

    /// Default candidates on the local disk
    pub fn local() -> Self {
        Self::new(ResolverConfig::default(), Some(Arc::new(LocalFileSystem)))
    }

    /// A host without filesystem access, every lookup is absent
    pub fn without_filesystem() -> Self {
        Self::new(ResolverConfig::default(), None)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(document = %document.display()))]
    pub fn find_state(&mut self, document: &Path) -> Option<Arc<StateDocument>> {
        if let Some(state) = self.cache.get(document) {
            tracing::debug!("state cache hit");
            return Some(Arc::clone(state));
        }

        let Some(fs) = &self.fs else {
            tracing::debug!("no filesystem available, state is absent");
            return None;
        };

        let directory = document.parent().unwrap_or(Path::new(""));
        for candidate in &self.config.state_candidates {
            let path = directory.join(candidate);
            match load_state(fs.as_ref(), &path) {
                Ok(state) => {
                    tracing::info!(
                        path=%path.display(),
                        serial = state.serial,
                        outputs = state.outputs.len(),
                        "Loaded state"
                    );
                    let state = Arc::new(state);
                    self.cache.insert(document.to_path_buf(), Arc::clone(&state));
                    return Some(state);
                }
                Err(StateLoadError::NotFound) => {
                    tracing::trace!(path=%path.display(), "no state candidate");
                }
                Err(error) => {
                    tracing::warn!(
                        path=%path.display(),
                        error=%error,
                        "Skipping unreadable state candidate"
                    );
                }
            }
        }

        tracing::debug!("no state found");
        None
    }

    /// All outputs, coerced by their declared type
    pub fn get_all_outputs(&mut self, document: &Path) -> IndexMap<String, RuntimeValue> {
        let Some(state) = self.find_state(document) else {
            return IndexMap::new();
        };

        state
            .outputs
            .iter()
            .map(|(name, output)| (name.clone(), output.to_runtime_value()))
            .collect()
    }

    pub fn get_output(&mut self, document: &Path, name: &str) -> Option<RuntimeValue> {
        let state = self.find_state(document)?;
        state.outputs.get(name).map(StateOutput::to_runtime_value)
    }

    /// Attributes of the first instance of a resource, as an object
    pub fn resource_attributes(
        &mut self,
        document: &Path,
        resource_type: &str,
        name: &str,
    ) -> Option<RuntimeValue> {
        let state = self.find_state(document)?;
        let instance = state.resource(resource_type, name)?.instances.first()?;
        Some(coerce(&instance.attributes, "object"))
    }

    pub fn invalidate(&mut self, document: &Path) {
        if self.cache.remove(document).is_some() {
            tracing::debug!(document=%document.display(), "state cache entry invalidated");
        }
    }

    /// Document locations that currently have a cached state
    pub fn cached_locations(&self) -> impl Iterator<Item = &Path> {
        self.cache.keys().map(PathBuf::as_path)
    }
}

fn load_state(fs: &dyn FileSystem, path: &Path) -> Result<StateDocument, StateLoadError> {
    if !fs.exists(path) {
        return Err(StateLoadError::NotFound);
    }
    let contents = fs.read_to_string(path)?;
    StateDocument::from_json(&contents)
}
