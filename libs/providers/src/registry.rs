//! Provider Registry: lazy, cached, three-scope provider discovery and lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::discovery::{discover_project_providers, discover_user_providers, DiscoveredProvider};
use crate::error::ProviderError;
use crate::glob::{glob_match, literal_weight};
use crate::manifest::{ProviderManifest, ProviderScope};
use crate::wasm::runtime::{WasmRuntime, WasmRuntimeConfig};

#[derive(Clone)]
pub struct ProviderEntry {
    pub tool: String,
    pub scope: ProviderScope,
    pub manifest: ProviderManifest,
}

struct Inner {
    entries: HashMap<(String, String), ProviderEntry>,
    discovered: bool,
}

/// Registry of builtin/user/project providers, keyed by `(tool, name)`.
///
/// Discovery is lazy: the first call to `get`/`list`/`match_url`/`validate`
/// walks the filesystem and caches the result. Scopes override in order
/// builtin < user < project, so a project-scope provider of the same
/// `(tool, name)` shadows a builtin one.
pub struct ProviderRegistry {
    inner: RwLock<Inner>,
    project_root: Option<std::path::PathBuf>,
    builtins: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(project_root: Option<&Path>, builtins: Vec<ProviderEntry>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                discovered: false,
            }),
            project_root: project_root.map(Path::to_path_buf),
            builtins,
        }
    }

    fn ensure_discovered(&self) {
        {
            let inner = self.inner.read();
            if inner.discovered {
                return;
            }
        }
        let mut entries = HashMap::new();
        for entry in &self.builtins {
            entries.insert((entry.tool.clone(), entry.manifest.name.clone()), entry.clone());
        }
        for found in discover_user_providers() {
            insert_discovered(&mut entries, found);
        }
        if let Some(root) = &self.project_root {
            for found in discover_project_providers(root) {
                insert_discovered(&mut entries, found);
            }
        }
        let mut inner = self.inner.write();
        inner.entries = entries;
        inner.discovered = true;
    }

    #[must_use]
    pub fn get(&self, tool: &str, name: &str) -> Option<ProviderEntry> {
        self.ensure_discovered();
        self.inner
            .read()
            .entries
            .get(&(tool.to_string(), name.to_string()))
            .cloned()
    }

    #[must_use]
    pub fn list(&self, tool: &str) -> Vec<ProviderEntry> {
        self.ensure_discovered();
        self.inner
            .read()
            .entries
            .values()
            .filter(|e| e.tool == tool)
            .cloned()
            .collect()
    }

    /// Find the most specific provider for `tool` whose `url_patterns` match
    /// `url`, preferring fewer wildcard characters (more literal match).
    pub fn match_url(&self, tool: &str, url: &str) -> Result<ProviderEntry, ProviderError> {
        self.ensure_discovered();
        let candidates = self.list(tool);
        candidates
            .into_iter()
            .filter(|e| e.manifest.url_patterns.iter().any(|p| glob_match(p, url)))
            .max_by_key(|e| {
                e.manifest
                    .url_patterns
                    .iter()
                    .filter(|p| glob_match(p, url))
                    .map(|p| literal_weight(p))
                    .max()
                    .unwrap_or(0)
            })
            .ok_or_else(|| ProviderError::NoUrlMatch {
                tool: tool.to_string(),
                url: url.to_string(),
            })
    }

    /// Names of `entry`'s `requires_env` variables that are unset in the
    /// current process environment. Empty means the provider is runnable.
    #[must_use]
    pub fn missing_env(entry: &ProviderEntry) -> Vec<String> {
        entry
            .manifest
            .requires_env
            .iter()
            .filter(|var| std::env::var(var).is_err())
            .cloned()
            .collect()
    }

    /// Validate that a registered provider's required environment
    /// variables are set. Returns the missing variable names (empty if
    /// the provider is unknown or fully satisfied).
    #[must_use]
    pub fn validate(&self, tool: &str, name: &str) -> Vec<String> {
        match self.get(tool, name) {
            Some(entry) => Self::missing_env(&entry),
            None => Vec::new(),
        }
    }

    /// Look up a provider and confirm its environment requirements are
    /// met, raising `NotFound` (with every other registered name for this
    /// tool, for a helpful error) or `Requirements` instead of silently
    /// handing back an unusable instance.
    pub fn get_checked(&self, tool: &str, name: &str) -> Result<ProviderEntry, ProviderError> {
        let entry = self.get(tool, name).ok_or_else(|| ProviderError::NotFound {
            tool: tool.to_string(),
            name: name.to_string(),
            available: self.list(tool).into_iter().map(|e| e.manifest.name).collect(),
        })?;
        let missing = Self::missing_env(&entry);
        if missing.is_empty() {
            Ok(entry)
        } else {
            Err(ProviderError::Requirements {
                provider: entry.manifest.name.clone(),
                missing,
            })
        }
    }

    /// Validate `config` against `(tool, name)`'s declared `ConfigModel`
    /// JSON Schema, if it has one. A provider with no `config_schema` is
    /// always considered satisfied.
    pub fn validate_config(
        &self,
        tool: &str,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<(), ProviderError> {
        let Some(entry) = self.get(tool, name) else {
            return Ok(());
        };
        let Some(schema) = &entry.manifest.config_schema else {
            return Ok(());
        };
        let validator = jsonschema::validator_for(schema).map_err(|e| ProviderError::ConfigSchema {
            provider: name.to_string(),
            message: e.to_string(),
        })?;
        if let Err(e) = validator.validate(config) {
            return Err(ProviderError::ConfigSchema {
                provider: name.to_string(),
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Load+instantiate a provider's optional wasm module as a liveness
    /// check. Returns `Ok(None)` if the provider declares no module.
    pub fn check_wasm_module(
        &self,
        dir: &Path,
        manifest: &ProviderManifest,
    ) -> Result<Option<()>, crate::wasm::runtime::WasmError> {
        let Some(rel) = &manifest.wasm_module else {
            return Ok(None);
        };
        let bytes = std::fs::read(dir.join(rel)).map_err(|e| {
            crate::wasm::runtime::WasmError::ModuleLoadError(e.to_string())
        })?;
        let runtime = WasmRuntime::new(WasmRuntimeConfig::default())?;
        let module = runtime.load_module(&bytes)?;
        module.instantiate()?;
        Ok(Some(()))
    }

    #[cfg(test)]
    pub fn reset_for_test(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.discovered = false;
    }
}

fn insert_discovered(
    entries: &mut HashMap<(String, String), ProviderEntry>,
    found: DiscoveredProvider,
) {
    entries.insert(
        (found.tool.clone(), found.manifest.name.clone()),
        ProviderEntry {
            tool: found.tool,
            scope: found.scope,
            manifest: found.manifest,
        },
    );
}

static GLOBAL: once_cell::sync::OnceCell<Arc<ProviderRegistry>> = once_cell::sync::OnceCell::new();

/// Access the process-wide registry, constructing it on first use with no
/// project scope and no builtins. Call sites that need project scope or
/// builtins should construct their own `ProviderRegistry` instead.
#[must_use]
pub fn global() -> Arc<ProviderRegistry> {
    GLOBAL
        .get_or_init(|| Arc::new(ProviderRegistry::new(None, Vec::new())))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tool: &str, name: &str, patterns: &[&str]) -> ProviderEntry {
        ProviderEntry {
            tool: tool.to_string(),
            scope: ProviderScope::Builtin,
            manifest: ProviderManifest {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                url_patterns: patterns.iter().map(|s| s.to_string()).collect(),
                requires_env: Vec::new(),
                config_schema: None,
                wasm_module: None,
            },
        }
    }

    #[test]
    fn matches_specific_over_wildcard() {
        let registry = ProviderRegistry::new(
            None,
            vec![
                entry("search", "wildcard", &["*"]),
                entry("search", "google", &["*.google.com/search*"]),
            ],
        );
        let matched = registry.match_url("search", "www.google.com/search?q=x").unwrap();
        assert_eq!(matched.manifest.name, "google");
    }

    #[test]
    fn missing_env_is_reported() {
        let mut e = entry("search", "needs-key", &["*"]);
        e.manifest.requires_env = vec!["KURT_TEST_UNSET_VAR_XYZ".to_string()];
        let registry = ProviderRegistry::new(None, vec![e]);
        assert_eq!(
            registry.validate("search", "needs-key"),
            vec!["KURT_TEST_UNSET_VAR_XYZ".to_string()]
        );
    }

    #[test]
    fn no_match_is_not_found() {
        let registry = ProviderRegistry::new(None, vec![entry("search", "google", &["*.google.com/*"])]);
        let result = registry.match_url("search", "www.bing.com/search");
        assert!(matches!(result, Err(ProviderError::NoUrlMatch { .. })));
    }

    #[test]
    fn get_checked_reports_available_names_when_missing() {
        let registry = ProviderRegistry::new(None, vec![entry("search", "google", &["*"])]);
        let err = registry.get_checked("search", "bing").unwrap_err();
        match err {
            ProviderError::NotFound { tool, name, available } => {
                assert_eq!(tool, "search");
                assert_eq!(name, "bing");
                assert_eq!(available, vec!["google".to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn get_checked_reports_missing_requirements() {
        let mut e = entry("search", "needs-key", &["*"]);
        e.manifest.requires_env = vec!["KURT_TEST_UNSET_VAR_XYZ".to_string()];
        let registry = ProviderRegistry::new(None, vec![e]);
        let err = registry.get_checked("search", "needs-key").unwrap_err();
        assert!(matches!(err, ProviderError::Requirements { .. }));
    }

    #[test]
    fn get_checked_succeeds_when_requirements_met() {
        let registry = ProviderRegistry::new(None, vec![entry("search", "google", &["*"])]);
        let entry = registry.get_checked("search", "google").unwrap();
        assert_eq!(entry.manifest.name, "google");
    }

    #[test]
    fn validate_config_passes_when_provider_has_no_schema() {
        let registry = ProviderRegistry::new(None, vec![entry("search", "google", &["*"])]);
        assert!(registry
            .validate_config("search", "google", &serde_json::json!({"anything": true}))
            .is_ok());
    }

    #[test]
    fn validate_config_rejects_value_failing_the_schema() {
        let mut e = entry("search", "needs-key", &["*"]);
        e.manifest.config_schema = Some(serde_json::json!({
            "type": "object",
            "required": ["api_key"],
            "properties": {"api_key": {"type": "string"}}
        }));
        let registry = ProviderRegistry::new(None, vec![e]);
        let err = registry
            .validate_config("search", "needs-key", &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, ProviderError::ConfigSchema { .. }));

        assert!(registry
            .validate_config("search", "needs-key", &serde_json::json!({"api_key": "sk-1"}))
            .is_ok());
    }
}
