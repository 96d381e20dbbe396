//! Config Resolver: layered fallback-chain resolution for model tunables.
//!
//! Resolution order (first hit wins): explicit override -> project file
//! step-key -> user file step-key -> workflow-level key (if opted in) ->
//! global env fallback key -> declared default.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::Config;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::error::ConfigError;

/// Declares where a single tunable comes from and how to fall back.
#[derive(Debug, Clone)]
pub struct ConfigField<T> {
    /// Dotted key under `[tool.<tool>]`, e.g. `"max_results"`.
    pub key: &'static str,
    /// Whether a workflow-level `[workflow.<field>]` value is consulted
    /// before falling back to the global env key.
    pub workflow_fallback: bool,
    /// Environment variable consulted as the last resort before `default`.
    pub global_env_key: Option<&'static str>,
    pub default: T,
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> ConfigField<T> {
    #[must_use]
    pub const fn new(key: &'static str, default: T) -> Self {
        Self {
            key,
            workflow_fallback: false,
            global_env_key: None,
            default,
            min: None,
            max: None,
        }
    }
}

/// Values resolvable from TOML config and environment by `ConfigResolver`.
pub trait CoerceConfig: Sized + PartialOrd + ToString {
    fn coerce(raw: &config::Value) -> Option<Self>;
    fn coerce_str(raw: &str) -> Option<Self>;
    const TYPE_NAME: &'static str;
}

impl CoerceConfig for String {
    fn coerce(raw: &config::Value) -> Option<Self> {
        raw.clone().into_string().ok()
    }
    fn coerce_str(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
    const TYPE_NAME: &'static str = "string";
}

impl CoerceConfig for i64 {
    fn coerce(raw: &config::Value) -> Option<Self> {
        raw.clone().into_int().ok()
    }
    fn coerce_str(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
    const TYPE_NAME: &'static str = "integer";
}

impl CoerceConfig for f64 {
    fn coerce(raw: &config::Value) -> Option<Self> {
        raw.clone().into_float().ok()
    }
    fn coerce_str(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
    const TYPE_NAME: &'static str = "float";
}

impl CoerceConfig for bool {
    fn coerce(raw: &config::Value) -> Option<Self> {
        raw.clone().into_bool().ok()
    }
    fn coerce_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    }
    const TYPE_NAME: &'static str = "bool";
}

struct Files {
    project: Option<Config>,
    user: Option<Config>,
}

fn load_toml(path: &Path) -> Option<Config> {
    match Config::builder()
        .add_source(config::File::from(path).required(false))
        .build()
    {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Process-wide cache of parsed config files, guarded by a mutex since
/// reloads are rare and reads happen on the hot path of every step.
pub struct ConfigResolver {
    files: Mutex<Files>,
    project_path: PathBuf,
    user_path: PathBuf,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(project_path: PathBuf, user_path: PathBuf) -> Self {
        let project = load_toml(&project_path);
        let user = load_toml(&user_path);
        Self {
            files: Mutex::new(Files { project, user }),
            project_path,
            user_path,
        }
    }

    #[must_use]
    pub fn for_project(project_root: &Path) -> Self {
        let user_path = std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join(".kurt/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".kurt/config.toml"));
        Self::new(project_root.join("kurt.toml"), user_path)
    }

    /// Reload both files from disk (used after an external edit in tests
    /// or long-running processes).
    pub fn reload(&self) {
        let project = load_toml(&self.project_path);
        let user = load_toml(&self.user_path);
        let mut files = self.files.lock();
        files.project = project;
        files.user = user;
    }

    fn lookup(cfg: &Config, tool: &str, step: Option<&str>, key: &str) -> Option<config::Value> {
        if let Some(step) = step {
            if let Ok(v) = cfg.get::<config::Value>(&format!("tool.{tool}.steps.{step}.{key}")) {
                return Some(v);
            }
        }
        cfg.get::<config::Value>(&format!("tool.{tool}.{key}")).ok()
    }

    /// Resolve a single tunable for `tool`/`step_name`, honoring the full
    /// fallback chain and applying declared bounds.
    pub fn resolve<T: CoerceConfig + Clone>(
        &self,
        tool: &str,
        step_name: &str,
        workflow_name: Option<&str>,
        field: &ConfigField<T>,
        override_value: Option<T>,
    ) -> Result<T, ConfigError> {
        if let Some(v) = override_value {
            return self.check_bounds(field, v);
        }

        let files = self.files.lock();

        if let Some(cfg) = &files.project {
            if let Some(raw) = Self::lookup(cfg, tool, Some(step_name), field.key) {
                let v = T::coerce(&raw).ok_or_else(|| ConfigError::Coercion {
                    field: field.key.to_string(),
                    expected_type: T::TYPE_NAME,
                })?;
                return self.check_bounds(field, v);
            }
        }

        if let Some(cfg) = &files.user {
            if let Some(raw) = Self::lookup(cfg, tool, Some(step_name), field.key) {
                let v = T::coerce(&raw).ok_or_else(|| ConfigError::Coercion {
                    field: field.key.to_string(),
                    expected_type: T::TYPE_NAME,
                })?;
                return self.check_bounds(field, v);
            }
        }

        if field.workflow_fallback {
            if let Some(workflow_name) = workflow_name {
                if let Some(cfg) = &files.project {
                    if let Ok(raw) =
                        cfg.get::<config::Value>(&format!("workflow.{workflow_name}.{}", field.key))
                    {
                        let v = T::coerce(&raw).ok_or_else(|| ConfigError::Coercion {
                            field: field.key.to_string(),
                            expected_type: T::TYPE_NAME,
                        })?;
                        return self.check_bounds(field, v);
                    }
                }
            }
        }

        if let Some(env_key) = field.global_env_key {
            if let Ok(raw) = std::env::var(env_key) {
                let v = T::coerce_str(&raw).ok_or_else(|| ConfigError::Coercion {
                    field: field.key.to_string(),
                    expected_type: T::TYPE_NAME,
                })?;
                return self.check_bounds(field, v);
            }
        }

        self.check_bounds(field, field.default.clone())
    }

    fn check_bounds<T: CoerceConfig>(&self, field: &ConfigField<T>, v: T) -> Result<T, ConfigError> {
        if let Some(min) = &field.min {
            if v < *min {
                return Err(ConfigError::OutOfBounds {
                    field: field.key.to_string(),
                    value: v.to_string(),
                    min: min.to_string(),
                    max: field
                        .max
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                });
            }
        }
        if let Some(max) = &field.max {
            if v > *max {
                return Err(ConfigError::OutOfBounds {
                    field: field.key.to_string(),
                    value: v.to_string(),
                    min: field
                        .min
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    max: max.to_string(),
                });
            }
        }
        Ok(v)
    }
}

static GLOBAL: OnceCell<Mutex<Option<Arc<ConfigResolver>>>> = OnceCell::new();

fn global_slot() -> &'static Mutex<Option<Arc<ConfigResolver>>> {
    GLOBAL.get_or_init(|| Mutex::new(None))
}

/// Process-wide `ConfigResolver`, initialized against `project_root` on
/// first access.
#[must_use]
pub fn global(project_root: &Path) -> Arc<ConfigResolver> {
    let mut slot = global_slot().lock();
    if let Some(existing) = &*slot {
        return existing.clone();
    }
    let resolver = Arc::new(ConfigResolver::for_project(project_root));
    *slot = Some(resolver.clone());
    resolver
}

/// Test-only: drop the cached global resolver so the next `global()` call
/// re-reads files from disk.
#[cfg(test)]
pub fn reset_for_test() {
    *global_slot().lock() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        write!(f, "{body}").unwrap();
    }

    #[test]
    fn default_is_used_when_nothing_configured() {
        let dir = std::env::temp_dir().join("kurt-cfg-test-default");
        std::fs::remove_dir_all(&dir).ok();
        let resolver = ConfigResolver::new(dir.join("kurt.toml"), dir.join("user.toml"));
        let field = ConfigField::new("max_results", 10i64);
        let v = resolver.resolve("search", "fetch_results", None, &field, None).unwrap();
        assert_eq!(v, 10);
    }

    #[test]
    fn project_file_overrides_default() {
        let dir = std::env::temp_dir().join("kurt-cfg-test-project");
        std::fs::remove_dir_all(&dir).ok();
        write_toml(
            &dir.join("kurt.toml"),
            "[tool.search.steps.fetch_results]\nmax_results = 50\n",
        );
        let resolver = ConfigResolver::new(dir.join("kurt.toml"), dir.join("user-missing.toml"));
        let field = ConfigField::new("max_results", 10i64);
        let v = resolver.resolve("search", "fetch_results", None, &field, None).unwrap();
        assert_eq!(v, 50);
    }

    #[test]
    fn explicit_override_wins_over_everything() {
        let dir = std::env::temp_dir().join("kurt-cfg-test-override");
        std::fs::remove_dir_all(&dir).ok();
        write_toml(
            &dir.join("kurt.toml"),
            "[tool.search.steps.fetch_results]\nmax_results = 50\n",
        );
        let resolver = ConfigResolver::new(dir.join("kurt.toml"), dir.join("user-missing.toml"));
        let field = ConfigField::new("max_results", 10i64);
        let v = resolver
            .resolve("search", "fetch_results", None, &field, Some(99))
            .unwrap();
        assert_eq!(v, 99);
    }

    #[test]
    fn out_of_bounds_value_is_rejected() {
        let dir = std::env::temp_dir().join("kurt-cfg-test-bounds");
        std::fs::remove_dir_all(&dir).ok();
        let resolver = ConfigResolver::new(dir.join("kurt.toml"), dir.join("user.toml"));
        let mut field = ConfigField::new("max_results", 10i64);
        field.max = Some(5);
        let result = resolver.resolve("search", "fetch_results", None, &field, Some(100));
        assert!(matches!(result, Err(ConfigError::OutOfBounds { .. })));
    }

    #[test]
    fn resolution_is_deterministic() {
        let dir = std::env::temp_dir().join("kurt-cfg-test-deterministic");
        std::fs::remove_dir_all(&dir).ok();
        write_toml(
            &dir.join("kurt.toml"),
            "[tool.search.steps.fetch_results]\nmax_results = 7\n",
        );
        let resolver = ConfigResolver::new(dir.join("kurt.toml"), dir.join("user-missing.toml"));
        let field = ConfigField::new("max_results", 10i64);
        let a = resolver.resolve("search", "fetch_results", None, &field, None).unwrap();
        let b = resolver.resolve("search", "fetch_results", None, &field, None).unwrap();
        assert_eq!(a, b);
    }
}
