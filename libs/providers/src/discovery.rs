//! Three-scope provider discovery: built-in < user < project.
//!
//! User scope: `$HOME/.kurt/tools/<tool>/providers/<name>/provider.toml`
//! Project scope: `<project>/kurt/tools/<tool>/providers/<name>/provider.toml`

use std::path::{Path, PathBuf};

use crate::manifest::{ProviderManifest, ProviderScope};

pub struct DiscoveredProvider {
    pub tool: String,
    pub scope: ProviderScope,
    pub manifest: ProviderManifest,
    pub dir: PathBuf,
}

fn scan_tools_dir(root: &Path, scope: ProviderScope) -> Vec<DiscoveredProvider> {
    let mut found = Vec::new();
    let Ok(tools) = std::fs::read_dir(root) else {
        return found;
    };
    for tool_entry in tools.flatten() {
        let Ok(tool_name) = tool_entry.file_name().into_string() else {
            continue;
        };
        let providers_dir = tool_entry.path().join("providers");
        let Ok(providers) = std::fs::read_dir(&providers_dir) else {
            continue;
        };
        for provider_entry in providers.flatten() {
            let manifest_path = provider_entry.path().join("provider.toml");
            let Ok(src) = std::fs::read_to_string(&manifest_path) else {
                continue;
            };
            match ProviderManifest::from_toml(&src) {
                Ok(manifest) => found.push(DiscoveredProvider {
                    tool: tool_name.clone(),
                    scope,
                    manifest,
                    dir: provider_entry.path(),
                }),
                Err(e) => {
                    tracing::warn!(
                        path = %manifest_path.display(),
                        error = %e,
                        "skipping unparseable provider manifest"
                    );
                }
            }
        }
    }
    found
}

/// Discover user-scope providers under `$HOME/.kurt/tools/`.
#[must_use]
pub fn discover_user_providers() -> Vec<DiscoveredProvider> {
    let Some(home) = dirs_home() else {
        return Vec::new();
    };
    scan_tools_dir(&home.join(".kurt/tools"), ProviderScope::User)
}

/// Discover project-scope providers under `<project>/kurt/tools/`.
#[must_use]
pub fn discover_project_providers(project_root: &Path) -> Vec<DiscoveredProvider> {
    scan_tools_dir(&project_root.join("kurt/tools"), ProviderScope::Project)
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn discovers_a_project_provider() {
        let dir = std::env::temp_dir().join(format!("kurt-test-{}", uuid::Uuid::new_v4()));
        let provider_dir = dir.join("kurt/tools/search/providers/serpapi");
        std::fs::create_dir_all(&provider_dir).unwrap();
        let mut f = std::fs::File::create(provider_dir.join("provider.toml")).unwrap();
        writeln!(f, "name = \"serpapi\"\nurl_patterns = [\"*\"]").unwrap();

        let found = discover_project_providers(&dir);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tool, "search");
        assert_eq!(found[0].manifest.name, "serpapi");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_yields_empty() {
        let dir = std::env::temp_dir().join(format!("kurt-test-missing-{}", uuid::Uuid::new_v4()));
        assert!(discover_project_providers(&dir).is_empty());
    }
}
