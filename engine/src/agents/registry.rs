use std::path::Path;

use dashmap::DashMap;

use super::entry::AgentEntry;
use super::error::AgentError;

/// Name → [`AgentEntry`] map, covering both the static built-in team and
/// agents loaded from plugin manifests at startup or reload (spec.md §4.1).
#[derive(Default)]
pub struct AgentRegistry {
    entries: DashMap<String, AgentEntry>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the registry with the static thirteen-member team.
    pub fn with_builtin_team() -> Result<Self, AgentError> {
        let registry = Self::new();
        for entry in super::team::builtin_team() {
            registry.register(entry)?;
        }
        Ok(registry)
    }

    pub fn register(&self, entry: AgentEntry) -> Result<(), AgentError> {
        if self.entries.contains_key(&entry.name) {
            return Err(AgentError::DuplicateName(entry.name));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<AgentEntry, AgentError> {
        self.entries
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// A snapshot of every registered entry (built-in team plus plugins),
    /// used by the executor to wire one graph node per agent at startup.
    pub fn all_entries(&self) -> Vec<AgentEntry> {
        let mut entries: Vec<AgentEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Formats the set of plugin entries into a block appended to the
    /// Router prompt, rebuilt live on every call so it always reflects the
    /// current plugin set (spec.md §9's open question: "the Router's schema
    /// must be rebuilt whenever plugins change").
    pub fn router_context(&self) -> String {
        let mut lines = Vec::new();
        for entry in self.entries.iter() {
            if !entry.value().is_plugin {
                continue;
            }
            lines.push(format!(
                "- {}: {} (hints: {})",
                entry.value().name,
                entry.value().role_description,
                entry.value().router_hints.join(", "),
            ));
        }
        lines.sort();
        lines.join("\n")
    }

    /// Loads plugin agents from a directory of YAML manifests, one agent per
    /// file. A manifest directory that can't be read at all is fatal (the
    /// operator misconfigured the path); an individual bad manifest inside it
    /// is not — it is logged and skipped, so one malformed plugin never takes
    /// down the whole registry (spec.md §4.1).
    pub fn load_plugins(&self, dir: &Path) -> Result<usize, AgentError> {
        let mut loaded = 0;
        let read_dir = std::fs::read_dir(dir).map_err(|e| AgentError::PluginLoad {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry, skipping");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read plugin manifest, skipping");
                    continue;
                }
            };
            let mut parsed: AgentEntry = match serde_yaml::from_str(&contents) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "invalid plugin manifest, skipping");
                    continue;
                }
            };
            parsed.is_plugin = true;
            self.entries.insert(parsed.name.clone(), parsed);
            loaded += 1;
        }
        Ok(loaded)
    }
}
