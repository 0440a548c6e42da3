//! Process configuration: env vars the core recognizes (spec.md §6
//! "Configuration") loaded through `env_config::load_and_apply` (XDG
//! `config.toml` + project `.env`, existing process env taking priority).

use std::path::PathBuf;
use std::time::Duration;

use engine::ExecutorConfig;

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// Everything the HTTP surface and its `Executor` need, assembled once at
/// startup from environment variables (spec.md §6 "Configuration",
/// "Environment variables consumed by the core").
pub struct ServerConfig {
    pub bind_addr: String,
    pub workspace_root: PathBuf,
    pub checkpoint_db_path: PathBuf,
    pub plugin_dir: Option<PathBuf>,
    /// Outer per-HTTP-request ceiling; spec.md §5 only names LLM/tool/checkpoint
    /// deadlines as the engine's own suspension points, so this is read and
    /// carried for an operator's outer reverse-proxy/load-balancer layer
    /// rather than enforced inside the core itself.
    pub request_timeout: Duration,
    pub tool_timeout: Duration,
    pub llm_timeout: Duration,
    pub executor: ExecutorConfig,
    pub primary_model: String,
    pub secondary_model: String,
    /// `API_KEY`, consumed by outer middleware (spec.md §6: "not part of the
    /// core contract") — the core still reads it so a deployment can turn on
    /// a bearer-token check without a second config surface.
    pub api_key: Option<String>,
}

impl ServerConfig {
    /// Loads `env_config`'s XDG/`.env` layers (lowest priority first) then
    /// reads every recognized variable, falling back to spec.md §4.5/§4.6's
    /// defaults (`MAX_TURNS=50`, `MAX_RETRIES=3`) where unset.
    pub fn from_env() -> Self {
        if let Err(err) = env_config::load_and_apply("orchestrator", None) {
            tracing::warn!(error = %err, "failed to load XDG/.env config layers, continuing with process env only");
        }

        let tool_timeout = Duration::from_secs(env_u64("TOOL_TIMEOUT_SECS", 30));
        let mut executor = ExecutorConfig {
            workspace_root: env_path("WORKSPACE_ROOT", "./workspace"),
            max_turns: env_u32("MAX_TURNS", 50),
            max_retries: env_u32("MAX_RETRIES", 3),
            max_tool_iterations: env_u32("MAX_TOOL_ITERATIONS", 8) as usize,
            circuit_threshold: env_u32("CIRCUIT_BREAKER_THRESHOLD", 3),
            circuit_cooldown: Duration::from_secs(env_u64("CIRCUIT_BREAKER_COOLDOWN_SECS", 60)),
            tool_timeout,
        };
        // ExecutorConfig::workspace_root is authoritative; keep the two copies in sync.
        let workspace_root = executor.workspace_root.clone();
        executor.workspace_root = workspace_root.clone();

        Self {
            bind_addr: std::env::var("PORT")
                .ok()
                .map(|p| format!("0.0.0.0:{p}"))
                .unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            workspace_root,
            checkpoint_db_path: env_path("CHECKPOINT_DB_PATH", "checkpoints.db"),
            plugin_dir: std::env::var("PLUGIN_DIR").ok().map(PathBuf::from),
            request_timeout: Duration::from_secs(env_u64("REQUEST_TIMEOUT_SECS", 120)),
            tool_timeout,
            llm_timeout: Duration::from_secs(env_u64("LLM_TIMEOUT_SECS", 60)),
            executor,
            primary_model: std::env::var("PRIMARY_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            secondary_model: std::env::var("SECONDARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_key: std::env::var("API_KEY").ok(),
        }
    }
}
