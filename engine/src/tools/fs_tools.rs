//! Filesystem tools: read, write, list, glob, grep — all sandboxed to the
//! workspace root via [`ToolCallContext::resolve`].
//!
//! `ReadFileTool` produces cat-n-style numbered output; `ListDirTool` walks
//! recursively via `walkdir` with a default ignore set; `GlobTool` matches via
//! the `glob` crate. `GrepTool` is built on the `grep-regex`/`grep-searcher`/
//! `ignore` crates — the same stack ripgrep itself is built from.

use std::path::Path;

use async_trait::async_trait;
use glob::Pattern;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::{ToolCallContext, ToolError};
use crate::tools::Tool;

const DEFAULT_READ_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;
const LIST_LIMIT: usize = 200;

const IGNORE_DIRS: &[&str] = &[
    "node_modules", "__pycache__", ".git", "dist", "build", "target", "vendor", ".venv",
];

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArgs(format!("missing `{key}`")))
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read a text file under the workspace. Output is cat -n style, optionally windowed by offset/limit."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer", "minimum": 0},
                "limit": {"type": "integer", "minimum": 1}
            },
            "required": ["path"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let path = ctx.resolve(require_str(&args, "path")?)?;
        if !path.exists() {
            return Err(ToolError::NotFound(path.display().to_string()));
        }
        if path.is_dir() {
            return Err(ToolError::InvalidArgs(format!("is a directory: {}", path.display())));
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        let offset = args.get("offset").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_READ_LIMIT as u64) as usize;

        let lines: Vec<&str> = content.split('\n').collect();
        let start = offset.min(lines.len());
        let end = (start + limit).min(lines.len());

        let mut out = String::new();
        for (i, line) in lines[start..end].iter().enumerate() {
            let line_num = start + i + 1;
            if line.len() > MAX_LINE_LENGTH {
                let truncated: String = line.chars().take(MAX_LINE_LENGTH).collect();
                out.push_str(&format!("  {line_num}\t{truncated}...\n"));
            } else {
                out.push_str(&format!("  {line_num}\t{line}\n"));
            }
        }
        Ok(out)
    }
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Write (overwrite) a text file under the workspace, creating parent directories as needed."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let path = ctx.resolve(require_str(&args, "path")?)?;
        let content = require_str(&args, "content")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(format!("wrote {} bytes to {}", content.len(), path.display()))
    }
}

pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }
    fn description(&self) -> &str {
        "List files recursively under a workspace directory, skipping common build/dependency directories."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "directory relative to workspace root, default '.'"}
            }
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let root = ctx.resolve(path_param)?;
        if !root.is_dir() {
            return Err(ToolError::InvalidArgs(format!("not a directory: {}", root.display())));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && IGNORE_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(rel) = entry.path().strip_prefix(&root) {
                files.push(rel.to_string_lossy().replace('\\', "/"));
            }
            if files.len() >= LIST_LIMIT {
                break;
            }
        }
        files.sort();
        Ok(files.join("\n"))
    }
}

pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }
    fn description(&self) -> &str {
        "List files under a workspace directory matching a glob pattern."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string", "description": "search root relative to workspace, default '.'"}
            },
            "required": ["pattern"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let pattern_str = require_str(&args, "pattern")?;
        let pattern = Pattern::new(pattern_str)
            .map_err(|e| ToolError::InvalidArgs(format!("invalid glob pattern: {e}")))?;
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let search_root = ctx.resolve(path_param)?;
        if !search_root.is_dir() {
            return Err(ToolError::InvalidArgs(format!("not a directory: {}", search_root.display())));
        }

        let mut matched: Vec<String> = WalkDir::new(&search_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&search_root).ok()?;
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                pattern.matches(&rel_str).then_some(rel_str)
            })
            .collect();
        matched.sort();
        Ok(matched.join("\n"))
    }
}

pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Search file contents under the workspace for a regular expression, respecting .gitignore."
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string", "description": "search root relative to workspace, default '.'"}
            },
            "required": ["pattern"]
        })
    }

    async fn call(&self, args: Value, ctx: &ToolCallContext) -> Result<String, ToolError> {
        let pattern_str = require_str(&args, "pattern")?.to_string();
        let path_param = args.get("path").and_then(|v| v.as_str()).unwrap_or(".").to_string();
        let search_root = ctx.resolve(&path_param)?;
        if !search_root.is_dir() {
            return Err(ToolError::InvalidArgs(format!("not a directory: {}", search_root.display())));
        }
        let workspace_root = search_root.clone();

        tokio::task::spawn_blocking(move || grep_dir(&workspace_root, &pattern_str))
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
    }
}

fn grep_dir(root: &Path, pattern: &str) -> Result<String, ToolError> {
    let matcher = grep_regex::RegexMatcher::new(pattern)
        .map_err(|e| ToolError::InvalidArgs(format!("invalid regex: {e}")))?;
    let mut searcher = grep_searcher::Searcher::new();
    let mut out = String::new();

    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        let _ = searcher.search_path(
            &matcher,
            path,
            grep_searcher::sinks::UTF8(|line_num, line| {
                out.push_str(&format!("{rel}:{line_num}:{line}"));
                Ok(true)
            }),
        );
    }
    Ok(out)
}
