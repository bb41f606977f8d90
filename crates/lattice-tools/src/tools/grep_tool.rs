//! Grep tool — searches file contents by regular expression.

use std::fmt::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use walkdir::WalkDir;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

/// Maximum number of matching lines returned before truncation.
const MAX_MATCHES: usize = 200;

/// Built-in tool for searching file contents by regular expression.
pub struct GrepTool;

#[async_trait]
impl BuiltinTool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Searches file contents for a regular expression. Returns matching lines as \
         `path:line:content`, most recently modified files first. Optionally restrict \
         the search to files matching a glob with `include`."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in (defaults to workspace root)"
                },
                "include": {
                    "type": "string",
                    "description": "Glob restricting which files are searched (e.g. \"*.rs\")"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let pattern = args
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("pattern is required".into()))?;

        let search_dir = args
            .get("path")
            .and_then(Value::as_str)
            .map_or_else(|| ctx.workspace_root.clone(), PathBuf::from);

        if !search_dir.exists() {
            return Err(ToolError::PathNotFound(search_dir.display().to_string()));
        }
        let search_dir = search_dir.canonicalize()?;

        let include = args
            .get("include")
            .and_then(Value::as_str)
            .map(|p| {
                globset::GlobBuilder::new(p)
                    .literal_separator(false)
                    .build()
                    .map(|g| g.compile_matcher())
            })
            .transpose()
            .map_err(|e| ToolError::InvalidArguments(format!("invalid include pattern: {e}")))?;

        let regex = Regex::new(pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("invalid regex: {e}")))?;

        let mut entries: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        for entry in WalkDir::new(&search_dir).follow_links(false).into_iter().filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
        }) {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_dir() {
                continue;
            }
            let rel_path = entry.path().strip_prefix(&search_dir).unwrap_or(entry.path());
            if let Some(include) = &include {
                if !include.is_match(rel_path) {
                    continue;
                }
            }
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            entries.push((entry.path().to_path_buf(), mtime));
        }
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        let mut output = String::new();
        let mut matched = 0usize;
        'files: for (path, _) in &entries {
            let Ok(content) = tokio::fs::read_to_string(path).await else { continue };
            for (line_num, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    let _ = writeln!(output, "{}:{}:{line}", path.display(), line_num.saturating_add(1));
                    matched = matched.saturating_add(1);
                    if matched >= MAX_MATCHES {
                        let _ = write!(output, "\n(truncated at {MAX_MATCHES} matches)");
                        break 'files;
                    }
                }
            }
        }

        if matched == 0 {
            return Ok(format!("No matches for \"{pattern}\""));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_with_root(root: &std::path::Path) -> ToolContext {
        ToolContext::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn finds_matching_lines_with_location() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nstruct Foo;\n").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool.execute(serde_json::json!({"pattern": "struct \\w+"}), &ctx).await.unwrap();

        assert!(result.contains("a.rs:2:struct Foo;"));
    }

    #[tokio::test]
    async fn include_filter_restricts_search() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "needle").unwrap();
        std::fs::write(dir.path().join("b.txt"), "needle").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool
            .execute(serde_json::json!({"pattern": "needle", "include": "*.rs"}), &ctx)
            .await
            .unwrap();

        assert!(result.contains("a.rs"));
        assert!(!result.contains("b.txt"));
    }

    #[tokio::test]
    async fn no_matches_reports_clearly() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "hello").unwrap();

        let ctx = ctx_with_root(dir.path());
        let result = GrepTool.execute(serde_json::json!({"pattern": "needle"}), &ctx).await.unwrap();

        assert!(result.contains("No matches"));
    }

    #[tokio::test]
    async fn invalid_regex_is_rejected() {
        let ctx = ctx_with_root(&std::env::temp_dir());
        let result = GrepTool.execute(serde_json::json!({"pattern": "("}), &ctx).await;
        assert!(matches!(result.unwrap_err(), ToolError::InvalidArguments(_)));
    }
}
