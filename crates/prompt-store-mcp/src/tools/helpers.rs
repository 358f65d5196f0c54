//! Shared helper functions for MCP tool implementations.

/// Treat empty and whitespace-only strings the same as an absent argument.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Working directory recorded when the caller does not supply a path.
pub fn default_path() -> Option<String> {
    std::env::current_dir()
        .ok()
        .map(|dir| dir.display().to_string())
}
