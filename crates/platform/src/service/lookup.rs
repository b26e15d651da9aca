//! Resolve a base service name to the instance actually registered

use hotswap_errors::ServiceError;
use hotswap_types::{RegisteredService, StartMode};

use super::ServiceManager;

/// Whether a registered `name` belongs to the service family `pattern`.
///
/// A name matches when it equals the pattern, or when it starts with the
/// pattern followed by a character that is not an ASCII letter or digit
/// (`agent` matches `agent-1.2.0` and `agent_old`, not `agents`).
/// Comparison is ASCII case-insensitive.
#[must_use]
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if name.len() < pattern.len() || !name.is_char_boundary(pattern.len()) {
        return false;
    }
    let (head, tail) = name.split_at(pattern.len());
    if !head.eq_ignore_ascii_case(pattern) {
        return false;
    }
    match tail.chars().next() {
        None => true,
        Some(c) => !c.is_ascii_alphanumeric(),
    }
}

/// Find the registered service for `pattern`, skipping disabled services and
/// the exact name `exclude`. When several match, the last one listed wins.
///
/// The pid is queried fresh for the chosen service; nothing is cached.
///
/// # Errors
///
/// Returns an error if the registry cannot be listed or the pid cannot be
/// read.
pub async fn lookup(
    manager: &dyn ServiceManager,
    pattern: &str,
    exclude: Option<&str>,
) -> Result<Option<RegisteredService>, ServiceError> {
    let services = manager.list_services().await?;

    let found = services
        .into_iter()
        .filter(|entry| entry.start_mode != StartMode::Disabled)
        .filter(|entry| exclude.is_none_or(|ex| !entry.name.eq_ignore_ascii_case(ex)))
        .filter(|entry| matches_pattern(&entry.name, pattern))
        .last();

    match found {
        Some(entry) => {
            let process_id = manager.process_id(&entry.name).await?;
            Ok(Some(RegisteredService {
                name: entry.name,
                process_id,
            }))
        }
        None => Ok(None),
    }
}
