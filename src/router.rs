use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::extractors::Extractor;

/// Owned view of a successful pattern match, detached from the borrowed
/// `Captures` so the worklist can outlive routing.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The full input string.
    pub input: String,
    /// The prefix the pattern actually matched.
    pub matched: String,
    groups: HashMap<String, String>,
}

impl RouteMatch {
    pub fn from_captures(input: &str, pattern: &Regex, caps: &regex::Captures<'_>) -> Self {
        let mut groups = HashMap::new();
        for name in pattern.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                groups.insert(name.to_string(), m.as_str().to_string());
            }
        }
        Self {
            input: input.to_string(),
            matched: caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
            groups,
        }
    }

    /// Named capture group, if it participated in the match.
    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }
}

/// Builds the worklist: for each extractor, its first matching pattern wins
/// and contributes one work item. Patterns are prefix matches: query strings
/// or other trailing text after a recognized URL still route.
/// Several extractors matching the same input is normal; all of them run.
pub fn route(
    extractors: &[Arc<dyn Extractor>],
    input: &str,
) -> Vec<(Arc<dyn Extractor>, RouteMatch)> {
    let mut worklist = Vec::new();
    for extractor in extractors {
        for pattern in extractor.patterns() {
            if let Some(caps) = pattern.captures(input) {
                if caps.get(0).map(|m| m.start()) != Some(0) {
                    continue;
                }
                debug!(kind = %extractor.kind(), input, "route match");
                worklist.push((extractor.clone(), RouteMatch::from_captures(input, pattern, &caps)));
                break;
            }
        }
    }
    worklist
}
