//! The fixed method surface the session core dispatches on (§4.7).

pub const INITIALIZE: &str = "initialize";

pub const TOOLS_LIST: &str = "tools/list";
pub const TOOLS_CALL: &str = "tools/call";
pub const TOOLS_BATCH: &str = "tools/batch";

pub const RESOURCES_LIST: &str = "resources/list";
pub const RESOURCES_READ: &str = "resources/read";

pub const PROMPTS_LIST: &str = "prompts/list";
pub const PROMPTS_GET: &str = "prompts/get";

pub const CONTEXTS_CREATE: &str = "contexts/create";
pub const CONTEXTS_GET: &str = "contexts/get";
pub const CONTEXTS_UPDATE: &str = "contexts/update";
pub const CONTEXTS_DELETE: &str = "contexts/delete";
pub const CONTEXTS_LIST: &str = "contexts/list";
pub const CONTEXTS_SEARCH: &str = "contexts/search";

pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";

pub const KNOWN_METHODS: &[&str] = &[
    INITIALIZE,
    TOOLS_LIST,
    TOOLS_CALL,
    TOOLS_BATCH,
    RESOURCES_LIST,
    RESOURCES_READ,
    PROMPTS_LIST,
    PROMPTS_GET,
    CONTEXTS_CREATE,
    CONTEXTS_GET,
    CONTEXTS_UPDATE,
    CONTEXTS_DELETE,
    CONTEXTS_LIST,
    CONTEXTS_SEARCH,
];

pub fn is_known_method(method: &str) -> bool {
    KNOWN_METHODS.contains(&method)
}

/// Per-method request deadline (§4.6 "every inbound request carries a
/// deadline"). `tools/batch` gets the longest allowance; everything else
/// falls back to the 30s default.
pub fn default_deadline_secs(method: &str) -> u64 {
    match method {
        TOOLS_CALL => 60,
        TOOLS_BATCH => 300,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_methods_recognized() {
        assert!(is_known_method(TOOLS_LIST));
        assert!(!is_known_method("bogus/method"));
    }

    #[test]
    fn deadlines_match_spec_defaults() {
        assert_eq!(default_deadline_secs(TOOLS_CALL), 60);
        assert_eq!(default_deadline_secs(TOOLS_BATCH), 300);
        assert_eq!(default_deadline_secs(CONTEXTS_GET), 30);
    }
}
