//! Context truncation policies (§4.4). Each policy is a pure function of
//! `(items, max_tokens)` — same input always produces the same output,
//! mirroring this repo's existing accumulate-then-cut-off truncation idiom
//! (budget walked in order, items past the cutoff dropped or marked).

use mcp_domain::context::{ContextItem, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationMethod {
    OldestFirst,
    PreserveUser,
    FallbackSystemFirst,
}

impl TruncationMethod {
    pub fn metadata_tag(&self) -> &'static str {
        match self {
            TruncationMethod::OldestFirst => "oldest_first",
            TruncationMethod::PreserveUser => "preserve_user",
            TruncationMethod::FallbackSystemFirst => "fallback_system_first",
        }
    }
}

fn sort_key(item: &ContextItem) -> (i64, &str) {
    (item.timestamp.timestamp(), item.id.as_str())
}

/// Drop items oldest-first (ties broken by id) until the remainder fits.
pub fn oldest_first(items: &[ContextItem], max_tokens: u32) -> Vec<ContextItem> {
    let mut sorted: Vec<&ContextItem> = items.iter().collect();
    sorted.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let total: u32 = items.iter().map(|i| i.tokens).sum();
    let mut dropped: u32 = 0;
    let mut excess = total.saturating_sub(max_tokens);

    let mut keep_ids = std::collections::HashSet::new();
    for item in &sorted {
        if excess == 0 {
            keep_ids.insert(item.id.clone());
            continue;
        }
        if item.tokens <= excess {
            excess -= item.tokens;
            dropped += item.tokens;
            continue;
        }
        keep_ids.insert(item.id.clone());
    }
    let _ = dropped;

    items
        .iter()
        .filter(|i| keep_ids.contains(&i.id))
        .cloned()
        .collect()
}

/// Drop oldest assistant items first, then oldest user items if still over
/// budget. System items are kept unless they alone exceed the budget, in
/// which case only the newest system items that fit survive.
pub fn preserve_user(items: &[ContextItem], max_tokens: u32) -> Vec<ContextItem> {
    let system_tokens: u32 = items
        .iter()
        .filter(|i| i.role == Role::System)
        .map(|i| i.tokens)
        .sum();

    if system_tokens > max_tokens {
        let mut system: Vec<&ContextItem> = items.iter().filter(|i| i.role == Role::System).collect();
        system.sort_by(|a, b| sort_key(b).cmp(&sort_key(a))); // newest first
        let mut kept = Vec::new();
        let mut budget = max_tokens;
        for item in system {
            if item.tokens <= budget {
                budget -= item.tokens;
                kept.push(item.clone());
            }
        }
        kept.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        return kept;
    }

    let mut remaining: Vec<ContextItem> = items.to_vec();
    let mut current: u32 = remaining.iter().map(|i| i.tokens).sum();

    for role in [Role::Assistant, Role::User] {
        if current <= max_tokens {
            break;
        }
        let mut candidates: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, i)| i.role == role)
            .map(|(idx, _)| idx)
            .collect();
        candidates.sort_by(|&a, &b| sort_key(&remaining[a]).cmp(&sort_key(&remaining[b])));

        for idx in candidates {
            if current <= max_tokens {
                break;
            }
            current -= remaining[idx].tokens;
            remaining[idx].metadata.insert("__dropped".into(), serde_json::Value::Bool(true));
        }
    }

    remaining.retain(|i| !i.metadata.contains_key("__dropped"));
    remaining
}

/// Keep all system items that fit (newest first), then append newest
/// non-system items that fit. Used when a standard policy itself errors.
pub fn emergency_fallback(items: &[ContextItem], max_tokens: u32) -> Vec<ContextItem> {
    let mut system: Vec<&ContextItem> = items.iter().filter(|i| i.role == Role::System).collect();
    system.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));

    let mut budget = max_tokens;
    let mut kept: Vec<ContextItem> = Vec::new();
    for item in system {
        if item.tokens <= budget {
            budget -= item.tokens;
            kept.push(item.clone());
        }
    }

    let mut rest: Vec<&ContextItem> = items.iter().filter(|i| i.role != Role::System).collect();
    rest.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
    for item in rest {
        if item.tokens <= budget {
            budget -= item.tokens;
            let mut clone = item.clone();
            clone
                .metadata
                .insert("truncation_method".into(), serde_json::Value::String(
                    TruncationMethod::FallbackSystemFirst.metadata_tag().into(),
                ));
            kept.push(clone);
        }
    }

    kept.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    kept
}

pub fn apply(
    method: TruncationMethod,
    items: &[ContextItem],
    max_tokens: u32,
) -> Vec<ContextItem> {
    match method {
        TruncationMethod::OldestFirst => oldest_first(items, max_tokens),
        TruncationMethod::PreserveUser => preserve_user(items, max_tokens),
        TruncationMethod::FallbackSystemFirst => emergency_fallback(items, max_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn item(id: &str, role: Role, tokens: u32, ts: i64) -> ContextItem {
        ContextItem {
            id: id.into(),
            role,
            content: format!("content-{id}"),
            tokens,
            timestamp: DateTime::<Utc>::from_timestamp(ts, 0).unwrap(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn oldest_first_drops_earliest() {
        let items = vec![
            item("a", Role::User, 10, 1),
            item("b", Role::User, 10, 2),
            item("c", Role::User, 10, 3),
        ];
        let kept = oldest_first(&items, 20);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn oldest_first_is_pure() {
        let items = vec![item("a", Role::User, 10, 1), item("b", Role::User, 10, 2)];
        let r1 = oldest_first(&items, 10);
        let r2 = oldest_first(&items, 10);
        assert_eq!(r1.len(), r2.len());
        assert_eq!(r1[0].id, r2[0].id);
    }

    #[test]
    fn preserve_user_drops_assistant_before_user() {
        let items = vec![
            item("sys", Role::System, 5, 1),
            item("asst", Role::Assistant, 10, 2),
            item("usr", Role::User, 10, 3),
        ];
        let kept = preserve_user(&items, 15);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"sys"));
        assert!(ids.contains(&"usr"));
        assert!(!ids.contains(&"asst"));
    }

    #[test]
    fn preserve_user_keeps_newest_system_when_system_alone_exceeds_budget() {
        let items = vec![
            item("sys-old", Role::System, 10, 1),
            item("sys-new", Role::System, 10, 2),
        ];
        let kept = preserve_user(&items, 10);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "sys-new");
    }

    #[test]
    fn emergency_fallback_tags_non_system_items() {
        let items = vec![
            item("sys", Role::System, 5, 1),
            item("usr", Role::User, 5, 2),
        ];
        let kept = emergency_fallback(&items, 10);
        let usr = kept.iter().find(|i| i.id == "usr").unwrap();
        assert_eq!(
            usr.metadata.get("truncation_method").and_then(|v| v.as_str()),
            Some("fallback_system_first")
        );
    }
}
