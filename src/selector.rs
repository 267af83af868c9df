// Copyright 2026, the confix authors
// SPDX-License-Identifier: Apache-2.0

//! `appliesTo` selector evaluation against target labels.

use std::collections::BTreeMap;

use crate::types::provider::LabelMatch;

/// Check whether a target's labels satisfy a provider's `appliesTo`
/// selector. Every key must be present on the target; a scalar value must
/// match exactly, a list value requires membership. An absent or empty
/// selector matches every target - that wildcard is intentional, not a
/// missing check.
pub fn matches(
    applies_to: Option<&BTreeMap<String, LabelMatch>>,
    labels: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(applies_to) = applies_to else {
        return true;
    };

    for (key, wanted) in applies_to {
        let Some(actual) = labels.and_then(|l| l.get(key)) else {
            return false;
        };
        let ok = match wanted {
            LabelMatch::Value(v) => actual == v,
            LabelMatch::In(set) => set.contains(actual),
        };
        if !ok {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn selector(pairs: Vec<(&str, LabelMatch)>) -> BTreeMap<String, LabelMatch> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_scalar_value_matches_exactly() {
        let sel = selector(vec![("app", LabelMatch::Value("web".to_string()))]);
        let lbl = labels(&[("app", "web")]);
        assert!(matches(Some(&sel), Some(&lbl)));
    }

    #[test]
    fn test_scalar_value_mismatch() {
        let sel = selector(vec![("app", LabelMatch::Value("web".to_string()))]);
        let lbl = labels(&[("app", "worker")]);
        assert!(!matches(Some(&sel), Some(&lbl)));
    }

    #[test]
    fn test_set_membership_matches() {
        let sel = selector(vec![(
            "tier",
            LabelMatch::In(vec!["a".to_string(), "b".to_string()]),
        )]);
        let lbl = labels(&[("tier", "b")]);
        assert!(matches(Some(&sel), Some(&lbl)));
    }

    #[test]
    fn test_set_membership_mismatch() {
        let sel = selector(vec![(
            "tier",
            LabelMatch::In(vec!["a".to_string(), "b".to_string()]),
        )]);
        let lbl = labels(&[("tier", "c")]);
        assert!(!matches(Some(&sel), Some(&lbl)));
    }

    #[test]
    fn test_missing_label_is_no_match() {
        let sel = selector(vec![("app", LabelMatch::Value("web".to_string()))]);
        let lbl = labels(&[("tier", "a")]);
        assert!(!matches(Some(&sel), Some(&lbl)));
        assert!(!matches(Some(&sel), None));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let sel = BTreeMap::new();
        assert!(matches(Some(&sel), Some(&labels(&[("app", "web")]))));
        assert!(matches(Some(&sel), None));
        assert!(matches(None, None));
    }

    #[test]
    fn test_all_keys_must_match() {
        let sel = selector(vec![
            ("app", LabelMatch::Value("web".to_string())),
            ("tier", LabelMatch::Value("frontend".to_string())),
        ]);
        let lbl = labels(&[("app", "web"), ("tier", "backend")]);
        assert!(!matches(Some(&sel), Some(&lbl)));
    }
}
