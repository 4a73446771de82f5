use std::collections::BTreeMap;

use crate::catalog::PatternName;

/// First catalog pattern whose conditions all hold for the known filter
/// values, else the shape implied by a well-known transaction type.
pub(crate) fn detect(known: &BTreeMap<String, String>) -> Option<PatternName> {
    let matched = PatternName::ALL.into_iter().find(|pattern| {
        pattern
            .conditions()
            .iter()
            .all(|(key, expect)| known.get(*key).is_some_and(|v| expect.matches(v)))
    });
    matched.or_else(|| {
        known
            .get("type")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(PatternName::for_transaction_type)
    })
}
