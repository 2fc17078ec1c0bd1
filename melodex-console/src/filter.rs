//! Client-side filter predicate
//!
//! Criteria are the current search/filter inputs keyed by filter name. A
//! record passes when it satisfies every active criterion; empty values and
//! the `all` sentinel are inactive and never exclude anything.

use melodex_common::Record;
use std::collections::BTreeMap;

/// Dropdown value meaning "no restriction"
pub const ALL_SENTINEL: &str = "all";

/// How a criterion value is compared with record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive substring over any of the listed fields
    Contains,
    /// Numeric equality after coercion, string equality otherwise
    Equals,
    /// Value appears in an id-list field
    Member,
}

/// Filter declared by a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub key: &'static str,
    pub fields: &'static [&'static str],
    pub kind: MatchKind,
}

impl FilterField {
    pub const fn contains(key: &'static str, fields: &'static [&'static str]) -> Self {
        Self { key, fields, kind: MatchKind::Contains }
    }

    pub const fn equals(key: &'static str, field: &'static [&'static str]) -> Self {
        Self { key, fields: field, kind: MatchKind::Equals }
    }

    pub const fn member(key: &'static str, field: &'static [&'static str]) -> Self {
        Self { key, fields: field, kind: MatchKind::Member }
    }

    fn accepts(&self, record: &Record, value: &str) -> bool {
        match self.kind {
            MatchKind::Contains => {
                let needle = value.to_lowercase();
                self.fields.iter().any(|field| {
                    record
                        .get_str(field)
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
            MatchKind::Equals => self.fields.iter().any(|field| {
                match value.trim().parse::<i64>() {
                    Ok(wanted) => record.get_i64(field) == Some(wanted),
                    Err(_) => record
                        .get_str(field)
                        .map(|text| text.trim() == value.trim())
                        .unwrap_or(false),
                }
            }),
            MatchKind::Member => match value.trim().parse::<i64>() {
                Ok(wanted) => self.fields.iter().any(|field| {
                    record
                        .get_id_list(field)
                        .map(|ids| ids.contains(&wanted))
                        .unwrap_or(false)
                }),
                Err(_) => false,
            },
        }
    }
}

/// Current filter inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    values: BTreeMap<String, String>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set one criterion; returns whether the effective criteria changed
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        let before = self.active_value(&key).map(str::to_string);
        if is_active(&value) {
            self.values.insert(key.clone(), value);
        } else {
            self.values.remove(&key);
        }
        before.as_deref() != self.active_value(&key)
    }

    pub fn clear(&mut self) -> bool {
        let had_any = !self.values.is_empty();
        self.values.clear();
        had_any
    }

    pub fn active_value(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| is_active(v))
    }

    /// Active criteria, in key order
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(_, v)| is_active(v))
            .map(|(k, v)| (k.as_str(), v.trim()))
    }

    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Active criteria as query parameters for server-side filtering
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.active()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

fn is_active(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(ALL_SENTINEL)
}

/// Whether `record` satisfies every active criterion the screen declares
///
/// Criteria keys without a declared field are skipped here; they only
/// matter for server-side filtering.
pub fn matches(record: &Record, criteria: &Criteria, fields: &[FilterField]) -> bool {
    criteria.active().all(|(key, value)| {
        match fields.iter().find(|f| f.key == key) {
            Some(field) => field.accepts(record, value),
            None => true,
        }
    })
}

/// Records passing [`matches`], in original order
pub fn apply(records: &[Record], criteria: &Criteria, fields: &[FilterField]) -> Vec<Record> {
    if criteria.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches(r, criteria, fields))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &[FilterField] = &[
        FilterField::contains("name", &["name"]),
        FilterField::contains("keyword", &["name", "singerName"]),
        FilterField::equals("status", &["status"]),
        FilterField::member("singer", &["singerIds"]),
    ];

    fn rec(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn songs() -> Vec<Record> {
        vec![
            rec(json!({"id": 1, "name": "Blue Moon", "singerName": "Ella", "status": 0, "singerIds": [3, 4]})),
            rec(json!({"id": 2, "name": "Red Sky", "singerName": "Nat", "status": 1, "singerIds": "4,5"})),
            rec(json!({"id": 3, "name": "Moonlight", "singerName": "Ella", "status": "0"})),
        ]
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let list = songs();
        assert_eq!(apply(&list, &Criteria::new(), FIELDS), list);
    }

    #[test]
    fn test_all_sentinel_and_blank_are_inactive() {
        let list = songs();
        let criteria = Criteria::new().with("status", "All").with("name", "   ");
        assert!(criteria.is_empty());
        assert_eq!(apply(&list, &criteria, FIELDS), list);
    }

    #[test]
    fn test_name_substring_case_insensitive() {
        let criteria = Criteria::new().with("name", "MOON");
        let found = apply(&songs(), &criteria, FIELDS);
        let ids: Vec<_> = found.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_keyword_matches_any_field() {
        let criteria = Criteria::new().with("keyword", "nat");
        let found = apply(&songs(), &criteria, FIELDS);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), Some(2));
    }

    #[test]
    fn test_status_equality_coerces() {
        let list = vec![
            rec(json!({"id": 1, "status": 0})),
            rec(json!({"id": 2, "status": 1})),
            rec(json!({"id": 3, "status": 0})),
        ];
        let found = apply(&list, &Criteria::new().with("status", "0"), FIELDS);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.get_i64("status") == Some(0)));
    }

    #[test]
    fn test_member_in_id_list() {
        let found = apply(&songs(), &Criteria::new().with("singer", "4"), FIELDS);
        let ids: Vec<_> = found.iter().filter_map(Record::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_missing_field_fails_closed() {
        // record 3 has no singerIds
        let criteria = Criteria::new().with("singer", "3");
        assert!(!matches(&songs()[2], &criteria, FIELDS));
        let bare = rec(json!({"id": 9}));
        assert!(!matches(&bare, &Criteria::new().with("name", "x"), FIELDS));
    }

    #[test]
    fn test_conjunction() {
        let criteria = Criteria::new().with("name", "moon").with("status", "0");
        assert_eq!(apply(&songs(), &criteria, FIELDS).len(), 2);
        let criteria = criteria.with("singer", "3");
        assert_eq!(apply(&songs(), &criteria, FIELDS).len(), 1);
    }

    #[test]
    fn test_undeclared_key_ignored_locally_but_forwarded() {
        let criteria = Criteria::new().with("tagId", "7");
        assert_eq!(apply(&songs(), &criteria, FIELDS).len(), 3);
        assert_eq!(criteria.query_params(), vec![("tagId".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_set_reports_change() {
        let mut criteria = Criteria::new();
        assert!(criteria.set("name", "a"));
        assert!(!criteria.set("name", "a"));
        assert!(criteria.set("name", "all"));
        assert!(!criteria.set("name", ""));
    }
}
