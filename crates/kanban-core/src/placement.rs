//! Status to column mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps tracker status names to board column names.
///
/// Statuses without an entry land in a column named after the status itself,
/// as do statuses mapped to a name that cannot be written as a heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, String>", into = "HashMap<String, String>")]
pub struct PlacementMap {
    entries: HashMap<String, String>,
}

impl PlacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Column names are trimmed so they compare equal to parsed headings.
    pub fn insert(&mut self, status: impl Into<String>, section: impl AsRef<str>) {
        self.entries
            .insert(status.into(), section.as_ref().trim().to_string());
    }

    pub fn get(&self, status: &str) -> Option<&str> {
        self.entries.get(status).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(status, column)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Whether `name` round-trips through a `## name` heading line.
pub fn is_column_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['\n', '\r'])
}

impl From<HashMap<String, String>> for PlacementMap {
    fn from(entries: HashMap<String, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<PlacementMap> for HashMap<String, String> {
    fn from(map: PlacementMap) -> Self {
        map.entries
    }
}

impl<S: Into<String>, T: AsRef<str>> FromIterator<(S, T)> for PlacementMap {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (status, section) in iter {
            map.insert(status, section);
        }
        map
    }
}

/// Column a record with `status` belongs in.
pub fn resolve<'a>(status: &'a str, map: &'a PlacementMap) -> &'a str {
    map.get(status)
        .filter(|name| is_column_name(name))
        .unwrap_or(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_status_uses_mapping() {
        let map: PlacementMap = [("Done", "Complete")].into_iter().collect();
        assert_eq!(resolve("Done", &map), "Complete");
    }

    #[test]
    fn unmapped_status_is_identity() {
        let map: PlacementMap = [("Done", "Complete")].into_iter().collect();
        assert_eq!(resolve("In Review", &map), "In Review");
        assert_eq!(resolve("In Review", &PlacementMap::new()), "In Review");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let map: PlacementMap = [("Done", "Complete")].into_iter().collect();
        assert_eq!(resolve("done", &map), "done");
    }

    #[test]
    fn section_names_are_trimmed() {
        let map: PlacementMap = [("Done", "  Complete ")].into_iter().collect();
        assert_eq!(map.get("Done"), Some("Complete"));
    }

    #[test]
    fn unusable_column_names_fall_back_to_status() {
        let map: PlacementMap = [("Done", "   "), ("Closed", "Shipped\n- [ ] [[Z-9]]")]
            .into_iter()
            .collect();
        assert_eq!(resolve("Done", &map), "Done");
        assert_eq!(resolve("Closed", &map), "Closed");
    }

    #[test]
    fn column_name_rules() {
        assert!(is_column_name("In Progress"));
        assert!(!is_column_name(""));
        assert!(!is_column_name(" \t"));
        assert!(!is_column_name("A\nB"));
        assert!(!is_column_name("A\r"));
    }

    #[test]
    fn deserializes_from_plain_mapping() {
        let map: PlacementMap =
            serde_json::from_str(r#"{"In Progress": "Doing", "Done": "Complete"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(resolve("In Progress", &map), "Doing");
    }
}
