use serde::{Deserialize, Serialize};

/// Entry-style dictionary value with optional nested values, e.g. a skill group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub name: String,
    #[serde(default)]
    pub sub_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DictionaryValues {
    Flat(Vec<String>),
    Entries(Vec<DictionaryEntry>),
}

impl DictionaryValues {
    /// Entry dictionaries accept both an entry name and any of its sub-values.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            DictionaryValues::Flat(values) => values.iter().any(|v| v == value),
            DictionaryValues::Entries(entries) => entries
                .iter()
                .any(|entry| entry.name == value || entry.sub_values.iter().any(|v| v == value)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DictionaryValues::Flat(values) => values.len(),
            DictionaryValues::Entries(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DictionaryValues {
    fn default() -> Self {
        DictionaryValues::Flat(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dictionary {
    pub name: String,
    pub values: DictionaryValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_value_shapes() {
        let flat: DictionaryValues = serde_json::from_str(r#"["Moscow","Remote"]"#).unwrap();
        assert!(matches!(flat, DictionaryValues::Flat(_)));
        assert!(flat.contains("Remote"));

        let entries: DictionaryValues = serde_json::from_str(
            r#"[{"name":"Automation","subValues":["Playwright","Selenium"]},{"name":"Manual"}]"#,
        )
        .unwrap();
        assert!(matches!(entries, DictionaryValues::Entries(_)));
        assert!(entries.contains("Automation"));
        assert!(entries.contains("Selenium"));
        assert!(entries.contains("Manual"));
        assert!(!entries.contains("Cypress"));
    }
}
