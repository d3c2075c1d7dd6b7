use async_trait::async_trait;
use thiserror::Error;

use crate::api::dictionary::Dictionary;
use crate::db::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Field-level checks run on create payloads and on the present fields of patches.
pub trait Validate {
    /// Trim free-text fields before validation and persistence.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), ValidationError>;
}

pub fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub fn trim_optional(value: &mut Option<String>) {
    if let Some(inner) = value.as_mut() {
        trim_in_place(inner);
    }
}

/// Trim every value, drop blanks and repeats. First occurrence wins.
pub fn normalize_set(values: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    for value in values.drain(..) {
        let value = value.trim();
        if !value.is_empty() && !seen.iter().any(|kept| kept == value) {
            seen.push(value.to_string());
        }
    }
    *values = seen;
}

pub fn normalize_optional_set(values: &mut Option<Vec<String>>) {
    if let Some(inner) = values.as_mut() {
        normalize_set(inner);
    }
}

pub fn min_len(field: &str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::new(
            field,
            format!("must be at least {min} characters long"),
        ));
    }
    Ok(())
}

pub fn not_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "should not be empty"));
    }
    Ok(())
}

pub fn http_url(field: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ValidationError::new(field, "must be a URL address")),
    }
}

pub fn at_least(field: &str, value: u32, min: u32) -> Result<(), ValidationError> {
    if value < min {
        return Err(ValidationError::new(
            field,
            format!("must not be less than {min}"),
        ));
    }
    Ok(())
}

/// Resolves controlled vocabularies by name.
#[async_trait]
pub trait DictionaryLookup: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Dictionary>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryCheck {
    Accepted,
    MissingDictionary,
    Rejected(Vec<String>),
}

impl DictionaryCheck {
    pub fn into_result(self, field: &str, dictionary: &str) -> Result<(), ValidationError> {
        match self {
            DictionaryCheck::Accepted => Ok(()),
            DictionaryCheck::MissingDictionary => Err(ValidationError::new(
                field,
                format!("cannot be checked: dictionary \"{dictionary}\" is not seeded"),
            )),
            DictionaryCheck::Rejected(values) => Err(ValidationError::new(
                field,
                format!(
                    "value \"{}\" not allowed in \"{dictionary}\" dictionary",
                    values.join("\", \"")
                ),
            )),
        }
    }
}

/// Every candidate must be present in the named dictionary. Empty candidate
/// lists pass without a lookup.
pub async fn check_in_dictionary<L>(
    lookup: &L,
    dictionary: &str,
    candidates: &[String],
) -> Result<DictionaryCheck, StoreError>
where
    L: DictionaryLookup + ?Sized,
{
    if candidates.is_empty() {
        return Ok(DictionaryCheck::Accepted);
    }

    let Some(found) = lookup.find_by_name(dictionary).await? else {
        return Ok(DictionaryCheck::MissingDictionary);
    };

    let rejected = candidates
        .iter()
        .filter(|candidate| !found.values.contains(candidate))
        .cloned()
        .collect::<Vec<_>>();

    if rejected.is_empty() {
        Ok(DictionaryCheck::Accepted)
    } else {
        Ok(DictionaryCheck::Rejected(rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dictionary::DictionaryValues;

    struct Fixed(Option<Dictionary>);

    #[async_trait]
    impl DictionaryLookup for Fixed {
        async fn find_by_name(&self, _name: &str) -> Result<Option<Dictionary>, StoreError> {
            Ok(self.0.clone())
        }
    }

    fn skills() -> Fixed {
        Fixed(Some(Dictionary {
            name: "skills".into(),
            values: DictionaryValues::Flat(vec!["Jest".into(), "Playwright".into()]),
        }))
    }

    #[tokio::test]
    async fn accepts_known_values() {
        let check = check_in_dictionary(&skills(), "skills", &["Jest".into()])
            .await
            .unwrap();
        assert_eq!(check, DictionaryCheck::Accepted);
    }

    #[tokio::test]
    async fn rejects_unknown_values_and_lists_them() {
        let check = check_in_dictionary(&skills(), "skills", &["Jest".into(), "Cobol".into()])
            .await
            .unwrap();
        assert_eq!(check, DictionaryCheck::Rejected(vec!["Cobol".into()]));

        let err = check.into_result("skills", "skills").unwrap_err();
        assert!(err.to_string().contains("Cobol"));
    }

    #[tokio::test]
    async fn missing_dictionary_fails_closed() {
        let check = check_in_dictionary(&Fixed(None), "skills", &["Jest".into()])
            .await
            .unwrap();
        assert_eq!(check, DictionaryCheck::MissingDictionary);
    }

    #[tokio::test]
    async fn empty_candidates_skip_lookup() {
        let check = check_in_dictionary(&Fixed(None), "skills", &[]).await.unwrap();
        assert_eq!(check, DictionaryCheck::Accepted);
    }

    #[test]
    fn sets_are_trimmed_and_deduplicated() {
        let mut values = vec![
            " Jest".to_string(),
            "Playwright".to_string(),
            "Jest ".to_string(),
            "  ".to_string(),
        ];
        normalize_set(&mut values);
        assert_eq!(values, vec!["Jest".to_string(), "Playwright".to_string()]);

        let mut absent = None;
        normalize_optional_set(&mut absent);
        assert_eq!(absent, None);
    }

    #[test]
    fn field_helpers_report_the_field() {
        assert!(min_len("name", "I", 2).is_err());
        assert!(min_len("name", "Ян", 2).is_ok());
        assert!(not_empty("role", "  ").is_err());
        assert!(http_url("cvLink", "https://example.com/cv").is_ok());
        assert_eq!(http_url("cvLink", "not a url").unwrap_err().field, "cvLink");
        assert!(at_least("staffing.count", 0, 1).is_err());
    }
}
