use crate::store::errors::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single book on the shelf, including its reading progress.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    pub year: Option<Value>,
    pub author: Option<Value>,
    pub summary: Option<Value>,
    pub publisher: Option<Value>,
    pub page_count: u32,
    pub read_page: u32,
    /// Derived from `page_count` and `read_page`, see [`is_finished`]
    pub finished: bool,
    pub reading: bool,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Builds a freshly inserted book. Both timestamps are set to `now`.
    pub(crate) fn create(id: String, fields: BookFields, now: DateTime<Utc>) -> Self {
        Self {
            finished: is_finished(fields.page_count, fields.read_page),
            id,
            name: fields.name,
            year: fields.year,
            author: fields.author,
            summary: fields.summary,
            publisher: fields.publisher,
            page_count: fields.page_count,
            read_page: fields.read_page,
            reading: fields.reading,
            inserted_at: now,
            updated_at: now,
        }
    }

    /// Replaces every field except `id` and `inserted_at`.
    pub(crate) fn apply(&mut self, fields: BookFields, now: DateTime<Utc>) {
        self.finished = is_finished(fields.page_count, fields.read_page);
        self.name = fields.name;
        self.year = fields.year;
        self.author = fields.author;
        self.summary = fields.summary;
        self.publisher = fields.publisher;
        self.page_count = fields.page_count;
        self.read_page = fields.read_page;
        self.reading = fields.reading;
        self.updated_at = now;
    }

    #[must_use]
    #[inline]
    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            publisher: self.publisher.clone(),
        }
    }
}

/// A book counts as finished once every page has been read.
#[must_use]
#[inline]
pub const fn is_finished(page_count: u32, read_page: u32) -> bool {
    page_count == read_page
}

/// The reduced view of a book returned when listing the shelf.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub publisher: Option<Value>,
}

/// The fields a client supplies when adding or editing a book.
///
/// `id`, `finished` and the timestamps are owned by the store, so any such
/// keys in the incoming document are ignored. `year`, `author`, `summary` and
/// `publisher` are stored as given, whatever their JSON type.
#[derive(Serialize, Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub name: Option<String>,
    pub year: Option<Value>,
    pub author: Option<Value>,
    pub summary: Option<Value>,
    pub publisher: Option<Value>,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub read_page: u32,
    #[serde(default)]
    pub reading: bool,
}

impl BookPayload {
    #[must_use]
    #[inline]
    pub fn new(name: &str, page_count: u32, read_page: u32) -> Self {
        Self {
            name: Some(name.to_owned()),
            page_count,
            read_page,
            ..Self::default()
        }
    }

    /// Checks the payload against the shelf rules, in order: a non-empty
    /// name, then `read_page <= page_count`.
    /// # Errors
    /// Returns the first rule the payload violates.
    #[inline]
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::NameRequired);
        }
        if self.read_page > self.page_count {
            return Err(ValidationError::ReadPageExceedsPageCount {
                read_page: self.read_page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    pub(crate) fn into_fields(self) -> Result<BookFields, ValidationError> {
        self.validate()?;
        let Some(name) = self.name else {
            return Err(ValidationError::NameRequired);
        };
        Ok(BookFields {
            name,
            year: self.year,
            author: self.author,
            summary: self.summary,
            publisher: self.publisher,
            page_count: self.page_count,
            read_page: self.read_page,
            reading: self.reading,
        })
    }
}

/// A payload that passed validation, with the name guaranteed to be present.
pub(crate) struct BookFields {
    name: String,
    year: Option<Value>,
    author: Option<Value>,
    summary: Option<Value>,
    publisher: Option<Value>,
    page_count: u32,
    read_page: u32,
    reading: bool,
}

/// Raw list filters as they arrive from a query string.
///
/// `reading` and `finished` only take effect for the literals `"0"` and `"1"`.
#[derive(Serialize, Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub name: Option<String>,
    pub reading: Option<String>,
    pub finished: Option<String>,
}

impl BookQuery {
    #[must_use]
    #[inline]
    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    #[inline]
    pub fn by_reading(flag: &str) -> Self {
        Self {
            reading: Some(flag.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    #[inline]
    pub fn by_finished(flag: &str) -> Self {
        Self {
            finished: Some(flag.to_owned()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn finished_only_when_all_pages_read() {
        assert!(is_finished(100, 100));
        assert!(is_finished(0, 0));
        assert!(!is_finished(100, 99));
    }

    #[test]
    fn validate_rejects_missing_and_empty_name() {
        let missing = BookPayload {
            page_count: 10,
            ..BookPayload::default()
        };
        assert_eq!(missing.validate(), Err(ValidationError::NameRequired));

        let empty = BookPayload::new("", 10, 0);
        assert_eq!(empty.validate(), Err(ValidationError::NameRequired));
    }

    #[test]
    fn validate_checks_name_before_pages() {
        let payload = BookPayload::new("", 10, 20);
        assert_eq!(payload.validate(), Err(ValidationError::NameRequired));
    }

    #[test]
    fn validate_rejects_read_page_past_page_count() {
        let payload = BookPayload::new("X", 10, 20);
        assert_eq!(
            payload.validate(),
            Err(ValidationError::ReadPageExceedsPageCount {
                read_page: 20,
                page_count: 10
            })
        );
        assert!(BookPayload::new("X", 10, 10).validate().is_ok());
    }

    #[test]
    fn payload_uses_camel_case_and_ignores_store_owned_keys() {
        let payload: BookPayload = serde_json::from_str(
            r#"{
                "id": "spoofed",
                "name": "Dune",
                "year": 1965,
                "author": "Frank Herbert",
                "publisher": "Chilton",
                "pageCount": 412,
                "readPage": 12,
                "finished": true,
                "reading": true
            }"#,
        )
        .unwrap();

        assert_eq!(
            payload,
            BookPayload {
                name: Some("Dune".to_owned()),
                year: Some(json!(1965)),
                author: Some(json!("Frank Herbert")),
                summary: None,
                publisher: Some(json!("Chilton")),
                page_count: 412,
                read_page: 12,
                reading: true,
            }
        );
    }

    #[test]
    fn passthrough_fields_keep_their_json_type() {
        let payload: BookPayload = serde_json::from_str(
            r#"{"name": "X", "year": "2008", "publisher": 42, "author": ["A", "B"], "summary": null}"#,
        )
        .unwrap();
        let book = Book::create(
            "book000000000001".to_owned(),
            payload.into_fields().unwrap(),
            Utc::now(),
        );

        assert_eq!(book.year, Some(json!("2008")));
        assert_eq!(book.publisher, Some(json!(42)));
        assert_eq!(book.author, Some(json!(["A", "B"])));
        assert_eq!(book.summary, None);

        let encoded = serde_json::to_value(&book).unwrap();
        assert_eq!(encoded["year"], json!("2008"));
        assert_eq!(encoded["publisher"], json!(42));
        assert_eq!(serde_json::to_value(book.summary()).unwrap()["publisher"], json!(42));
    }

    #[test]
    fn negative_page_count_does_not_deserialize() {
        let result = serde_json::from_str::<BookPayload>(r#"{"name": "X", "pageCount": -1}"#);
        assert!(result.is_err());
    }
}
