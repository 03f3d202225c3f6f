use crate::store::types::{Book, BookQuery};

/// A [`BookQuery`] reduced to the filters that actually apply.
///
/// Every recognized filter must match for a book to be listed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BookFilter {
    /// Lowercased needle for a case-insensitive substring match on the name
    name: Option<String>,
    reading: Option<bool>,
    finished: Option<bool>,
}

impl BookFilter {
    #[must_use]
    #[inline]
    pub fn from_query(query: &BookQuery) -> Self {
        Self {
            name: query.name.as_deref().map(str::to_lowercase),
            reading: query.reading.as_deref().and_then(parse_flag),
            finished: query.finished.as_deref().and_then(parse_flag),
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.reading.is_none() && self.finished.is_none()
    }

    #[must_use]
    #[inline]
    pub fn matches(&self, book: &Book) -> bool {
        if self
            .name
            .as_deref()
            .is_some_and(|needle| !book.name.to_lowercase().contains(needle))
        {
            return false;
        }
        if self.reading.is_some_and(|reading| book.reading != reading) {
            return false;
        }
        if self.finished.is_some_and(|finished| book.finished != finished) {
            return false;
        }
        true
    }
}

/// `"1"` means set, `"0"` means unset; any other literal disables the filter.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags() {
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("true"), None);
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("01"), None);
    }

    #[test]
    fn unrecognized_flags_leave_filter_empty() {
        let query = BookQuery {
            name: None,
            reading: Some("yes".to_owned()),
            finished: Some("2".to_owned()),
        };
        assert!(BookFilter::from_query(&query).is_empty());
        assert!(BookFilter::from_query(&BookQuery::default()).is_empty());
    }

    #[test]
    fn name_needle_is_lowercased() {
        let filter = BookFilter::from_query(&BookQuery::by_name("PoTTer"));
        assert_eq!(filter.name.as_deref(), Some("potter"));
    }
}
