//! Reply envelope
//!
//! Every reply carries the HTTP-equivalent status code of the operation's outcome and a body
//! tagged with `status`: `success`, `fail` for requests the client got wrong, or `error` for
//! unexpected conditions inside the server.
use bookshelf_core::{Book, BookSummary};
use serde::{Deserialize, Serialize};

pub const OK: u16 = 200;
pub const CREATED: u16 = 201;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const INTERNAL_SERVER_ERROR: u16 = 500;

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub body: ResponseBody,
}

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseBody {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    Fail {
        message: String,
    },
    Error {
        message: String,
    },
}

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResponseData {
    BookId {
        #[serde(rename = "bookId")]
        book_id: String,
    },
    Books {
        books: Vec<BookSummary>,
    },
    Book {
        book: Book,
    },
}

impl Reply {
    #[must_use]
    #[inline]
    pub fn success(code: u16, message: Option<&str>, data: Option<ResponseData>) -> Self {
        Self {
            code,
            body: ResponseBody::Success {
                message: message.map(str::to_owned),
                data,
            },
        }
    }

    #[must_use]
    #[inline]
    pub fn fail(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            body: ResponseBody::Fail {
                message: message.into(),
            },
        }
    }

    #[must_use]
    #[inline]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_SERVER_ERROR,
            body: ResponseBody::Error {
                message: message.into(),
            },
        }
    }

    #[must_use]
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Success { .. })
    }

    /// The message of the body, if it has one
    #[must_use]
    #[inline]
    pub fn message(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Success { message, .. } => message.as_deref(),
            ResponseBody::Fail { message } | ResponseBody::Error { message } => Some(message),
        }
    }

    #[must_use]
    #[inline]
    pub const fn data(&self) -> Option<&ResponseData> {
        match &self.body {
            ResponseBody::Success { data, .. } => data.as_ref(),
            ResponseBody::Fail { .. } | ResponseBody::Error { .. } => None,
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
    fn success_with_book_id() {
        let reply = Reply::success(
            CREATED,
            Some("Book added successfully"),
            Some(ResponseData::BookId {
                book_id: "abc".to_owned(),
            }),
        );
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "code": 201,
                "body": {
                    "status": "success",
                    "message": "Book added successfully",
                    "data": { "bookId": "abc" }
                }
            })
        );
    }

    #[test]
    fn success_without_message_omits_key() {
        let reply = Reply::success(OK, None, Some(ResponseData::Books { books: Vec::new() }));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "code": 200,
                "body": { "status": "success", "data": { "books": [] } }
            })
        );
    }

    #[test]
    fn fail_and_error_bodies() {
        assert_eq!(
            serde_json::to_value(Reply::fail(NOT_FOUND, "Book not found")).unwrap(),
            json!({ "code": 404, "body": { "status": "fail", "message": "Book not found" } })
        );
        assert_eq!(
            serde_json::to_value(Reply::error("Failed to add book")).unwrap(),
            json!({ "code": 500, "body": { "status": "error", "message": "Failed to add book" } })
        );
    }

    #[test]
    fn decodes_data_variants() {
        let reply: Reply = serde_json::from_value(json!({
            "code": 201,
            "body": { "status": "success", "data": { "bookId": "abc" } }
        }))
        .unwrap();
        assert_eq!(
            reply.data(),
            Some(&ResponseData::BookId {
                book_id: "abc".to_owned()
            })
        );
        assert_eq!(reply.message(), None);
        assert!(reply.is_success());
    }
}
