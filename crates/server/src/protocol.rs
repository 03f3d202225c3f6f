//! Wire protocol
//!
//! Clients talk to the server with newline-delimited JSON. Each line is one request, tagged by
//! `op`, and is answered by exactly one [`Reply`] line, in order:
//! ```text
//! -> {"op":"add_book","payload":{"name":"Dune","pageCount":412,"readPage":0,"reading":true}}
//! <- {"code":201,"body":{"status":"success","message":"Book added successfully","data":{"bookId":"..."}}}
//! -> {"op":"list_books","query":{"name":"dune"}}
//! -> {"op":"get_book","bookId":"..."}
//! -> {"op":"edit_book","bookId":"...","payload":{...}}
//! -> {"op":"delete_book","bookId":"..."}
//! ```
use crate::response::Reply;
use bookshelf_core::{BookPayload, BookQuery};
use serde::{Deserialize, Serialize};

#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    AddBook {
        payload: BookPayload,
    },
    ListBooks {
        #[serde(default)]
        query: BookQuery,
    },
    GetBook {
        #[serde(rename = "bookId")]
        book_id: String,
    },
    EditBook {
        #[serde(rename = "bookId")]
        book_id: String,
        payload: BookPayload,
    },
    DeleteBook {
        #[serde(rename = "bookId")]
        book_id: String,
    },
}

impl Request {
    /// Name of the operation, as it appears in the `op` tag
    #[must_use]
    #[inline]
    pub const fn op(&self) -> &'static str {
        match self {
            Self::AddBook { .. } => "add_book",
            Self::ListBooks { .. } => "list_books",
            Self::GetBook { .. } => "get_book",
            Self::EditBook { .. } => "edit_book",
            Self::DeleteBook { .. } => "delete_book",
        }
    }
}

/// # Errors
/// Fails if the line is not a JSON object describing a known operation.
#[inline]
pub fn decode_request(line: &str) -> Result<Request, serde_json::Error> {
    serde_json::from_str(line)
}

/// Encodes a request as a single line, including the trailing newline.
/// # Errors
/// Fails if the request cannot be serialized.
#[inline]
pub fn encode_request(request: &Request) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    Ok(line)
}

/// Encodes a reply as a single line, including the trailing newline.
/// # Errors
/// Fails if the reply cannot be serialized.
#[inline]
pub fn encode_reply(reply: &Reply) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_add_book() {
        let request = decode_request(
            r#"{"op":"add_book","payload":{"name":"Go","pageCount":100,"readPage":100}}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::AddBook {
                payload: BookPayload::new("Go", 100, 100)
            }
        );
        assert_eq!(request.op(), "add_book");
    }

    #[test]
    fn list_books_query_is_optional() {
        let request = decode_request(r#"{"op":"list_books"}"#).unwrap();
        assert_eq!(
            request,
            Request::ListBooks {
                query: BookQuery::default()
            }
        );

        let request = decode_request(r#"{"op":"list_books","query":{"reading":"1"}}"#).unwrap();
        assert_eq!(
            request,
            Request::ListBooks {
                query: BookQuery::by_reading("1")
            }
        );
    }

    #[test]
    fn decodes_id_operations() {
        assert_eq!(
            decode_request(r#"{"op":"get_book","bookId":"abc"}"#).unwrap(),
            Request::GetBook {
                book_id: "abc".to_owned()
            }
        );
        assert_eq!(
            decode_request(r#"{"op":"delete_book","bookId":"abc"}"#).unwrap(),
            Request::DeleteBook {
                book_id: "abc".to_owned()
            }
        );
        assert_eq!(
            decode_request(r#"{"op":"edit_book","bookId":"abc","payload":{"name":"X"}}"#)
                .unwrap(),
            Request::EditBook {
                book_id: "abc".to_owned(),
                payload: BookPayload::new("X", 0, 0)
            }
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_requests() {
        assert!(decode_request(r#"{"op":"burn_books"}"#).is_err());
        assert!(decode_request(r#"{"op":"get_book"}"#).is_err());
        assert!(decode_request("not json").is_err());
    }

    #[test]
    fn encoded_request_is_one_line() {
        let line = encode_request(&Request::GetBook {
            book_id: "abc".to_owned(),
        })
        .unwrap();
        assert_eq!(line, "{\"op\":\"get_book\",\"bookId\":\"abc\"}\n");
    }
}
