use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Deserializer, Serialize};

/// Caller supplied identifier of the book
pub type BookId = String;
/// Identifier assigned by the document store on insertion
pub type StoreId = String;

#[derive(Debug, Clone, Default, Serialize, Eq, PartialEq, Apiv2Schema)]
/// Wire representation of a book. Every field is a free form string,
/// missing fields deserialize to empty strings.
pub struct BookDetails {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub edition: String,
    pub pages: String,
    pub year: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct BookDetailsObject {
    id: BookId,
    title: String,
    author: String,
    edition: String,
    pages: String,
    year: String,
}

/// Only json objects are accepted, a positional array is not a book
impl<'de> Deserialize<'de> for BookDetails {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let object: BookDetailsObject =
            serde_json::from_value(serde_json::Value::Object(object))
                .map_err(serde::de::Error::custom)?;
        Ok(Self {
            id: object.id,
            title: object.title,
            author: object.author,
            edition: object.edition,
            pages: object.pages,
            year: object.year,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Book together with the identifier the store assigned to it
pub struct StoredBook {
    #[serde(rename = "mongo_id")]
    pub store_id: StoreId,
    #[serde(flatten)]
    pub details: BookDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Struct representing a patch to book details. Only the fields present are applied,
/// unknown keys in the payload are ignored.
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl BookPatch {
    /// True when the patch carries none of the recognized fields
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.edition.is_none()
            && self.pages.is_none()
            && self.year.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct AuthorEntry {
    #[serde(rename = "AuthorName")]
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct YearEntry {
    #[serde(rename = "BookYear")]
    pub year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Body returned with every 4xx/5xx response of the json api
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
