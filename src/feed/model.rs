use serde::Serialize;

/// Unparsed body of one feed response.
///
/// Lives only between the fetcher and the parser; it is never cached.
#[derive(Debug, Clone)]
pub struct RawFeedDocument {
    pub url: String,
    pub body: Vec<u8>,
}

impl RawFeedDocument {
    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Parsed representation of one subscription.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

/// One entry as it will be persisted. Only `id` is mandatory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    /// RFC 3339
    pub published: Option<String>,
    /// RFC 3339
    pub updated: Option<String>,
    /// Taken from an Atom `replies`/`comments` link. `feed-rs` does not
    /// surface the RSS `<comments>` element, so this is `None` for RSS items.
    pub comments: Option<String>,
    pub categories: Vec<Category>,
    pub content: Option<EntryContent>,
    pub source: Option<String>,
    pub contributors: Vec<Person>,
    pub rights: Option<Rights>,
    pub attachments: Vec<Attachment>,
}

/// Typed entry body, stored as `content_type` / `content_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryContent {
    pub content_type: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rights {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

/// Enclosure or media object attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
}
