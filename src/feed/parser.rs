use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::model;
use feed_rs::parser;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::model::{Attachment, Category, EntryContent, Feed, FeedEntry, Person, Rights};

#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not a well-formed Atom, RSS or JSON Feed document.
    #[error("Unparsable feed: {0}")]
    Unparsable(String),
}

/// Decodes a syndication document into a [`Feed`].
///
/// Missing elements become `None` or empty lists. Entry order follows the
/// source document.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseError> {
    // Leave missing ids empty so `generate_id` can derive a stable one;
    // the feed-rs default falls back to a random UUID.
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| ParseError::Unparsable(e.to_string()))?;

    let entries = feed.entries.into_iter().map(convert_entry).collect();

    Ok(Feed {
        title: feed.title.map(|t| t.content),
        entries,
    })
}

fn convert_entry(entry: model::Entry) -> FeedEntry {
    let link = entry
        .links
        .iter()
        .find(|l| !l.href.trim().is_empty())
        .map(|l| l.href.clone());
    let comments = entry
        .links
        .iter()
        .find(|l| {
            l.rel.as_deref().is_some_and(|rel| {
                rel.eq_ignore_ascii_case("replies") || rel.eq_ignore_ascii_case("comments")
            })
        })
        .map(|l| l.href.clone());
    let title = entry.title.map(|t| t.content);
    let published = entry.published.map(format_timestamp);
    let updated = entry.updated.map(format_timestamp);

    let existing_id = if entry.id.is_empty() {
        None
    } else {
        Some(entry.id.as_str())
    };
    let id = generate_id(
        existing_id,
        link.as_deref(),
        title.as_deref(),
        published.as_deref(),
    );

    let attachments = collect_attachments(&entry.links, &entry.media);

    FeedEntry {
        id,
        title,
        description: entry.summary.map(|s| s.content),
        link,
        author: entry.authors.first().map(author_name),
        published,
        updated,
        comments,
        categories: entry
            .categories
            .into_iter()
            .map(|c| Category {
                term: c.term,
                label: c.label,
                scheme: c.scheme,
            })
            .collect(),
        content: entry.content.map(|c| EntryContent {
            content_type: c.content_type.to_string(),
            value: c.body,
        }),
        source: entry.source,
        contributors: entry.contributors.into_iter().map(convert_person).collect(),
        rights: entry.rights.map(|r| Rights {
            content_type: r.content_type.to_string(),
            value: r.content,
        }),
        attachments,
    }
}

/// RSS `<author>` arrives as a person named after the element with the
/// text in `email`.
fn author_name(p: &model::Person) -> String {
    match &p.email {
        Some(email) if p.name == "author" && !email.trim().is_empty() => email.clone(),
        _ => p.name.clone(),
    }
}

fn convert_person(p: model::Person) -> Person {
    Person {
        name: p.name,
        uri: p.uri,
        email: p.email,
    }
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Enclosure links first, then media content, skipping repeated URLs.
fn collect_attachments(links: &[model::Link], media: &[model::MediaObject]) -> Vec<Attachment> {
    let mut attachments: Vec<Attachment> = Vec::new();

    let enclosures = links
        .iter()
        .filter(|l| {
            l.rel
                .as_deref()
                .is_some_and(|rel| rel.eq_ignore_ascii_case("enclosure"))
        })
        .map(|l| Attachment {
            url: l.href.clone(),
            mime_type: l.media_type.clone(),
            size_in_bytes: l.length,
        });

    let media_content = media.iter().flat_map(|m| m.content.iter()).filter_map(|c| {
        c.url.as_ref().map(|u| Attachment {
            url: u.to_string(),
            mime_type: c.content_type.as_ref().map(|m| m.to_string()),
            size_in_bytes: c.size,
        })
    });

    for attachment in enclosures.chain(media_content) {
        if attachment.url.trim().is_empty() {
            continue;
        }
        if !attachments.iter().any(|a| a.url == attachment.url) {
            attachments.push(attachment);
        }
    }

    attachments
}

/// Uses the feed-declared id when present, otherwise a SHA-256 over
/// `link|title|published` so the same entry maps to the same row on re-runs.
fn generate_id(
    existing: Option<&str>,
    link: Option<&str>,
    title: Option<&str>,
    published: Option<&str>,
) -> String {
    if let Some(id) = existing {
        let trimmed = id.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title.unwrap_or(""),
        published.unwrap_or("")
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
