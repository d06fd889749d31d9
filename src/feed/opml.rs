use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::parse_feed_url;

/// Errors that can occur during OPML extraction. All of them are fatal for
/// a run: without a URL list there is nothing to ingest.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// The subscription file does not exist.
    #[error("OPML file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file is not well-formed XML or lacks the category/feed outline tree.
    #[error("Malformed OPML document: {0}")]
    Malformed(String),

    /// File I/O error other than a missing file.
    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

/// A feed subscription extracted from an OPML file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Well-formed absolute http(s) URL of the feed document.
    pub url: String,
}

// Typed view of the `opml > body > outline > outline` tree. Anything else in
// the document (head, extra attributes) is ignored.

#[derive(Debug, Deserialize)]
struct OpmlDocument {
    body: Option<OpmlBody>,
}

#[derive(Debug, Deserialize)]
struct OpmlBody {
    #[serde(rename = "outline", default)]
    outlines: Vec<Outline>,
}

#[derive(Debug, Deserialize)]
struct Outline {
    #[serde(rename = "@text")]
    text: Option<String>,
    #[serde(rename = "@xmlUrl")]
    xml_url: Option<String>,
    #[serde(rename = "outline", default)]
    children: Vec<Outline>,
}

impl Outline {
    fn label(&self) -> &str {
        self.text.as_deref().unwrap_or("<untitled>")
    }
}

/// Reads an OPML file and returns its feed URLs in document order.
///
/// The body must be a two-level tree: category outlines whose children
/// carry `xmlUrl`. The category level is dropped. Children with a missing
/// or malformed `xmlUrl` are skipped with a warning.
///
/// # Errors
///
/// - [`OpmlError::NotFound`] if `path` does not exist
/// - [`OpmlError::Malformed`] if the XML is broken, `body` has no outlines,
///   or a top-level outline has no nested outlines
/// - [`OpmlError::Io`] for any other read failure
///
/// # Security
///
/// `quick-xml` (0.37) does not parse `<!ENTITY>` declarations, so custom
/// entity references surface as a decode error instead of being expanded.
pub fn extract_urls(path: &Path) -> Result<Vec<FeedSource>, OpmlError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OpmlError::NotFound(path.to_path_buf()),
        _ => OpmlError::Io(e),
    })?;
    let sources = parse_opml_content(&content)?;
    tracing::info!(path = %path.display(), feeds = sources.len(), "Extracted feed URLs from OPML");
    Ok(sources)
}

fn parse_opml_content(content: &str) -> Result<Vec<FeedSource>, OpmlError> {
    let document: OpmlDocument =
        quick_xml::de::from_str(content).map_err(|e| OpmlError::Malformed(e.to_string()))?;

    let body = document
        .body
        .ok_or_else(|| OpmlError::Malformed("missing <body> element".to_string()))?;

    if body.outlines.is_empty() {
        return Err(OpmlError::Malformed(
            "<body> contains no <outline> elements".to_string(),
        ));
    }

    let mut sources = Vec::new();
    for category in &body.outlines {
        if category.children.is_empty() {
            return Err(OpmlError::Malformed(format!(
                "top-level outline '{}' has no nested feed outlines",
                category.label()
            )));
        }

        for feed in &category.children {
            let Some(raw) = feed.xml_url.as_deref() else {
                tracing::warn!(category = %category.label(), outline = %feed.label(), "Skipping outline without xmlUrl");
                continue;
            };
            match parse_feed_url(raw) {
                Ok(_) => sources.push(FeedSource {
                    url: raw.trim().to_string(),
                }),
                Err(e) => {
                    tracing::warn!(url = %raw, error = %e, "Skipping invalid feed URL");
                }
            }
        }
    }

    Ok(sources)
}
