//! Feed acquisition: everything between an OPML file and a parsed entry list.
//!
//! - [`opml`] - OPML subscription list to an ordered list of feed URLs
//! - [`fetcher`] - single-attempt HTTP retrieval with size and time limits
//! - [`parser`] - Atom/RSS/JSON Feed decoding via `feed-rs`
//!
//! # Example
//!
//! ```ignore
//! use feedsink::feed::{extract_urls, parse_feed, Fetcher};
//!
//! let sources = extract_urls(Path::new("subscriptions.opml"))?;
//! let doc = fetcher.fetch(&sources[0].url).await?;
//! let feed = parse_feed(&doc.body)?;
//! ```

mod fetcher;
mod model;
mod opml;
mod parser;

pub use fetcher::{FetchError, Fetcher};
pub use model::{
    Attachment, Category, EntryContent, Feed, FeedEntry, Person, RawFeedDocument, Rights,
};
pub use opml::{extract_urls, FeedSource, OpmlError};
pub use parser::{parse_feed, ParseError};
