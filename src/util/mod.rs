//! Utility functions shared by the extractor and the fetcher.
//!
//! - **URL validation**: well-formedness checks for `xmlUrl` values and the
//!   optional private-host policy applied before a fetch.

mod url_validator;

pub use url_validator::{ensure_public_host, parse_feed_url, UrlValidationError};
