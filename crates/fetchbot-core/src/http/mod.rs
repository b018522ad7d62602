//! Response metadata for the streaming GET.
//!
//! libcurl hands header lines to a callback one at a time, including the
//! status line of every intermediate response when redirects are followed.
//! [`HeaderCollector`] folds those lines into the metadata of the final
//! response, tracking the effective URL across `Location` hops.

mod parse;

pub(crate) use parse::HeaderCollector;

/// Metadata of the final response, carried by the START report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    /// URL after following redirects.
    pub final_url: String,
    /// HTTP status code of the final response.
    pub status: u32,
    /// Header lines of the final response, in arrival order.
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared body size, if `Content-Length` is present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.parse().ok()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
