//! Fold raw header lines into [`ResponseMeta`].

use super::ResponseMeta;

/// Accumulates header lines across redirect hops.
#[derive(Debug, Clone)]
pub(crate) struct HeaderCollector {
    current_url: String,
    status: Option<u32>,
    location: Option<String>,
    headers: Vec<(String, String)>,
}

impl HeaderCollector {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            current_url: url.to_string(),
            status: None,
            location: None,
            headers: Vec::new(),
        }
    }

    /// Feed one raw header line (status line, `Name: value`, or blank terminator).
    pub(crate) fn push_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with("HTTP/") {
            self.begin_block(line);
            return;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("location") {
                self.location = Some(value.to_string());
            }
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// A new status line means the previous block was an intermediate response.
    fn begin_block(&mut self, status_line: &str) {
        if let (Some(prev), Some(location)) = (self.status, self.location.take()) {
            if (300..400).contains(&prev) {
                self.follow(&location);
            }
        }
        self.status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok());
        self.location = None;
        self.headers.clear();
    }

    fn follow(&mut self, location: &str) {
        let next = url::Url::parse(&self.current_url)
            .and_then(|base| base.join(location))
            .map(String::from)
            .unwrap_or_else(|_| location.to_string());
        self.current_url = next;
    }

    /// Status of the latest header block seen so far.
    pub(crate) fn status(&self) -> Option<u32> {
        self.status
    }

    pub(crate) fn content_length(&self) -> Option<u64> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse().ok())
    }

    /// Metadata of the latest block. `fallback_status` is used when no status
    /// line was seen (e.g. non-HTTP schemes).
    pub(crate) fn meta(&self, fallback_status: u32) -> ResponseMeta {
        ResponseMeta {
            final_url: self.current_url.clone(),
            status: self.status.unwrap_or(fallback_status),
            headers: self.headers.clone(),
        }
    }
}
