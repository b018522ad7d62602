//! Local file names for URLs that come without one.

/// Name used when the URL path has no usable last segment.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Last non-empty path segment of `url`, made safe for a Linux file name.
///
/// - `https://example.com/pub/debian-12.iso?x=1` -> `debian-12.iso`
/// - `https://example.com/` -> `download.bin`
pub fn derive_filename(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|u| {
        u.path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string)
    });
    match segment.map(|s| sanitize(&s)) {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_FILENAME.to_string(),
    }
}

/// Replace separators, control characters and whitespace with `_`, squeeze
/// runs of `_`, strip leading/trailing dots and underscores, cap the length.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let bad = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        let c = if bad { '_' } else { c };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
