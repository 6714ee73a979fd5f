use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Parses a TRAILER frame payload into a header map.
///
/// The payload is HTTP/1-style trailer text: `name: value` lines joined
/// by CRLF. Lines without a `:` past the first byte are skipped, as are
/// lines that do not survive header-name or header-value validation.
/// Repeated names accumulate as multiple values.
pub fn parse_trailer(payload: &[u8]) -> HeaderMap {
    let mut trailer = HeaderMap::new();
    let text = String::from_utf8_lossy(payload);

    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        let idx = match line.find(':') {
            Some(idx) if idx > 0 => idx,
            _ => continue,
        };
        let name = match HeaderName::try_from(line[..idx].trim()) {
            Ok(name) => name,
            Err(_) => continue,
        };
        let value = match HeaderValue::from_str(line[idx + 1..].trim()) {
            Ok(value) => value,
            Err(_) => continue,
        };
        trailer.append(name, value);
    }

    trailer
}
