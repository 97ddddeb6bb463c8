//! Request headers file: `Name: value` per line.

use std::collections::HashMap;

/// Parse `Name: value` lines. The value may itself contain `:` (e.g. URLs in
/// `Referer`). Lines without a name or value are skipped.
pub fn parse_headers(text: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in text.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        headers.insert(name.to_string(), value.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_keep_inner_colons() {
        let h = parse_headers("Referer: https://example.com:8443/page\nUser-Agent: fanout\n");
        assert_eq!(h["Referer"], "https://example.com:8443/page");
        assert_eq!(h["User-Agent"], "fanout");
    }

    #[test]
    fn malformed_lines_skipped() {
        let h = parse_headers("no colon here\n: novalue\nEmpty:\n\nAccept: */*");
        assert_eq!(h.len(), 1);
        assert_eq!(h["Accept"], "*/*");
    }
}
