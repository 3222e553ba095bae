//! Parser for `consul-k8s proxy list` output

use crate::models::ProxyRecord;
use std::str::Lines;

/// Lazy iterator over the proxy rows of a listing
///
/// Lines before the `Name  Type` column header are skipped. Every later
/// non-blank line is a row whose first two fields are name and type.
pub struct ProxyListing<'a> {
    lines: Lines<'a>,
    in_table: bool,
}

/// Parse captured listing text into proxy records
pub fn parse_proxy_listing(text: &str) -> ProxyListing<'_> {
    ProxyListing {
        lines: text.lines(),
        in_table: false,
    }
}

fn is_header(line: &str) -> bool {
    let mut fields = line.split_whitespace();
    matches!(
        (fields.next(), fields.next()),
        (Some(name), Some(kind)) if name.eq_ignore_ascii_case("name") && kind.eq_ignore_ascii_case("type")
    )
}

impl<'a> Iterator for ProxyListing<'a> {
    type Item = ProxyRecord;

    fn next(&mut self) -> Option<ProxyRecord> {
        for line in self.lines.by_ref() {
            if !self.in_table {
                self.in_table = is_header(line);
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };

            return Some(ProxyRecord {
                name: name.to_string(),
                proxy_type: fields.next().unwrap_or_default().to_string(),
            });
        }
        None
    }
}

/// Substring match on the proxy name; no filter matches everything
pub fn matches_filter(record: &ProxyRecord, filter: Option<&str>) -> bool {
    match filter {
        None | Some("") => true,
        Some(needle) => record.name.contains(needle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Namespace: default

Name         Type
web-sidecar  sidecar-proxy
api-sidecar  sidecar-proxy

mesh-gateway Mesh Gateway
";

    #[test]
    fn test_parse_skips_preamble() {
        let records: Vec<ProxyRecord> = parse_proxy_listing(LISTING).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "web-sidecar");
        assert_eq!(records[0].proxy_type, "sidecar-proxy");
        assert_eq!(records[1].name, "api-sidecar");
        assert_eq!(records[2].name, "mesh-gateway");
        assert_eq!(records[2].proxy_type, "Mesh");
    }

    #[test]
    fn test_parse_without_header_yields_nothing() {
        let text = "No proxies found in namespace default\nweb-sidecar sidecar-proxy\n";
        assert_eq!(parse_proxy_listing(text).count(), 0);
    }

    #[test]
    fn test_parse_empty_table() {
        let text = "Namespace: default\n\nName  Type\n\n";
        assert_eq!(parse_proxy_listing(text).count(), 0);
    }

    #[test]
    fn test_parse_row_without_type() {
        let text = "NAME TYPE\nlonely\n";
        let records: Vec<ProxyRecord> = parse_proxy_listing(text).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].proxy_type, "");
    }

    #[test]
    fn test_parse_is_lazy() {
        let mut listing = parse_proxy_listing(LISTING);
        assert_eq!(listing.next().map(|r| r.name), Some("web-sidecar".to_string()));
        assert_eq!(listing.next().map(|r| r.name), Some("api-sidecar".to_string()));
    }

    #[test]
    fn test_filter_counts_substring_matches() {
        let records: Vec<ProxyRecord> = parse_proxy_listing(LISTING).collect();

        let count = |filter: Option<&str>| records.iter().filter(|r| matches_filter(r, filter)).count();

        assert_eq!(count(None), 3);
        assert_eq!(count(Some("")), 3);
        assert_eq!(count(Some("web")), 1);
        assert_eq!(count(Some("sidecar")), 2);
        assert_eq!(count(Some("billing")), 0);
    }
}
