use serde_yaml::Value;

use crate::rules::Finding;

/// Read-only index over a loaded document.
///
/// Built in a single pass, it exposes the facts the rule engine consumes
/// (security-scheme presence, contact presence, server URLs in authored
/// order) together with structural findings from a basic conformance check.
/// The index never mutates the tree it was built from.
#[derive(Debug)]
pub struct SpecIndex {
    security_schemes_present: bool,
    contact_present: bool,
    server_urls: Vec<String>,
    structural_findings: Vec<Finding>,
}

impl SpecIndex {
    pub fn build(document: &Value) -> Self {
        let mut findings = Vec::new();

        if document.as_mapping().is_none() {
            findings.push(Finding::structural(
                "document root must be a mapping",
                Some("$"),
            ));
            return Self {
                security_schemes_present: false,
                contact_present: false,
                server_urls: Vec::new(),
                structural_findings: findings,
            };
        }

        match document.get("openapi") {
            Some(Value::String(_)) => {}
            Some(_) => findings.push(Finding::structural(
                "`openapi` version must be a string",
                Some("$.openapi"),
            )),
            None => findings.push(Finding::structural(
                "missing `openapi` version field",
                Some("$.openapi"),
            )),
        }

        match document.get("info") {
            Some(info) if info.is_mapping() => {
                if info.get("title").and_then(Value::as_str).is_none() {
                    findings.push(Finding::structural(
                        "missing `info.title`",
                        Some("$.info.title"),
                    ));
                }
                if info.get("version").is_none() {
                    findings.push(Finding::structural(
                        "missing `info.version`",
                        Some("$.info.version"),
                    ));
                }
            }
            Some(_) => findings.push(Finding::structural(
                "`info` must be a mapping",
                Some("$.info"),
            )),
            None => findings.push(Finding::structural("missing `info` object", Some("$.info"))),
        }

        if document.get("paths").is_none() {
            findings.push(Finding::structural(
                "missing `paths` object",
                Some("$.paths"),
            ));
        }

        // The typed model covers 3.0.x only; other versions get just the
        // field checks above.
        let is_3_0 = matches!(
            document.get("openapi"),
            Some(Value::String(v)) if v.starts_with("3.0")
        );
        if findings.is_empty() && is_3_0 {
            // The typed model deserializes from JSON values; bridge the
            // YAML tree through serde_json first.
            match serde_json::to_value(document) {
                Ok(json) => {
                    if let Err(e) = serde_json::from_value::<openapiv3::OpenAPI>(json) {
                        findings.push(Finding::structural(
                            format!("document does not conform to the OpenAPI 3.0 model: {e}"),
                            None,
                        ));
                    }
                }
                Err(e) => findings.push(Finding::structural(
                    format!("document is not JSON-compatible: {e}"),
                    None,
                )),
            }
        }

        let security_schemes_present = document
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(Value::as_mapping)
            .map(|schemes| !schemes.is_empty())
            .unwrap_or(false);

        let contact_present = document
            .get("info")
            .and_then(|info| info.get("contact"))
            .map(|contact| !contact.is_null())
            .unwrap_or(false);

        let mut server_urls = Vec::new();
        if let Some(servers) = document.get("servers").and_then(Value::as_sequence) {
            for server in servers {
                if let Some(url) = server.get("url").and_then(Value::as_str) {
                    server_urls.push(url.to_string());
                }
            }
        }

        Self {
            security_schemes_present,
            contact_present,
            server_urls,
            structural_findings: findings,
        }
    }

    /// Whether the document declares at least one security scheme.
    pub fn has_security_schemes(&self) -> bool {
        self.security_schemes_present
    }

    /// Whether `info.contact` is present.
    pub fn has_contact(&self) -> bool {
        self.contact_present
    }

    /// Server URLs in authored order.
    pub fn server_urls(&self) -> &[String] {
        &self.server_urls
    }

    /// Findings from the structural conformance pass, in check order.
    pub fn structural_findings(&self) -> &[Finding] {
        &self.structural_findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;

    const FULL_DOC: &str = r#"
openapi: 3.0.0
info:
  title: Payments API
  version: 1.2.0
  contact:
    name: API team
servers:
  - url: https://api.example.com/v1
  - url: http://staging.example.com/v1
paths: {}
components:
  securitySchemes:
    apiKey:
      type: apiKey
      in: header
      name: X-Api-Key
"#;

    #[test]
    fn indexes_facts_from_a_complete_document() {
        let doc = parse_document(FULL_DOC).unwrap();
        let index = SpecIndex::build(&doc);
        assert!(index.has_security_schemes());
        assert!(index.has_contact());
        assert_eq!(
            index.server_urls(),
            [
                "https://api.example.com/v1",
                "http://staging.example.com/v1"
            ]
        );
        assert!(index.structural_findings().is_empty());
    }

    #[test]
    fn missing_sections_are_reported_as_absent() {
        let doc = parse_document(
            "openapi: 3.0.0\ninfo:\n  title: Bare\n  version: 0.1.0\npaths: {}\n",
        )
        .unwrap();
        let index = SpecIndex::build(&doc);
        assert!(!index.has_security_schemes());
        assert!(!index.has_contact());
        assert!(index.server_urls().is_empty());
        assert!(index.structural_findings().is_empty());
    }

    #[test]
    fn empty_security_schemes_count_as_absent() {
        let doc = parse_document(
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: 1.0.0\npaths: {}\ncomponents:\n  securitySchemes: {}\n",
        )
        .unwrap();
        assert!(!SpecIndex::build(&doc).has_security_schemes());
    }

    #[test]
    fn missing_top_level_fields_produce_findings() {
        let doc = parse_document("info:\n  title: T\n").unwrap();
        let index = SpecIndex::build(&doc);
        let messages: Vec<&str> = index
            .structural_findings()
            .iter()
            .map(|f| f.message.as_str())
            .collect();
        assert!(messages.contains(&"missing `openapi` version field"));
        assert!(messages.contains(&"missing `info.version`"));
        assert!(messages.contains(&"missing `paths` object"));
    }

    #[test]
    fn non_mapping_root_is_a_single_finding() {
        let doc = parse_document("- just\n- a\n- list\n").unwrap();
        let index = SpecIndex::build(&doc);
        assert_eq!(index.structural_findings().len(), 1);
        assert_eq!(
            index.structural_findings()[0].message,
            "document root must be a mapping"
        );
    }

    #[test]
    fn server_entries_without_url_are_skipped() {
        let doc = parse_document(
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: 1.0.0\npaths: {}\nservers:\n  - description: no url\n  - url: https://a.example.com\n",
        )
        .unwrap();
        assert_eq!(
            SpecIndex::build(&doc).server_urls(),
            ["https://a.example.com"]
        );
    }
}
