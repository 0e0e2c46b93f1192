use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::encoding;

/// Key that marks a mapping node as a reference.
pub const REF_KEY: &str = "$ref";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference target not found: {reference}")]
    UnknownTarget { reference: String },

    #[error("`$ref` at {site} must be a string")]
    MalformedRef { site: String },

    #[error("remote reference {reference} is not allowed (closed resolution index)")]
    RemoteDisallowed { reference: String },

    #[error("file reference {reference} is not allowed (enable file references to follow it)")]
    FileDisallowed { reference: String },

    #[error("failed to load referenced file {}: {detail}", .path.display())]
    FileLoad { path: PathBuf, detail: String },
}

/// Resolution scope. Same-document pointers are always followed; relative
/// local files only when explicitly permitted; remote locations never.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub allow_file_refs: bool,
    /// Directory relative file references in the entry document resolve
    /// against. References inside a loaded file resolve against that
    /// file's own directory.
    pub base_dir: Option<PathBuf>,
}

/// A fully dereferenced document plus the pointers of any reference cycles
/// that were left in place as unexpanded markers.
#[derive(Debug)]
pub struct Resolution {
    pub document: Value,
    pub cycles: Vec<String>,
}

/// One `$ref` occurrence: where it sits and what it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSite {
    pub site: String,
    pub target: String,
}

/// Enumerates every reference node in the tree, in document order.
pub fn index_references(document: &Value) -> Vec<RefSite> {
    let mut sites = Vec::new();
    collect_refs(document, "$", &mut sites);
    sites
}

fn collect_refs(node: &Value, path: &str, sites: &mut Vec<RefSite>) {
    match node {
        Value::Mapping(map) => {
            if let Some(Value::String(target)) = map.get(REF_KEY) {
                sites.push(RefSite {
                    site: path.to_string(),
                    target: target.clone(),
                });
                return;
            }
            for (key, value) in map {
                let key = key.as_str().unwrap_or("?");
                collect_refs(value, &format!("{path}.{key}"), sites);
            }
        }
        Value::Sequence(seq) => {
            for (position, value) in seq.iter().enumerate() {
                collect_refs(value, &format!("{path}[{position}]"), sites);
            }
        }
        Value::Tagged(tagged) => collect_refs(&tagged.value, path, sites),
        _ => {}
    }
}

/// Expands every reference in the document to a deep copy of its target,
/// transitively, and returns the rewritten tree.
///
/// A pointer already on the active expansion stack is a cycle: the
/// reference node is left in place as a marker and its pointer recorded in
/// [`Resolution::cycles`], so resolution always terminates. An unknown
/// target, a malformed `$ref` value, or a disallowed remote/file target
/// fails the whole resolution.
pub fn resolve(document: Value, config: &ResolverConfig) -> Result<Resolution, ResolveError> {
    let mut resolver = Resolver {
        config,
        files: HashMap::new(),
        cycles: Vec::new(),
    };
    let mut stack = Vec::new();
    let resolved = resolver.expand(&document, &document, None, &mut stack)?;
    Ok(Resolution {
        document: resolved,
        cycles: resolver.cycles,
    })
}

struct Resolver<'a> {
    config: &'a ResolverConfig,
    files: HashMap<PathBuf, Value>,
    cycles: Vec<String>,
}

impl Resolver<'_> {
    fn expand(
        &mut self,
        node: &Value,
        root: &Value,
        file: Option<&Path>,
        stack: &mut Vec<String>,
    ) -> Result<Value, ResolveError> {
        match node {
            Value::Mapping(map) => {
                if let Some(ref_value) = map.get(REF_KEY) {
                    let reference =
                        ref_value
                            .as_str()
                            .ok_or_else(|| ResolveError::MalformedRef {
                                site: describe_site(file, stack),
                            })?;
                    return match self.expand_reference(reference, root, file, stack)? {
                        Some(expanded) => Ok(expanded),
                        // Cycle: keep the reference node as a marker.
                        None => Ok(node.clone()),
                    };
                }
                let mut out = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), self.expand(value, root, file, stack)?);
                }
                Ok(Value::Mapping(out))
            }
            Value::Sequence(seq) => {
                let items = seq
                    .iter()
                    .map(|value| self.expand(value, root, file, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Sequence(items))
            }
            Value::Tagged(tagged) => {
                let value = self.expand(&tagged.value, root, file, stack)?;
                Ok(Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                    tag: tagged.tag.clone(),
                    value,
                })))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    /// Expands one reference. Returns `None` when the reference closes a
    /// cycle and must stay in place.
    fn expand_reference(
        &mut self,
        reference: &str,
        root: &Value,
        file: Option<&Path>,
        stack: &mut Vec<String>,
    ) -> Result<Option<Value>, ResolveError> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Err(ResolveError::RemoteDisallowed {
                reference: reference.to_string(),
            });
        }

        let (file_part, pointer) = match reference.split_once('#') {
            Some((f, p)) => (if f.is_empty() { None } else { Some(f) }, p),
            None => (Some(reference), ""),
        };

        match file_part {
            None => {
                let key = match file {
                    Some(path) => format!("{}#{}", path.display(), pointer),
                    None => format!("#{pointer}"),
                };
                if stack.contains(&key) {
                    self.record_cycle(key);
                    return Ok(None);
                }
                let target = lookup_pointer(root, pointer)
                    .ok_or_else(|| ResolveError::UnknownTarget {
                        reference: reference.to_string(),
                    })?
                    .clone();
                stack.push(key);
                let expanded = self.expand(&target, root, file, stack)?;
                stack.pop();
                Ok(Some(expanded))
            }
            Some(relative) => {
                if !self.config.allow_file_refs {
                    return Err(ResolveError::FileDisallowed {
                        reference: reference.to_string(),
                    });
                }
                let base = file
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .or_else(|| self.config.base_dir.clone())
                    .unwrap_or_else(|| PathBuf::from("."));
                let path = base.join(relative);
                let file_root = self.load_file(&path)?;
                let key = format!("{}#{}", path.display(), pointer);
                if stack.contains(&key) {
                    self.record_cycle(key);
                    return Ok(None);
                }
                let target = lookup_pointer(&file_root, pointer)
                    .ok_or_else(|| ResolveError::UnknownTarget {
                        reference: reference.to_string(),
                    })?
                    .clone();
                stack.push(key);
                let expanded = self.expand(&target, &file_root, Some(&path), stack)?;
                stack.pop();
                Ok(Some(expanded))
            }
        }
    }

    fn record_cycle(&mut self, key: String) {
        if !self.cycles.contains(&key) {
            self.cycles.push(key);
        }
    }

    fn load_file(&mut self, path: &Path) -> Result<Value, ResolveError> {
        if let Some(cached) = self.files.get(path) {
            return Ok(cached.clone());
        }
        let raw = std::fs::read(path).map_err(|e| ResolveError::FileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let text = encoding::normalize(&raw).map_err(|e| ResolveError::FileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let value: Value = serde_yaml::from_str(&text).map_err(|e| ResolveError::FileLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        self.files.insert(path.to_path_buf(), value.clone());
        Ok(value)
    }
}

/// Follows a JSON-pointer fragment (`/components/schemas/User`) into the
/// tree, unescaping `~1` and `~0`. An empty pointer addresses the root.
pub fn lookup_pointer<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(root);
    }
    let pointer = pointer.strip_prefix('/')?;
    let mut current = root;
    for token in pointer.split('/') {
        let token = token.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Mapping(map) => map.get(token.as_str())?,
            Value::Sequence(seq) => seq.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn describe_site(file: Option<&Path>, stack: &[String]) -> String {
    match stack.last() {
        Some(pointer) => pointer.clone(),
        None => file
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "document root".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse_document, to_yaml_string};

    const DOC_WITH_REFS: &str = r##"
openapi: 3.0.0
info:
  title: Refs API
  version: 1.0.0
paths:
  /users:
    get:
      responses:
        "200":
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/UserList"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
    UserList:
      type: array
      items:
        $ref: "#/components/schemas/User"
"##;

    #[test]
    fn indexes_every_reference_site() {
        let doc = parse_document(DOC_WITH_REFS).unwrap();
        let sites = index_references(&doc);
        let targets: Vec<&str> = sites.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(
            targets,
            ["#/components/schemas/UserList", "#/components/schemas/User"]
        );
    }

    #[test]
    fn acyclic_resolution_leaves_no_references() {
        let doc = parse_document(DOC_WITH_REFS).unwrap();
        let resolution = resolve(doc, &ResolverConfig::default()).unwrap();
        assert!(resolution.cycles.is_empty());
        assert!(index_references(&resolution.document).is_empty());
    }

    #[test]
    fn transitive_targets_are_fully_expanded() {
        let doc = parse_document(DOC_WITH_REFS).unwrap();
        let resolution = resolve(doc, &ResolverConfig::default()).unwrap();
        let items = lookup_pointer(
            &resolution.document,
            "/paths/~1users/get/responses/200/content/application~1json/schema/items",
        )
        .unwrap();
        assert_eq!(
            items.get("type").and_then(Value::as_str),
            Some("object")
        );
    }

    #[test]
    fn expanded_occurrences_are_independent_copies() {
        let doc = parse_document(
            r##"
a:
  $ref: "#/shared"
b:
  $ref: "#/shared"
shared:
  value: 1
"##,
        )
        .unwrap();
        let mut resolved = resolve(doc, &ResolverConfig::default()).unwrap().document;
        let map = resolved.as_mapping_mut().unwrap();
        let a = map.get_mut("a").unwrap().as_mapping_mut().unwrap();
        a.insert(Value::from("value"), Value::from(2));
        assert_eq!(
            resolved.get("b").unwrap().get("value").unwrap(),
            &Value::from(1)
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let first = resolve(
            parse_document(DOC_WITH_REFS).unwrap(),
            &ResolverConfig::default(),
        )
        .unwrap();
        let second = resolve(
            parse_document(DOC_WITH_REFS).unwrap(),
            &ResolverConfig::default(),
        )
        .unwrap();
        assert_eq!(
            to_yaml_string(&first.document).unwrap(),
            to_yaml_string(&second.document).unwrap()
        );
    }

    #[test]
    fn unknown_target_fails_resolution() {
        let doc = parse_document("a:\n  $ref: \"#/missing\"\n").unwrap();
        assert!(matches!(
            resolve(doc, &ResolverConfig::default()),
            Err(ResolveError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn non_string_ref_fails_resolution() {
        let doc = parse_document("a:\n  $ref: 42\n").unwrap();
        assert!(matches!(
            resolve(doc, &ResolverConfig::default()),
            Err(ResolveError::MalformedRef { .. })
        ));
    }

    #[test]
    fn remote_references_are_rejected() {
        let doc =
            parse_document("a:\n  $ref: \"https://example.com/schema.yaml#/X\"\n").unwrap();
        assert!(matches!(
            resolve(doc, &ResolverConfig::default()),
            Err(ResolveError::RemoteDisallowed { .. })
        ));
    }

    #[test]
    fn file_references_require_opt_in() {
        let doc = parse_document("a:\n  $ref: \"other.yaml#/X\"\n").unwrap();
        assert!(matches!(
            resolve(doc, &ResolverConfig::default()),
            Err(ResolveError::FileDisallowed { .. })
        ));
    }

    #[test]
    fn cycles_terminate_and_leave_a_marker() {
        let doc = parse_document(
            r##"
components:
  schemas:
    Node:
      type: object
      properties:
        next:
          $ref: "#/components/schemas/Node"
"##,
        )
        .unwrap();
        let resolution = resolve(doc, &ResolverConfig::default()).unwrap();
        assert_eq!(resolution.cycles, ["#/components/schemas/Node"]);
        let remaining = index_references(&resolution.document);
        assert!(!remaining.is_empty());
        assert!(remaining
            .iter()
            .all(|site| site.target == "#/components/schemas/Node"));
    }

    #[test]
    fn mutual_cycles_terminate() {
        let doc = parse_document(
            r##"
a:
  $ref: "#/b"
b:
  $ref: "#/a"
"##,
        )
        .unwrap();
        let resolution = resolve(doc, &ResolverConfig::default()).unwrap();
        assert!(!resolution.cycles.is_empty());
    }

    #[test]
    fn pointer_unescapes_tilde_sequences() {
        let doc = parse_document("\"a/b\":\n  \"x~y\": 7\n").unwrap();
        assert_eq!(
            lookup_pointer(&doc, "/a~1b/x~0y").and_then(Value::as_u64),
            Some(7)
        );
    }

    #[test]
    fn file_reference_resolves_when_permitted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("shared.yaml"),
            "definitions:\n  Id:\n    type: integer\n",
        )
        .unwrap();
        let doc = parse_document("id:\n  $ref: \"shared.yaml#/definitions/Id\"\n").unwrap();
        let config = ResolverConfig {
            allow_file_refs: true,
            base_dir: Some(dir.path().to_path_buf()),
        };
        let resolution = resolve(doc, &config).unwrap();
        assert_eq!(
            resolution
                .document
                .get("id")
                .and_then(|v| v.get("type"))
                .and_then(Value::as_str),
            Some("integer")
        );
    }
}
