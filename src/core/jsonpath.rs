use anyhow::{bail, Context, Result};
use serde_json::Value;
use serde_json_path::JsonPath;

/// One JSONPath match: the value found and the concrete path that reached it.
///
/// The path carries no wildcards and can be used to address the same node
/// again, e.g. when projecting a credential for limited disclosure.
#[derive(Debug, Clone, PartialEq)]
pub struct PathHit {
    pub value: Value,
    pub path: String,
}

/// Evaluate a JSONPath expression against a document, returning every match
/// in document order.
///
/// A syntactically invalid expression is the only error; an expression that
/// matches nothing yields an empty vector.
pub fn extract(root: &Value, expression: &str) -> Result<Vec<PathHit>> {
    let path = JsonPath::parse(expression)
        .with_context(|| format!("invalid JSONPath expression: {expression}"))?;

    Ok(path
        .query_located(root)
        .into_iter()
        .map(|located| PathHit {
            path: located.location().to_string(),
            value: located.node().clone(),
        })
        .collect())
}

/// A single step of a concrete (wildcard-free) JSONPath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse a concrete JSONPath into its segments.
///
/// Accepts the normalized bracket form produced by [extract]
/// (`$['credentialSubject']['age']`, `$[0]`) as well as the dot form
/// (`$.credentialSubject.age`). Wildcards, unions and recursive descent are
/// rejected: a concrete path addresses exactly one node.
pub fn parse_concrete_path(path: &str) -> Result<Vec<PathSegment>> {
    let mut chars = path.chars().peekable();
    match chars.next() {
        Some('$') => {}
        _ => bail!("concrete path must start with '$': {path}"),
    }

    let mut segments = Vec::new();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if chars.peek() == Some(&'.') {
                    bail!("recursive descent is not a concrete path: {path}");
                }
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if name.is_empty() {
                    bail!("empty member name in path: {path}");
                }
                segments.push(PathSegment::Key(name));
            }
            '[' => match chars.peek().copied() {
                Some(quote @ ('\'' | '"')) => {
                    chars.next();
                    let mut name = String::new();
                    let mut closed = false;
                    while let Some(next) = chars.next() {
                        match next {
                            '\\' => {
                                if let Some(escaped) = chars.next() {
                                    name.push(escaped);
                                }
                            }
                            _ if next == quote => {
                                closed = true;
                                break;
                            }
                            _ => name.push(next),
                        }
                    }
                    if !closed || chars.next() != Some(']') {
                        bail!("unterminated bracket selector in path: {path}");
                    }
                    segments.push(PathSegment::Key(name));
                }
                _ => {
                    let mut digits = String::new();
                    for next in chars.by_ref() {
                        if next == ']' {
                            break;
                        }
                        digits.push(next);
                    }
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .with_context(|| format!("invalid index selector in path: {path}"))?;
                    segments.push(PathSegment::Index(index));
                }
            },
            _ => bail!("unexpected character {c:?} in path: {path}"),
        }
    }

    Ok(segments)
}

/// Resolve a parsed concrete path against a document.
pub fn value_at<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match segment {
        PathSegment::Key(key) => node.get(key.as_str()),
        PathSegment::Index(index) => node.get(index),
    })
}

/// Write a value into a document at a concrete path, creating intermediate
/// objects and arrays as needed.
///
/// Array elements keep their original indices; gaps are filled with nulls so
/// previously recorded concrete paths still resolve in the rebuilt document.
pub fn insert_at(root: &mut Value, segments: &[PathSegment], value: &Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *root = value.clone();
        return;
    };

    match segment {
        PathSegment::Key(key) => {
            if !root.is_object() {
                *root = Value::Object(serde_json::Map::new());
            }
            let child = root
                .as_object_mut()
                .expect("just ensured an object")
                .entry(key.clone())
                .or_insert(Value::Null);
            insert_at(child, rest, value);
        }
        PathSegment::Index(index) => {
            if !root.is_array() {
                *root = Value::Array(Vec::new());
            }
            let array = root.as_array_mut().expect("just ensured an array");
            if array.len() <= *index {
                array.resize(*index + 1, Value::Null);
            }
            insert_at(&mut array[*index], rest, value);
        }
    }
}
