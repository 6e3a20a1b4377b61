//! Path-based lookup over a GraphQL `data` tree.
//!
//! Upstream responses are addressed by an ordered path that mixes object keys
//! and array indices, e.g. `["xMatchSetting", "vsStages", 0, "name"]`. Sibling
//! fields are never inspected, so additive schema changes upstream are ignored.

use serde_json::Value;
use std::fmt;

use crate::QueryError;

/// One step of a response path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSeg<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for PathSeg<'a> {
    fn from(key: &'a str) -> Self {
        PathSeg::Key(key)
    }
}

impl From<usize> for PathSeg<'_> {
    fn from(idx: usize) -> Self {
        PathSeg::Index(idx)
    }
}

impl fmt::Display for PathSeg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSeg::Key(k) => write!(f, "{k}"),
            PathSeg::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Build a `&[PathSeg]` from mixed keys and indices.
///
/// ```ignore
/// let name = resp.str_at(path!["weapon", "subWeapon", "name"])?;
/// let stage = resp.str_at(path!["vsStages", 0, "vsStageId"])?;
/// ```
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        &[$($crate::PathSeg::from($seg)),*]
    };
}

fn render(path: &[PathSeg<'_>]) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Owned response tree returned by a [`crate::QueryClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    root: Value,
}

impl QueryResponse {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    /// Walk `path` and return the value it addresses.
    pub fn get(&self, path: &[PathSeg<'_>]) -> Result<&Value, QueryError> {
        let mut cur = &self.root;
        for (depth, seg) in path.iter().enumerate() {
            let next = match (seg, cur) {
                (PathSeg::Key(k), Value::Object(map)) => map.get(*k),
                (PathSeg::Index(i), Value::Array(items)) => items.get(*i),
                _ => None,
            };
            cur = next.ok_or_else(|| QueryError::PathNotFound {
                path: render(&path[..=depth]),
            })?;
        }
        Ok(cur)
    }

    /// Sub-response rooted at `path`, so parsers can address one node relatively.
    pub fn node(&self, path: &[PathSeg<'_>]) -> Result<QueryResponse, QueryError> {
        self.get(path).map(|v| QueryResponse::new(v.clone()))
    }

    pub fn is_null_at(&self, path: &[PathSeg<'_>]) -> Result<bool, QueryError> {
        Ok(self.get(path)?.is_null())
    }

    pub fn str_at(&self, path: &[PathSeg<'_>]) -> Result<&str, QueryError> {
        self.get(path)?
            .as_str()
            .ok_or_else(|| unexpected(path, "string"))
    }

    /// Nullable string: JSON `null` maps to `None`, a missing key is still an error.
    pub fn opt_str_at(&self, path: &[PathSeg<'_>]) -> Result<Option<&str>, QueryError> {
        match self.get(path)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            _ => Err(unexpected(path, "string or null")),
        }
    }

    pub fn i64_at(&self, path: &[PathSeg<'_>]) -> Result<i64, QueryError> {
        self.get(path)?
            .as_i64()
            .ok_or_else(|| unexpected(path, "integer"))
    }

    pub fn f64_at(&self, path: &[PathSeg<'_>]) -> Result<f64, QueryError> {
        self.get(path)?
            .as_f64()
            .ok_or_else(|| unexpected(path, "number"))
    }

    pub fn bool_at(&self, path: &[PathSeg<'_>]) -> Result<bool, QueryError> {
        self.get(path)?
            .as_bool()
            .ok_or_else(|| unexpected(path, "boolean"))
    }

    /// Array elements at `path`, each wrapped as its own response node.
    pub fn array_at(&self, path: &[PathSeg<'_>]) -> Result<Vec<QueryResponse>, QueryError> {
        self.get(path)?
            .as_array()
            .map(|items| items.iter().cloned().map(QueryResponse::new).collect())
            .ok_or_else(|| unexpected(path, "array"))
    }
}

impl From<Value> for QueryResponse {
    fn from(root: Value) -> Self {
        QueryResponse::new(root)
    }
}

fn unexpected(path: &[PathSeg<'_>], expected: &'static str) -> QueryError {
    QueryError::UnexpectedType {
        path: render(path),
        expected,
    }
}
