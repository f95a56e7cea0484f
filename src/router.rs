//! Declarative request routing.
//!
//! Each service declares an ordered table of `(method, path pattern,
//! endpoint)` entries. A request resolves to the first entry whose method and
//! pattern both match; the endpoint is a plain value (usually a `Copy` enum)
//! that the service dispatches on. Routing can therefore be tested without
//! any handler, backend or HTTP machinery.
//!
//! # Pattern Syntax
//!
//! ```text
//! /tickets                     literal segments
//! /tickets/{id}                one non-empty segment, captured as "id"
//! /users/{id:hex}/status       one segment of [a-f0-9-]+
//! /tickets/{id:empty}/{*rest}  one empty segment ("/tickets//status")
//! /tickets/{id}/{sub}/{*rest}  one or more trailing segments (last only)
//! /tickets/{id}/status/{*rest?} zero or more trailing segments (last only)
//! ```
//!
//! # Example
//!
//! ```
//! use helpdesk_gateway::router::RouteTable;
//! use http::Method;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Endpoint { Get, Comment }
//!
//! let table = RouteTable::new()
//!     .route(Method::GET, "/tickets/{id}", Endpoint::Get)
//!     .route(Method::POST, "/tickets/{id}/comments", Endpoint::Comment);
//!
//! let matched = table.match_route(&Method::POST, "/tickets/t-1/comments").unwrap();
//! assert_eq!(matched.endpoint, Endpoint::Comment);
//! assert_eq!(matched.params.get("id"), Some("t-1"));
//! ```

use http::Method;
use thiserror::Error;

/// Collapse any run of leading slashes into one (`//tickets` becomes `/tickets`).
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Split a normalized path into segments; `/` has none.
fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

// =============================================================================
// Patterns
// =============================================================================

/// Errors for malformed route patterns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("unknown parameter constraint '{0}'")]
    UnknownConstraint(String),

    #[error("parameter name is empty")]
    EmptyName,

    #[error("wildcard must be the last segment")]
    WildcardNotLast,

    #[error("unbalanced braces in segment '{0}'")]
    UnbalancedBraces(String),
}

/// Constraint on a captured segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Any,
    Hex,
    Empty,
}

impl ParamKind {
    fn accepts(self, segment: &str) -> bool {
        match self {
            ParamKind::Any => !segment.is_empty(),
            ParamKind::Hex => {
                !segment.is_empty()
                    && segment
                        .bytes()
                        .all(|b| matches!(b, b'a'..=b'f' | b'0'..=b'9' | b'-'))
            }
            ParamKind::Empty => segment.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Wildcard {
    name: String,
    optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, kind: ParamKind },
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    wildcard: Option<Wildcard>,
}

impl PathPattern {
    /// Parse a pattern such as `/users/{id:hex}/status`.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let body = pattern
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let raw: Vec<&str> = if body.is_empty() {
            Vec::new()
        } else {
            body.split('/').collect()
        };

        let mut segments = Vec::with_capacity(raw.len());
        let mut wildcard = None;

        for (index, part) in raw.iter().enumerate() {
            if wildcard.is_some() {
                return Err(PatternError::WildcardNotLast);
            }

            let inner = match (part.strip_prefix('{'), part.ends_with('}')) {
                (Some(rest), true) => &rest[..rest.len() - 1],
                (None, false) if !part.contains(['{', '}']) => {
                    segments.push(Segment::Literal(part.to_string()));
                    continue;
                }
                _ => return Err(PatternError::UnbalancedBraces(part.to_string())),
            };

            if let Some(name) = inner.strip_prefix('*') {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(name) => (name, true),
                    None => (name, false),
                };
                if name.is_empty() {
                    return Err(PatternError::EmptyName);
                }
                if index + 1 != raw.len() {
                    return Err(PatternError::WildcardNotLast);
                }
                wildcard = Some(Wildcard {
                    name: name.to_string(),
                    optional,
                });
                continue;
            }

            let (name, kind) = match inner.split_once(':') {
                None => (inner, ParamKind::Any),
                Some((name, "hex")) => (name, ParamKind::Hex),
                Some((name, "empty")) => (name, ParamKind::Empty),
                Some((_, other)) => return Err(PatternError::UnknownConstraint(other.to_string())),
            };
            if name.is_empty() {
                return Err(PatternError::EmptyName);
            }
            segments.push(Segment::Param {
                name: name.to_string(),
                kind,
            });
        }

        Ok(Self { segments, wildcard })
    }

    /// Match path segments, returning captured parameters.
    fn matches(&self, path: &[&str]) -> Option<PathParams> {
        let fixed = self.segments.len();
        match &self.wildcard {
            Some(w) if w.optional && path.len() < fixed => return None,
            Some(w) if !w.optional && path.len() <= fixed => return None,
            None if path.len() != fixed => return None,
            _ => {}
        }

        let mut params = PathParams::default();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param { name, kind } if kind.accepts(actual) => {
                    params.push(name, actual);
                }
                Segment::Param { .. } => return None,
            }
        }

        if let Some(wildcard) = &self.wildcard {
            params.push(&wildcard.name, &path[fixed..].join("/"));
        }

        Some(params)
    }
}

// =============================================================================
// Route Table
// =============================================================================

/// Parameters captured from the path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    /// Value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<E> {
    pub endpoint: E,
    pub params: PathParams,
}

#[derive(Debug, Clone)]
struct Route<E> {
    method: Option<Method>,
    pattern: PathPattern,
    endpoint: E,
}

/// Ordered routing table; the first matching entry wins.
#[derive(Debug, Clone)]
pub struct RouteTable<E> {
    routes: Vec<Route<E>>,
}

impl<E: Clone> RouteTable<E> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add an entry for a single method.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is malformed.
    pub fn route(self, method: Method, pattern: &str, endpoint: E) -> Self {
        self.push(Some(method), pattern, endpoint)
    }

    /// Add an entry matching every method.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is malformed.
    pub fn any(self, pattern: &str, endpoint: E) -> Self {
        self.push(None, pattern, endpoint)
    }

    fn push(mut self, method: Option<Method>, pattern: &str, endpoint: E) -> Self {
        let pattern = match PathPattern::parse(pattern) {
            Ok(parsed) => parsed,
            Err(e) => panic!("Invalid route pattern {:?}: {}", pattern, e),
        };
        self.routes.push(Route {
            method,
            pattern,
            endpoint,
        });
        self
    }

    /// Resolve a request. `path` is normalized before matching.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<E>> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        self.routes.iter().find_map(|route| {
            if route.method.as_ref().is_some_and(|m| m != method) {
                return None;
            }
            route.pattern.matches(&segments).map(|params| RouteMatch {
                endpoint: route.endpoint.clone(),
                params,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<E: Clone> Default for RouteTable<E> {
    fn default() -> Self {
        Self::new()
    }
}
