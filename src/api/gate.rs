//! Request gate: public-route classification and bearer-token enforcement.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use tracing::debug;

use super::AppState;
use crate::auth::{AuthError, MSG_NO_USER_IN_CONTEXT, UserContext};

/// Only paths under this prefix are gated.
pub const API_PREFIX: &str = "/api/";

/// Path matcher of a public route.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// Literal path, compared for equality
    Exact(String),
    /// Regular expression, applied to the whole path as written
    Regex(Regex),
}

impl RoutePattern {
    /// Patterns starting with `^` are regular expressions, anything else is literal.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        if pattern.starts_with('^') {
            Ok(Self::Regex(Regex::new(pattern)?))
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == path,
            Self::Regex(re) => re.is_match(path),
        }
    }
}

/// One entry of the public-route table.
#[derive(Debug, Clone)]
pub struct PublicRoute {
    pub pattern: RoutePattern,
    /// Upper-case HTTP method names
    pub methods: Vec<String>,
}

/// Immutable table of routes reachable without an access token.
#[derive(Debug, Clone)]
pub struct PublicRoutes {
    routes: Vec<PublicRoute>,
}

const CATALOG_PUBLIC_ROUTES: &[(&str, &[&str])] = &[
    ("/api/auth/login", &["POST"]),
    ("/api/auth/refresh", &["POST"]),
    ("/api/auth/logout", &["POST"]),
    ("^/api/movies$", &["GET"]),
    ("^/api/movies/[a-f0-9-]+$", &["GET"]),
    ("^/api/series$", &["GET"]),
    ("^/api/series/[a-f0-9-]+$", &["GET"]),
    ("^/api/series/[a-f0-9-]+/seasons$", &["GET"]),
    ("^/api/seasons/[a-f0-9-]+$", &["GET"]),
    ("^/api/seasons/[a-f0-9-]+/episodes$", &["GET"]),
    ("^/api/episodes/[a-f0-9-]+$", &["GET"]),
    ("^/api/genres$", &["GET"]),
    ("^/api/genres/[a-f0-9-]+$", &["GET"]),
    ("^/api/_nuxt_icon/.*", &["GET"]),
];

impl PublicRoutes {
    pub fn new(entries: &[(&str, &[&str])]) -> Result<Self, regex::Error> {
        let routes = entries
            .iter()
            .map(|(pattern, methods)| {
                Ok(PublicRoute {
                    pattern: RoutePattern::parse(pattern)?,
                    methods: methods.iter().map(|m| m.to_ascii_uppercase()).collect(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { routes })
    }

    /// The auth endpoints plus the catalog's public read routes.
    pub fn catalog() -> Result<Self, regex::Error> {
        Self::new(CATALOG_PUBLIC_ROUTES)
    }

    /// True when both path and method match one entry.
    pub fn is_public(&self, path: &str, method: &str) -> bool {
        self.routes.iter().any(|route| {
            route.pattern.matches(path) && route.methods.iter().any(|m| m == method)
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Authenticated user extracted from the request.
///
/// Only present behind the gate; its absence rejects with
/// "User not found in context".
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserContext);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::unauthorized(MSG_NO_USER_IN_CONTEXT))
    }
}

/// Gate middleware.
///
/// Requests under [`API_PREFIX`] that do not match a public route must carry
/// `Authorization: Bearer <access token>`; on success the [`UserContext`] is
/// inserted into the request extensions.
pub async fn request_gate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path();

    if !path.starts_with(API_PREFIX) {
        return Ok(next.run(req).await);
    }

    if state.public_routes.is_public(path, req.method().as_str()) {
        debug!(path, "public route");
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let user = state.sessions.authenticate(auth_header)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
