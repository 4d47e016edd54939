//! Route table - maps a method and path to exactly one route.

use http::Method;
use serde_json::Value;
use tracing::{debug, trace};

use crate::binder::BoundRequest;
use crate::error::{RouteError, SpecError};
use crate::request::{parse_query, split_target, PathValues};
use crate::route::Route;

/// Registered routes, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::DuplicateRoute` if a route with the same method
    /// already matches exactly the same paths.
    pub fn insert(&mut self, route: Route) -> Result<(), SpecError> {
        let duplicate = self.routes.iter().any(|existing| {
            existing.method() == route.method() && existing.template().same_shape(route.template())
        });
        if duplicate {
            return Err(SpecError::DuplicateRoute {
                method: route.method().clone(),
                path: route.path().to_string(),
            });
        }
        debug!(method = %route.method(), path = route.path(), params = route.params().len(), "route registered");
        self.routes.push(route);
        Ok(())
    }

    /// Chaining form of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn route(mut self, route: Route) -> Result<Self, SpecError> {
        self.insert(route)?;
        Ok(self)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for a request path (without query string).
    ///
    /// When several templates match, the one with the most literal segments
    /// wins, so `/items/me` beats `/items/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::NotFound` if no template matches, or
    /// `RouteError::MethodNotAllowed` if templates match but none for
    /// this method.
    pub fn find(&self, method: &Method, path: &str) -> Result<(&Route, PathValues), RouteError> {
        let mut path_matched = false;
        let mut best: Option<(&Route, PathValues)> = None;

        for route in &self.routes {
            let Some(values) = route.matches(path) else {
                continue;
            };
            path_matched = true;
            if route.method() != method {
                continue;
            }
            let better = best.as_ref().map_or(true, |(current, _)| {
                route.template().specificity() > current.template().specificity()
            });
            if better {
                best = Some((route, values));
            }
        }

        match best {
            Some(found) => {
                trace!(method = %method, path, template = found.0.path(), "route matched");
                Ok(found)
            }
            None if path_matched => Err(RouteError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
            }),
            None => Err(RouteError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Route a request target (path plus optional query string) and bind it.
    ///
    /// # Errors
    ///
    /// Returns `RouteError` if no route matches or binding fails.
    pub fn bind(
        &self,
        method: &Method,
        target: &str,
        body: Option<&Value>,
    ) -> Result<BoundRequest, RouteError> {
        let (path, query) = split_target(target);
        let (route, path_values) = self.find(method, path)?;
        let query_values = parse_query(query);
        Ok(route.bind(&path_values, &query_values, body)?)
    }
}
