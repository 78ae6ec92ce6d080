// Route resolution

use crate::HttpMethod;
use crate::route_registry::{ControllerDescriptor, RouteDescriptor, RouteStore};
use crate::routing::UrlPattern;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The handler chosen for a request plus the variables its pattern bound
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub route: Arc<RouteDescriptor>,
    pub pattern: UrlPattern,
    pub variables: HashMap<String, String>,
}

/// Select the handler for `method` and `path`.
///
/// Controllers are tried in registration order and the first one with a
/// match wins. Inside a controller the method-agnostic mappings are tried
/// first, then the mappings restricted to `method`. Within each pass the
/// first dynamic match beats every static one and is never replaced; with
/// no dynamic match the first static match is used.
///
/// `None` means no handler is mapped, which callers report as a 404.
pub fn resolve(store: &RouteStore, method: Option<HttpMethod>, path: &str) -> Option<ResolvedRoute> {
    for controller in store.controllers() {
        let agnostic = best_match(controller, path, |m| m.is_none());
        let found = agnostic.or_else(|| {
            let method = method?;
            best_match(controller, path, |m| m == Some(method))
        });
        if let Some(resolved) = found {
            debug!(
                controller = %controller.name,
                handler = %resolved.route.handler_name,
                pattern = %resolved.pattern,
                path,
                "Resolved route"
            );
            return Some(resolved);
        }
    }
    debug!(path, "No route matched");
    None
}

fn best_match(
    controller: &ControllerDescriptor,
    path: &str,
    accepts: impl Fn(Option<HttpMethod>) -> bool,
) -> Option<ResolvedRoute> {
    let mut best: Option<ResolvedRoute> = None;

    for route in &controller.routes {
        for mapping in route.mappings.iter().filter(|m| accepts(m.method)) {
            let result = mapping.pattern.matches(path);
            if !result.is_match {
                continue;
            }
            if result.is_dynamic {
                return Some(ResolvedRoute {
                    route: route.clone(),
                    pattern: mapping.pattern.clone(),
                    variables: result.variables,
                });
            }
            if best.is_none() {
                best = Some(ResolvedRoute {
                    route: route.clone(),
                    pattern: mapping.pattern.clone(),
                    variables: result.variables,
                });
            }
        }
    }

    best
}
