// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route permission registry.
//!
//! Maps `"<METHOD>:<path>"` to the permission code gating that route. The
//! registry is built once next to the router definition and is immutable
//! afterwards; both the authorization middleware and permission-update
//! validation consult the same object, so "registered permission" always
//! means "permission some route actually declares".

use std::collections::HashMap;

/// Immutable route → permission-code registry.
#[derive(Debug, Default)]
pub struct PermRegistry {
    routes: HashMap<String, String>,
}

fn route_key(method: &str, path: &str) -> String {
    format!("{method}:{path}")
}

impl PermRegistry {
    pub fn builder() -> PermRegistryBuilder {
        PermRegistryBuilder {
            routes: HashMap::new(),
        }
    }

    /// Permission code gating a route, if the route is gated at all.
    pub fn code_for(&self, method: &str, path: &str) -> Option<&str> {
        self.routes.get(&route_key(method, path)).map(String::as_str)
    }

    /// Whether any route declares this permission code.
    pub fn is_registered(&self, code: &str) -> bool {
        self.routes.values().any(|c| c == code)
    }

    /// All gated routes with their permission codes.
    pub fn routes(&self) -> &HashMap<String, String> {
        &self.routes
    }
}

/// Builder used at router-definition time.
pub struct PermRegistryBuilder {
    routes: HashMap<String, String>,
}

impl PermRegistryBuilder {
    /// Declare that `method path` requires `code`.
    pub fn route(
        mut self,
        method: &str,
        path: &str,
        code: impl Into<String>,
    ) -> Self {
        self.routes.insert(route_key(method, path), code.into());
        self
    }

    pub fn build(self) -> PermRegistry {
        PermRegistry {
            routes: self.routes,
        }
    }
}
