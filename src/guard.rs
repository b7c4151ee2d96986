//! Guards decide whether a request may reach its handler.
//!
//! A guard that returns `false` stops the pipeline with
//! `403 Forbidden resource`.

use crate::request::Request;

/// Authorization check run before interceptors, pipes and the handler.
pub trait Guard: Send + Sync + 'static {
    fn can_activate(&self, req: &Request) -> bool;
}

/// Any `Fn(&Request) -> bool` is a guard.
impl<F> Guard for F
where
    F: Fn(&Request) -> bool + Send + Sync + 'static,
{
    fn can_activate(&self, req: &Request) -> bool {
        self(req)
    }
}

/// Passes when the caller holds at least one of the required roles.
#[derive(Clone, Debug)]
pub struct RolesGuard {
    required: Required,
}

#[derive(Clone, Debug)]
enum Required {
    Fixed(Vec<String>),
    FromRoute,
}

impl RolesGuard {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required: Required::Fixed(roles.into_iter().map(Into::into).collect()) }
    }

    /// Requires the `admin` role.
    pub fn admin() -> Self {
        Self::new(["admin"])
    }

    /// Reads the required roles from the route's
    /// [`Route::roles`](crate::Route::roles) metadata. Routes without role
    /// metadata are open.
    pub fn from_route() -> Self {
        Self { required: Required::FromRoute }
    }

    fn allows(required: &[String], req: &Request) -> bool {
        let caller = req.caller();
        required.iter().any(|role| caller.has_role(role))
    }
}

impl Guard for RolesGuard {
    fn can_activate(&self, req: &Request) -> bool {
        match &self.required {
            Required::Fixed(roles) => Self::allows(roles, req),
            Required::FromRoute => match req.route() {
                Some(meta) if !meta.roles.is_empty() => Self::allows(&meta.roles, req),
                _ => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::pipeline::RouteMeta;
    use crate::request::ROLES_HEADER;

    fn with_roles(roles: &str) -> Request {
        Request::new(Method::POST, "/cats").with_header(ROLES_HEADER, roles)
    }

    #[test]
    fn admin_passes_and_others_fail() {
        let guard = RolesGuard::admin();
        assert!(guard.can_activate(&with_roles("admin")));
        assert!(guard.can_activate(&with_roles("user,admin")));
        assert!(!guard.can_activate(&with_roles("user")));
        assert!(!guard.can_activate(&with_roles("administrator")));
        assert!(!guard.can_activate(&Request::new(Method::POST, "/cats")));
    }

    #[test]
    fn from_route_reads_route_metadata() {
        let guard = RolesGuard::from_route();
        let mut req = with_roles("editor");
        req.route = Some(Arc::new(RouteMeta {
            method: Method::POST,
            path: "/cats".into(),
            summary: None,
            roles: vec!["admin".into()],
        }));
        assert!(!guard.can_activate(&req));

        req.route = Some(Arc::new(RouteMeta {
            method: Method::POST,
            path: "/cats".into(),
            summary: None,
            roles: vec!["editor".into()],
        }));
        assert!(guard.can_activate(&req));
    }

    #[test]
    fn from_route_without_metadata_is_open() {
        assert!(RolesGuard::from_route().can_activate(&Request::new(Method::GET, "/cats")));
    }

    #[test]
    fn closures_are_guards() {
        let guard = |req: &Request| req.header("x-debug").is_some();
        assert!(!Guard::can_activate(&guard, &Request::new(Method::GET, "/")));
    }
}
