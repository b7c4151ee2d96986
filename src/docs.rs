//! Generated API documentation.
//!
//! Produces an OpenAPI 3.0 shaped JSON document from the router's route
//! table. Only what the router knows is described: paths, methods, summaries,
//! path parameters and required roles (as the `x-roles` extension).

use serde_json::{Map, Value, json};

use crate::pipeline::RouteMeta;

/// Title block of the generated document.
#[derive(Clone, Debug)]
pub struct ApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl ApiInfo {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self { title: title.into(), description: description.into(), version: version.into() }
    }
}

pub(crate) fn document<'a>(
    info: &ApiInfo,
    routes: impl IntoIterator<Item = &'a std::sync::Arc<RouteMeta>>,
) -> Value {
    let mut paths = Map::new();
    for route in routes {
        let mut operation = Map::new();
        if let Some(summary) = &route.summary {
            operation.insert("summary".into(), json!(summary));
        }
        let params: Vec<Value> = path_params(&route.path)
            .map(|name| json!({ "name": name, "in": "path", "required": true, "schema": { "type": "string" } }))
            .collect();
        if !params.is_empty() {
            operation.insert("parameters".into(), Value::Array(params));
        }
        if !route.roles.is_empty() {
            operation.insert("x-roles".into(), json!(route.roles));
        }

        let item = paths
            .entry(route.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(route.method.as_str().to_ascii_lowercase(), Value::Object(operation));
        }
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": info.title,
            "description": info.description,
            "version": info.version,
        },
        "paths": paths,
    })
}

/// Names of `{param}` segments, in order.
fn path_params(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
}
