use std::sync::Arc;

use serde_json::Value;

use super::dto::Cat;
use crate::ws::Gateway;

/// Event answered by [`CatsGateway`].
pub const MESSAGE_EVENT: &str = "message";
/// Event pushed by [`CatsGateway::broadcast`].
pub const CAT_EVENT: &str = "catEvent";

/// Echoes `message` events back as `"Received: <data>"` and can push
/// `catEvent`s to every connected client.
#[derive(Clone)]
pub struct CatsGateway {
    gateway: Arc<Gateway>,
}

impl CatsGateway {
    pub fn new() -> Self {
        let gateway = Gateway::new().on(MESSAGE_EVENT, |data| {
            let text = match data {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some(Value::String(format!("Received: {text}")))
        });
        Self { gateway: Arc::new(gateway) }
    }

    /// The gateway to register on the router.
    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.gateway)
    }

    /// Sends `cat` as a `catEvent` to every connected client. Returns how many
    /// clients it was queued for.
    pub fn broadcast(&self, cat: &Cat) -> usize {
        match serde_json::to_value(cat) {
            Ok(data) => self.gateway.broadcast(CAT_EVENT, data),
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode cat event");
                0
            }
        }
    }
}

impl Default for CatsGateway {
    fn default() -> Self { Self::new() }
}
