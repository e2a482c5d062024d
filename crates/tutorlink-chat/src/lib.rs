mod convert;
mod error;
mod inbox;
mod messages;
mod resolver;

pub use error::ChatError;

use std::sync::Arc;

use tutorlink_db::Database;
use tutorlink_gateway::Dispatcher;

/// The messaging core: conversation resolution, the append-only message
/// store, and inbox aggregation. The authenticated identity is passed
/// explicitly into every operation — there is no ambient session state.
///
/// All methods are synchronous (the store is SQLite behind a mutex);
/// async callers run them under `spawn_blocking`.
pub struct ChatService {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    /// Held across insert-and-publish so subscribers observe messages in
    /// insertion order; the store mutex alone only orders the inserts.
    append_lock: std::sync::Mutex<()>,
}

impl ChatService {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self {
            db,
            dispatcher,
            append_lock: std::sync::Mutex::new(()),
        }
    }

    /// The live update channel appends are published to.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use tutorlink_types::api::Identity;
    use uuid::Uuid;

    pub fn service() -> ChatService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        ChatService::new(db, Dispatcher::new())
    }

    pub fn identity(name: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
        }
    }

    /// A registered tutor identity, present in the directory.
    pub fn tutor(service: &ChatService, name: &str) -> Identity {
        let tutor = identity(name);
        service.register_tutor(&tutor, name).unwrap();
        tutor
    }
}
