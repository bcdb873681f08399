use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::clock::BusinessClock;
use crate::services::conversation::ConversationStore;
use crate::services::messaging::ChatProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: BusinessClock,
    pub chat: Box<dyn ChatProvider>,
    pub conversations: ConversationStore,
}
