pub mod config_service;
pub mod in_memory_entry_store;
pub mod in_memory_session_feed;
pub mod paths;
pub mod session_token_store;
pub mod supabase_entry_store;
pub mod supabase_session_feed;

pub use crate::config_service::ConfigService;
pub use crate::in_memory_entry_store::{InMemoryEntryStore, StoreCalls};
pub use crate::in_memory_session_feed::InMemorySessionFeed;
pub use crate::paths::MemoPaths;
pub use crate::session_token_store::SessionTokenStore;
pub use crate::supabase_entry_store::SupabaseEntryStore;
pub use crate::supabase_session_feed::SupabaseSessionFeed;
