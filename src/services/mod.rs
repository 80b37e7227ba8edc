pub mod cache;
pub mod chat;
pub mod connectivity;
pub mod context;
pub mod database;
pub mod errors;
pub mod markdown;
pub mod persistence;
pub mod store;
pub mod supabase;
pub mod sync;
#[cfg(test)]
pub mod testing;

pub use cache::LocalCache;
pub use connectivity::HttpProbe;
pub use context::AppContext;
pub use database::SqliteStore;
pub use store::ConversationStore;
pub use supabase::SupabaseStore;
pub use sync::SyncAgent;
