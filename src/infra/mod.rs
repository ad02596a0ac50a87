// Concrete adapters for the app ports
pub mod http_client;
pub mod sqlite_store;

pub use http_client::ReqwestFetcher;
pub use sqlite_store::{SqliteConnector, SqliteStore};
