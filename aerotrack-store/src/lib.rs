pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod pg_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use memory_repo::MemoryStore;
pub use pg_repo::PgStore;
