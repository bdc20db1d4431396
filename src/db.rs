pub mod change_feed;
pub mod memory_store;
pub mod pg_store;
pub mod store;

pub mod account_repo;
pub use account_repo::AccountRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;

pub use memory_store::MemoryDocumentStore;
pub use pg_store::PgDocumentStore;
pub use store::DocumentStore;
