//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod card_repo;
pub mod collection_repo;
pub mod file_repo;

pub use card_repo::CardRepo;
pub use collection_repo::CollectionRepo;
pub use file_repo::FileRepo;
