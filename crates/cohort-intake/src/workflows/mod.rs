pub mod admissions;
pub mod enrollment;
pub(crate) mod http;
pub mod intake;
pub mod memory;
pub mod persistence;

pub use memory::InMemoryStore;
pub use persistence::RepositoryError;
