mod model;
mod repository;

pub use model::{CredentialDB, NewCredentialDB};
pub use repository::CredentialRepository;
