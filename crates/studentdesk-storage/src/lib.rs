//! # studentdesk-storage
//!
//! Storage abstraction layer for StudentDesk.
//!
//! This crate defines the student record types and the repository contract
//! every backend implements. Backends live in separate crates
//! (`studentdesk-db-memory`, `studentdesk-db-postgres`).
//!
//! ## Example
//!
//! ```ignore
//! use studentdesk_storage::{NewStudent, StudentRepository, StorageError};
//!
//! async fn enrol(repo: &dyn StudentRepository) -> Result<i32, StorageError> {
//!     let student = repo
//!         .add(NewStudent::new("Ada Lovelace", "ada@example.com", 19).with_course("Math"))
//!         .await?;
//!     Ok(student.id)
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::StorageError;
pub use traits::StudentRepository;
pub use types::{DashboardData, NewStudent, Student};

/// Type alias for a shared repository trait object.
pub type DynStudentRepository = std::sync::Arc<dyn StudentRepository>;
