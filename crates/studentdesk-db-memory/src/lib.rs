//! In-memory student storage backend for StudentDesk.
//!
//! Provides an implementation of [`StudentRepository`] over a papaya
//! lock-free HashMap. Used for development and tests; data is lost when the
//! process exits.
//!
//! # Example
//!
//! ```ignore
//! use studentdesk_db_memory::InMemoryStudentRepository;
//! use studentdesk_storage::{NewStudent, StudentRepository};
//!
//! let repo = InMemoryStudentRepository::new();
//! let created = repo.add(NewStudent::new("Ada", "ada@example.com", 19)).await?;
//! assert_eq!(created.id, 1);
//! ```

mod storage;

pub use storage::InMemoryStudentRepository;
pub use studentdesk_storage::{StorageError, StudentRepository};
