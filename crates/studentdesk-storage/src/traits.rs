//! The repository contract implemented by every storage backend.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{NewStudent, Student};

/// CRUD access to student records.
///
/// Every mutating call commits on its own; there is no batching and no
/// transaction spanning several calls.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so they can be shared across
/// request handlers behind an `Arc`.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Returns every student, ordered by insertion (ascending id).
    async fn get_all(&self) -> Result<Vec<Student>, StorageError>;

    /// Returns the student with the given id, or `None` if absent.
    async fn get_by_id(&self, id: i32) -> Result<Option<Student>, StorageError>;

    /// Persists a new student and returns it with its assigned id.
    async fn add(&self, student: NewStudent) -> Result<Student, StorageError>;

    /// Overwrites every field of the record with the same id.
    ///
    /// Updating an id that does not exist is a no-op.
    async fn update(&self, student: &Student) -> Result<(), StorageError>;

    /// Removes the student with the given id.
    ///
    /// Returns `true` if a record was removed; deleting an absent id is a
    /// no-op that returns `false`.
    async fn delete(&self, id: i32) -> Result<bool, StorageError>;
}
