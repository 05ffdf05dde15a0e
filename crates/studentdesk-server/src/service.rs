use studentdesk_storage::{DynStudentRepository, NewStudent, StorageError, Student};
use tracing::instrument;

/// Facade over the student repository used by the handlers.
#[derive(Clone)]
pub struct StudentService {
    repository: DynStudentRepository,
}

impl StudentService {
    pub fn new(repository: DynStudentRepository) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Student>, StorageError> {
        self.repository.get_all().await
    }

    #[instrument(skip(self))]
    pub async fn find(&self, id: i32) -> Result<Option<Student>, StorageError> {
        self.repository.get_by_id(id).await
    }

    #[instrument(skip(self, student), fields(email = %student.email))]
    pub async fn create(&self, student: NewStudent) -> Result<Student, StorageError> {
        self.repository.add(student).await
    }

    #[instrument(skip(self, student), fields(id = student.id))]
    pub async fn update(&self, student: &Student) -> Result<(), StorageError> {
        self.repository.update(student).await
    }

    /// Returns `true` if a record was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, StorageError> {
        self.repository.delete(id).await
    }
}
