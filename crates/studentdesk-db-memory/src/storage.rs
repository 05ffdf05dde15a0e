use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use studentdesk_storage::{NewStudent, StorageError, Student, StudentRepository};

/// In-memory student storage backend using papaya lock-free HashMap.
///
/// Ids are assigned from an atomic counter starting at 1, so ascending id
/// order is insertion order.
#[derive(Debug)]
pub struct InMemoryStudentRepository {
    data: Arc<PapayaHashMap<i32, Student>>,
    next_id: AtomicI32,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            next_id: AtomicI32::new(1),
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.data.pin().len() == 0
    }

    fn next_id(&self) -> Result<i32, StorageError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if id <= 0 {
            return Err(StorageError::internal("student id sequence exhausted"));
        }
        Ok(id)
    }
}

impl Default for InMemoryStudentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn get_all(&self) -> Result<Vec<Student>, StorageError> {
        let guard = self.data.pin();
        let mut students: Vec<Student> = guard.iter().map(|(_, s)| s.clone()).collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Student>, StorageError> {
        let guard = self.data.pin();
        Ok(guard.get(&id).cloned())
    }

    async fn add(&self, student: NewStudent) -> Result<Student, StorageError> {
        let id = self.next_id()?;
        let stored = Student::from_new(id, student);
        let guard = self.data.pin();
        guard.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, student: &Student) -> Result<(), StorageError> {
        let guard = self.data.pin();
        // Only overwrites an existing entry; absent ids stay absent.
        guard.update(student.id, |_| student.clone());
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, StorageError> {
        let guard = self.data.pin();
        Ok(guard.remove(&id).is_some())
    }
}
