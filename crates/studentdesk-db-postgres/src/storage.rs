//! PostgreSQL implementation of the student repository.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::debug;

use studentdesk_storage::{NewStudent, StorageError, Student, StudentRepository};

type StudentRow = (i32, String, String, i32, Option<String>);

fn row_to_student((id, name, email, age, course): StudentRow) -> Student {
    Student {
        id,
        name,
        email,
        age,
        course,
    }
}

fn internal(action: &str) -> impl FnOnce(sqlx_core::error::Error) -> StorageError + '_ {
    move |e| StorageError::internal(format!("Failed to {action}: {e}"))
}

/// PostgreSQL storage backend for student records.
#[derive(Debug, Clone)]
pub struct PostgresStudentRepository {
    pool: PgPool,
}

impl PostgresStudentRepository {
    /// Wraps a pool. Run [`migrations::run`](crate::migrations::run) first.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentRepository for PostgresStudentRepository {
    async fn get_all(&self) -> Result<Vec<Student>, StorageError> {
        let rows: Vec<StudentRow> =
            query_as("SELECT id, name, email, age, course FROM students ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(internal("list students"))?;

        Ok(rows.into_iter().map(row_to_student).collect())
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Student>, StorageError> {
        let row: Option<StudentRow> =
            query_as("SELECT id, name, email, age, course FROM students WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal("read student"))?;

        Ok(row.map(row_to_student))
    }

    async fn add(&self, student: NewStudent) -> Result<Student, StorageError> {
        let (id,): (i32,) = query_as(
            r#"INSERT INTO students (name, email, age, course)
               VALUES ($1, $2, $3, $4)
               RETURNING id"#,
        )
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.age)
        .bind(&student.course)
        .fetch_one(&self.pool)
        .await
        .map_err(internal("create student"))?;

        debug!(id, "Inserted student");
        Ok(Student::from_new(id, student))
    }

    async fn update(&self, student: &Student) -> Result<(), StorageError> {
        let result = query(
            r#"UPDATE students
               SET name = $2, email = $3, age = $4, course = $5
               WHERE id = $1"#,
        )
        .bind(student.id)
        .bind(&student.name)
        .bind(&student.email)
        .bind(student.age)
        .bind(&student.course)
        .execute(&self.pool)
        .await
        .map_err(internal("update student"))?;

        if result.rows_affected() == 0 {
            debug!(id = student.id, "Update skipped, student does not exist");
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> Result<bool, StorageError> {
        let result = query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal("delete student"))?;

        Ok(result.rows_affected() > 0)
    }
}
