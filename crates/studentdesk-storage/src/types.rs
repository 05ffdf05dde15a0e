//! Student record types shared by every backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Identity assigned by the store on insert.
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

impl Student {
    /// Returns the record without its identity.
    #[must_use]
    pub fn to_new(&self) -> NewStudent {
        NewStudent {
            name: self.name.clone(),
            email: self.email.clone(),
            age: self.age,
            course: self.course.clone(),
        }
    }

    /// Builds a full record from input and an assigned id.
    #[must_use]
    pub fn from_new(id: i32, new: NewStudent) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            age: new.age,
            course: new.course,
        }
    }
}

/// A student record that has not been assigned an identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i32) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age,
            course: None,
        }
    }

    #[must_use]
    pub fn with_course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }
}

/// Aggregate counts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub student_count: usize,
    /// Number of distinct non-null courses.
    pub course_count: usize,
}

impl DashboardData {
    /// Computes the dashboard counts from a student list.
    pub fn from_students(students: &[Student]) -> Self {
        let courses: HashSet<&str> = students
            .iter()
            .filter_map(|s| s.course.as_deref())
            .collect();

        Self {
            student_count: students.len(),
            course_count: courses.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: i32, course: Option<&str>) -> Student {
        Student {
            id,
            name: format!("Student {id}"),
            email: format!("s{id}@example.com"),
            age: 20,
            course: course.map(str::to_string),
        }
    }

    #[test]
    fn dashboard_counts_distinct_courses() {
        let students = vec![
            student(1, Some("Math")),
            student(2, Some("Math")),
            student(3, Some("CS")),
        ];
        let data = DashboardData::from_students(&students);
        assert_eq!(data.student_count, 3);
        assert_eq!(data.course_count, 2);
    }

    #[test]
    fn dashboard_ignores_missing_courses() {
        let students = vec![student(1, None), student(2, Some("CS")), student(3, None)];
        let data = DashboardData::from_students(&students);
        assert_eq!(data.student_count, 3);
        assert_eq!(data.course_count, 1);
    }

    #[test]
    fn dashboard_of_empty_list() {
        let data = DashboardData::from_students(&[]);
        assert_eq!(data, DashboardData { student_count: 0, course_count: 0 });
    }

    #[test]
    fn dashboard_serializes_camel_case() {
        let json = serde_json::to_value(DashboardData {
            student_count: 3,
            course_count: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"studentCount": 3, "courseCount": 2}));
    }

    #[test]
    fn student_round_trips_through_new() {
        let s = student(7, Some("Physics"));
        assert_eq!(Student::from_new(7, s.to_new()), s);
    }
}
