//! Database repository for employee CRUD operations.
//!
//! Uses prepared statements; inserts and updates return the stored row.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Employee, EmployeeFields};

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, email, phone_number, role, department, signature, time_posted";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all employees in insertion order.
    pub async fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(employee_from_row).collect())
    }

    /// Get an employee by ID.
    pub async fn get_employee(&self, id: i64) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(employee_from_row))
    }

    /// Insert a new employee, stamping `time_posted` with the current time.
    pub async fn create_employee(&self, fields: &EmployeeFields) -> Result<Employee, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO employees (first_name, last_name, email, phone_number, role, department, signature, time_posted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .bind(&fields.role)
        .bind(&fields.department)
        .bind(&fields.signature)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(employee_from_row(&row))
    }

    /// Overwrite the writable fields of an employee. `time_posted` is untouched.
    pub async fn update_employee(
        &self,
        id: i64,
        fields: &EmployeeFields,
    ) -> Result<Employee, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE employees SET first_name = ?, last_name = ?, email = ?, phone_number = ?, \
             role = ?, department = ?, signature = ? WHERE id = ? RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .bind(&fields.role)
        .bind(&fields.department)
        .bind(&fields.signature)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(employee_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", id)))
    }

    /// Delete an employee.
    pub async fn delete_employee(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Employee {} not found", id)));
        }

        Ok(())
    }

    /// Close the underlying pool. Subsequent queries fail.
    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn employee_from_row(row: &sqlx::sqlite::SqliteRow) -> Employee {
    Employee {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone_number: row.get("phone_number"),
        role: row.get("role"),
        department: row.get("department"),
        signature: row.get("signature"),
        time_posted: row.get("time_posted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    fn fields(department: &str) -> EmployeeFields {
        EmployeeFields {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "555-0100".to_string(),
            role: "Engineer".to_string(),
            department: department.to_string(),
            signature: "check-in".to_string(),
        }
    }

    #[tokio::test]
    async fn test_employee_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let repo = Repository::new(pool);

        let first = repo.create_employee(&fields("Ops")).await.unwrap();
        let second = repo.create_employee(&fields("R&D")).await.unwrap();
        assert!(second.id > first.id);

        let mut changed = fields("Sales");
        changed.signature = "check-out".to_string();
        let updated = repo.update_employee(first.id, &changed).await.unwrap();
        assert_eq!(updated.department, "Sales");
        assert_eq!(updated.time_posted, first.time_posted);

        let listed = repo.list_employees().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);

        repo.delete_employee(first.id).await.unwrap();
        assert!(repo.get_employee(first.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_employee(first.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.update_employee(first.id, &changed).await,
            Err(AppError::NotFound(_))
        ));
    }
}
