use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::models::TeacherModel;
use crate::shared::AppError;
use crate::store::{InMemoryStore, PostgresStore};

/// Read access to the teacher catalog, which is managed elsewhere
#[async_trait]
pub trait CatalogRepository {
    async fn list_teachers(&self) -> Result<Vec<TeacherModel>, AppError>;
    async fn add_teacher(&self, teacher: TeacherModel) -> Result<(), AppError>;
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    #[instrument(skip(self))]
    async fn list_teachers(&self) -> Result<Vec<TeacherModel>, AppError> {
        let tables = self.tables()?;
        debug!(teacher_count = tables.teachers.len(), "Listing teachers from memory");
        Ok(tables.teachers.clone())
    }

    #[instrument(skip(self, teacher), fields(teacher_name = %teacher.name))]
    async fn add_teacher(&self, teacher: TeacherModel) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        tables.teachers.push(teacher);
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn list_teachers(&self) -> Result<Vec<TeacherModel>, AppError> {
        let teacher_rows = sqlx::query("SELECT id, name FROM teachers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let mut teachers = Vec::with_capacity(teacher_rows.len());
        let mut index = HashMap::new();
        for row in teacher_rows {
            let id: String = row.try_get("id")?;
            index.insert(id.clone(), teachers.len());
            teachers.push(TeacherModel {
                id,
                name: row.try_get("name")?,
                subjects: Vec::new(),
                quotes: Vec::new(),
            });
        }

        let subject_rows =
            sqlx::query("SELECT teacher_id, subject FROM teacher_subjects ORDER BY subject")
                .fetch_all(&self.pool)
                .await?;
        for row in subject_rows {
            let teacher_id: String = row.try_get("teacher_id")?;
            if let Some(&i) = index.get(&teacher_id) {
                teachers[i].subjects.push(row.try_get("subject")?);
            }
        }

        let quote_rows = sqlx::query("SELECT teacher_id, text FROM teacher_quotes")
            .fetch_all(&self.pool)
            .await?;
        for row in quote_rows {
            let teacher_id: String = row.try_get("teacher_id")?;
            if let Some(&i) = index.get(&teacher_id) {
                teachers[i].quotes.push(row.try_get("text")?);
            }
        }

        debug!(teacher_count = teachers.len(), "Teachers loaded from database");
        Ok(teachers)
    }

    #[instrument(skip(self, teacher), fields(teacher_name = %teacher.name))]
    async fn add_teacher(&self, teacher: TeacherModel) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO teachers (id, name) VALUES ($1, $2)")
            .bind(&teacher.id)
            .bind(&teacher.name)
            .execute(&mut *tx)
            .await?;
        for subject in &teacher.subjects {
            sqlx::query("INSERT INTO teacher_subjects (teacher_id, subject) VALUES ($1, $2)")
                .bind(&teacher.id)
                .bind(subject)
                .execute(&mut *tx)
                .await?;
        }
        for quote in &teacher.quotes {
            sqlx::query("INSERT INTO teacher_quotes (teacher_id, text) VALUES ($1, $2)")
                .bind(&teacher.id)
                .bind(quote)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
