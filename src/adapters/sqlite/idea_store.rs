//! SQLite implementation of `PersistenceStore<Idea>`.
//!
//! The edit lock is stored as the nullable `editing_by` / `editing_at`
//! columns and written through `update` like any other field.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::PersistenceError;
use crate::domain::models::{EditLock, Idea, IdeaPatch, MatrixPosition, Resource, UserId};
use crate::domain::ports::PersistenceStore;

const IDEA_COLUMNS: &str =
    "id, project_id, content, details, x, y, created_by, editing_by, editing_at, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteIdeaStore {
    pool: SqlitePool,
}

impl SqliteIdeaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, idea: &Idea) -> Result<(), PersistenceError> {
        idea.position.validate()?;
        let (editing_by, editing_at) = idea.edit_lock.clone().into_fields();

        sqlx::query(&format!(
            "INSERT INTO ideas ({IDEA_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(idea.id.to_string())
        .bind(idea.project_id.to_string())
        .bind(&idea.content)
        .bind(&idea.details)
        .bind(idea.position.x)
        .bind(idea.position.y)
        .bind(idea.created_by.as_str())
        .bind(editing_by.as_ref().map(UserId::as_str))
        .bind(editing_at.map(|at| at.to_rfc3339()))
        .bind(idea.created_at.to_rfc3339())
        .bind(idea.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Ideas of one project, oldest first.
    pub async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<Idea>, PersistenceError> {
        let rows: Vec<IdeaRow> = sqlx::query_as(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas WHERE project_id = ? ORDER BY created_at, id"
        ))
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Idea::try_from).collect()
    }
}

#[async_trait]
impl PersistenceStore<Idea> for SqliteIdeaStore {
    async fn get(&self, id: &str) -> Result<Option<Idea>, PersistenceError> {
        let row: Option<IdeaRow> = sqlx::query_as(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Idea::try_from).transpose()
    }

    async fn update(&self, id: &str, patch: &IdeaPatch) -> Result<Idea, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<IdeaRow> = sqlx::query_as(&format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut idea = row
            .map(Idea::try_from)
            .transpose()?
            .ok_or_else(|| PersistenceError::NotFound {
                collection: Idea::COLLECTION,
                id: id.to_string(),
            })?;

        idea.apply_patch(patch, Utc::now())?;
        let (editing_by, editing_at) = idea.edit_lock.clone().into_fields();

        sqlx::query(
            r#"UPDATE ideas SET content = ?, details = ?, x = ?, y = ?,
               editing_by = ?, editing_at = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&idea.content)
        .bind(&idea.details)
        .bind(idea.position.x)
        .bind(idea.position.y)
        .bind(editing_by.as_ref().map(UserId::as_str))
        .bind(editing_at.map(|at| at.to_rfc3339()))
        .bind(idea.updated_at.to_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(idea)
    }
}

#[derive(sqlx::FromRow)]
struct IdeaRow {
    id: String,
    project_id: String,
    content: String,
    details: Option<String>,
    x: f64,
    y: f64,
    created_by: String,
    editing_by: Option<String>,
    editing_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<IdeaRow> for Idea {
    type Error = PersistenceError;

    fn try_from(row: IdeaRow) -> Result<Self, Self::Error> {
        let edit_lock = EditLock::from_fields(
            row.editing_by.map(UserId::new),
            parse_optional_datetime(row.editing_at)?,
        )?;

        Ok(Idea {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            content: row.content,
            details: row.details,
            position: MatrixPosition { x: row.x, y: row.y },
            created_by: UserId::new(row.created_by),
            edit_lock,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
