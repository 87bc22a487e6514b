//! Todo table operations, scoped to the signed-in user.
//!
//! Every query filters on the session user's id in addition to whatever
//! row-level security the backend enforces. Rows that still come back with a
//! different owner are dropped here.

use uuid::Uuid;

use crate::error::{AuthError, DataError};
use crate::types::{NewTodo, Session, Todo};
use crate::validation::validate_title;

use super::Client;

impl Client {
    /// The active session, checked against the user the caller asked for.
    async fn scoped_session(&self, requested: Option<Uuid>) -> Result<Session, DataError> {
        let session = match self.active_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(DataError::NotAuthenticated),
            Err(AuthError::Unavailable(reason)) => return Err(DataError::Unavailable(reason)),
            Err(e) => {
                tracing::debug!(error = %e, "no usable session for data call");
                return Err(DataError::NotAuthenticated);
            }
        };
        if let Some(requested) = requested {
            if requested != session.user_id() {
                return Err(DataError::ScopeMismatch { requested, session: session.user_id() });
            }
        }
        Ok(session)
    }

    /// Todos owned by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session, `ScopeMismatch` when `user_id` is
    /// not the signed-in user, else backend failures.
    pub async fn list_todos(&self, user_id: Uuid) -> Result<Vec<Todo>, DataError> {
        let session = self.scoped_session(Some(user_id)).await?;
        let mut rows = self.backend.select_todos(&session.access_token, user_id).await?;

        let fetched = rows.len();
        rows.retain(|t| t.user_id == user_id);
        if rows.len() != fetched {
            tracing::warn!(%user_id, dropped = fetched - rows.len(), "backend returned rows of another user");
        }
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    /// Add a todo for `user_id`. The stored title is trimmed; the row starts
    /// out not completed.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank title, checked before anything else.
    pub async fn insert_todo(&self, user_id: Uuid, title: &str) -> Result<Todo, DataError> {
        let title = validate_title(title)?;
        let session = self.scoped_session(Some(user_id)).await?;
        let todo = self
            .backend
            .insert_todo(&session.access_token, &NewTodo { title, user_id })
            .await?;
        tracing::info!(%user_id, todo_id = todo.id, "todo created");
        Ok(todo)
    }

    /// # Errors
    ///
    /// `NotFound` when the signed-in user owns no todo with this id.
    pub async fn update_todo_completion(&self, id: i64, completed: bool) -> Result<(), DataError> {
        self.set_completed(id, completed).await.map(|_| ())
    }

    /// # Errors
    ///
    /// `NotFound` when the signed-in user owns no todo with this id.
    pub async fn delete_todo(&self, id: i64) -> Result<(), DataError> {
        let session = self.scoped_session(None).await?;
        let deleted = self
            .backend
            .delete_todo(&session.access_token, id, session.user_id())
            .await?;
        if deleted.is_empty() {
            return Err(DataError::NotFound(id));
        }
        tracing::info!(user_id = %session.user_id(), todo_id = id, "todo deleted");
        Ok(())
    }

    /// Flip `completed` on `todo` and return the stored row.
    ///
    /// # Errors
    ///
    /// As [`Client::update_todo_completion`].
    pub async fn toggle_todo(&self, todo: &Todo) -> Result<Todo, DataError> {
        self.set_completed(todo.id, !todo.completed).await
    }

    async fn set_completed(&self, id: i64, completed: bool) -> Result<Todo, DataError> {
        let session = self.scoped_session(None).await?;
        let updated = self
            .backend
            .update_todo(&session.access_token, id, session.user_id(), completed)
            .await?;
        let todo = updated.into_iter().next().ok_or(DataError::NotFound(id))?;
        tracing::debug!(user_id = %session.user_id(), todo_id = id, completed, "todo updated");
        Ok(todo)
    }
}

#[cfg(test)]
#[path = "todos_test.rs"]
mod tests;
