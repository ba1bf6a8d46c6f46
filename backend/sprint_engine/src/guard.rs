//! Precondition checks shared by every command.

use sprint_rules::Project;
use tokio_util::sync::CancellationToken;

use crate::errors::{EngineError, Result};

/// Called immediately before a command's first write.
pub fn not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

pub fn found<T>(entity: &'static str, id: i64, row: Option<T>) -> Result<T> {
    row.ok_or(EngineError::NotFound { entity, id })
}

pub fn ensure_owner(project: &Project, user_id: i64) -> Result<()> {
    if project.user_id == user_id {
        Ok(())
    } else {
        Err(EngineError::Forbidden(format!(
            "user {user_id} does not own project {}",
            project.id
        )))
    }
}

pub fn positive_id(field: &str, id: i64) -> Result<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(EngineError::rule(format!("invalid {field}: {id}")))
    }
}

pub fn non_negative(field: &str, value: i64) -> Result<()> {
    if value >= 0 {
        Ok(())
    } else {
        Err(EngineError::rule(format!("{field} cannot be negative")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprint_rules::GoalUnit;

    #[test]
    fn cancelled_token_stops_writes() {
        let token = CancellationToken::new();
        assert!(not_cancelled(&token).is_ok());
        token.cancel();
        assert!(matches!(not_cancelled(&token), Err(EngineError::Cancelled)));
    }

    #[test]
    fn ownership_is_by_user_id() {
        let project = Project {
            id: 3,
            user_id: 9,
            title: "Draft".into(),
            goal_amount: None,
            goal_unit: GoalUnit::Words,
        };
        assert!(ensure_owner(&project, 9).is_ok());
        assert!(matches!(ensure_owner(&project, 8), Err(EngineError::Forbidden(_))));
    }

    #[test]
    fn id_and_count_checks() {
        assert!(positive_id("UserId", 1).is_ok());
        assert!(matches!(positive_id("UserId", 0), Err(EngineError::BusinessRule(_))));
        assert!(non_negative("word count", 0).is_ok());
        assert_eq!(
            non_negative("word count", -1).unwrap_err().to_string(),
            "word count cannot be negative"
        );
    }
}
