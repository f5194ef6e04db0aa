//! Query parameter extractors for list endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use hirechat_types::message::{MessageCursor, MessageId, MessageQuery};

use crate::http::error::AppError;

/// Largest page a client may request from the history endpoint.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Query parameters for the message history endpoint.
///
/// `after_created_at` and `after_id` together form a keyset cursor and must
/// be given as a pair.
#[derive(Debug, Deserialize, Default)]
pub struct MessageListQuery {
    /// Only messages created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub after_created_at: Option<DateTime<Utc>>,
    pub after_id: Option<String>,
    /// Maximum results, capped at [`MAX_PAGE_SIZE`].
    pub limit: Option<u32>,
}

impl MessageListQuery {
    pub fn into_query(self) -> Result<MessageQuery, AppError> {
        let after = match (self.after_created_at, self.after_id) {
            (Some(created_at), Some(id)) => {
                let id: MessageId = id
                    .parse()
                    .map_err(|_| AppError::Validation(format!("Invalid message ID: {id}")))?;
                Some(MessageCursor { created_at, id })
            }
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "after_created_at and after_id must be given together".to_string(),
                ));
            }
        };

        if self.limit == Some(0) {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }

        Ok(MessageQuery {
            since: self.since,
            after,
            limit: self.limit.map(|l| l.min(MAX_PAGE_SIZE)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_lists_everything() {
        let query = MessageListQuery::default().into_query().unwrap();
        assert_eq!(query, MessageQuery::all());
    }

    #[test]
    fn test_cursor_requires_both_halves() {
        let q = MessageListQuery {
            after_created_at: Some(Utc::now()),
            ..Default::default()
        };
        assert!(matches!(q.into_query(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_cursor_and_limit() {
        let id = MessageId::new();
        let at = Utc::now();
        let q = MessageListQuery {
            after_created_at: Some(at),
            after_id: Some(id.to_string()),
            limit: Some(10_000),
            ..Default::default()
        };
        let query = q.into_query().unwrap();
        assert_eq!(query.after, Some(MessageCursor { created_at: at, id }));
        assert_eq!(query.limit, Some(MAX_PAGE_SIZE));
    }

    #[test]
    fn test_bad_message_id_rejected() {
        let q = MessageListQuery {
            after_created_at: Some(Utc::now()),
            after_id: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(q.into_query().is_err());
    }
}
