use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn author_name(&self) -> &str {
        match self.user.as_ref().map(|u| u.name.trim()) {
            Some(name) if !name.is_empty() => name,
            _ => "User",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_parses_and_names_author() {
        let comment: Comment = serde_json::from_str(
            r#"{"_id":"c1","content":"Lovely","user":{"_id":"u1","name":"Dee"},"created_at":"2024-06-01T08:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(comment.id, "c1");
        assert_eq!(comment.author_name(), "Dee");

        let anonymous: Comment = serde_json::from_str(r#"{"id":"c2","content":"Hi"}"#).unwrap();
        assert_eq!(anonymous.author_name(), "User");
        assert!(anonymous.created_at.is_none());
    }
}
