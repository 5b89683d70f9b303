use serde::{Deserialize, Serialize};

/// A user profile as returned by the API and persisted with the session.
///
/// The server may send the identifier as `_id`; it is always written back
/// as `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub followers_count: u32,
    #[serde(default)]
    pub following_count: u32,
    #[serde(default)]
    pub is_following: bool,
}

impl User {
    /// Name for display, with a placeholder for blank names.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Unknown User"
        } else {
            name
        }
    }

    /// Avatar letter: first character of the name, upper-cased, or `U`.
    pub fn initial(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "U".to_string())
    }
}

/// Payload for `PUT /users/{id}`. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_accepts_mongo_id() {
        let user: User = serde_json::from_str(r#"{"_id":"64f0","name":"Bea"}"#).unwrap();
        assert_eq!(user.id, "64f0");
        assert_eq!(user.followers_count, 0);
        assert!(user.email.is_none());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "64f0");
        assert!(json.get("_id").is_none());
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_user_derived_fields() {
        let mut user: User = serde_json::from_str(r#"{"id":"u1","name":"ada lovelace"}"#).unwrap();
        assert_eq!(user.initial(), "A");
        assert_eq!(user.display_name(), "ada lovelace");

        user.name = "   ".to_string();
        assert_eq!(user.initial(), "U");
        assert_eq!(user.display_name(), "Unknown User");
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            bio: Some("Home cook".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "bio": "Home cook" }));
    }
}
