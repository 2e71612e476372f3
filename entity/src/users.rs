use crate::Id;
use serde::{Deserialize, Serialize};

/// Identity of the signed-in user as issued by `GET /users/me`.
/// Read-only to the console.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: Id,
    #[serde(alias = "name", default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Model {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_backend_user_payload() {
        let user: Model = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "fullName": "Alice Nguyen",
            "email": "alice@example.com",
            "roles": ["Admin"]
        }))
        .unwrap();

        assert_eq!(user.full_name, "Alice Nguyen");
        assert!(user.has_role("admin"));
        assert!(!user.has_role("viewer"));
    }

    #[test]
    fn test_missing_roles_default_to_empty() {
        let user: Model =
            serde_json::from_value(serde_json::json!({ "id": "u-2", "name": "Bob" })).unwrap();
        assert_eq!(user.full_name, "Bob");
        assert!(user.roles.is_empty());
    }
}
