//! Backend auth endpoints, relative to the API base URL.

pub const LOGIN: &str = "/auth/login";
pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const LOGOUT: &str = "/auth/logout";
pub const CURRENT_USER: &str = "/users/me";

/// Joins an API base URL and an endpoint path with exactly one slash.
pub fn join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `Authorization` header value for a bearer token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_normalises_slashes() {
        assert_eq!(
            join("http://rai/api/v1/", LOGIN),
            "http://rai/api/v1/auth/login"
        );
        assert_eq!(
            join("http://rai/api/v1", "users/me"),
            "http://rai/api/v1/users/me"
        );
    }

    #[test]
    fn test_bearer_prefix() {
        assert_eq!(bearer("abc"), "Bearer abc");
    }
}
