use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::models::UserRole;

/// Hex SHA-256 digest used for membership-code comparison. Codes are only
/// ever compared through this digest; the plaintext configured value never
/// leaves the server and the client never submits one.
pub fn code_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn digest_matches(configured: &Option<String>, submitted: &str) -> bool {
    configured
        .as_deref()
        .map(|code| code_digest(code) == submitted)
        .unwrap_or(false)
}

/// Role assignment at registration, first match wins:
/// admin email, then admin code, then elite-member code, then member code,
/// and plain `user` when nothing matches.
pub fn assign_role(config: &Config, email: &str, membership_code_digest: Option<&str>) -> UserRole {
    if config
        .admin_email
        .as_deref()
        .is_some_and(|admin_email| admin_email == email)
    {
        return UserRole::Admin;
    }

    if let Some(digest) = membership_code_digest {
        if digest_matches(&config.admin_code, digest) {
            return UserRole::Admin;
        }
        if digest_matches(&config.elite_member_code, digest) {
            return UserRole::EliteMember;
        }
        if digest_matches(&config.member_code, digest) {
            return UserRole::Member;
        }
    }

    UserRole::User
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "secret".to_string(),
            jwt_maxage: 900,
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
            upload_dir: "static/uploads".to_string(),
            admin_email: Some("captain@team.example".to_string()),
            admin_code: Some("admin-code".to_string()),
            elite_member_code: Some("elite-code".to_string()),
            member_code: Some("member-code".to_string()),
        }
    }

    #[test]
    fn admin_email_wins_over_any_code() {
        let config = test_config();
        let digest = code_digest("member-code");
        let role = assign_role(&config, "captain@team.example", Some(&digest));
        assert_eq!(role, UserRole::Admin);
    }

    #[test]
    fn codes_resolve_in_precedence_order() {
        let config = test_config();
        assert_eq!(
            assign_role(&config, "x@y.z", Some(&code_digest("admin-code"))),
            UserRole::Admin
        );
        assert_eq!(
            assign_role(&config, "x@y.z", Some(&code_digest("elite-code"))),
            UserRole::EliteMember
        );
        assert_eq!(
            assign_role(&config, "x@y.z", Some(&code_digest("member-code"))),
            UserRole::Member
        );
    }

    #[test]
    fn unknown_or_absent_code_falls_back_to_user() {
        let config = test_config();
        assert_eq!(
            assign_role(&config, "x@y.z", Some(&code_digest("guess"))),
            UserRole::User
        );
        assert_eq!(assign_role(&config, "x@y.z", None), UserRole::User);
    }

    #[test]
    fn unconfigured_codes_never_match() {
        let mut config = test_config();
        config.admin_code = None;
        config.elite_member_code = None;
        config.member_code = None;
        config.admin_email = None;
        assert_eq!(
            assign_role(&config, "x@y.z", Some(&code_digest("admin-code"))),
            UserRole::User
        );
    }

    #[test]
    fn digest_is_hex_and_not_the_plaintext() {
        let digest = code_digest("member-code");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, "member-code");
    }
}
