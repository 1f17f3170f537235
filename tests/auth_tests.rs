mod common;

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::Algorithm;

use qms_auth::auth::flow::{self, AuthFailure};
use qms_auth::auth::jwt::{TokenError, TokenService, TokenSubject};
use qms_auth::auth::password::validate_new_password;
use qms_auth::auth::permission::{self, Decision};
use qms_auth::config::TokenConfig;
use qms_auth::db::{CredentialStore, MemoryStore};
use qms_auth::models::Role;

fn subject() -> TokenSubject {
    TokenSubject {
        user_id: "user-1".to_string(),
        username: "alice".to_string(),
        role_id: "role-operator".to_string(),
    }
}

// ── Password hashing ────────────────────────────────────────────

#[test]
fn password_verifies_against_own_hash_only() {
    let hasher = common::test_hasher();
    let hash = hasher.hash("Admin@123").unwrap();

    assert!(hasher.verify("Admin@123", &hash));
    assert!(!hasher.verify("wrong", &hash));
    assert!(!hasher.verify("admin@123", &hash));
    assert!(!hasher.verify("", &hash));
}

#[test]
fn same_password_hashes_differently() {
    let hasher = common::test_hasher();
    let first = hasher.hash("correct horse").unwrap();
    let second = hasher.hash("correct horse").unwrap();

    assert_ne!(first, second);
    assert!(hasher.verify("correct horse", &first));
    assert!(hasher.verify("correct horse", &second));
    assert!(first.starts_with("$argon2id$"));
}

#[test]
fn malformed_hash_is_false_not_error() {
    let hasher = common::test_hasher();
    assert!(!hasher.verify("anything", ""));
    assert!(!hasher.verify("anything", "not-a-phc-string"));
    assert!(!hasher.verify("anything", "$2b$12$abcdefghijklmnopqrstuv"));
}

#[test]
fn hash_from_other_cost_still_verifies() {
    let cheap = common::test_hasher();
    let other = qms_auth::auth::password::PasswordHasher::new(qms_auth::config::HashCost {
        memory_kib: 2048,
        iterations: 2,
    })
    .unwrap();

    let hash = other.hash("password123").unwrap();
    assert!(cheap.verify("password123", &hash));
}

#[test]
fn decoy_hash_costs_the_same_as_real_hashes() {
    let hasher = common::test_hasher();
    let cost = common::test_cost();
    let real = hasher.hash("password123").unwrap();

    for phc in [hasher.decoy_hash(), real.as_str()] {
        let parsed = argon2::password_hash::PasswordHash::new(phc).unwrap();
        assert_eq!(parsed.algorithm.as_str(), "argon2id");
        assert_eq!(parsed.params.get_decimal("m"), Some(cost.memory_kib));
        assert_eq!(parsed.params.get_decimal("t"), Some(cost.iterations));
    }
}

#[test]
fn decoy_verification_never_succeeds() {
    let hasher = common::test_hasher();
    assert!(!hasher.verify_decoy(""));
    assert!(!hasher.verify_decoy("Admin@123"));
    assert!(!hasher.verify_decoy(hasher.decoy_hash()));
}

#[test]
fn new_password_minimum_length() {
    assert!(validate_new_password("short").is_err());
    assert!(validate_new_password("1234567").is_err());
    assert!(validate_new_password("12345678").is_ok());
}

// ── Token service ───────────────────────────────────────────────

#[test]
fn token_round_trips_claims() {
    let tokens = common::test_tokens();
    let token = tokens.issue(&subject()).unwrap();

    let claims = tokens.verify(&token).unwrap();
    assert_eq!(claims.sub, "user-1");
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.role_id, "role-operator");
}

#[test]
fn default_ttl_is_eight_hours() {
    let tokens = common::test_tokens();
    assert_eq!(tokens.ttl(), Duration::minutes(480));

    let claims = tokens.verify(&tokens.issue(&subject()).unwrap()).unwrap();
    assert_eq!(claims.exp - claims.iat, 480 * 60);
}

#[test]
fn token_expires_exactly_after_ttl() {
    let tokens = common::test_tokens();
    let issued_at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let ttl = Duration::minutes(30);
    let token = tokens.issue_at(&subject(), issued_at, ttl).unwrap();

    let eps = Duration::seconds(1);
    assert!(tokens.verify_at(&token, issued_at + ttl - eps).is_ok());
    assert!(tokens.verify_at(&token, issued_at + ttl).is_ok());
    assert_eq!(
        tokens.verify_at(&token, issued_at + ttl + eps),
        Err(TokenError::Expired)
    );
}

#[test]
fn token_issued_in_the_past_is_expired_now() {
    let tokens = common::test_tokens();
    let token = tokens
        .issue_at(&subject(), Utc::now() - Duration::hours(9), Duration::hours(8))
        .unwrap();
    assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
}

#[test]
fn wrong_secret_is_invalid_signature_even_when_expired() {
    let issuer = common::test_tokens();
    let other = TokenService::new(&common::token_config("a-completely-different-secret-value"));

    let fresh = issuer.issue(&subject()).unwrap();
    assert_eq!(other.verify(&fresh), Err(TokenError::InvalidSignature));

    let stale = issuer
        .issue_at(&subject(), Utc::now() - Duration::days(2), Duration::hours(1))
        .unwrap();
    assert_eq!(other.verify(&stale), Err(TokenError::InvalidSignature));
}

#[test]
fn spliced_payload_is_invalid_signature() {
    let tokens = common::test_tokens();
    let alice = tokens.issue(&subject()).unwrap();
    let mallory = tokens
        .issue(&TokenSubject {
            user_id: "user-admin".to_string(),
            username: "admin".to_string(),
            role_id: "role-admin".to_string(),
        })
        .unwrap();

    let alice_parts: Vec<&str> = alice.split('.').collect();
    let mallory_parts: Vec<&str> = mallory.split('.').collect();
    let forged = format!("{}.{}.{}", alice_parts[0], mallory_parts[1], alice_parts[2]);

    assert_eq!(tokens.verify(&forged), Err(TokenError::InvalidSignature));
}

#[test]
fn garbage_is_malformed() {
    let tokens = common::test_tokens();
    assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
    assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Malformed));
    assert_eq!(tokens.verify("a.b.c"), Err(TokenError::Malformed));
}

#[test]
fn algorithm_mismatch_is_invalid_signature() {
    let hs512 = TokenService::new(&TokenConfig {
        secret: common::TEST_SECRET.to_string(),
        algorithm: Algorithm::HS512,
        ttl: Duration::minutes(10),
    });
    let token = hs512.issue(&subject()).unwrap();

    assert!(hs512.verify(&token).is_ok());
    assert_eq!(
        common::test_tokens().verify(&token),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn only_hmac_algorithms_are_configurable() {
    use qms_auth::config::parse_algorithm;
    assert_eq!(parse_algorithm("HS256"), Ok(Algorithm::HS256));
    assert_eq!(parse_algorithm("hs384"), Ok(Algorithm::HS384));
    assert_eq!(parse_algorithm("HS512"), Ok(Algorithm::HS512));
    assert!(parse_algorithm("RS256").is_err());
    assert!(parse_algorithm("none").is_err());
}

#[test]
fn token_ttl_must_fit_the_clock() {
    use qms_auth::config::parse_ttl_minutes;
    assert_eq!(parse_ttl_minutes("480"), Ok(Duration::minutes(480)));
    assert!(parse_ttl_minutes("0").is_err());
    assert!(parse_ttl_minutes("-5").is_err());
    assert!(parse_ttl_minutes("soon").is_err());
    assert!(parse_ttl_minutes(&i64::MAX.to_string()).is_err());
    assert!(parse_ttl_minutes("9000000000000").is_err());
}

#[test]
fn overflowing_lifetime_fails_to_issue() {
    let tokens = common::test_tokens();
    assert!(tokens.issue_with_ttl(&subject(), Duration::MAX).is_err());
    assert!(
        tokens
            .issue_at(&subject(), Utc::now(), Duration::days(365 * 300_000))
            .is_err()
    );
}

// ── Permission gate ─────────────────────────────────────────────

#[test]
fn system_admin_with_empty_map_is_allowed_everything() {
    let admin = Role::new("role-admin", "System Admin", BTreeMap::new());
    assert!(admin.is_superadmin);
    assert_eq!(
        permission::check_role(&admin, "anything.nonexistent"),
        Decision::Allow
    );
}

#[test]
fn admin_name_match_is_case_sensitive() {
    let imposter = Role::new("role-x", "system admin", BTreeMap::new());
    assert!(!imposter.is_superadmin);
    assert_eq!(
        permission::check_role(&imposter, "nc.create"),
        Decision::Deny("Permission denied: nc.create".to_string())
    );
}

#[test]
fn superadmin_flag_survives_rename() {
    let mut admin = Role::new("role-admin", "System Admin", BTreeMap::new());
    admin.name = "Administrators".to_string();
    assert!(permission::check_role(&admin, "wo.approve").is_allowed());
}

#[test]
fn explicit_map_grants_and_denies() {
    let mut perms = BTreeMap::new();
    perms.insert("nc.create".to_string(), true);
    perms.insert("nc.view".to_string(), false);
    let role = Role::new("role-qa", "QA Engineer", perms);

    assert_eq!(permission::check_role(&role, "nc.create"), Decision::Allow);
    assert_eq!(
        permission::check_role(&role, "nc.approve"),
        Decision::Deny("Permission denied: nc.approve".to_string())
    );
    assert_eq!(
        permission::check_role(&role, "nc.view"),
        Decision::Deny("Permission denied: nc.view".to_string())
    );
}

#[test]
fn all_key_is_not_a_wildcard() {
    let mut perms = BTreeMap::new();
    perms.insert("all".to_string(), true);
    let role = Role::new("role-fake", "Almost Admin", perms);

    assert!(!permission::check_role(&role, "wo.view").is_allowed());
}

#[test]
fn permission_registry_accepts_known_keys() {
    assert!(permission::is_known_permission("all"));
    assert!(permission::is_known_permission("capa.approve"));
    assert!(permission::is_known_permission("user.manage"));
    assert!(!permission::is_known_permission("capa.aprove"));
    assert!(!permission::is_known_permission("widgets.view"));
    assert!(!permission::is_known_permission("nc"));
    assert!(!permission::is_known_permission("NC.CREATE"));

    let mut perms = BTreeMap::new();
    perms.insert("nc.create".to_string(), true);
    perms.insert("nc.crate".to_string(), true);
    let err = permission::validate_permissions(&perms).unwrap_err();
    assert!(err.contains("nc.crate"));
    assert!(!err.contains("nc.create,"));
}

// ── Authentication flow ─────────────────────────────────────────

async fn operator_fixture() -> (MemoryStore, TokenService, String) {
    let store = MemoryStore::new();
    store
        .create_role(common::role("role-operator", "Operator", &[("wo.view", true)]))
        .await
        .unwrap();
    let hasher = common::test_hasher();
    let alice = common::insert_user(&store, &hasher, "alice", "password123", "role-operator").await;

    let tokens = common::test_tokens();
    let token = tokens
        .issue(&TokenSubject {
            user_id: alice.user.id.clone(),
            username: alice.user.username.clone(),
            role_id: alice.user.role_id.clone(),
        })
        .unwrap();
    (store, tokens, token)
}

#[tokio::test]
async fn valid_token_authenticates_with_role_loaded() {
    let (store, tokens, token) = operator_fixture().await;

    let user = flow::authenticate(&tokens, &store, Some(&token)).await.unwrap();
    assert_eq!(user.user.username, "alice");
    assert_eq!(user.role.name, "Operator");
    assert_eq!(permission::check(&user, "wo.view"), Decision::Allow);
    assert_eq!(
        permission::check(&user, "wo.approve"),
        Decision::Deny("Permission denied: wo.approve".to_string())
    );
}

#[tokio::test]
async fn no_token_is_missing_credentials() {
    let (store, tokens, _) = operator_fixture().await;
    let err = flow::authenticate(&tokens, &store, None).await.unwrap_err();
    assert!(matches!(err, AuthFailure::MissingCredentials));
}

#[tokio::test]
async fn bad_token_is_invalid_or_expired() {
    let (store, tokens, token) = operator_fixture().await;

    let err = flow::authenticate(&tokens, &store, Some("garbage")).await.unwrap_err();
    assert!(matches!(
        err,
        AuthFailure::InvalidOrExpiredToken(TokenError::Malformed)
    ));

    let rotated = TokenService::new(&common::token_config("rotated-secret-rotated-secret-!!"));
    let err = flow::authenticate(&rotated, &store, Some(&token)).await.unwrap_err();
    assert!(matches!(
        err,
        AuthFailure::InvalidOrExpiredToken(TokenError::InvalidSignature)
    ));
}

#[tokio::test]
async fn token_for_missing_user_is_unknown_user() {
    let (store, tokens, _) = operator_fixture().await;
    let ghost = tokens
        .issue(&TokenSubject {
            user_id: "no-such-user".to_string(),
            username: "ghost".to_string(),
            role_id: "role-operator".to_string(),
        })
        .unwrap();

    let err = flow::authenticate(&tokens, &store, Some(&ghost)).await.unwrap_err();
    assert!(matches!(err, AuthFailure::UnknownUser));
}

#[tokio::test]
async fn deactivation_rejects_previously_valid_token() {
    let (store, tokens, token) = operator_fixture().await;
    let alice = flow::authenticate(&tokens, &store, Some(&token)).await.unwrap();

    assert!(store.set_active(&alice.user.id, false).await.unwrap());

    let err = flow::authenticate(&tokens, &store, Some(&token)).await.unwrap_err();
    assert!(matches!(err, AuthFailure::InactiveAccount));
}

#[test]
fn bearer_header_parsing() {
    assert_eq!(flow::bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    assert_eq!(flow::bearer_token(Some("Bearer ")), None);
    assert_eq!(flow::bearer_token(Some("Basic dXNlcjpwYXNz")), None);
    assert_eq!(flow::bearer_token(Some("bearer abc")), None);
    assert_eq!(flow::bearer_token(None), None);
}
