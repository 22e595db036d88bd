mod common;

use support_desk::error::SupportDeskError;
use support_desk::services::auth::{AuthService, RESET_REQUESTED_MESSAGE};

use common::{test_desk, test_desk_with_notifier, MailCall, RecordingNotifier};

#[tokio::test]
async fn register_then_login() {
    let desk = test_desk(vec![]);

    let (token, user) = desk
        .auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();
    assert!(!token.is_empty());
    assert_eq!(user.email, "ana@x.com");
    assert_eq!(user.name, "Ana");

    let (login_token, logged_in) = desk.auth.login("ana@x.com", "pw123456").await.unwrap();
    assert_eq!(logged_in.id, user.id);
    assert_eq!(desk.auth.verify_token(&login_token).unwrap(), user.id);
}

#[tokio::test]
async fn register_normalizes_email_for_later_login() {
    let desk = test_desk(vec![]);
    desk.auth
        .register("Ana", "  Ana@X.com ", "pw123456")
        .await
        .unwrap();

    let (_, user) = desk.auth.login("ana@x.com", "pw123456").await.unwrap();
    assert_eq!(user.email, "ana@x.com");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let desk = test_desk(vec![]);
    desk.auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let err = desk
        .auth
        .register("Other Ana", "ANA@x.com", "pw123456")
        .await
        .unwrap_err();
    assert!(matches!(err, SupportDeskError::Conflict(_)));
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let desk = test_desk(vec![]);

    let err = desk
        .auth
        .register("  ", "ana@x.com", "pw123456")
        .await
        .unwrap_err();
    assert!(matches!(err, SupportDeskError::Validation(_)));

    let err = desk
        .auth
        .register("Ana", "not-an-email", "pw123456")
        .await
        .unwrap_err();
    assert!(matches!(err, SupportDeskError::Validation(_)));

    let err = desk
        .auth
        .register("Ana", "ana@x.com", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, SupportDeskError::Validation(_)));
}

#[tokio::test]
async fn wrong_credentials_are_indistinguishable() {
    let desk = test_desk(vec![]);
    desk.auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let wrong_password = desk
        .auth
        .login("ana@x.com", "pw1234567")
        .await
        .unwrap_err();
    let unknown_email = desk
        .auth
        .login("nobody@x.com", "pw123456")
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert!(matches!(wrong_password, SupportDeskError::Unauthorized(_)));
}

#[tokio::test]
async fn forgot_password_does_not_leak_account_existence() {
    let desk = test_desk(vec![]);
    desk.auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let known = desk.auth.forgot_password("ana@x.com").await.unwrap();
    let unknown = desk.auth.forgot_password("nobody@x.com").await.unwrap();
    assert_eq!(known, RESET_REQUESTED_MESSAGE);
    assert_eq!(unknown, RESET_REQUESTED_MESSAGE);

    // Only the existing account got a mail.
    let resets: Vec<_> = desk
        .notifier
        .recorded_calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, MailCall::PasswordReset { .. }))
        .collect();
    assert_eq!(resets.len(), 1);
    assert!(matches!(&resets[0], MailCall::PasswordReset { email, .. } if email == "ana@x.com"));
}

#[tokio::test]
async fn forgot_password_swallows_delivery_failure() {
    let notifier = RecordingNotifier {
        fail_reset: true,
        ..RecordingNotifier::new()
    };
    let desk = test_desk_with_notifier(vec![], notifier);
    desk.auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let message = desk.auth.forgot_password("ana@x.com").await.unwrap();
    assert_eq!(message, RESET_REQUESTED_MESSAGE);
}

#[tokio::test]
async fn reset_password_via_mailed_token() {
    let desk = test_desk(vec![]);
    desk.auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();
    desk.auth.forgot_password("ana@x.com").await.unwrap();

    let calls = desk.notifier.recorded_calls().await;
    let token = calls
        .iter()
        .find_map(|c| match c {
            MailCall::PasswordReset { token, .. } => Some(token.clone()),
            _ => None,
        })
        .unwrap();

    desk.auth
        .reset_password(&token, "newpw12345")
        .await
        .unwrap();

    assert!(desk.auth.login("ana@x.com", "pw123456").await.is_err());
    desk.auth.login("ana@x.com", "newpw12345").await.unwrap();
}

#[tokio::test]
async fn reset_password_rejects_short_replacement() {
    let desk = test_desk(vec![]);
    let (token, _) = desk
        .auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let err = desk.auth.reset_password(&token, "short").await.unwrap_err();
    assert!(matches!(err, SupportDeskError::Validation(_)));
}

#[tokio::test]
async fn tampered_token_is_unauthorized() {
    let desk = test_desk(vec![]);
    let (token, _) = desk
        .auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let mut tampered = token.clone();
    tampered.pop();
    tampered.push('A');
    assert!(matches!(
        desk.auth.verify_token(&tampered),
        Err(SupportDeskError::Unauthorized(_))
    ));

    assert!(matches!(
        desk.auth.verify_token("no-dot-here"),
        Err(SupportDeskError::Unauthorized(_))
    ));
    assert!(matches!(
        desk.auth.verify_token("!!.!!"),
        Err(SupportDeskError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let desk = test_desk(vec![]);
    let (_, user) = desk
        .auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let short_lived = AuthService::new(
        desk.store.clone(),
        desk.notifier.clone(),
        "test-secret".to_string(),
    )
    .with_token_ttl(-10);
    let stale = short_lived.issue_token(&user.id).unwrap();

    let err = desk.auth.verify_token(&stale).unwrap_err();
    assert!(matches!(err, SupportDeskError::Unauthorized(_)));
}

#[tokio::test]
async fn resolve_user_requires_bearer_scheme() {
    let desk = test_desk(vec![]);
    let (token, user) = desk
        .auth
        .register("Ana", "ana@x.com", "pw123456")
        .await
        .unwrap();

    let resolved = desk
        .auth
        .resolve_user(Some(&format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(resolved.id, user.id);

    assert!(desk.auth.resolve_user(None).await.is_err());
    assert!(desk.auth.resolve_user(Some(&token)).await.is_err());
    assert!(desk
        .auth
        .resolve_user(Some(&format!("Basic {token}")))
        .await
        .is_err());
}
