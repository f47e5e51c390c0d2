/// End-to-end tests for the HTTP API
///
/// Requests go through the full router (guards, extractors, error mapping)
/// backed by the in-memory account store.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, ADMIN_EMAIL};
use partnerdesk_shared::auth::jwt::TokenLifetimes;
use partnerdesk_shared::models::account::{AccountRole, AccountStatus};
use partnerdesk_shared::store::AccountStore;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");
}

#[tokio::test]
async fn test_signup_then_login() {
    let ctx = TestContext::new();

    let signup = ctx
        .post_json(
            "/signup",
            json!({ "name": "Ann", "email": "ann@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;

    assert_eq!(signup.status, StatusCode::CREATED, "{}", signup.body);
    assert_eq!(signup.body["success"], true);
    assert_eq!(signup.body["data"]["role"], "partner");
    assert_eq!(signup.body["data"]["status"], "Active");
    assert_eq!(signup.body["data"]["invitedByAdmin"], false);
    assert!(signup.body["data"].get("passwordHash").is_none());
    assert!(signup.cookie("token").is_some());

    let stored = ctx.store.find_by_email("ann@x.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash.as_deref(), Some("Str0ng!Pass"));

    let login = ctx
        .post_json(
            "/login",
            json!({ "email": "ann@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;

    assert_eq!(login.status, StatusCode::OK, "{}", login.body);
    assert_eq!(login.body["data"]["name"], "Ann");
    assert_eq!(login.body["data"]["email"], "ann@x.com");

    let cookie = login.cookies.iter().find(|c| c.starts_with("token=")).unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));
}

#[tokio::test]
async fn test_signup_email_alias() {
    let ctx = TestContext::new();

    let response = ctx
        .post_json(
            "/signup/email",
            json!({ "name": "Ann", "email": "ann@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_signup_rejects_duplicates_and_bad_input() {
    let ctx = TestContext::new();
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;

    let duplicate = ctx
        .post_json(
            "/signup",
            json!({ "name": "Ann Again", "email": "ANN@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["success"], false);

    let weak = ctx
        .post_json(
            "/signup",
            json!({ "name": "Carl", "email": "carl@x.com", "password": "password" }),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert_eq!(weak.body["details"][0]["field"], "password");

    let bad_email = ctx
        .post_json(
            "/signup",
            json!({ "name": "Carl", "email": "not-an-email", "password": "Str0ng!Pass" }),
            None,
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.body["details"][0]["field"], "email");

    let missing = ctx
        .post_json("/signup", json!({ "name": "Carl" }), None)
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    assert_eq!(ctx.store.len().await, 1);
}

#[tokio::test]
async fn test_phone_signup() {
    let ctx = TestContext::new();

    let created = ctx
        .post_json(
            "/signup/phone",
            json!({ "name": "Pat", "phoneNumber": "+14155550100", "externalAuthId": "fb-uid-1" }),
            None,
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["data"]["phoneNumber"], "+14155550100");
    assert!(created.body["data"]["email"].is_null());

    let duplicate = ctx
        .post_json(
            "/signup/phone",
            json!({ "name": "Sam", "phoneNumber": "+14155550100", "externalAuthId": "fb-uid-2" }),
            None,
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let bad_format = ctx
        .post_json(
            "/signup/phone",
            json!({ "name": "Sam", "phoneNumber": "555-0100", "externalAuthId": "fb-uid-3" }),
            None,
        )
        .await;
    assert_eq!(bad_format.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_format.body["details"][0]["field"], "phoneNumber");
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let ctx = TestContext::new();
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;

    let wrong_password = ctx
        .post_json(
            "/login",
            json!({ "email": "ann@x.com", "password": "Wr0ng!Pass" }),
            None,
        )
        .await;
    let unknown_email = ctx
        .post_json(
            "/login",
            json!({ "email": "nobody@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password.body["message"], "Invalid credentials");
    assert_eq!(wrong_password.body["message"], unknown_email.body["message"]);
    assert!(wrong_password.cookie("token").is_none());
}

#[tokio::test]
async fn test_admin_cannot_use_regular_login() {
    let ctx = TestContext::new();
    ctx.admin_cookie().await;

    let response = ctx
        .post_json(
            "/login",
            json!({ "email": ADMIN_EMAIL, "password": "Adm1n!Pass" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_profile_and_logout() {
    let ctx = TestContext::new();

    let anonymous = ctx.get("/profile", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let garbage = ctx.get("/profile", Some("token=not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let cookie = ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;

    let profile = ctx.get("/profile", Some(&cookie)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["data"]["name"], "Ann");
    assert_eq!(profile.body["data"]["email"], "ann@x.com");

    let logout = ctx
        .request(Method::POST, "/logout", None, Some(&cookie))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.cookies.iter().any(|c| c.starts_with("token=;") && c.contains("Max-Age=0")));

    let no_session = ctx.request(Method::POST, "/logout", None, None).await;
    assert_eq!(no_session.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_bootstrap_and_wrong_password() {
    let ctx = TestContext::new();

    let first = ctx
        .post_json(
            "/admin/login",
            json!({ "email": ADMIN_EMAIL, "password": "Adm1n!Pass" }),
            None,
        )
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert!(first.cookie("adminToken").is_some());

    let admin = ctx.store.find_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    assert_eq!(admin.role, AccountRole::Admin);
    assert_eq!(admin.name, "Admin");

    let wrong = ctx
        .post_json(
            "/admin/login",
            json!({ "email": ADMIN_EMAIL, "password": "guessing" }),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid password");
    assert!(wrong.cookie("adminToken").is_none());

    assert_eq!(ctx.store.len().await, 1);
}

#[tokio::test]
async fn test_admin_login_rejections() {
    let ctx = TestContext::new();

    let outsider = ctx
        .post_json(
            "/admin/login",
            json!({ "email": "ann@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;
    assert_eq!(outsider.status, StatusCode::FORBIDDEN);
    assert_eq!(outsider.body["message"], "Not authorized as admin");

    let missing = ctx
        .post_json("/admin/login", json!({ "email": ADMIN_EMAIL }), None)
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    assert!(ctx.store.is_empty().await);
}

#[tokio::test]
async fn test_allow_listed_account_is_promoted() {
    let ctx = TestContext::new();
    ctx.session_cookie("Root User", ADMIN_EMAIL, "Str0ng!Pass").await;

    let response = ctx
        .post_json(
            "/admin/login",
            json!({ "email": ADMIN_EMAIL, "password": "Str0ng!Pass" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let account = ctx.store.find_by_email(ADMIN_EMAIL).await.unwrap().unwrap();
    assert_eq!(account.role, AccountRole::Admin);
    assert_eq!(account.name, "Root User");
}

#[tokio::test]
async fn test_admin_verify_and_logout() {
    let ctx = TestContext::new();
    let cookie = ctx.admin_cookie().await;

    let verify = ctx.get("/admin/verify", Some(&cookie)).await;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(verify.body["message"], "Admin verified");

    let logout = ctx
        .request(Method::POST, "/admin/logout", None, Some(&cookie))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout
        .cookies
        .iter()
        .any(|c| c.starts_with("adminToken=;") && c.contains("Max-Age=0")));

    let anonymous = ctx.get("/admin/verify", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invite_redeem_and_profile() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;

    let invite = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Bob", "email": "bob@x.com", "role": "manager" }),
            Some(&admin),
        )
        .await;
    assert_eq!(invite.status, StatusCode::OK, "{}", invite.body);
    assert_eq!(invite.body["message"], "Invitation sent successfully");

    let pending = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    assert_eq!(pending.status, AccountStatus::Inactive);
    assert_eq!(pending.role, AccountRole::Manager);
    assert!(pending.invited_by_admin);
    assert!(pending.password_hash.is_none());

    {
        let sent = ctx.mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Invitation to join PartnerDesk as manager");
        assert!(sent[0].text.contains("https://partners.test/setup-partner?token="));
    }

    // A pending account cannot log in yet
    let early = ctx
        .post_json(
            "/login",
            json!({ "email": "bob@x.com", "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);

    let token = ctx.last_invite_token("bob@x.com").await;
    let setup = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": token, "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(setup.status, StatusCode::OK, "{}", setup.body);
    assert_eq!(setup.body["data"]["status"], "Active");

    let session = setup.cookie("token").expect("session cookie");
    assert!(setup
        .cookies
        .iter()
        .any(|c| c.starts_with("token=") && c.contains("Max-Age=432000")));

    let profile = ctx.get("/profile", Some(&format!("token={}", session))).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["data"]["name"], "Bob");
    assert_eq!(profile.body["data"]["email"], "bob@x.com");

    let login = ctx
        .post_json(
            "/login",
            json!({ "email": "bob@x.com", "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let active = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    assert!(active.invite_token.is_none());
}

#[tokio::test]
async fn test_invite_rejections() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;

    let missing = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Bob", "email": "bob@x.com" }),
            Some(&admin),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let taken = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Ann", "email": "ann@x.com", "role": "partner" }),
            Some(&admin),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);
    assert_eq!(taken.body["message"], "Email already registered");

    let admin_role = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Eve", "email": "eve@x.com", "role": "admin" }),
            Some(&admin),
        )
        .await;
    assert_eq!(admin_role.status, StatusCode::BAD_REQUEST);

    let unknown_role = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Eve", "email": "eve@x.com", "role": "superuser" }),
            Some(&admin),
        )
        .await;
    assert_eq!(unknown_role.status, StatusCode::BAD_REQUEST);

    assert!(ctx.store.find_by_email("eve@x.com").await.unwrap().is_none());
    assert!(ctx.mailer.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_invite_email_failure_keeps_account() {
    let ctx = TestContext::with_failing_mailer();
    let admin = ctx.admin_cookie().await;

    let response = ctx
        .post_json(
            "/admin/invite-partner",
            json!({ "name": "Bob", "email": "bob@x.com", "role": "owner" }),
            Some(&admin),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "User created but email failed to send");

    let account = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Inactive);
}

#[tokio::test]
async fn test_setup_partner_token_failures() {
    let ctx = TestContext::with_lifetimes(TokenLifetimes {
        invite: chrono::Duration::seconds(-60),
        ..Default::default()
    });
    let admin = ctx.admin_cookie().await;

    ctx.post_json(
        "/admin/invite-partner",
        json!({ "name": "Bob", "email": "bob@x.com", "role": "partner" }),
        Some(&admin),
    )
    .await;
    let expired_token = ctx.last_invite_token("bob@x.com").await;

    let expired = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": expired_token, "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        expired.body["message"],
        "Invite link has expired, please ask an admin for a new invite"
    );

    let invalid = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": "eyJhbGciOiJIUzI1NiJ9.e30.c2lnbmF0dXJl", "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        invalid.body["message"],
        "Invalid invite link, please contact an admin"
    );

    let weak = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": "whatever", "password": "short" }),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let account = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Inactive);
}

#[tokio::test]
async fn test_setup_partner_cannot_lift_suspension() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;

    ctx.post_json(
        "/admin/invite-partner",
        json!({ "name": "Bob", "email": "bob@x.com", "role": "partner" }),
        Some(&admin),
    )
    .await;
    let token = ctx.last_invite_token("bob@x.com").await;

    let setup = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": token, "password": "N3w!Password" }),
            None,
        )
        .await;
    assert_eq!(setup.status, StatusCode::OK, "{}", setup.body);

    let bob = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    let suspended = ctx
        .request(
            Method::PATCH,
            &format!("/admin/partner/{}", bob.id),
            Some(json!({ "status": "Suspended" })),
            Some(&admin),
        )
        .await;
    assert_eq!(suspended.status, StatusCode::OK, "{}", suspended.body);

    let replay = ctx
        .post_json(
            "/setup-partner",
            json!({ "token": token, "password": "An0ther!Pass" }),
            None,
        )
        .await;
    assert_eq!(replay.status, StatusCode::FORBIDDEN);
    assert!(replay.cookie("token").is_none());

    let account = ctx.store.find_by_email("bob@x.com").await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Suspended);
    assert!(account.verify_password("N3w!Password"));
}

#[tokio::test]
async fn test_non_admin_cannot_list_accounts() {
    let ctx = TestContext::new();
    let session = ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;

    let anonymous = ctx.post_json("/admin/accounts", json!({}), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert!(anonymous.body.get("data").is_none());

    let with_session = ctx
        .post_json("/admin/accounts", json!({}), Some(&session))
        .await;
    assert_eq!(with_session.status, StatusCode::UNAUTHORIZED);

    // A session token presented as the admin cookie is the wrong token kind
    let token = session.trim_start_matches("token=");
    let smuggled = ctx
        .post_json(
            "/admin/accounts",
            json!({}),
            Some(&format!("adminToken={}", token)),
        )
        .await;
    assert_eq!(smuggled.status, StatusCode::UNAUTHORIZED);
    assert!(smuggled.body.get("data").is_none());
}

#[tokio::test]
async fn test_list_accounts_excludes_admins() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;
    ctx.session_cookie("Carl", "carl@x.com", "Str0ng!Pass").await;

    let all = ctx
        .request(Method::POST, "/admin/account", None, Some(&admin))
        .await;
    assert_eq!(all.status, StatusCode::OK, "{}", all.body);

    let accounts = all.body["data"].as_array().unwrap();
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a["role"] != "admin"));
    assert!(accounts[0].get("createdAt").is_some());
    assert!(accounts[0].get("status").is_none());

    let filtered = ctx
        .post_json("/admin/accounts", json!({ "query": "ANN" }), Some(&admin))
        .await;
    let accounts = filtered.body["data"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["email"], "ann@x.com");
}

#[tokio::test]
async fn test_partner_detail_and_updates() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;
    let ann = ctx.store.find_by_email("ann@x.com").await.unwrap().unwrap();
    let uri = format!("/admin/partner/{}", ann.id);

    let bad_id = ctx.get("/admin/partner/undefined", Some(&admin)).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["message"], "Invalid partner ID format");

    let unknown = ctx
        .get(&format!("/admin/partner/{}", uuid::Uuid::new_v4()), Some(&admin))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let detail = ctx.get(&uri, Some(&admin)).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["data"]["name"], "Ann");

    let patched = ctx
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "name": "Ann Smith", "role": "owner" })),
            Some(&admin),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK, "{}", patched.body);
    assert_eq!(patched.body["data"]["name"], "Ann Smith");
    assert_eq!(patched.body["data"]["role"], "owner");
    assert_eq!(patched.body["data"]["email"], "ann@x.com");

    let bad_role = ctx
        .request(Method::PATCH, &uri, Some(json!({ "role": "root" })), Some(&admin))
        .await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    let incomplete = ctx
        .request(Method::PUT, &uri, Some(json!({ "name": "Ann" })), Some(&admin))
        .await;
    assert_eq!(incomplete.status, StatusCode::BAD_REQUEST);

    let replaced = ctx
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "name": "Ann Jones", "email": "ann.jones@x.com", "status": "Suspended" })),
            Some(&admin),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK, "{}", replaced.body);
    assert_eq!(replaced.body["data"]["status"], "Suspended");

    let suspended_login = ctx
        .post_json(
            "/login",
            json!({ "email": "ann.jones@x.com", "password": "Str0ng!Pass" }),
            None,
        )
        .await;
    assert_eq!(suspended_login.status, StatusCode::FORBIDDEN);

    let missing = ctx
        .request(
            Method::PATCH,
            &format!("/admin/partner/{}", uuid::Uuid::new_v4()),
            Some(json!({ "name": "Nobody Here" })),
            Some(&admin),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_partner_update_rejects_taken_email() {
    let ctx = TestContext::new();
    let admin = ctx.admin_cookie().await;
    ctx.session_cookie("Ann", "ann@x.com", "Str0ng!Pass").await;
    ctx.session_cookie("Carl", "carl@x.com", "Str0ng!Pass").await;
    let carl = ctx.store.find_by_email("carl@x.com").await.unwrap().unwrap();

    let response = ctx
        .request(
            Method::PATCH,
            &format!("/admin/partner/{}", carl.id),
            Some(json!({ "email": "ann@x.com" })),
            Some(&admin),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}
