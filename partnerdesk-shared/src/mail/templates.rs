/// Email templates

use super::OutgoingEmail;
use crate::models::account::AccountRole;

const PRODUCT_NAME: &str = "PartnerDesk";

/// Invitation sent to a partner created by an admin
///
/// The setup link carries the invite token and the invited email as query
/// parameters of `<frontend_url>/setup-partner`.
pub fn invite_email(
    frontend_url: &str,
    to: &str,
    name: &str,
    role: AccountRole,
    token: &str,
) -> OutgoingEmail {
    let setup_url = format!(
        "{}/setup-partner?token={}&email={}",
        frontend_url.trim_end_matches('/'),
        urlencoding::encode(token),
        urlencoding::encode(to)
    );

    let html = format!(
        r#"<h1>Welcome to {product}!</h1>
<p>Hello {name},</p>
<p>You have been invited to join {product} as a <strong>{role}</strong>.</p>
<p>Please click the link below to set up your account:</p>
<a href="{url}">Set up your account</a>
<p>This link will expire in 5 days.</p>
"#,
        product = PRODUCT_NAME,
        name = escape_html(name),
        role = role,
        url = escape_html(&setup_url),
    );

    let text = format!(
        "Hello {}, please visit {} to complete setup. This link will expire in 5 days.",
        name, setup_url
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Invitation to join {} as {}", PRODUCT_NAME, role),
        html,
        text,
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
