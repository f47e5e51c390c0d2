/// Session cookie handling
///
/// Two cookies carry credentials: [`SESSION_COOKIE`] for regular sessions and
/// [`ADMIN_COOKIE`] for admin sessions. Both are `HttpOnly` with `Path=/`.
/// In production they are `Secure; SameSite=None` so a separately hosted
/// frontend can send them; elsewhere they are `SameSite=Lax`.

use axum::http::{header, HeaderMap};
use chrono::Duration;

/// Cookie carrying the regular session token
pub const SESSION_COOKIE: &str = "token";

/// Cookie carrying the admin session token
pub const ADMIN_COOKIE: &str = "adminToken";

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied to every credential cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Derives the policy from the deployment mode
    pub fn for_environment(production: bool) -> Self {
        if production {
            Self {
                secure: true,
                same_site: SameSite::None,
            }
        } else {
            Self {
                secure: false,
                same_site: SameSite::Lax,
            }
        }
    }

    /// `Set-Cookie` value storing `value` for `max_age`
    pub fn set(&self, name: &str, value: &str, max_age: Duration) -> String {
        self.render(name, value, max_age.num_seconds().max(0))
    }

    /// `Set-Cookie` value that removes the cookie
    pub fn clear(&self, name: &str) -> String {
        self.render(name, "", 0)
    }

    fn render(&self, name: &str, value: &str, max_age_seconds: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite={}",
            name,
            value,
            max_age_seconds,
            self.same_site.as_str()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Reads a cookie by name from every `Cookie` header on the request
///
/// Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
