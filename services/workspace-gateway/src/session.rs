//! Session cookie to identity mapping
//!
//! The session cookie holds an opaque UUID. It only names a slot in the
//! token store; holding one grants nothing until an authorization flow
//! started from that same session has completed. Completing a flow always
//! moves the session to a freshly issued id, so an id chosen or seen before
//! sign-in never unlocks credentials.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::IdentityKey;
use uuid::Uuid;

use crate::config::SessionConfig;

/// Identity named by the request's session cookie, if it carries a
/// well-formed one.
pub fn identity_from(jar: &CookieJar, settings: &SessionConfig) -> Option<IdentityKey> {
    let value = jar.get(&settings.cookie_name)?.value();
    Uuid::parse_str(value)
        .ok()
        .map(|id| IdentityKey::new(id.as_hyphenated().to_string()))
}

/// The caller's identity, issuing a fresh session cookie when the request
/// has none.
pub fn ensure(jar: CookieJar, settings: &SessionConfig) -> (CookieJar, IdentityKey) {
    if let Some(identity) = identity_from(&jar, settings) {
        return (jar, identity);
    }
    issue(jar, settings)
}

/// Issue a new session id, replacing whatever cookie the request carried.
pub fn issue(jar: CookieJar, settings: &SessionConfig) -> (CookieJar, IdentityKey) {
    let identity = IdentityKey::new(Uuid::new_v4().as_hyphenated().to_string());
    let cookie = Cookie::build((settings.cookie_name.clone(), identity.as_str().to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .path("/");
    (jar.add(cookie), identity)
}

/// Jar that tells the browser to drop the session cookie.
pub fn expire(jar: CookieJar, settings: &SessionConfig) -> CookieJar {
    jar.remove(Cookie::build((settings.cookie_name.clone(), "")).path("/"))
}
