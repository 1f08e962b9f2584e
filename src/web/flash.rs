//! One-shot messages carried across a redirect in a signed cookie.
//!
//! The cookie holds a short ASCII code rather than the message text, and it is removed by the first
//! page that shows it.

use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flash {
    /// A new movement passed validation.
    Created,
    /// Exactly one record was updated.
    Updated,
    /// The backend failed or cannot edit.
    NotSaved,
    /// Anything else, e.g. no record had the id.
    Unknown,
}

serde_plain::derive_display_from_serialize!(Flash);
serde_plain::derive_fromstr_from_deserialize!(Flash);

impl Flash {
    pub fn message(&self) -> &'static str {
        match self {
            Flash::Created => "Nuevo movimiento agregado con éxito.",
            Flash::Updated => "El movimiento se ha actualizado correctamente",
            Flash::NotSaved => "El movimiento no se ha guardado. Inténtalo de nuevo.",
            Flash::Unknown => "Houston, tenemos un problema",
        }
    }
}

/// Stores `flash` for the next request.
pub(crate) fn put(jar: SignedCookieJar, flash: Flash) -> SignedCookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.to_string()))
            .path("/")
            .http_only(true),
    )
}

/// Reads the pending message, if any, and clears it. A cookie that fails verification or holds an
/// unknown code is dropped.
pub(crate) fn take(jar: SignedCookieJar) -> (SignedCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::from_str(cookie.value()).ok();
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
