use axum::extract::FromRequestParts;
use cookie::time::Duration;
use axum::http::{StatusCode, request::Parts};
use tower_cookies::{Cookie, Cookies};

use crate::api::AppState;
use crate::session::{CookieOptions, SessionId};
use crate::store::CartBackend;

/// Axum extractor yielding the caller's cart session.
///
/// The id is read from the session cookie. A missing or malformed cookie is
/// replaced by a freshly generated id, which is sent back with the response.
/// Requires the [`CookieManagerLayer`](tower_cookies::CookieManagerLayer).
#[derive(Clone, Debug)]
pub struct CartSession {
    id: SessionId,
    is_new: bool,
}

impl CartSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// `true` if the id was issued by this request.
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

impl<B> FromRequestParts<AppState<B>> for CartSession
where
    B: CartBackend,
{
    type Rejection = (StatusCode, &'static str);

    #[tracing::instrument(name = "cart session", skip(parts, state))]
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<B>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>().cloned().ok_or_else(|| {
            tracing::error!("cookies not found in the request extensions");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Cookies not found in the request extensions",
            )
        })?;

        let cookie_options = state.cookie_options();
        let existing = cookies.get(&cookie_options.name).and_then(|cookie| {
            cookie
                .value()
                .parse::<SessionId>()
                .map_err(|err| {
                    tracing::warn!(
                        err = %err,
                        "possibly suspicious activity: malformed session id"
                    )
                })
                .ok()
        });

        if let Some(id) = existing {
            return Ok(Self { id, is_new: false });
        }

        let id = SessionId::generate();
        cookies.add(build_cookie(&id, cookie_options));
        tracing::debug!("issued a new cart session");

        Ok(Self { id, is_new: true })
    }
}

fn build_cookie(id: &SessionId, cookie_options: &CookieOptions) -> Cookie<'static> {
    let cookie_builder = Cookie::build((cookie_options.name.clone(), id.to_string()))
        .secure(cookie_options.secure)
        .http_only(cookie_options.http_only)
        .same_site(cookie_options.same_site)
        .max_age(Duration::seconds(cookie_options.max_age));

    let cookie_builder = if let Some(domain) = &cookie_options.domain {
        cookie_builder.domain(domain.clone())
    } else {
        cookie_builder
    };

    let cookie_builder = if let Some(path) = &cookie_options.path {
        cookie_builder.path(path.clone())
    } else {
        cookie_builder
    };

    cookie_builder.build()
}
