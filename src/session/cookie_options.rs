use cookie::SameSite;

/// Attributes of the cookie that carries the cart session id.
///
/// The cookie is always `HttpOnly`, `SameSite=Lax` and scoped to `/` unless
/// the fields are set directly. It outlives the cart itself: an expired cart
/// simply comes back empty under the same id.
///
/// # Example
///
/// ```rust
/// use cart_store::session::CookieOptions;
///
/// let cookie_options = CookieOptions::build()
///     .name("cart_sess")
///     .domain("shop.example.com")
///     .secure(true)
///     .max_age(7 * 24 * 60 * 60);
/// ```
#[derive(Clone, Debug)]
pub struct CookieOptions {
    pub name: String,
    pub http_only: bool,
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: i64,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: String::from("sessionid"),
            http_only: true,
            same_site: SameSite::Lax,
            secure: true,
            domain: None,
            path: Some(String::from("/")),
            max_age: 14 * 24 * 60 * 60,
        }
    }
}

impl CookieOptions {
    pub fn build() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Disable only for plain-HTTP development setups.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Lifetime of the session cookie in seconds.
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }
}
