//! `woopsa-auth` — HTTP Basic authentication for Woopsa transports.
//!
//! A transport hands the raw `Authorization` header of each request to a
//! [`BasicAuthenticator`]. The outcome is either a [`RequestContext`] carrying
//! the authenticated user for the rest of that request, or a [`Challenge`]
//! the transport sends back as the response.
//!
//! ```
//! use woopsa_auth::{AuthOutcome, BasicAuthenticator};
//!
//! let auth = BasicAuthenticator::new("Plant", |user, password| {
//!     user == Some("admin") && password == Some("secret")
//! });
//!
//! // "admin:secret"
//! match auth.process(Some("Basic YWRtaW46c2VjcmV0")) {
//!     AuthOutcome::Authenticated(context) => {
//!         assert_eq!(context.authenticated_user(), Some("admin"))
//!     }
//!     AuthOutcome::Rejected(_) => unreachable!(),
//! }
//!
//! let AuthOutcome::Rejected(challenge) = auth.process(None) else {
//!     unreachable!()
//! };
//! assert_eq!(challenge.status, 401);
//! assert_eq!(challenge.header_value(), r#"Basic Realm="Plant""#);
//! ```

pub mod error;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use error::AuthError;

/// Name of the response header carrying the challenge.
pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

pub const UNAUTHORIZED_STATUS: u16 = 401;

/// Username and password decoded from a Basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Parses `Basic <base64(user:password)>`. The decoded bytes are read as
    /// ISO-8859-1 and split at the first `:`.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let (scheme, encoded) = header
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MissingCredentials)?;
        if !scheme.eq_ignore_ascii_case("Basic") {
            return Err(AuthError::Scheme(scheme.to_string()));
        }
        let bytes = STANDARD.decode(encoded.trim())?;
        let decoded: String = bytes.iter().map(|&b| char::from(b)).collect();
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MissingSeparator)?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Identity established for one request. Each request gets its own value,
/// so concurrent requests never observe each other's user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated_user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// Response a transport sends when authentication fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub status: u16,
    pub realm: String,
    pub body: &'static str,
}

impl Challenge {
    fn new(realm: &str) -> Self {
        Self {
            status: UNAUTHORIZED_STATUS,
            realm: realm.to_string(),
            body: "Unauthorized",
        }
    }

    /// Value of the `WWW-Authenticate` header.
    pub fn header_value(&self) -> String {
        format!("Basic Realm=\"{}\"", self.realm)
    }

    pub fn header(&self) -> (&'static str, String) {
        (WWW_AUTHENTICATE, self.header_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(RequestContext),
    Rejected(Challenge),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }
}

pub type AuthCheck = Arc<dyn Fn(Option<&str>, Option<&str>) -> bool + Send + Sync>;

/// Basic authentication with a pluggable credential check.
///
/// The check receives `(None, None)` when the request carries no
/// `Authorization` header, so it decides whether anonymous access is allowed.
#[derive(Clone)]
pub struct BasicAuthenticator {
    realm: String,
    check: AuthCheck,
}

impl fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthenticator")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

impl BasicAuthenticator {
    pub fn new(
        realm: impl Into<String>,
        check: impl Fn(Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            realm: realm.into(),
            check: Arc::new(check),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Authenticates one request from its `Authorization` header value.
    pub fn process(&self, authorization: Option<&str>) -> AuthOutcome {
        let credentials = match authorization.map(Credentials::parse).transpose() {
            Ok(credentials) => credentials,
            Err(err) => {
                debug!(realm = %self.realm, error = %err, "malformed authorization header");
                return AuthOutcome::Rejected(Challenge::new(&self.realm));
            }
        };
        let (username, password) = match &credentials {
            Some(c) => (Some(c.username.as_str()), Some(c.password.as_str())),
            None => (None, None),
        };
        if !(self.check)(username, password) {
            debug!(realm = %self.realm, user = username, "authentication rejected");
            return AuthOutcome::Rejected(Challenge::new(&self.realm));
        }
        AuthOutcome::Authenticated(RequestContext {
            user: credentials.map(|c| c.username),
        })
    }
}
