//! Authentication module.
//!
//! Users sign in through an external identity provider (Kakao or Facebook)
//! and receive an HS512 session token. Every request then runs the token
//! through [`SessionValidator`], which yields a [`Session`] that handlers
//! receive explicitly.
//!
//! ## Revocation
//!
//! Each user row carries an `auth_uuid` marker that is copied into every
//! issued token. A fresh login rotates the marker, so only the most recent
//! token per user stays valid. Disabling a user makes all of their tokens
//! resolve to [`Session::Anonymous`].
//!
//! ## Usage
//!
//! ```ignore
//! let token = login.login(Provider::Kakao, &access_token).await?;
//!
//! match validator.validate(Some(token.as_str())).await? {
//!     Session::Authenticated(user) => println!("hello {}", user.name()),
//!     Session::Anonymous => println!("who are you?"),
//! }
//! ```

mod context;
mod login;
pub mod providers;
mod token;
mod user_store;
mod validator;

pub use context::{AuthenticatedUser, Session};
pub use login::{LoginError, LoginService};
pub use providers::{IdentityProviders, Provider, ProviderError, ProviderIdentity};
pub use token::{SESSION_ALGORITHM, SessionClaims, TokenIssuer, unix_now};
pub use user_store::UserStore;
pub use validator::{AuthError, SessionValidator};
