pub mod access_jwt;
pub mod factory;
pub mod key_set;
pub mod verifier;

pub use access_jwt::{AccessJwtVerifier, VerifierOptions};
pub use factory::build_verifier;
pub use key_set::{KeySetError, KeySource, RemoteKeySet};
pub use verifier::{AccessClaims, Audience, TokenVerifier, VerifyError};
