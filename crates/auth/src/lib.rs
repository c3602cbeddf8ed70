//! Credentials and request signing for the venue's authenticated APIs.
//!
//! Two levels of authentication exist on the venue:
//!
//! - **L2** (API key): every request carries `POLY_*` headers with an
//!   HMAC-SHA256 signature over `timestamp ‖ method ‖ path [‖ body]`.
//!   Implemented here by [`RequestSigner`].
//! - **L1** (wallet key): order payloads themselves are EIP-712 signed;
//!   that lives in the `order-signer` crate.
//!
//! The wallet private key is wrapped in `SecretString` so it is zeroed on
//! drop and can never leak through `Debug` output.

mod credentials;
mod error;
mod signer;

pub use credentials::{mask_secret, Credentials, MaskedCredentials};
pub use error::AuthError;
pub use signer::{AuthHeaders, RequestSigner};
