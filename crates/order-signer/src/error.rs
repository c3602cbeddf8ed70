use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from order construction and signing.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Private key is not a valid secp256k1 scalar.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Token id is not a decimal uint256.
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    /// Address field failed to parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Size/price pair that rounds to nothing or is non-positive.
    #[error("unusable order amount (size {size}, price {price})")]
    InvalidAmount { size: Decimal, price: Decimal },

    /// Fixed-point conversion left the u128 range.
    #[error("amount overflow")]
    AmountOverflow,

    /// secp256k1 signing failed.
    #[error("signing failed: {0}")]
    Signing(String),
}
