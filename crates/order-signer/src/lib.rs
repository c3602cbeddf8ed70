//! EIP-712 order signing for the venue's exchange contracts.
//!
//! Building a signed order is purely functional: amounts are rounded to the
//! venue's fixed-point grid, the order struct is hashed per EIP-712 against
//! the exchange domain (standard or neg-risk contract), and the digest is
//! signed with the wallet's secp256k1 key.

mod amounts;
mod eip712;
mod error;
mod order;

pub use amounts::{clamp_price_to_grid, order_amounts, TICK};
pub use eip712::{digest, domain_separator, struct_hash, NEG_RISK_EXCHANGE, STANDARD_EXCHANGE};
pub use error::SignerError;
pub use order::{OrderArgs, OrderRequest, OrderSigner, OrderType, SignedOrder};
