//! Order construction and signing against the exchange contracts.

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::amounts::order_amounts;
use crate::eip712::{self, OrderFields, NEG_RISK_EXCHANGE, STANDARD_EXCHANGE};
use crate::error::SignerError;

const SIG_TYPE_EOA: u8 = 0;
const SIG_TYPE_PROXY: u8 = 2;

/// Time-in-force accepted by `POST /order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    GTC,
    FOK,
    FAK,
    GTD,
}

/// What the caller wants to trade.
#[derive(Debug, Clone)]
pub struct OrderArgs {
    /// Decimal uint256 token id.
    pub token_id: String,
    /// Limit price in dollars; callers clamp to the tick grid first.
    pub price: Decimal,
    /// Size in shares.
    pub size: Decimal,
    /// True for BUY.
    pub is_buy: bool,
    /// Settlement mode of the market; selects the verifying contract.
    pub neg_risk: bool,
}

/// The venue-shaped signed order.
///
/// All uint fields travel as strings except `salt` and `signatureType`.
#[derive(Debug, Clone, Serialize)]
pub struct SignedOrder {
    pub salt: u64,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    #[serde(rename = "tokenId")]
    pub token_id: String,
    #[serde(rename = "makerAmount")]
    pub maker_amount: String,
    #[serde(rename = "takerAmount")]
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    #[serde(rename = "feeRateBps")]
    pub fee_rate_bps: String,
    pub side: String,
    #[serde(rename = "signatureType")]
    pub signature_type: u8,
    pub signature: String,
}

/// Body of `POST /order`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub order: SignedOrder,
    pub owner: String,
    #[serde(rename = "orderType")]
    pub order_type: OrderType,
}

/// Builds and signs orders for one wallet.
pub struct OrderSigner {
    wallet: PrivateKeySigner,
    /// Funding wallet; always the `maker`.
    maker: Address,
    /// Signing address; equals `maker` in EOA mode.
    signer: Address,
    signature_type: u8,
}

impl OrderSigner {
    /// Build from the wallet key and addresses.
    ///
    /// When `signer_address` is set and differs from the wallet, orders are
    /// signed in proxy mode (type 2); otherwise EOA (type 0).
    pub fn new(
        private_key: &str,
        wallet_address: &str,
        signer_address: Option<&str>,
    ) -> Result<Self, SignerError> {
        let wallet: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| SignerError::InvalidPrivateKey)?;
        let maker = parse_address(wallet_address)?;

        let (signer, signature_type) = match signer_address {
            Some(s) if !s.eq_ignore_ascii_case(wallet_address) => {
                (parse_address(s)?, SIG_TYPE_PROXY)
            }
            _ => (maker, SIG_TYPE_EOA),
        };

        Ok(Self {
            wallet,
            maker,
            signer,
            signature_type,
        })
    }

    /// Round amounts, hash and sign one order.
    pub fn sign_order(&self, args: &OrderArgs) -> Result<SignedOrder, SignerError> {
        let token_id = U256::from_str_radix(&args.token_id, 10)
            .map_err(|_| SignerError::InvalidTokenId(args.token_id.clone()))?;

        let (stable, token) = order_amounts(args.size, args.price)?;
        // BUY pays stablecoin for tokens; SELL is the mirror image.
        let (maker_amount, taker_amount) = if args.is_buy {
            (stable, token)
        } else {
            (token, stable)
        };

        let salt: u64 = rand::thread_rng().gen_range(0..(1u64 << 31));

        let fields = OrderFields {
            salt: U256::from(salt),
            maker: self.maker,
            signer: self.signer,
            taker: Address::ZERO,
            token_id,
            maker_amount: U256::from(maker_amount),
            taker_amount: U256::from(taker_amount),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            fee_rate_bps: U256::ZERO,
            side: if args.is_buy { 0 } else { 1 },
            signature_type: self.signature_type,
        };

        let exchange = if args.neg_risk {
            NEG_RISK_EXCHANGE
        } else {
            STANDARD_EXCHANGE
        };
        let separator = eip712::domain_separator(parse_address(exchange)?);
        let digest = eip712::digest(separator, eip712::struct_hash(&fields));

        let sig = self
            .wallet
            .sign_hash_sync(&digest)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        // r ‖ s ‖ v with v in {27, 28}
        let signature = format!("0x{}", hex::encode(sig.as_bytes()));

        Ok(SignedOrder {
            salt,
            maker: format!("{:#x}", self.maker),
            signer: format!("{:#x}", self.signer),
            taker: format!("{:#x}", Address::ZERO),
            token_id: args.token_id.clone(),
            maker_amount: maker_amount.to_string(),
            taker_amount: taker_amount.to_string(),
            expiration: "0".to_string(),
            nonce: "0".to_string(),
            fee_rate_bps: "0".to_string(),
            side: if args.is_buy { "BUY" } else { "SELL" }.to_string(),
            signature_type: self.signature_type,
            signature,
        })
    }

    pub fn signature_type(&self) -> u8 {
        self.signature_type
    }
}

impl SignedOrder {
    /// Wrap into the `POST /order` body.
    pub fn into_request(self, owner: impl Into<String>, order_type: OrderType) -> OrderRequest {
        OrderRequest {
            order: self,
            owner: owner.into(),
            order_type,
        }
    }
}

fn parse_address(s: &str) -> Result<Address, SignerError> {
    s.parse()
        .map_err(|_| SignerError::InvalidAddress(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // Well-known throwaway key (first Anvil dev account).
    const PK: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const WALLET: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const PROXY_SIGNER: &str = "0x2222222222222222222222222222222222222222";

    fn args(is_buy: bool) -> OrderArgs {
        OrderArgs {
            token_id: "123456789".to_string(),
            price: dec!(0.9),
            size: dec!(11.11),
            is_buy,
            neg_risk: false,
        }
    }

    #[test]
    fn eoa_mode_signs_with_the_wallet() {
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();
        assert_eq!(signer.signature_type(), 0);

        let order = signer.sign_order(&args(true)).unwrap();
        assert_eq!(order.maker, WALLET.to_lowercase());
        assert_eq!(order.signer, order.maker);
        assert_eq!(order.taker, "0x0000000000000000000000000000000000000000");
    }

    #[test]
    fn proxy_mode_splits_maker_and_signer() {
        let signer = OrderSigner::new(PK, WALLET, Some(PROXY_SIGNER)).unwrap();
        assert_eq!(signer.signature_type(), 2);

        let order = signer.sign_order(&args(true)).unwrap();
        assert_eq!(order.maker, WALLET.to_lowercase());
        assert_eq!(order.signer, PROXY_SIGNER);
        assert_eq!(order.signature_type, 2);
    }

    #[test]
    fn matching_signer_address_stays_eoa() {
        let signer = OrderSigner::new(PK, WALLET, Some(WALLET)).unwrap();
        assert_eq!(signer.signature_type(), 0);
    }

    #[test]
    fn buy_and_sell_swap_amount_legs() {
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();

        let buy = signer.sign_order(&args(true)).unwrap();
        assert_eq!(buy.side, "BUY");
        assert_eq!(buy.maker_amount, "9999000"); // dollars
        assert_eq!(buy.taker_amount, "11110000"); // shares

        let sell = signer.sign_order(&args(false)).unwrap();
        assert_eq!(sell.side, "SELL");
        assert_eq!(sell.maker_amount, "11110000");
        assert_eq!(sell.taker_amount, "9999000");
    }

    #[test]
    fn signature_is_sixty_five_bytes_with_legacy_v() {
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();
        let order = signer.sign_order(&args(true)).unwrap();

        assert!(order.signature.starts_with("0x"));
        assert_eq!(order.signature.len(), 2 + 130);
        let v = u8::from_str_radix(&order.signature[130..], 16).unwrap();
        assert!(v == 27 || v == 28, "v was {v}");
    }

    #[test]
    fn salt_fits_in_31_bits() {
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();
        for _ in 0..16 {
            let order = signer.sign_order(&args(true)).unwrap();
            assert!(order.salt < (1 << 31));
        }
    }

    #[test]
    fn request_body_has_the_venue_shape() {
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();
        let req = signer
            .sign_order(&args(true))
            .unwrap()
            .into_request("api-key", OrderType::GTC);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["owner"], "api-key");
        assert_eq!(json["orderType"], "GTC");
        assert_eq!(json["order"]["tokenId"], "123456789");
        assert_eq!(json["order"]["side"], "BUY");
        assert!(json["order"]["salt"].is_u64());
    }

    #[test]
    fn bad_inputs_error_cleanly() {
        assert!(OrderSigner::new("nope", WALLET, None).is_err());
        let signer = OrderSigner::new(PK, WALLET, None).unwrap();
        let mut bad = args(true);
        bad.token_id = "0xnot-decimal".into();
        assert!(matches!(
            signer.sign_order(&bad),
            Err(SignerError::InvalidTokenId(_))
        ));
    }
}
