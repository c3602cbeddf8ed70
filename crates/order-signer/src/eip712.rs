//! EIP-712 hashing for the exchange order struct.
//!
//! Field encoding: addresses left-padded to 32 bytes, `uint256` big-endian,
//! `uint8` right-aligned in a 32-byte word. The final digest is
//! `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)`.

use alloy::primitives::{keccak256, Address, B256, U256};

/// Exchange contract for CTF-settled markets (chain id 137).
pub const STANDARD_EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";
/// Exchange contract for neg-risk-settled markets (chain id 137).
pub const NEG_RISK_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";

pub const CHAIN_ID: u64 = 137;
const DOMAIN_NAME: &str = "Polymarket CTF Exchange";
const DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// The order type string, verbatim as the contract hashes it.
const ORDER_TYPE: &str = "Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)";

/// Hashable field values of an order, already in wire representation.
#[derive(Debug, Clone)]
pub struct OrderFields {
    pub salt: U256,
    pub maker: Address,
    pub signer: Address,
    pub taker: Address,
    pub token_id: U256,
    pub maker_amount: U256,
    pub taker_amount: U256,
    pub expiration: U256,
    pub nonce: U256,
    pub fee_rate_bps: U256,
    pub side: u8,
    pub signature_type: u8,
}

/// Domain separator for the given verifying contract.
pub fn domain_separator(verifying_contract: Address) -> B256 {
    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(keccak256(DOMAIN_TYPE.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_NAME.as_bytes()).as_slice());
    buf.extend_from_slice(keccak256(DOMAIN_VERSION.as_bytes()).as_slice());
    buf.extend_from_slice(&U256::from(CHAIN_ID).to_be_bytes::<32>());
    buf.extend_from_slice(B256::left_padding_from(verifying_contract.as_slice()).as_slice());
    keccak256(&buf)
}

/// Struct hash of the order fields.
pub fn struct_hash(order: &OrderFields) -> B256 {
    let mut buf = Vec::with_capacity(32 * 13);
    buf.extend_from_slice(keccak256(ORDER_TYPE.as_bytes()).as_slice());
    buf.extend_from_slice(&order.salt.to_be_bytes::<32>());
    buf.extend_from_slice(B256::left_padding_from(order.maker.as_slice()).as_slice());
    buf.extend_from_slice(B256::left_padding_from(order.signer.as_slice()).as_slice());
    buf.extend_from_slice(B256::left_padding_from(order.taker.as_slice()).as_slice());
    buf.extend_from_slice(&order.token_id.to_be_bytes::<32>());
    buf.extend_from_slice(&order.maker_amount.to_be_bytes::<32>());
    buf.extend_from_slice(&order.taker_amount.to_be_bytes::<32>());
    buf.extend_from_slice(&order.expiration.to_be_bytes::<32>());
    buf.extend_from_slice(&order.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&order.fee_rate_bps.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(order.side).to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(order.signature_type).to_be_bytes::<32>());
    keccak256(&buf)
}

/// Final signing digest.
pub fn digest(separator: B256, struct_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(2 + 64);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(&buf)
}
