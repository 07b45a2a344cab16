//! Asset transfer encoding for the exact scheme.
//!
//! [`encode`] turns a [`PaymentRequest`] into an unsigned transaction and
//! [`decode`] recovers the transfer from a signed one. Both sides share the
//! call-data layout pinned by [`ExactScheme`], so a verifier can recompute and
//! compare what a payer built.

use crate::amount::TokenAmount;
use crate::exact::{
    Asset, DecodeError, DecodedTransfer, EncodeError, EncodedTransaction, ExactScheme,
    MIN_GAS_PRICE, MULTI_TRANSFER_FUNCTION, PAY_FUNCTION, PaymentRequest, SignedTransaction,
    TX_VERSION, TokenIdentifier, TransferMode,
};
use crate::chain::Address;

/// Hex encoding of the `pay` selector as a call-data argument.
const PAY_FUNCTION_HEX: &str = "706179";

/// Builds the unsigned transaction for a payment request.
///
/// Pure and deterministic: the same request always yields the same bytes.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidAsset`] for an unknown asset identifier,
/// [`EncodeError::AmbiguousDecimals`] for fractional amounts and
/// [`EncodeError::InvalidAmount`] for anything else that is not an atomic amount
/// and [`EncodeError::ReservedResourceId`] for a v1 native resource id that
/// [`decode`] would take for a token transfer.
pub fn encode(
    scheme: ExactScheme,
    request: &PaymentRequest,
) -> Result<EncodedTransaction, EncodeError> {
    let asset: Asset = request.asset.parse()?;
    let amount: TokenAmount = request.amount.parse()?;
    let resource_id = request.resource_id.as_deref().filter(|r| !r.is_empty());

    let (value, receiver, data, gas_limit) = match &asset {
        Asset::Native => {
            let data = native_call_data(scheme, resource_id);
            if data.starts_with(token_prefix().as_bytes()) {
                return Err(EncodeError::ReservedResourceId(
                    resource_id.unwrap_or_default().to_owned(),
                ));
            }
            let gas_limit = native_gas_limit(scheme, data.len());
            (amount, request.recipient, data, gas_limit)
        }
        Asset::Token(token) => (
            TokenAmount::ZERO,
            request.sender,
            token_call_data(scheme, &request.recipient, token, amount, resource_id),
            scheme.token_gas_limit(),
        ),
    };

    Ok(EncodedTransaction {
        nonce: request.nonce.unwrap_or_default(),
        value,
        receiver,
        gas_price: MIN_GAS_PRICE,
        gas_limit,
        data,
        chain_id: request.chain_id.reference().to_owned(),
        version: TX_VERSION,
        options: 0,
    })
}

fn token_prefix() -> String {
    format!("{MULTI_TRANSFER_FUNCTION}@")
}

fn native_gas_limit(scheme: ExactScheme, data_len: usize) -> u64 {
    let data_len = u64::try_from(data_len).unwrap_or(u64::MAX);
    scheme
        .native_gas_base()
        .saturating_add(scheme.gas_per_data_byte().saturating_mul(data_len))
}

fn native_call_data(scheme: ExactScheme, resource_id: Option<&str>) -> Vec<u8> {
    match (scheme, resource_id) {
        (ExactScheme::V1, None) => Vec::new(),
        (ExactScheme::V1, Some(rid)) => rid.as_bytes().to_vec(),
        (ExactScheme::V2, None) => PAY_FUNCTION.as_bytes().to_vec(),
        (ExactScheme::V2, Some(rid)) => format!("{PAY_FUNCTION}@{}", hex::encode(rid)).into_bytes(),
    }
}

fn token_call_data(
    scheme: ExactScheme,
    recipient: &Address,
    token: &TokenIdentifier,
    amount: TokenAmount,
    resource_id: Option<&str>,
) -> Vec<u8> {
    let mut data = format!(
        "{MULTI_TRANSFER_FUNCTION}@{}@01@{}@00@{}",
        recipient.to_hex(),
        token.to_hex(),
        amount.to_even_hex()
    );
    if scheme == ExactScheme::V2 {
        data.push('@');
        data.push_str(PAY_FUNCTION_HEX);
    }
    if let Some(rid) = resource_id {
        data.push('@');
        data.push_str(&hex::encode(rid));
    }
    data.into_bytes()
}

/// Recovers the transfer described by a signed transaction.
///
/// Call-data starting with `MultiESDTNFTTransfer@` is read as a token transfer,
/// anything else as a native transfer whose call-data must fit the scheme's
/// native layout.
///
/// # Errors
///
/// Returns [`DecodeError`] when the call-data does not fit either layout.
pub fn decode(
    scheme: ExactScheme,
    signed: &SignedTransaction,
) -> Result<DecodedTransfer, DecodeError> {
    let tx = &signed.transaction;
    if tx.data.starts_with(token_prefix().as_bytes()) {
        decode_token(scheme, &tx.data)
    } else {
        Ok(DecodedTransfer {
            mode: TransferMode::NativeTransfer,
            recipient: tx.receiver,
            amount: tx.value,
            asset: Asset::Native,
            resource_id: decode_native_resource(scheme, &tx.data)?,
        })
    }
}

fn decode_native_resource(
    scheme: ExactScheme,
    data: &[u8],
) -> Result<Option<String>, DecodeError> {
    let malformed = |reason: &str| DecodeError::MalformedNativeTransfer(reason.to_owned());
    match scheme {
        ExactScheme::V1 if data.is_empty() => Ok(None),
        ExactScheme::V1 => String::from_utf8(data.to_vec())
            .map(Some)
            .map_err(|_| malformed("resource id is not utf-8")),
        ExactScheme::V2 => {
            let text = std::str::from_utf8(data).map_err(|_| malformed("call-data is not utf-8"))?;
            let mut parts = text.split('@');
            if parts.next() != Some(PAY_FUNCTION) {
                return Err(malformed("missing pay selector"));
            }
            let resource = parts
                .next()
                .map(|arg| decode_hex_string(arg).map_err(|_| malformed("resource id is not hex utf-8")))
                .transpose()?;
            if parts.next().is_some() {
                return Err(malformed("unexpected trailing arguments"));
            }
            Ok(resource)
        }
    }
}

fn decode_token(scheme: ExactScheme, data: &[u8]) -> Result<DecodedTransfer, DecodeError> {
    let malformed = |reason: &str| DecodeError::MalformedTokenTransfer(reason.to_owned());
    let text = std::str::from_utf8(data).map_err(|_| malformed("call-data is not utf-8"))?;
    let args: Vec<&str> = text.split('@').skip(1).collect();
    let [receiver_hex, count, token_hex, token_nonce, amount_hex, trailing @ ..] = args.as_slice()
    else {
        return Err(malformed("too few arguments"));
    };

    let recipient =
        Address::from_hex(receiver_hex).map_err(|_| malformed("receiver is not a 32-byte hex key"))?;
    if *count != "01" {
        return Err(DecodeError::MultipleTransfers((*count).to_owned()));
    }
    let token: TokenIdentifier = decode_hex_string(token_hex)?
        .parse()
        .map_err(|_| malformed("token identifier is invalid"))?;
    if *token_nonce != "00" {
        return Err(malformed("token nonce must be zero"));
    }
    let amount =
        TokenAmount::from_hex(amount_hex).map_err(|_| malformed("amount is not a hex integer"))?;

    let resource_args = match (scheme, trailing) {
        (ExactScheme::V1, rest) => rest,
        (ExactScheme::V2, [selector, rest @ ..]) if *selector == PAY_FUNCTION_HEX => rest,
        (ExactScheme::V2, _) => return Err(malformed("missing pay selector")),
    };
    let resource_id = match resource_args {
        [] => None,
        [rid] => Some(decode_hex_string(rid)?),
        _ => return Err(malformed("unexpected trailing arguments")),
    };

    Ok(DecodedTransfer {
        mode: TransferMode::TokenTransfer,
        recipient,
        amount,
        asset: Asset::Token(token),
        resource_id,
    })
}

fn decode_hex_string(arg: &str) -> Result<String, DecodeError> {
    hex::decode(arg)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| DecodeError::MalformedTokenTransfer(format!("argument {arg:?} is not hex utf-8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;

    const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg83cq4jgy80zy85ryfx475fsz99m4h39s292042";
    const BOB: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";

    fn request(asset: &str, amount: &str, resource_id: Option<&str>) -> PaymentRequest {
        PaymentRequest {
            sender: ALICE.parse().unwrap(),
            recipient: BOB.parse().unwrap(),
            amount: amount.to_owned(),
            asset: asset.to_owned(),
            resource_id: resource_id.map(str::to_owned),
            chain_id: ChainId::new("D"),
            nonce: Some(7),
        }
    }

    fn sign(transaction: EncodedTransaction) -> SignedTransaction {
        SignedTransaction {
            transaction,
            sender: ALICE.parse().unwrap(),
            signature: vec![0; 64],
        }
    }

    #[test]
    fn test_native_encode_is_deterministic() {
        let req = request("EGLD", "1000", Some("invoice-42"));
        let first = encode(ExactScheme::V1, &req).unwrap();
        let second = encode(ExactScheme::V1, &req).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value.inner(), 1000);
        assert_eq!(first.receiver.to_string(), BOB);
        assert_eq!(first.data, b"invoice-42");
        assert_eq!(first.gas_limit, 50_000 + 1_500 * 10);
        assert_eq!(first.nonce, 7);
        assert_eq!(first.chain_id, "D");
    }

    #[test]
    fn test_native_v2_uses_pay_selector() {
        let tx = encode(ExactScheme::V2, &request("EGLD", "1000", Some("abc"))).unwrap();
        assert_eq!(tx.data, b"pay@616263");
        assert_eq!(tx.gas_limit, 10_000_000);
    }

    #[test]
    fn test_token_encode_is_self_transfer() {
        let tx = encode(ExactScheme::V1, &request("USDC-c76f1f", "1000", Some("abc"))).unwrap();
        let bob: Address = BOB.parse().unwrap();
        assert_eq!(tx.value, TokenAmount::ZERO);
        assert_eq!(tx.receiver.to_string(), ALICE);
        assert_eq!(tx.gas_limit, 60_000_000);
        let expected = format!(
            "MultiESDTNFTTransfer@{}@01@555344432d633736663166@00@03e8@616263",
            bob.to_hex()
        );
        assert_eq!(String::from_utf8(tx.data).unwrap(), expected);
    }

    #[test]
    fn test_token_v2_appends_pay_selector() {
        let tx = encode(ExactScheme::V2, &request("USDC-c76f1f", "1000", Some("abc"))).unwrap();
        let data = String::from_utf8(tx.data).unwrap();
        assert!(data.ends_with("@03e8@706179@616263"), "{data}");
        assert_eq!(tx.gas_limit, 15_000_000);
    }

    #[test]
    fn test_token_amount_hex_is_even_and_decodes_back() {
        for amount in ["1", "15", "16", "255", "256", "1000000000000000000"] {
            let tx = encode(ExactScheme::V1, &request("USDC-c76f1f", amount, None)).unwrap();
            let data = String::from_utf8(tx.data.clone()).unwrap();
            let amount_hex = data.split('@').nth(5).unwrap();
            assert_eq!(amount_hex.len() % 2, 0, "amount {amount}");
            let decoded = decode(ExactScheme::V1, &sign(tx)).unwrap();
            assert_eq!(decoded.amount.to_string(), amount);
        }
    }

    #[test]
    fn test_encode_errors() {
        assert_eq!(
            encode(ExactScheme::V1, &request("usdc", "1000", None)),
            Err(EncodeError::InvalidAsset("usdc".to_owned()))
        );
        assert_eq!(
            encode(ExactScheme::V1, &request("EGLD", "1.5", None)),
            Err(EncodeError::AmbiguousDecimals("1.5".to_owned()))
        );
        assert!(matches!(
            encode(ExactScheme::V1, &request("EGLD", "-3", None)),
            Err(EncodeError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_native_resource_id_cannot_mimic_token_call_data() {
        let rid = "MultiESDTNFTTransfer@report";
        assert_eq!(
            encode(ExactScheme::V1, &request("EGLD", "1000", Some(rid))),
            Err(EncodeError::ReservedResourceId(rid.to_owned()))
        );
        let v2 = encode(ExactScheme::V2, &request("EGLD", "1000", Some(rid))).unwrap();
        let decoded = decode(ExactScheme::V2, &sign(v2)).unwrap();
        assert_eq!(decoded.mode, TransferMode::NativeTransfer);
        assert_eq!(decoded.resource_id.as_deref(), Some(rid));

        let lookalike = "MultiESDTNFTTransfer-report";
        let v1 = encode(ExactScheme::V1, &request("EGLD", "1000", Some(lookalike))).unwrap();
        let decoded = decode(ExactScheme::V1, &sign(v1)).unwrap();
        assert_eq!(decoded.resource_id.as_deref(), Some(lookalike));
    }

    #[test]
    fn test_decode_recovers_both_modes() {
        for scheme in ExactScheme::ALL {
            let native = encode(scheme, &request("EGLD", "1000", Some("r-1"))).unwrap();
            let decoded = decode(scheme, &sign(native)).unwrap();
            assert_eq!(decoded.mode, TransferMode::NativeTransfer);
            assert_eq!(decoded.resource_id.as_deref(), Some("r-1"));

            let token = encode(scheme, &request("USDC-c76f1f", "1000", Some("r-1"))).unwrap();
            let decoded = decode(scheme, &sign(token)).unwrap();
            assert_eq!(decoded.mode, TransferMode::TokenTransfer);
            assert_eq!(decoded.recipient.to_string(), BOB);
            assert_eq!(decoded.asset.to_string(), "USDC-c76f1f");
            assert_eq!(decoded.resource_id.as_deref(), Some("r-1"));
        }
    }

    #[test]
    fn test_decode_rejects_layout_of_other_version() {
        let v1_native = encode(ExactScheme::V1, &request("EGLD", "1000", Some("r-1"))).unwrap();
        assert!(matches!(
            decode(ExactScheme::V2, &sign(v1_native)),
            Err(DecodeError::MalformedNativeTransfer(_))
        ));
        let v2_token = encode(ExactScheme::V2, &request("USDC-c76f1f", "1000", Some("r-1"))).unwrap();
        assert!(matches!(
            decode(ExactScheme::V1, &sign(v2_token)),
            Err(DecodeError::MalformedTokenTransfer(_))
        ));
    }

    #[test]
    fn test_decode_rejects_multiple_transfers() {
        let bob: Address = BOB.parse().unwrap();
        let mut tx = encode(ExactScheme::V1, &request("EGLD", "0", None)).unwrap();
        tx.data = format!("MultiESDTNFTTransfer@{}@02@5553@00@01", bob.to_hex()).into_bytes();
        assert_eq!(
            decode(ExactScheme::V1, &sign(tx)),
            Err(DecodeError::MultipleTransfers("02".to_owned()))
        );
    }
}
