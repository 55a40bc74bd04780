use serde::Deserialize;
use serde_json::Value;

/// Lending-protocol transaction as it appears in the input dump.
///
/// Only the fields the scorer reads are modelled; everything else in the record
/// (tx hash, block number, pool ids, ...) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "userWallet")]
    pub user_wallet: Option<String>,
    pub action: Option<Value>,
    pub timestamp: Option<Value>,
    #[serde(rename = "actionData")]
    pub action_data: Option<RawActionData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActionData {
    pub amount: Option<Value>,
    #[serde(rename = "assetPriceUSD")]
    pub asset_price_usd: Option<Value>,
    #[serde(rename = "assetSymbol")]
    pub asset_symbol: Option<Value>,
}

/// Numeric coercion for fields that arrive as either JSON numbers or numeric strings.
/// Anything unparseable or non-finite is `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

/// Integer coercion for epoch timestamps. Integral floats and integer strings are accepted.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|x| x.is_finite() && x.fract() == 0.0)
                .map(|x| x as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// String payloads only. An empty string is a value, not a missing field.
pub fn coerce_str(value: &Value) -> Option<&str> {
    value.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_transaction_deserializes_nested_action_data() {
        let raw: RawTransaction = serde_json::from_value(json!({
            "userWallet": "0xabc",
            "network": "polygon",
            "action": "deposit",
            "timestamp": 1_629_178_166,
            "actionData": {
                "type": "Deposit",
                "amount": "2000000000",
                "assetSymbol": "USDC",
                "assetPriceUSD": "0.9938318274296357"
            }
        }))
        .unwrap();

        assert_eq!(raw.user_wallet.as_deref(), Some("0xabc"));
        let data = raw.action_data.unwrap();
        assert_eq!(data.amount.as_ref().and_then(coerce_f64), Some(2_000_000_000.0));
        assert_eq!(data.asset_symbol.as_ref().and_then(coerce_str), Some("USDC"));
    }

    #[test]
    fn test_action_data_is_optional() {
        let raw: RawTransaction =
            serde_json::from_value(json!({"userWallet": "0xabc", "timestamp": 1})).unwrap();
        assert!(raw.action_data.is_none());
        assert!(raw.action.is_none());
    }

    #[test]
    fn test_coerce_f64() {
        assert_eq!(coerce_f64(&json!(1.5)), Some(1.5));
        assert_eq!(coerce_f64(&json!("42")), Some(42.0));
        assert_eq!(coerce_f64(&json!(" 3.25 ")), Some(3.25));
        assert_eq!(coerce_f64(&json!("abc")), None);
        assert_eq!(coerce_f64(&json!("nan")), None);
        assert_eq!(coerce_f64(&json!("inf")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!({"x": 1})), None);
    }

    #[test]
    fn test_coerce_i64() {
        assert_eq!(coerce_i64(&json!(1_700_000_000)), Some(1_700_000_000));
        assert_eq!(coerce_i64(&json!("1700000000")), Some(1_700_000_000));
        assert_eq!(coerce_i64(&json!(12.0)), Some(12));
        assert_eq!(coerce_i64(&json!(12.5)), None);
        assert_eq!(coerce_i64(&json!("soon")), None);
    }

    #[test]
    fn test_coerce_str_keeps_empty_and_rejects_non_strings() {
        assert_eq!(coerce_str(&json!("WETH")), Some("WETH"));
        assert_eq!(coerce_str(&json!("")), Some(""));
        assert_eq!(coerce_str(&json!(7)), None);
        assert_eq!(coerce_str(&json!(null)), None);
    }
}
