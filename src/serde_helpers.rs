use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::{chain_id_hex, parse_chain_id};

/// Account strings of an address array, as the wallet sent them. Entries
/// that are not strings are skipped; a non-array yields `None`.
pub fn accounts(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
}

/// First element of an address array, when it is a string.
pub fn first_account(value: &Value) -> Option<&str> {
    value.as_array()?.first()?.as_str()
}

/// Normalizes a pushed chain id to `0x` hex. Wallets send either a hex
/// string or a bare number.
pub fn chain_id(value: &Value) -> Option<String> {
    match value {
        Value::String(chain_id) => Some(chain_id.clone()),
        Value::Number(number) => number.as_u64().map(chain_id_hex),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChainHint {
    Id(u64),
    Hex(String),
    Chain { id: u64 },
}

/// Accepts `1`, `"0x1"` or `{ "id": 1 }` for the `chain` option.
pub fn chain_hint<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<ChainHint>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ChainHint::Id(id)) | Some(ChainHint::Chain { id }) => Ok(Some(id)),
        Some(ChainHint::Hex(hex)) => parse_chain_id(&hex)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid chain id: {hex}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALICE: &str = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn accounts_keep_the_wallet_spelling() {
        assert_eq!(accounts(&json!([ALICE])), Some(vec![ALICE.to_string()]));
        assert_eq!(accounts(&json!(["0xabc", 1])), Some(vec!["0xabc".to_string()]));
        assert_eq!(accounts(&json!([])), Some(vec![]));
        assert_eq!(accounts(&json!(ALICE)), None);
    }

    #[test]
    fn first_account_only_checks_shape() {
        assert_eq!(first_account(&json!(["0xabc", "0x123"])), Some("0xabc"));
        assert_eq!(first_account(&json!([ALICE, "not an address"])), Some(ALICE));
        assert_eq!(first_account(&json!([])), None);
        assert_eq!(first_account(&json!([1])), None);
        assert_eq!(first_account(&json!({ "accounts": [ALICE] })), None);
    }

    #[test]
    fn pushed_chain_ids() {
        assert_eq!(chain_id(&json!("0x89")).as_deref(), Some("0x89"));
        assert_eq!(chain_id(&json!(137)).as_deref(), Some("0x89"));
        assert_eq!(chain_id(&json!(null)), None);
    }
}
