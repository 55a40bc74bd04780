use std::path::{Path, PathBuf};

use common::types::{coerce_f64, coerce_i64, coerce_str, RawTransaction};
use serde_json::Value;
use thiserror::Error;

/// Failures that abort a run before anything is computed. All map to exit code 1.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("input file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not a valid JSON array of transactions: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("transaction #{index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("{path} contains no transactions")]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Deposit,
    Borrow,
    Repay,
    RedeemUnderlying,
    LiquidationCall,
    Other(String),
}

impl ActionKind {
    /// Exact, case-sensitive match on the protocol's action names.
    pub fn parse(s: &str) -> Self {
        match s {
            "deposit" => Self::Deposit,
            "borrow" => Self::Borrow,
            "repay" => Self::Repay,
            "redeemunderlying" => Self::RedeemUnderlying,
            "liquidationcall" => Self::LiquidationCall,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One flattened transaction. Numeric fields that failed to parse are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub wallet: String,
    pub action: ActionKind,
    pub amount: Option<f64>,
    pub asset_price_usd: Option<f64>,
    pub asset_symbol: Option<String>,
    pub timestamp: i64,
}

impl TransactionRow {
    /// `amount * assetPriceUSD`, present only when both sides parsed.
    pub fn usd_value(&self) -> Option<f64> {
        match (self.amount, self.asset_price_usd) {
            (Some(amount), Some(price)) => Some(amount * price).filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRow>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            InputError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let rows = parse_transactions(&content).map_err(|e| match e {
        ParseError::Syntax(source) => InputError::Malformed {
            path: path.to_path_buf(),
            source,
        },
        ParseError::Record { index, reason } => InputError::InvalidRecord { index, reason },
    })?;

    if rows.is_empty() {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }

    tracing::info!(path = %path.display(), transactions = rows.len(), "transactions loaded");
    Ok(rows)
}

#[derive(Debug)]
enum ParseError {
    Syntax(serde_json::Error),
    Record { index: usize, reason: String },
}

fn parse_transactions(content: &str) -> Result<Vec<TransactionRow>, ParseError> {
    let records: Vec<Value> = serde_json::from_str(content).map_err(ParseError::Syntax)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            flatten_record(record).map_err(|reason| ParseError::Record { index, reason })
        })
        .collect()
}

fn flatten_record(record: Value) -> Result<TransactionRow, String> {
    let raw: RawTransaction = serde_json::from_value(record).map_err(|e| e.to_string())?;

    let wallet = raw
        .user_wallet
        .filter(|w| !w.is_empty())
        .ok_or_else(|| "missing userWallet".to_string())?;
    let timestamp = raw
        .timestamp
        .as_ref()
        .and_then(coerce_i64)
        .ok_or_else(|| format!("missing or non-integer timestamp for wallet {wallet}"))?;
    let action = ActionKind::parse(raw.action.as_ref().and_then(Value::as_str).unwrap_or(""));

    let data = raw.action_data.unwrap_or_default();
    Ok(TransactionRow {
        wallet,
        action,
        amount: data.amount.as_ref().and_then(coerce_f64),
        asset_price_usd: data.asset_price_usd.as_ref().and_then(coerce_f64),
        asset_symbol: data
            .asset_symbol
            .as_ref()
            .and_then(coerce_str)
            .map(str::to_string),
        timestamp,
    })
}
