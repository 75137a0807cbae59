//! Shape Adapters
//!
//! The merchant status API has changed response shape over time and is
//! not validated server-side. Each adapter here is a pure function that
//! attempts to extract a partial status record from one historically
//! observed layout. Adapters never panic; malformed input yields `None`
//! and the next shape is tried.

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::status::StatusCategory;

/// Partial extraction result from one shape adapter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapeHit {
    pub txn_ref: Option<String>,
    pub amount: Option<Decimal>,
    pub status: Option<String>,
}

impl ShapeHit {
    /// A hit counts only if it carries a transaction reference or a status
    pub fn is_useful(&self) -> bool {
        self.txn_ref.as_deref().is_some_and(|r| !r.is_empty())
            || self.status.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// A named, pure shape adapter
#[derive(Clone, Copy)]
pub struct ShapeAdapter {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<ShapeHit>,
}

/// Adapters in fixed priority order
pub fn default_adapters() -> Vec<ShapeAdapter> {
    vec![
        ShapeAdapter { name: "nested_status_object", extract: nested_status_object },
        ShapeAdapter { name: "transaction_row_list", extract: transaction_row_list },
        ShapeAdapter { name: "flat_aliases", extract: flat_aliases },
        ShapeAdapter { name: "encoded_json", extract: encoded_json },
        ShapeAdapter { name: "token_scan", extract: token_scan },
    ]
}

const REF_KEYS: &[&str] = &["txn_id", "txn_ref", "transaction_id", "merchant_txn_id"];
const AMOUNT_KEYS: &[&str] = &["amount", "txn_amount", "amt"];
const STATUS_KEYS: &[&str] = &["txn_status", "payment_status", "status"];

fn string_field(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn amount_field(obj: &Value, keys: &[&str]) -> Option<Decimal> {
    for key in keys {
        match obj.get(key) {
            // serde_json renders numbers losslessly; Decimal parses the text form
            Some(Value::Number(n)) => return n.to_string().parse().ok(),
            Some(Value::String(s)) => {
                if let Ok(amount) = s.trim().parse() {
                    return Some(amount);
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_row(row: &Value) -> ShapeHit {
    ShapeHit {
        txn_ref: string_field(row, REF_KEYS),
        amount: amount_field(row, AMOUNT_KEYS),
        status: string_field(row, STATUS_KEYS),
    }
}

/// Shape 1: `{"data": {"txn_id": ..., "amount": ..., "txn_status": ...}}`
/// (the gateway's "Admin Payment Response" layout)
pub fn nested_status_object(payload: &Value) -> Option<ShapeHit> {
    let data = payload.get("data")?;
    if !data.is_object() {
        return None;
    }
    let hit = extract_row(data);
    hit.is_useful().then_some(hit)
}

/// Shape 2: `{"data": [{...}, ...]}` — transaction rows, first row wins
/// (the gateway's "Get Transaction Detail" layout)
pub fn transaction_row_list(payload: &Value) -> Option<ShapeHit> {
    let rows = payload.get("data")?.as_array()?;
    let first = rows.first()?;
    let hit = extract_row(first);
    hit.is_useful().then_some(hit)
}

/// Shape 3: flat object carrying any of the historical field aliases
pub fn flat_aliases(payload: &Value) -> Option<ShapeHit> {
    if !payload.is_object() {
        return None;
    }
    let hit = extract_row(payload);
    hit.is_useful().then_some(hit)
}

/// Shape 4: the payload (or its `data` field) is itself a JSON-encoded
/// string. One decode step, then shapes 1-3 apply to the result.
pub fn encoded_json(payload: &Value) -> Option<ShapeHit> {
    let decoded = match payload {
        Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
        Value::Object(_) => {
            let inner = payload.get("data")?.as_str()?;
            let data: Value = serde_json::from_str(inner).ok()?;
            serde_json::json!({ "data": data })
        }
        _ => return None,
    };

    nested_status_object(&decoded)
        .or_else(|| transaction_row_list(&decoded))
        .or_else(|| flat_aliases(&decoded))
}

/// Shape 5: permissive token extraction from the serialized payload.
///
/// Last resort for responses that are not JSON at all (HTML fragments,
/// query-string blobs, bare status words).
pub fn token_scan(payload: &Value) -> Option<ShapeHit> {
    let text = match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    // A bare status word ("success", "pg_pending", ...) is the simplest
    // historical response of all.
    let bare = text.trim().trim_matches('"');
    if !bare.is_empty()
        && !bare.contains(char::is_whitespace)
        && StatusCategory::from_raw(bare) != StatusCategory::Unknown
    {
        return Some(ShapeHit {
            txn_ref: None,
            amount: None,
            status: Some(bare.to_string()),
        });
    }

    let ref_re =
        Regex::new(r#"(?i)["']?(?:txn_id|txn_ref|transaction_id|merchant_txn_id)["']?\s*[:=]\s*["']?([A-Za-z0-9_-]+)"#)
            .ok()?;
    let status_re =
        Regex::new(r#"(?i)["']?(?:txn_status|payment_status|status)["']?\s*[:=]\s*["']?([A-Za-z_]+)"#)
            .ok()?;
    let amount_re =
        Regex::new(r#"(?i)["']?(?:amount|txn_amount)["']?\s*[:=]\s*["']?([0-9]+(?:\.[0-9]+)?)"#)
            .ok()?;

    let hit = ShapeHit {
        txn_ref: ref_re.captures(&text).map(|c| c[1].to_string()),
        status: status_re.captures(&text).map(|c| c[1].to_string()),
        amount: amount_re.captures(&text).and_then(|c| c[1].parse().ok()),
    };
    hit.is_useful().then_some(hit)
}
