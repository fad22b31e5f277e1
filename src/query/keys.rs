//! Streaming key enumeration
//!
//! The store lists a table's keys as a stream of batches. Each batch holds
//! comma-separated key strings; the final batch carries `done = true`.
//! Nothing is returned until that flag is seen, and any error discards what
//! was buffered.

use crate::engine::traits::StoreClient;
use crate::error::StoreError;
use crate::metrics;
use crate::types::{CompositeKey, KeyComponent};
use futures::StreamExt;
use tracing::{debug, info};

/// Coerce one key token
///
/// The token is gated on its numeric value as a whole (decimal, float,
/// exponent or `0x` hex): when that truncates to zero or is not a number the
/// token stays a string, so `"0"` is kept as [`KeyComponent::Str`]. Tokens
/// past the gate take the value of their leading integer prefix, so `"1e3"`
/// becomes `1` and `"0x10"` becomes `16`.
///
/// ```rust
/// use quantum_ts::query::keys::coerce_token;
/// use quantum_ts::types::KeyComponent;
///
/// assert_eq!(coerce_token("1469541600000"), KeyComponent::Int(1_469_541_600_000));
/// assert_eq!(coerce_token("alpha"), KeyComponent::Str("alpha".to_string()));
/// assert_eq!(coerce_token("0"), KeyComponent::Str("0".to_string()));
/// assert_eq!(coerce_token("1e3"), KeyComponent::Int(1));
/// ```
pub fn coerce_token(token: &str) -> KeyComponent {
    let trimmed = token.trim();

    // Zero is kept as a string; see DESIGN.md
    let passes_gate = match trimmed.parse::<i64>() {
        Ok(n) => n != 0,
        Err(_) => whole_number(trimmed).map_or(false, |f| f.trunc() != 0.0),
    };

    match passes_gate.then(|| integer_prefix(trimmed)).flatten() {
        Some(n) => KeyComponent::Int(n),
        None => KeyComponent::Str(token.to_string()),
    }
}

/// Numeric value of the whole token, `None` if it is not a finite number
fn whole_number(trimmed: &str) -> Option<f64> {
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Leading integer of the token: optional sign, then decimal digits or a
/// `0x` hex prefix. Trailing text is ignored. `None` without digits or on
/// overflow.
fn integer_prefix(trimmed: &str) -> Option<i64> {
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (radix, digits) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, unsigned),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = i128::from_str_radix(&digits[..end], radix).ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// Decode one comma-separated key string
pub fn decode_key(csv: &str) -> CompositeKey {
    CompositeKey::new(csv.split(',').map(coerce_token).collect())
}

/// List every key of `table`
///
/// Buffers all batches until the completion flag, then returns the decoded
/// keys in listing order. Fails with the stream's error, or with
/// [`StoreError::StreamTruncated`] if the stream ends without completing.
pub async fn list_keys(
    store: &dyn StoreClient,
    table: &str,
) -> Result<Vec<CompositeKey>, StoreError> {
    let mut stream = store.list_keys_stream(table);
    let mut keys = Vec::new();
    let mut batches = 0usize;

    while let Some(batch) = stream.next().await {
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                metrics::record_enumeration(false);
                debug!(table = table, buffered = keys.len(), error = %e, "Key stream failed");
                return Err(e);
            },
        };

        batches += 1;
        metrics::record_key_batch(batch.keys.len());
        debug!(
            table = table,
            batch = batches,
            keys = batch.keys.len(),
            done = batch.done,
            "Received key batch"
        );
        keys.extend(batch.keys.iter().map(|csv| decode_key(csv)));

        if batch.done {
            metrics::record_enumeration(true);
            info!(table = table, keys = keys.len(), batches = batches, "Key enumeration complete");
            return Ok(keys);
        }
    }

    metrics::record_enumeration(false);
    Err(StoreError::StreamTruncated)
}
