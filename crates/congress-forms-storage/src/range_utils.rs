//! Range query helpers for prefix scans.

/// Calculate the exclusive end bound for a prefix range query.
///
/// Given prefix "S000148:", returns "S000148;" (next ASCII char after ':').
/// This allows efficient range scans: range(prefix..end_prefix)
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Zero-padded millisecond timestamp so lexical order matches time order.
pub fn ts_key(timestamp_ms: i64) -> String {
    format!("{:020}", timestamp_ms.max(0) as u64)
}

/// Inverted timestamp key: newest entries sort first.
pub fn reverse_ts_key(timestamp_ms: i64) -> String {
    format!("{:020}", u64::MAX - timestamp_ms.max(0) as u64)
}
