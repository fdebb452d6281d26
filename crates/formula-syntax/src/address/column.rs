//! Column letter and row number conversions.
//!
//! Columns use bijective base-26 (`A` = 0, `Z` = 25, `AA` = 26, ...). Rows are rendered
//! 1-indexed but stored 0-indexed.

/// Convert a 0-indexed column to its letters (e.g. `0` -> `A`, `27` -> `AB`).
pub fn to_col(col: u32) -> String {
    // Excel columns are 1-based in A1 notation. We store 0-based internally.
    let mut n = u64::from(col) + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Convert column letters (case-insensitive) to a 0-indexed column.
///
/// Returns `None` for empty input, non-letter characters or values that overflow `u32`. No
/// sheet bound is applied here; callers check against [`crate::MAX_COL_INDEX`].
pub fn from_col(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    Some(col - 1)
}

/// Render a 0-indexed row as its 1-indexed display number.
pub fn to_row(row: u32) -> String {
    (u64::from(row) + 1).to_string()
}

/// Parse a 1-indexed row number into a 0-indexed row. `0` and non-digits are rejected.
pub fn from_row(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    n.checked_sub(1)
}
