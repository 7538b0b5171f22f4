//! Column letter helpers (A, B, ..., Z, AA, ...)

/// Convert column letters to a 0-based index ("A" -> 0, "Z" -> 25, "AA" -> 26)
///
/// Letters are case-insensitive and surrounding whitespace is ignored.
/// Returns `None` for empty input, non-alphabetic characters, or labels too
/// long to fit in `usize`.
pub fn column_to_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }

    let mut sum = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        sum = sum.checked_mul(26)?.checked_add(digit)?;
    }
    Some(sum - 1)
}

/// Convert a 0-based column index to its letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn index_to_column(index: usize) -> String {
    let mut result = String::new();
    let mut n = index + 1;

    while n > 0 {
        let rem = (n - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }

    result
}

/// A1-style reference for a 0-based column and 1-based row
pub fn cell_reference(column: usize, row: u32) -> String {
    let mut buf = itoa::Buffer::new();
    let mut reference = index_to_column(column);
    reference.push_str(buf.format(row));
    reference
}
