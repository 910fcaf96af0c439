//! Contract source-filename parsing.

/// Standard futures month codes, January through December.
pub const MONTH_CODES: &str = "FGHJKMNQUVXZ";

/// Parse a contract data filename stem such as `ESH26` or `ADF18.txt` into
/// `(symbol_code, month_code, year)`.
///
/// Continuous-contract files carry no month/year suffix and yield `None`;
/// the loader skips them. Two-digit years map to 2000-2099.
pub fn parse_contract_filename(filename: &str) -> Option<(String, char, i32)> {
    let stem = filename
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(filename);

    if stem.len() < 3 || !stem.is_ascii() {
        return None;
    }

    let (head, tail) = stem.split_at(stem.len() - 3);
    let mut chars = tail.chars();
    let month_code = chars.next()?;
    let year_two: String = chars.collect();

    if !MONTH_CODES.contains(month_code) || !year_two.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let year = 2000 + year_two.parse::<i32>().ok()?;
    Some((head.to_string(), month_code, year))
}
