/// Trimmed keyword, or None when blank.
pub fn normalize_keyword(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `%keyword%` for ILIKE, with LIKE metacharacters escaped.
pub fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match, the in-memory counterpart of `ILIKE '%kw%'`.
pub fn contains_keyword(haystack: Option<&str>, keyword: &str) -> bool {
    haystack.is_some_and(|text| text.to_lowercase().contains(&keyword.to_lowercase()))
}
