/// Lowercases, keeps ASCII alphanumerics and joins the remaining words with `_`.
pub fn slugify(input: &str) -> String {
    input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Cuts `input` to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = trimmed.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}
