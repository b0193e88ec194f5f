/// Splits a comma-separated tag string into trimmed, deduplicated tags.
///
/// This is the single normalization point for the write path: empty
/// fragments are dropped and the first occurrence wins on duplicates.
/// Case is preserved, so "Rust" and "rust" remain distinct tags.
pub fn normalize(csv: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in csv.split(',') {
        let tag = raw.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
