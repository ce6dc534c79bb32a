//! Edit-distance text similarity for spoken and typed answers.
//!
//! Both sides are normalized (punctuation stripped, trimmed, case-folded)
//! and compared by Levenshtein distance over Unicode code points, so Hangul
//! and kana compare per character rather than per byte.

/// Punctuation removed before comparison.
pub const STRIPPED_PUNCTUATION: &[char] = &['.', ',', '!', '?'];

/// Strip punctuation, trim surrounding whitespace, and case-fold.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    stripped.trim().to_lowercase()
}

/// Levenshtein distance with unit costs, computed over the full matrix.
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + substitution);
        }
    }

    matrix[a.len()][b.len()]
}

/// Similarity between a recognized answer and the canonical text, 0–100.
///
/// Two answers that are both empty after normalization score 0: no answer
/// earns no credit even though the edit distance is zero.
pub fn similarity(recognized: &str, canonical: &str) -> f64 {
    let a: Vec<char> = normalize_text(recognized).chars().collect();
    let b: Vec<char> = normalize_text(canonical).chars().collect();

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }

    let distance = levenshtein(&a, &b);
    (100.0 - distance as f64 / max_len as f64 * 100.0).max(0.0)
}
