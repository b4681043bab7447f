//! 0-100 string similarity based on insertion/deletion distance.

/// Longest common subsequence length over chars.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { cur[j].max(prev[j + 1]) };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized indel similarity of the two whole strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against every equal-length window of
/// the longer one. A heading word anywhere inside a sentence scores 100.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    let mut best = 0.0f64;
    for start in 0..=(long.len() - short.len()) {
        let score = ratio_chars(&short, &long[start..start + short.len()]);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_disjoint() {
        assert_eq!(ratio("skills", "skills"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("", ""), 100.0);
    }

    #[test]
    fn ratio_counts_common_subsequence() {
        // lcs("kitten", "sitting") = "ittn" -> 200 * 4 / 13
        let r = ratio("kitten", "sitting");
        assert!((r - 61.538).abs() < 0.01, "{r}");
    }

    #[test]
    fn partial_finds_embedded_word() {
        assert_eq!(partial_ratio("technical skills: rust, go", "technical skills"), 100.0);
        assert_eq!(partial_ratio("skills", "my skills include"), 100.0);
    }

    #[test]
    fn partial_tolerates_small_typos() {
        assert!(partial_ratio("educaton", "education") >= 80.0);
        assert!(partial_ratio("references", "hobbies") < 80.0);
    }

    #[test]
    fn empty_short_side_scores_zero() {
        assert_eq!(partial_ratio("", "skills"), 0.0);
    }
}
