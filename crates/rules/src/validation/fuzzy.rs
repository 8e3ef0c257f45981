//! Fuzzy string matching utilities: Levenshtein distance and kebab-case validation.

/// Find the closest match using Levenshtein distance. Returns None if best
/// distance exceeds half the longer string (too dissimilar).
pub(crate) fn fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for &candidate in candidates {
        let dist = levenshtein(&input_lower, &candidate.to_lowercase());
        match best {
            None => best = Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((candidate, dist)),
            _ => {}
        }
    }

    best.and_then(|(name, dist)| {
        let max_len = input.len().max(name.len());
        if dist <= max_len / 2 {
            Some(name)
        } else {
            None
        }
    })
}

/// Levenshtein edit distance between two strings.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Whether an id can name a file inside the rules directory: no path
/// separators, no `..`, no leading `.` and no control characters.
pub(crate) fn is_path_safe(s: &str) -> bool {
    !s.trim().is_empty()
        && !s.starts_with('.')
        && !s.contains("..")
        && !s.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

/// Check if a string is valid kebab-case: `^[a-z0-9]+(-[a-z0-9]+)*$`
pub(crate) fn is_kebab_case(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Loose `MAJOR.MINOR.PATCH` check; pre-release and build suffixes are allowed.
pub(crate) fn is_semver(s: &str) -> bool {
    let core = s.split(['-', '+']).next().unwrap_or_default();
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM_IDS: &[&str] = &[
        "age-25-35",
        "high-purchase-frequency",
        "mobile-user",
        "newsletter-consent",
        "churn-risk-high",
        "metro-manila",
    ];

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn fuzzy_match_finds_close() {
        assert_eq!(fuzzy_match("age-25-53", ATOM_IDS), Some("age-25-35"));
        assert_eq!(fuzzy_match("mobile-users", ATOM_IDS), Some("mobile-user"));
        assert_eq!(fuzzy_match("Churn-Risk-High", ATOM_IDS), Some("churn-risk-high"));
    }

    #[test]
    fn fuzzy_match_rejects_distant() {
        assert_eq!(fuzzy_match("zzzzzzzzzzzzz", ATOM_IDS), None);
        assert_eq!(fuzzy_match("x", &[]), None);
    }

    #[test]
    fn kebab_case() {
        assert!(is_kebab_case("age-25-35"));
        assert!(is_kebab_case("vip"));
        assert!(!is_kebab_case(""));
        assert!(!is_kebab_case("-vip"));
        assert!(!is_kebab_case("vip-"));
        assert!(!is_kebab_case("vip--gold"));
        assert!(!is_kebab_case("VipGold"));
        assert!(!is_kebab_case("vip_gold"));
    }

    #[test]
    fn path_safe_ids() {
        assert!(is_path_safe("age-25-35"));
        assert!(is_path_safe("Promo_2024"));
        assert!(is_path_safe("v1.2"));
        assert!(!is_path_safe(""));
        assert!(!is_path_safe("./../escaped"));
        assert!(!is_path_safe("../up"));
        assert!(!is_path_safe("a/b"));
        assert!(!is_path_safe("a\\b"));
        assert!(!is_path_safe(".hidden"));
        assert!(!is_path_safe("two..dots"));
        assert!(!is_path_safe("nul\0"));
    }

    #[test]
    fn semver() {
        assert!(is_semver("1.0.0"));
        assert!(is_semver("2.10.3-beta.1"));
        assert!(!is_semver("1.0"));
        assert!(!is_semver("v1.0.0"));
        assert!(!is_semver("1..0"));
    }
}
