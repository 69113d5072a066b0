//! Provider-legal identifiers from free-form names

/// Constraints of one identifier namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRules {
    pub max_len: usize,

    /// Substituted when nothing legal survives sanitization
    pub fallback: &'static str,
}

/// Kubernetes object names and DNS labels
pub const DNS_LABEL: NameRules = NameRules {
    max_len: 63,
    fallback: "resource",
};

/// Helm release names
pub const HELM_RELEASE: NameRules = NameRules {
    max_len: 53,
    fallback: "release",
};

/// GCP label values
pub const GCP_LABEL_VALUE: NameRules = NameRules {
    max_len: 63,
    fallback: "none",
};

/// Database subnet group names
pub const SUBNET_GROUP: NameRules = NameRules {
    max_len: 255,
    fallback: "subnet-group",
};

fn is_separator(c: char) -> bool {
    c == '-' || c == '.'
}

/// Sanitize `input` into `[a-z0-9._-]`
///
/// The result is lower-case, has no runs of `-`, does not start or end with
/// `-` or `.`, is at most `rules.max_len` characters, and is never empty.
pub fn sanitize_name(input: &str, rules: &NameRules) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase) {
        let c = match c {
            'a'..='z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '-',
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(is_separator);
    let truncated: String = trimmed.chars().take(rules.max_len).collect();
    let result = truncated.trim_matches(is_separator);

    if result.is_empty() {
        rules.fallback.chars().take(rules.max_len).collect()
    } else {
        result.to_string()
    }
}

/// `value` unless it is empty, then `default`
pub fn resolve_or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_legal(name: &str, rules: &NameRules) {
        assert!(!name.is_empty());
        assert!(name.len() <= rules.max_len);
        assert!(
            name.chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '_' | '-'))
        );
        assert!(!name.starts_with(is_separator));
        assert!(!name.ends_with(is_separator));
        assert!(!name.contains("--"));
    }

    #[test]
    fn test_basic_sanitization() {
        assert_eq!(sanitize_name("My App_Prod", &DNS_LABEL), "my-app_prod");
        assert_eq!(sanitize_name("--a!!b--", &DNS_LABEL), "a-b");
        assert_eq!(sanitize_name(".hidden.", &DNS_LABEL), "hidden");
    }

    #[test]
    fn test_truncation_retrims() {
        let input = format!("{}-tail", "a".repeat(52));
        let name = sanitize_name(&input, &HELM_RELEASE);
        assert_eq!(name, "a".repeat(52));
    }

    #[test]
    fn test_fallback() {
        assert_eq!(sanitize_name("", &SUBNET_GROUP), "subnet-group");
        assert_eq!(sanitize_name("!!!", &SUBNET_GROUP), "subnet-group");
        assert_eq!(sanitize_name("---...", &DNS_LABEL), "resource");
    }

    #[test]
    fn test_output_always_legal() {
        let inputs = [
            "",
            "Ünïcode Näme",
            "..--..",
            "UPPER.lower-Mixed_09",
            "a",
            "日本語のサービス",
            &"x-".repeat(200),
            "trailing.dot.",
            "-.-.-.-",
        ];
        for rules in [DNS_LABEL, HELM_RELEASE, GCP_LABEL_VALUE, SUBNET_GROUP] {
            for input in inputs {
                assert_legal(&sanitize_name(input, &rules), &rules);
            }
        }
    }

    #[test]
    fn test_resolve_or_default() {
        assert_eq!(resolve_or_default(Some("dns"), "external-dns"), "dns");
        assert_eq!(resolve_or_default(Some(" "), "external-dns"), "external-dns");
        assert_eq!(resolve_or_default(None, "external-dns"), "external-dns");
    }
}
