//! Input sanitization and validation helpers shared by the core operations.
//!
//! Validation failures are reported as `Error::Validation` with a message
//! naming the offending field, so the UI can display it next to the input.

use crate::errors::{Error, Result};

/// Substrings rejected anywhere in user-supplied free text.
const DANGEROUS_PATTERNS: &[&str] = &["<script", "javascript:", "data:text/html", "vbscript:"];

/// Trims the value and strips angle brackets.
#[must_use]
pub fn sanitize_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect()
}

/// Keeps digits and the characters `+()-`.
#[must_use]
pub fn sanitize_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-'))
        .collect()
}

/// Keeps ASCII alphanumerics and `-`.
#[must_use]
pub fn sanitize_zip(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Trims and lowercases an email address.
#[must_use]
pub fn sanitize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// True when the text contains script-like content: one of the blocked
/// schemes or tags, or an inline event handler such as `onclick=`.
#[must_use]
pub fn contains_dangerous_pattern(value: &str) -> bool {
    let lower = value.to_lowercase();
    if DANGEROUS_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    // on<letters><spaces>=
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i + 2 < bytes.len() {
        let at_word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if at_word_start && bytes[i] == b'o' && bytes[i + 1] == b'n' {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
                j += 1;
            }
            if j > i + 2 {
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'=' {
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

/// Minimal structural email check: one `@`, a non-empty local part and a
/// dotted domain, no whitespace.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    if value.len() > 254 || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// True for absolute `http` or `https` URLs with a host.
#[must_use]
pub fn is_valid_url(value: &str) -> bool {
    reqwest::Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Checks that `value` has between `min` and `max` characters.
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(Error::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(Error::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Checks the minimum length only.
pub fn check_min_length(field: &str, value: &str, min: usize) -> Result<()> {
    check_length(field, value, min, usize::MAX)
}

/// Rejects script-like content in a free text field.
pub fn check_safe(field: &str, value: &str) -> Result<()> {
    if contains_dangerous_pattern(value) {
        return Err(Error::validation(format!(
            "{field} contains invalid content"
        )));
    }
    Ok(())
}

/// Rejects script-like content in the raw input, then sanitizes it with
/// [`sanitize_text`]. The check runs first because sanitizing strips the
/// angle brackets the tag patterns look for.
pub fn clean_text(field: &str, value: &str) -> Result<String> {
    check_safe(field, value)?;
    Ok(sanitize_text(value))
}

/// Validates an amount in dollars: finite and not negative.
pub fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Converts dollars to the provider's smallest currency unit, rounding to
/// the nearest cent.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Converts cents back to dollars.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_text("  <b>Jane</b> "), "bJane/b");
        assert_eq!(sanitize_phone(" +1 (555) 010-9999 ext"), "+1(555)010-9999");
        assert_eq!(sanitize_zip("90210-1234!"), "90210-1234");
        assert_eq!(sanitize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_dangerous_patterns() {
        assert!(contains_dangerous_pattern("<SCRIPT>alert(1)</script>"));
        assert!(contains_dangerous_pattern("JavaScript:void(0)"));
        assert!(contains_dangerous_pattern("x\" onclick = \"steal()"));
        assert!(contains_dangerous_pattern("onload=boom"));
        assert!(contains_dangerous_pattern("data:text/html;base64,AAAA"));
        assert!(contains_dangerous_pattern("vbscript:msgbox"));

        assert!(!contains_dangerous_pattern("123 Ontario Street"));
        assert!(!contains_dangerous_pattern("Jon = friend"));
        assert!(!contains_dangerous_pattern("Simone"));
    }

    #[test]
    fn test_clean_text_checks_raw_input() {
        assert!(matches!(
            clean_text("City", "<script>x</script>"),
            Err(Error::Validation { .. })
        ));
        assert_eq!(clean_text("City", "  <b>Lyon</b> ").ok().as_deref(), Some("bLyon/b"));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane@@example.com"));
        assert!(!is_valid_email("jane doe@example.com"));
        assert!(!is_valid_email("jane@example..com"));
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://cmk.com"));
        assert!(is_valid_url("http://localhost:3000/shop"));
        assert!(!is_valid_url("ftp://cmk.com"));
        assert!(!is_valid_url("cmk.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_length_checks() {
        assert!(check_length("Name", "Al", 2, 50).is_ok());
        assert!(check_length("Name", "A", 2, 50).is_err());
        assert!(check_length("Name", &"x".repeat(51), 2, 50).is_err());
        // Counted in characters, not bytes
        assert!(check_length("Name", "éé", 2, 2).is_ok());
    }

    #[test]
    fn test_cents_conversion_rounds() {
        assert_eq!(to_cents(19.99), 1999);
        assert_eq!(to_cents(0.1 + 0.2), 30);
        assert_eq!(to_cents(10.0), 1000);
        assert_eq!(from_cents(1999), 19.99);
    }

    #[test]
    fn test_check_amount() {
        assert!(check_amount(0.0).is_ok());
        assert!(check_amount(-0.01).is_err());
        assert!(check_amount(f64::NAN).is_err());
        assert!(check_amount(f64::INFINITY).is_err());
    }
}
