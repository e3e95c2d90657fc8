use std::collections::HashMap;

use crate::config::PasswordPolicy;
use crate::error::AppError;

/// One lowercase password per line.
const COMMON_PASSWORDS: &str = include_str!("common-passwords.txt");

fn is_common(password: &str) -> bool {
    let lowered = password.trim().to_lowercase();
    COMMON_PASSWORDS.lines().any(|line| line.trim() == lowered)
}

/// Upper bound on the similarity of two strings, computed from their
/// character multisets alone.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_insert(0) += 1;
    }
    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }
    2.0 * matches as f64 / total as f64
}

fn too_similar(password: &str, attribute: &str, max_similarity: f64) -> bool {
    let password = password.to_lowercase();
    let attribute = attribute.to_lowercase();
    let mut parts: Vec<&str> = attribute
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .collect();
    parts.push(&attribute);
    parts
        .into_iter()
        .any(|part| quick_ratio(&password, part) >= max_similarity)
}

/// Collects every rule the password breaks and reports them together.
pub fn validate_password(password: &str, email: &str, policy: &PasswordPolicy) -> Result<(), AppError> {
    let mut problems = Vec::new();

    if !email.is_empty() && too_similar(password, email, policy.max_similarity) {
        problems.push("The password is too similar to the email address.".to_string());
    }
    if password.chars().count() < policy.min_length {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            policy.min_length
        ));
    }
    if policy.reject_common && is_common(password) {
        problems.push("This password is too common.".to_string());
    }
    if policy.reject_numeric && !password.is_empty() && password.chars().all(char::is_numeric) {
        problems.push("This password is entirely numeric.".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(problems.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problems(password: &str, email: &str) -> String {
        match validate_password(password, email, &PasswordPolicy::default()) {
            Ok(()) => String::new(),
            Err(AppError::BadRequest(msg)) => msg,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_reasonable_password() {
        assert_eq!(problems("kale-smoothie-42", "jane@example.com"), "");
    }

    #[test]
    fn rejects_short_common_and_numeric() {
        let msg = problems("123456", "jane@example.com");
        assert!(msg.contains("too short"));
        assert!(msg.contains("too common"));
        assert!(msg.contains("entirely numeric"));
    }

    #[test]
    fn rejects_password_similar_to_email() {
        let msg = problems("janedoe1", "janedoe@example.com");
        assert!(msg.contains("too similar"));
    }

    #[test]
    fn common_check_ignores_case() {
        assert!(problems("PassWord", "x@y.z").contains("too common"));
    }

    #[test]
    fn common_list_covers_more_than_the_top_few() {
        assert!(COMMON_PASSWORDS.lines().count() > 300);
        assert!(is_common("liverpool"));
        assert!(is_common("P@ssw0rd"));
        assert!(!is_common("grilled-salmon-77"));
    }

    #[test]
    fn non_ascii_digits_count_as_numeric() {
        // Arabic-Indic digits
        let msg = problems("٣٤٥٦٧٨٩٠١", "x@y.z");
        assert!(msg.contains("entirely numeric"));
        assert!(!problems("٣٤٥٦٧٨٩٠a", "x@y.z").contains("entirely numeric"));
    }

    #[test]
    fn quick_ratio_bounds() {
        assert_eq!(quick_ratio("abc", "abc"), 1.0);
        assert_eq!(quick_ratio("abc", "xyz"), 0.0);
        assert!((quick_ratio("abcd", "ab") - 2.0 * 2.0 / 6.0).abs() < f64::EPSILON);
    }
}
