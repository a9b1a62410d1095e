//! Client-side password policy.
//!
//! Runs before registration ever touches the network, so a weak password is
//! rejected with a specific reason instead of a server round-trip.

use thiserror::Error;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// The specific reason a password fails the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordIssue {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain a digit")]
    MissingDigit,
}

/// Validate a password against the policy.
///
/// # Errors
///
/// Returns the first failing [`PasswordIssue`], checked in order: length,
/// uppercase, lowercase, digit.
pub fn validate_password(password: &str) -> Result<(), PasswordIssue> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordIssue::TooShort);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordIssue::MissingUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordIssue::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordIssue::MissingDigit);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_compliant_password() {
        assert!(validate_password("Correct1Horse").is_ok());
    }

    #[test]
    fn test_rejects_short() {
        assert_eq!(validate_password("Ab1"), Err(PasswordIssue::TooShort));
    }

    #[test]
    fn test_rejects_missing_case() {
        assert_eq!(
            validate_password("lowercase1only"),
            Err(PasswordIssue::MissingUppercase)
        );
        assert_eq!(
            validate_password("UPPERCASE1ONLY"),
            Err(PasswordIssue::MissingLowercase)
        );
    }

    #[test]
    fn test_rejects_missing_digit() {
        assert_eq!(
            validate_password("NoDigitsHere"),
            Err(PasswordIssue::MissingDigit)
        );
    }
}
