//! Input rules shared by the sign-in, sign-up and profile forms.

use thiserror::Error;

pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const NAME_MIN_LENGTH: usize = 2;
pub const PROFILE_NAME_MAX_LENGTH: usize = 15;
/// Length of the one-time codes mailed by the identity provider.
pub const OTP_LENGTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("email is required")]
    EmailRequired,

    #[error("email is not valid")]
    EmailInvalid,

    #[error("password is required")]
    PasswordRequired,

    #[error("password must be at least 6 characters")]
    PasswordTooShort,

    #[error("name is required")]
    NameRequired,

    #[error("name must be at least 2 characters")]
    NameTooShort,

    #[error("name cannot exceed 15 characters")]
    NameTooLong,

    #[error("verification code must be 8 digits")]
    InvalidOtp,
}

/// Lower-cases and trims an email so it can be used as a stable key.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accepts `local@domain.tld` with no whitespace and exactly one `@`.
///
/// # Errors
///
/// Returns `CredentialError::EmailRequired` or `CredentialError::EmailInvalid`.
pub fn validate_email(email: &str) -> Result<(), CredentialError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CredentialError::EmailRequired);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(CredentialError::EmailInvalid);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(CredentialError::EmailInvalid);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(CredentialError::EmailInvalid);
    }
    // Needs a dot with something on both sides somewhere in the domain.
    let has_dotted_domain = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !has_dotted_domain {
        return Err(CredentialError::EmailInvalid);
    }
    Ok(())
}

/// # Errors
///
/// Returns `CredentialError::PasswordRequired` or `CredentialError::PasswordTooShort`.
pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::PasswordRequired);
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(CredentialError::PasswordTooShort);
    }
    Ok(())
}

/// Name given on the sign-up form.
///
/// # Errors
///
/// Returns `CredentialError::NameRequired` or `CredentialError::NameTooShort`.
pub fn validate_sign_up_name(name: &str) -> Result<(), CredentialError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CredentialError::NameRequired);
    }
    if name.chars().count() < NAME_MIN_LENGTH {
        return Err(CredentialError::NameTooShort);
    }
    Ok(())
}

/// Validate and trim a profile display name.
///
/// # Errors
///
/// Returns `CredentialError::NameRequired` or `CredentialError::NameTooLong`.
pub fn profile_name(name: &str) -> Result<String, CredentialError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CredentialError::NameRequired);
    }
    if name.chars().count() > PROFILE_NAME_MAX_LENGTH {
        return Err(CredentialError::NameTooLong);
    }
    Ok(name.to_owned())
}

/// Clamp a name to the profile limit instead of rejecting it.
#[must_use]
pub fn truncate_profile_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.chars().take(PROFILE_NAME_MAX_LENGTH).collect())
}

/// # Errors
///
/// Returns `CredentialError::InvalidOtp` unless `code` is exactly `OTP_LENGTH` ASCII digits.
pub fn validate_otp(code: &str) -> Result<(), CredentialError> {
    let code = code.trim();
    if code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CredentialError::InvalidOtp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email(" ana@example.com ").is_ok());
        assert_eq!(validate_email(""), Err(CredentialError::EmailRequired));
        assert_eq!(validate_email("ana"), Err(CredentialError::EmailInvalid));
        assert_eq!(validate_email("ana@example"), Err(CredentialError::EmailInvalid));
        assert_eq!(validate_email("a na@example.com"), Err(CredentialError::EmailInvalid));
        assert_eq!(validate_email("@example.com"), Err(CredentialError::EmailInvalid));
        assert_eq!(validate_email("a@b@c.com"), Err(CredentialError::EmailInvalid));
        assert_eq!(validate_email("a@.com"), Err(CredentialError::EmailInvalid));
    }

    #[test]
    fn password_rules() {
        assert_eq!(validate_password(""), Err(CredentialError::PasswordRequired));
        assert_eq!(validate_password("12345"), Err(CredentialError::PasswordTooShort));
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn sign_up_name_rules() {
        assert_eq!(validate_sign_up_name("  "), Err(CredentialError::NameRequired));
        assert_eq!(validate_sign_up_name("A"), Err(CredentialError::NameTooShort));
        assert!(validate_sign_up_name("Al").is_ok());
    }

    #[test]
    fn profile_name_limits() {
        assert_eq!(profile_name(" Ana ").unwrap(), "Ana");
        assert_eq!(
            profile_name("sixteen chars!!!"),
            Err(CredentialError::NameTooLong)
        );
        assert_eq!(
            truncate_profile_name("sixteen chars!!!").as_deref(),
            Some("sixteen chars!!")
        );
        assert_eq!(truncate_profile_name("   "), None);
    }

    #[test]
    fn otp_must_be_eight_digits() {
        assert!(validate_otp("12345678").is_ok());
        assert!(validate_otp(" 12345678 ").is_ok());
        assert!(validate_otp("1234567").is_err());
        assert!(validate_otp("1234567a").is_err());
    }

    #[test]
    fn normalizes_email_keys() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
