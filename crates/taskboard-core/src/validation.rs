use crate::{Error, Result};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Trims a name or title and checks it is non-empty and within bounds.
pub fn name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Empty descriptions collapse to `None`.
pub fn description(value: Option<String>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(Error::Validation(format!(
                    "description must be at most {} characters",
                    MAX_DESCRIPTION_LEN
                )));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub fn email(value: &str) -> Result<String> {
    let email = crate::user::normalize_email(value);
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(Error::Validation(format!("invalid email address: {}", value.trim())));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_trims() {
        assert_eq!(name("title", "  Ship it  ").unwrap(), "Ship it");
    }

    #[test]
    fn test_name_rejects_blank_and_long() {
        assert!(matches!(name("title", "   "), Err(Error::Validation(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(name("title", &long), Err(Error::Validation(_))));
    }

    #[test]
    fn test_blank_description_is_none() {
        assert_eq!(description(Some("   ".to_string())).unwrap(), None);
        assert_eq!(description(None).unwrap(), None);
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" Bob@Example.org").unwrap(), "bob@example.org");
        assert!(email("bob").is_err());
        assert!(email("@example.org").is_err());
        assert!(email("bob@localhost").is_err());
    }
}
