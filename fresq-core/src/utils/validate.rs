// File: fresq-core/src/utils/validate.rs
//
// Cheap synchronous checks run before any transaction is opened.

use fresq_common::error::ValidationError;
use fresq_common::models::GridConfig;
use fresq_common::models::code::{CODE_ALPHABET, CODE_LENGTH, COLOR_MAX, COLOR_MIN};

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_ADMIN_CODES_PER_CALL: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Trim + uppercase.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Normalises `raw` and checks it is a well-formed code.
pub fn validate_code(raw: &str) -> Result<String, ValidationError> {
    let code = normalize_code(raw);
    if code.is_empty() {
        return Err(ValidationError::MissingCode);
    }
    let well_formed =
        code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b));
    if !well_formed {
        return Err(ValidationError::MalformedCode(code));
    }
    Ok(code)
}

pub fn validate_coordinates(x: i32, y: i32, config: &GridConfig) -> Result<(), ValidationError> {
    if config.contains(x, y) {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds {
            x,
            y,
            width: config.grid_width,
            height: config.grid_height,
        })
    }
}

/// Colour index as stored.
pub fn validate_color(color: i32) -> Result<i16, ValidationError> {
    i16::try_from(color)
        .ok()
        .filter(|c| (COLOR_MIN..=COLOR_MAX).contains(c))
        .ok_or(ValidationError::ColorOutOfRange(color))
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~-".contains(c)
}

fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Trims, lowercases and checks a simplified RFC 5322 address.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(email.clone());

    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    let local_ok = local
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(is_local_char));
    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2 && labels.iter().all(|l| is_domain_label(l));

    if local_ok && domain_ok {
        Ok(email)
    } else {
        Err(invalid())
    }
}

pub fn validate_admin_code_count(count: i64) -> Result<usize, ValidationError> {
    if (1..=MAX_ADMIN_CODES_PER_CALL).contains(&count) {
        Ok(count as usize)
    } else {
        Err(ValidationError::InvalidCount(count))
    }
}

/// Page size for the "most recent" listings.
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fresq_common::models::Palette;

    fn grid(width: i32, height: i32) -> GridConfig {
        GridConfig {
            grid_width: width,
            grid_height: height,
            state_version: 1,
            palette: Palette::new((0..10).map(|i| format!("#11111{i}")).collect()).unwrap(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code("  abcd2345 ").unwrap(), "ABCD2345");
        assert_eq!(validate_code("   "), Err(ValidationError::MissingCode));
        assert!(matches!(validate_code("ABCD234"), Err(ValidationError::MalformedCode(_))));
        // '0' and 'O' are not in the alphabet
        assert!(matches!(validate_code("ABCD2340"), Err(ValidationError::MalformedCode(_))));
        assert!(matches!(validate_code("OBCD2345"), Err(ValidationError::MalformedCode(_))));
    }

    #[test]
    fn test_validate_coordinates_against_current_grid() {
        let cfg = grid(200, 200);
        assert!(validate_coordinates(0, 0, &cfg).is_ok());
        assert!(validate_coordinates(199, 199, &cfg).is_ok());
        assert!(validate_coordinates(200, 10, &cfg).is_err());
        assert!(validate_coordinates(10, -1, &cfg).is_err());
        // a bigger grid accepts what the old one refused
        assert!(validate_coordinates(250, 10, &grid(300, 300)).is_ok());
    }

    #[test]
    fn test_validate_color() {
        assert_eq!(validate_color(1), Ok(1));
        assert_eq!(validate_color(10), Ok(10));
        assert_eq!(validate_color(0), Err(ValidationError::ColorOutOfRange(0)));
        assert_eq!(validate_color(11), Err(ValidationError::ColorOutOfRange(11)));
        assert_eq!(validate_color(70_000), Err(ValidationError::ColorOutOfRange(70_000)));
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Jane.Doe@Example.COM ").unwrap(), "jane.doe@example.com");
        assert!(validate_email("a+tag@sub.example.org").is_ok());
        for bad in ["", "plain", "a@b", "a@@b.com", "a..b@c.com", "a@-b.com", "a b@c.com"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_admin_code_count_bounds() {
        assert_eq!(validate_admin_code_count(1), Ok(1));
        assert_eq!(validate_admin_code_count(100), Ok(100));
        assert!(validate_admin_code_count(0).is_err());
        assert!(validate_admin_code_count(101).is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-3), 1);
        assert_eq!(clamp_limit(1000), 1000);
        assert_eq!(clamp_limit(i64::MAX), MAX_LIST_LIMIT);
    }
}
