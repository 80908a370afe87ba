/// Panel count used when the compose form leaves it blank.
pub(crate) const DEFAULT_CUTS: u32 = 4;
pub(crate) const MAX_CUTS: u32 = 8;

/// Characters of diary text shown on a list card before the ellipsis.
pub(crate) const PREVIEW_CHARS: usize = 30;

/// Input problems caught before any request is sent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ValidationError {
    #[error("Please write your diary entry first.")]
    EmptyDiary,
    #[error("Please log in again.")]
    NotLoggedIn,
    #[error("Panel count must be a whole number from 1 to {max}.")]
    CutsCount { max: u32 },
    #[error("Please fill in every field.")]
    MissingFields,
    #[error("Passwords do not match.")]
    PasswordMismatch,
}

pub(crate) fn parse_cuts_count(raw: &str) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_CUTS);
    }

    match raw.parse::<u32>() {
        Ok(n) if (1..=MAX_CUTS).contains(&n) => Ok(n),
        _ => Err(ValidationError::CutsCount { max: MAX_CUTS }),
    }
}

pub(crate) fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

pub(crate) fn validate_signup(
    nickname: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if nickname.trim().is_empty()
        || email.trim().is_empty()
        || password.is_empty()
        || confirm_password.is_empty()
    {
        return Err(ValidationError::MissingFields);
    }

    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }

    Ok(())
}

/// Truncate on character boundaries (diary text is often Hangul).
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Backend timestamps look like `2025-11-18T09:12:00`; show only the date.
pub(crate) fn display_date(created_at: Option<&str>) -> String {
    let Some(raw) = created_at.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    let date = raw.split(['T', ' ']).next().unwrap_or(raw);
    let mut parts = date.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d)) if y.len() == 4 => format!("{y}. {m}. {d}"),
        _ => raw.to_string(),
    }
}
