use crate::error::{QuizError, QuizResult, UsernameIssue};

pub const MIN_LEN: usize = 2;
pub const MAX_LEN: usize = 20;

/// Validate a username entry. Every problem found is reported, not just the
/// first. When `accept_underscores` is set, spaces are replaced with
/// underscores instead of being reported.
pub fn validate_username(raw: &str, accept_underscores: bool) -> QuizResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QuizError::InvalidUsername(vec![UsernameIssue::Empty]));
    }

    let mut name = trimmed.to_string();
    let mut issues = Vec::new();
    let len = name.chars().count();

    if len < MIN_LEN {
        issues.push(UsernameIssue::TooShort);
    }
    if !name.chars().any(char::is_alphabetic) {
        issues.push(UsernameIssue::NoAlphabetic);
    }
    if len > MAX_LEN {
        issues.push(UsernameIssue::TooLong {
            truncated: name.chars().take(MAX_LEN).collect(),
        });
    }
    if name.contains(' ') {
        if accept_underscores {
            name = name.replace(' ', "_");
        } else {
            issues.push(UsernameIssue::ContainsSpace {
                underscored: name.replace(' ', "_"),
            });
        }
    }

    if issues.is_empty() {
        Ok(name)
    } else {
        Err(QuizError::InvalidUsername(issues))
    }
}
