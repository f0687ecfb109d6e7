use serde::Serialize;

/// Minimum length that earns the length point
const MIN_STRONG_LENGTH: usize = 8;

/// Highest possible score, one point per criterion
pub const MAX_SCORE: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub label: &'static str,
}

impl PasswordStrength {
    /// Width of the strength meter in percent
    pub fn percent(&self) -> u8 {
        self.score * 20
    }
}

/// Score a candidate password from 0 to 5.
///
/// One point each for: at least 8 characters, an uppercase letter, a
/// lowercase letter, a digit, and any character outside `[A-Za-z0-9]`.
/// An empty password scores 0 with an empty label.
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength { score: 0, label: "" };
    }

    let checks = [
        password.chars().count() >= MIN_STRONG_LENGTH,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let score = checks.iter().filter(|passed| **passed).count() as u8;

    PasswordStrength {
        score,
        label: label_for(score),
    }
}

fn label_for(score: u8) -> &'static str {
    match score {
        0 | 1 => "Very Weak",
        2 => "Weak",
        3 => "Fair",
        4 => "Good",
        _ => "Strong",
    }
}
