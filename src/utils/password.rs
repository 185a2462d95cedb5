use serde::Serialize;

/// Characters accepted by the special-character rule.
const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Passwords rejected outright. Matching is case-insensitive and considers
/// substring containment in both directions, so "MyPassword1!" is still a hit.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "password123",
    "admin",
    "qwerty",
    "letmein",
    "welcome",
    "monkey",
    "1234567890",
    "abc123",
    "password1",
    "12345678",
    "welcome123",
    "admin123",
    "root",
    "toor",
    "pass",
    "test",
    "guest",
    "user",
    "login",
    "master",
    "secret",
    "default",
    "changeme",
    "1234",
    "12345",
    "1234567",
    "123456789",
    "belgiumcampus",
    "student",
    "campus",
];

/// Outcome of evaluating a candidate password against the platform policy.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub feedback: Vec<String>,
    pub is_valid: bool,
    pub requirements: PasswordRequirements,
    /// Display label for the strength meter.
    pub label: &'static str,
    /// Display color for the strength meter.
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PasswordRequirements {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub number: bool,
    pub special_char: bool,
    pub no_common_words: bool,
}

impl PasswordRequirements {
    fn all_met(&self) -> bool {
        self.length
            && self.uppercase
            && self.lowercase
            && self.number
            && self.special_char
            && self.no_common_words
    }
}

/// Score a candidate password: one point per satisfied rule, a feedback line
/// per unmet rule. Pure; recomputed on every input change and never persisted.
pub fn evaluate(password: &str) -> PasswordStrength {
    let requirements = PasswordRequirements {
        length: password.chars().count() >= 8,
        uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
        lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
        number: password.chars().any(|c| c.is_ascii_digit()),
        special_char: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
        no_common_words: !is_common_password(password),
    };

    let mut score = 0;
    let mut feedback = Vec::new();

    let mut apply = |met: bool, message: &str| {
        if met {
            score += 1;
        } else {
            feedback.push(message.to_string());
        }
    };

    apply(requirements.length, "At least 8 characters");
    apply(requirements.uppercase, "At least one uppercase letter");
    apply(requirements.lowercase, "At least one lowercase letter");
    apply(requirements.number, "At least one number");
    apply(requirements.special_char, "At least one special character");
    apply(requirements.no_common_words, "Avoid common passwords");

    PasswordStrength {
        score,
        feedback,
        is_valid: requirements.all_met(),
        requirements,
        label: strength_label(score),
        color: strength_color(score),
    }
}

fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS
        .iter()
        .any(|common| lowered.contains(common) || common.contains(lowered.as_str()))
}

/// Display label for a score, shown next to the strength meter.
pub fn strength_label(score: u8) -> &'static str {
    match score {
        0..=2 => "Very Weak",
        3 => "Weak",
        4 => "Fair",
        5 => "Good",
        _ => "Strong",
    }
}

/// Display color for a score, matching the strength meter palette.
pub fn strength_color(score: u8) -> &'static str {
    match score {
        0..=2 => "#f44336",
        3 => "#ff9800",
        4 => "#ffc107",
        5 => "#4caf50",
        _ => "#2e7d32",
    }
}
