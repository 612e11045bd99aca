use std::fmt;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use uuid::Uuid;

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 50_000;

pub const DISPLAY_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

/// Parse a raw path token into a post identifier.
///
/// Tokens that are not valid identifiers are indistinguishable from unknown
/// posts for callers, so this returns `None` instead of an error.
pub fn parse_post_id(token: &str) -> Option<Uuid> {
    Uuid::parse_str(token).ok()
}

pub fn format_display_time(value: OffsetDateTime) -> String {
    value
        .to_offset(time::UtcOffset::UTC)
        .format(DISPLAY_TIME_FORMAT)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// User-submitted post fields, prior to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Title,
    Content,
}

impl PostField {
    pub fn as_str(self) -> &'static str {
        match self {
            PostField::Title => "title",
            PostField::Content => "content",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Max(usize),
    /// U+0000 cannot be stored in a text column.
    NulCharacter,
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Required => f.write_str("required"),
            FieldRule::Max(limit) => write!(f, "max {limit}"),
            FieldRule::NulCharacter => f.write_str("must not contain NUL characters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: PostField,
    pub rule: FieldRule,
}

/// Every constraint a draft failed, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostValidationError {
    violations: Vec<FieldViolation>,
}

impl PostValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

impl fmt::Display for PostValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation errors:")?;
        for violation in &self.violations {
            writeln!(
                f,
                "invalid '{}' value: {}",
                violation.field.as_str(),
                violation.rule
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for PostValidationError {}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), PostValidationError> {
        let mut violations = Vec::new();
        check_field(&mut violations, PostField::Title, &self.title, TITLE_MAX_CHARS);
        check_field(
            &mut violations,
            PostField::Content,
            &self.content,
            CONTENT_MAX_CHARS,
        );

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PostValidationError { violations })
        }
    }
}

fn check_field(violations: &mut Vec<FieldViolation>, field: PostField, value: &str, max: usize) {
    if value.is_empty() {
        violations.push(FieldViolation {
            field,
            rule: FieldRule::Required,
        });
    } else if value.chars().count() > max {
        violations.push(FieldViolation {
            field,
            rule: FieldRule::Max(max),
        });
    } else if value.contains('\0') {
        violations.push(FieldViolation {
            field,
            rule: FieldRule::NulCharacter,
        });
    }
}
