use regex::Regex;
use std::sync::OnceLock;

/// One whitespace-delimited utility class split into its parts.
///
/// `text-neutral-900` has no modifier, property `text` and value
/// `neutral-900`. `dark:bg-white` has modifier `dark`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassToken {
    pub full: String,
    pub modifier: Option<String>,
    pub property: String,
    pub value: Option<String>,
}

impl ClassToken {
    pub fn is_dark(&self) -> bool {
        self.modifier.as_deref() == Some("dark")
    }

    /// Unconditional class, the baseline a dark variant overrides.
    pub fn is_light(&self) -> bool {
        self.modifier.is_none()
    }

    /// `property-value` without any modifier.
    pub fn base_class(&self) -> String {
        match &self.value {
            Some(value) => format!("{}-{}", self.property, value),
            None => self.property.clone(),
        }
    }
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:([^:]+):)?([a-z]+)(?:-(.+))?$").expect("class pattern is valid")
    })
}

fn block_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"))
}

fn line_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"//.*").expect("line comment pattern is valid"))
}

/// Parses a single class, returning `None` when it does not have the
/// `[modifier:]property[-value]` shape.
pub fn parse_class(class_name: &str) -> Option<ClassToken> {
    let trimmed = class_name.trim();
    if trimmed.is_empty() {
        return None;
    }

    let captures = class_pattern().captures(trimmed)?;
    let non_empty = |idx: usize| {
        captures
            .get(idx)
            .map(|m| m.as_str())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    Some(ClassToken {
        full: trimmed.to_string(),
        modifier: non_empty(1),
        property: non_empty(2)?,
        value: non_empty(3),
    })
}

/// Splits a class list into raw class strings after dropping comments and
/// collapsing whitespace.
pub fn extract_classes(input: &str) -> Vec<String> {
    let without_blocks = block_comment_pattern().replace_all(input, "");
    let cleaned = line_comment_pattern().replace_all(&without_blocks, "");

    cleaned
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Tokenizes a class list, keeping order and duplicates and silently
/// dropping anything that is not a utility class.
pub fn tokenize(class_list: &str) -> Vec<ClassToken> {
    extract_classes(class_list)
        .iter()
        .filter_map(|class| parse_class(class))
        .collect()
}

/// Builds `dark:{property}-{dark_value}` for a base class such as `bg-white`.
pub fn build_dark_class(base_class: &str, dark_value: &str) -> String {
    match parse_class(base_class) {
        Some(parsed) => format!("dark:{}-{}", parsed.property, dark_value),
        None => format!("dark:{}", base_class),
    }
}
