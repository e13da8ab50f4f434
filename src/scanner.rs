use crate::rule::{Fragment, FragmentSite, FragmentValue, Span};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const SCRIPT_EXTENSIONS: [&str; 6] = ["js", "jsx", "ts", "tsx", "mjs", "cjs"];
const MARKUP_EXTENSIONS: [&str; 5] = ["html", "htm", "vue", "svelte", "astro"];
const CLASS_ATTRIBUTES: [&str; 2] = ["className", "class"];
const DECLARATION_KEYWORDS: [&str; 3] = ["const", "let", "var"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("at least one path or glob pattern is required")]
    NoPatterns,
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to build glob set: {0}")]
    GlobSet(#[source] globset::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extractor {
    Markup,
    Script,
}

impl Extractor {
    fn for_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(ext) if MARKUP_EXTENSIONS.contains(&ext) => Extractor::Markup,
            _ => Extractor::Script,
        }
    }
}

/// Whether a file's extension is one the scanner understands.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .is_some_and(|ext| {
            SCRIPT_EXTENSIONS.contains(&ext.as_str()) || MARKUP_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Walks `base`, returning supported files that match `patterns` and none of
/// `ignore_patterns`. Gitignore rules are honoured.
pub fn collect_files(
    base: &Path,
    patterns: &[String],
    ignore_patterns: &[String],
) -> Result<Vec<PathBuf>, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError::NoPatterns);
    }

    let globset = build_globset(&expand_directories(base, patterns))?;
    let ignore_set = build_globset(&expand_directories(base, ignore_patterns))?;
    let mut paths = Vec::new();

    let mut builder = WalkBuilder::new(base);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(base).unwrap_or(path);
        if !globset.is_match(relative) && !globset.is_match(path) {
            continue;
        }
        if ignore_set.is_match(relative) || ignore_set.is_match(path) {
            continue;
        }
        if !is_supported(path) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    paths.sort();
    paths.dedup();
    debug!(files = paths.len(), "collected files");
    Ok(paths)
}

/// Turns plain directory inputs such as `src` into `src/**/*` so they match
/// the files beneath them rather than only the directory entry.
fn expand_directories(base: &Path, patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|pattern| {
            let has_meta = pattern.contains(['*', '?', '[', '{']);
            if has_meta || !base.join(pattern).is_dir() {
                return pattern.clone();
            }
            let dir = pattern.trim_end_matches(['/', '\\']);
            if dir.is_empty() || dir == "." {
                "**/*".to_string()
            } else {
                format!("{}/**/*", dir)
            }
        })
        .collect()
}

pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(ScanError::GlobSet)
}

/// Finds every class-list candidate in a source file.
///
/// Script files yield class attributes, `.className` assignments, variable
/// initialisers and string arguments of `helpers` calls. Markup files only
/// yield class attributes. Fragments are ordered by position and never
/// reported twice for the same literal.
pub fn extract_fragments(text: &str, ext: Option<&str>, helpers: &[String]) -> Vec<Fragment> {
    let mut by_start = BTreeMap::new();
    let mut keep = |fragment: Fragment| {
        by_start.entry(fragment.span.start).or_insert(fragment);
    };

    extract_class_attributes(text, &mut keep);
    if Extractor::for_extension(ext) == Extractor::Script {
        extract_member_assignments(text, &mut keep);
        extract_variable_inits(text, &mut keep);
        extract_helper_calls(text, helpers, &mut keep);
    }

    by_start.into_values().collect()
}

fn extract_class_attributes(text: &str, keep: &mut impl FnMut(Fragment)) {
    for attr in CLASS_ATTRIBUTES {
        for (idx, _) in text.match_indices(attr) {
            if !is_attr_boundary(text, idx, attr.len()) {
                continue;
            }
            let mut pos = skip_whitespace(text, idx + attr.len());
            if !text[pos..].starts_with('=') || text[pos..].starts_with("==") {
                continue;
            }
            pos = skip_whitespace(text, pos + 1);

            let site = FragmentSite::Attribute {
                name: attr.to_string(),
            };
            match next_char(text, pos) {
                Some(('"' | '\'', _)) => {
                    if let Some((value, end)) = parse_literal(text, pos) {
                        keep(Fragment {
                            site,
                            value,
                            span: Span::new(pos, end),
                        });
                    }
                }
                Some(('{', size)) => {
                    let inner = skip_whitespace(text, pos + size);
                    if let Some((value, end)) = parse_literal(text, inner) {
                        let close = skip_whitespace(text, end);
                        if text[close..].starts_with('}') {
                            keep(Fragment {
                                site,
                                value,
                                span: Span::new(inner, end),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn extract_member_assignments(text: &str, keep: &mut impl FnMut(Fragment)) {
    const MEMBER: &str = ".className";

    for (idx, _) in text.match_indices(MEMBER) {
        let end = idx + MEMBER.len();
        if text[end..].chars().next().is_some_and(is_identifier_char) {
            continue;
        }
        let pos = skip_whitespace(text, end);
        let Some(value_start) = assignment_value_start(text, pos) else {
            continue;
        };
        if !matches!(next_char(text, value_start), Some(('"' | '\'', _))) {
            continue;
        }
        if let Some((value, end)) = parse_literal(text, value_start) {
            keep(Fragment {
                site: FragmentSite::MemberAssignment {
                    property: MEMBER[1..].to_string(),
                },
                value,
                span: Span::new(value_start, end),
            });
        }
    }
}

fn extract_variable_inits(text: &str, keep: &mut impl FnMut(Fragment)) {
    for keyword in DECLARATION_KEYWORDS {
        for (idx, _) in text.match_indices(keyword) {
            if !is_identifier_boundary(text, idx, keyword.len()) {
                continue;
            }
            let after_keyword = idx + keyword.len();
            let name_start = skip_whitespace(text, after_keyword);
            if name_start == after_keyword {
                continue;
            }
            let name_end = skip_identifier(text, name_start);
            if name_end == name_start {
                continue;
            }
            let pos = skip_whitespace(text, name_end);
            let Some(value_start) = assignment_value_start(text, pos) else {
                continue;
            };
            if let Some((value, end)) = parse_literal(text, value_start) {
                keep(Fragment {
                    site: FragmentSite::VariableInit,
                    value,
                    span: Span::new(value_start, end),
                });
            }
        }
    }
}

fn extract_helper_calls(text: &str, helpers: &[String], keep: &mut impl FnMut(Fragment)) {
    for helper in helpers {
        if helper.is_empty() {
            continue;
        }
        for (idx, _) in text.match_indices(helper.as_str()) {
            if !is_identifier_boundary(text, idx, helper.len()) {
                continue;
            }
            let pos = skip_whitespace(text, idx + helper.len());
            if !text[pos..].starts_with('(') {
                continue;
            }
            extract_call_arguments(text, pos + 1, helper, keep);
        }
    }
}

/// Walks top-level arguments starting after the opening parenthesis and
/// keeps the ones that are a single string or template literal.
fn extract_call_arguments(text: &str, mut pos: usize, callee: &str, keep: &mut impl FnMut(Fragment)) {
    while pos < text.len() {
        pos = skip_whitespace(text, pos);
        if let Some((value, end)) = parse_literal(text, pos) {
            let after = skip_whitespace(text, end);
            if text[after..].starts_with(',') || text[after..].starts_with(')') {
                keep(Fragment {
                    site: FragmentSite::CallArgument {
                        callee: callee.to_string(),
                    },
                    value,
                    span: Span::new(pos, end),
                });
            }
        }

        pos = skip_argument(text, pos);
        match next_char(text, pos) {
            Some((',', size)) => pos += size,
            _ => break,
        }
    }
}

/// Returns the position of the `,` or `)` that ends the argument at `idx`.
fn skip_argument(text: &str, mut idx: usize) -> usize {
    let mut depth: usize = 0;
    while idx < text.len() {
        let Some((ch, size)) = next_char(text, idx) else {
            break;
        };
        match ch {
            '"' | '\'' | '`' => {
                idx = parse_literal(text, idx).map_or(text.len(), |(_, end)| end);
                continue;
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth == 0 => return idx,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => return idx,
            _ => {}
        }
        idx += size;
    }
    idx
}

/// Position of the value after a single `=`, rejecting `==` and `=>`.
fn assignment_value_start(text: &str, pos: usize) -> Option<usize> {
    let rest = &text[pos..];
    if !rest.starts_with('=') || rest.starts_with("==") || rest.starts_with("=>") {
        return None;
    }
    Some(skip_whitespace(text, pos + 1))
}

fn parse_literal(text: &str, idx: usize) -> Option<(FragmentValue, usize)> {
    let (ch, size) = next_char(text, idx)?;
    match ch {
        '"' | '\'' => parse_quoted_literal(text, idx + size, ch),
        '`' => parse_template_literal(text, idx + size),
        _ => None,
    }
}

fn parse_quoted_literal(text: &str, mut idx: usize, quote: char) -> Option<(FragmentValue, usize)> {
    let start = idx;
    while idx < text.len() {
        let (ch, size) = next_char(text, idx)?;
        if ch == '\\' {
            idx += size;
            if let Some((_, escaped)) = next_char(text, idx) {
                idx += escaped;
            }
            continue;
        }
        if ch == quote {
            let value = FragmentValue::Literal {
                text: text[start..idx].to_string(),
                quote,
            };
            return Some((value, idx + size));
        }
        idx += size;
    }
    None
}

fn parse_template_literal(text: &str, mut idx: usize) -> Option<(FragmentValue, usize)> {
    let mut quasis = Vec::new();
    let mut segment_start = idx;

    while idx < text.len() {
        let (ch, size) = next_char(text, idx)?;
        match ch {
            '\\' => {
                idx += size;
                if let Some((_, escaped)) = next_char(text, idx) {
                    idx += escaped;
                }
            }
            '`' => {
                quasis.push(text[segment_start..idx].to_string());
                return Some((FragmentValue::Template { quasis }, idx + size));
            }
            '$' if text[idx + size..].starts_with('{') => {
                quasis.push(text[segment_start..idx].to_string());
                idx = skip_braced_expression(text, idx + size + 1);
                segment_start = idx;
            }
            _ => idx += size,
        }
    }
    None
}

fn skip_braced_expression(text: &str, mut idx: usize) -> usize {
    let mut depth = 1;
    while idx < text.len() && depth > 0 {
        let Some((ch, size)) = next_char(text, idx) else {
            break;
        };
        match ch {
            '"' | '\'' | '`' => {
                idx = parse_literal(text, idx).map_or(text.len(), |(_, end)| end);
                continue;
            }
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        idx += size;
    }
    idx
}

fn is_attr_boundary(text: &str, idx: usize, len: usize) -> bool {
    let prev = text[..idx].chars().last();
    let next = text[idx + len..].chars().next();

    let prev_ok = prev.is_none_or(is_boundary_char);
    let next_ok = next.is_none_or(|c| is_boundary_char(c) || c == '=');

    prev_ok && next_ok
}

fn is_identifier_boundary(text: &str, idx: usize, len: usize) -> bool {
    let prev = text[..idx].chars().last();
    let next = text[idx + len..].chars().next();

    let prev_ok = prev.is_none_or(|c| !is_identifier_char(c) && c != '.');
    let next_ok = next.is_none_or(|c| !is_identifier_char(c));

    prev_ok && next_ok
}

fn is_boundary_char(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn skip_identifier(text: &str, mut idx: usize) -> usize {
    while let Some((ch, size)) = next_char(text, idx) {
        if !is_identifier_char(ch) {
            break;
        }
        idx += size;
    }
    idx
}

fn skip_whitespace(text: &str, mut idx: usize) -> usize {
    while let Some((ch, size)) = next_char(text, idx) {
        if !ch.is_whitespace() {
            break;
        }
        idx += size;
    }
    idx
}

fn next_char(text: &str, idx: usize) -> Option<(char, usize)> {
    text.get(idx..)?.chars().next().map(|ch| (ch, ch.len_utf8()))
}
