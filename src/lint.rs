use crate::config::{DEFAULT_CLASS_HELPERS, Severity};
use crate::rule::{Diagnostic, Rule, Span};
use crate::scanner::extract_fragments;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on re-analysis rounds when fixing one file.
pub const MAX_FIX_PASSES: usize = 10;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// 1-based line and column of a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn of(text: &str, offset: usize) -> Self {
        let before = &text[..offset.min(text.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        Self {
            line,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDiagnostic {
    pub location: Location,
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintedFile {
    pub path: PathBuf,
    pub diagnostics: Vec<LocatedDiagnostic>,
    /// Fix passes written back to disk.
    pub fix_passes: usize,
}

impl LintedFile {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|item| !item.diagnostic.is_advisory())
            .filter(|item| item.diagnostic.severity == Severity::Error)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSource {
    pub text: String,
    pub passes: usize,
}

fn helper_names(rule: &Rule<'_>) -> Vec<String> {
    DEFAULT_CLASS_HELPERS
        .iter()
        .map(|name| name.to_string())
        .chain(rule.options().custom_prefixes.iter().cloned())
        .collect()
}

/// Runs the rule over every fragment of a source text.
pub fn lint_source(text: &str, ext: Option<&str>, rule: &Rule<'_>) -> Vec<Diagnostic> {
    let fragments = extract_fragments(text, ext, &helper_names(rule));
    debug!(fragments = fragments.len(), "extracted class fragments");

    let mut diagnostics = Vec::new();
    for fragment in &fragments {
        rule.check(fragment, |diagnostic| diagnostics.push(diagnostic));
    }
    diagnostics
}

/// Applies the fixes attached to `diagnostics`, skipping any that overlap an
/// earlier one. Returns `None` when nothing was applied.
pub fn apply_fixes(text: &str, diagnostics: &[Diagnostic]) -> Option<String> {
    let mut edits: Vec<(Span, &str)> = diagnostics
        .iter()
        .filter_map(|diagnostic| diagnostic.fix.as_deref().map(|fix| (diagnostic.span, fix)))
        .collect();
    if edits.is_empty() {
        return None;
    }
    edits.sort_by_key(|(span, _)| *span);

    let mut accepted: Vec<(Span, &str)> = Vec::new();
    for (span, fix) in edits {
        if accepted.last().is_some_and(|(last, _)| last.overlaps(&span)) {
            continue;
        }
        if span.end > text.len() || !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
            continue;
        }
        accepted.push((span, fix));
    }

    let mut out = text.to_string();
    for (span, fix) in accepted.iter().rev() {
        out.replace_range(span.start..span.end, fix);
    }
    Some(out)
}

/// Applies fixes and re-analyzes until no fix is left or the text stops
/// changing.
pub fn fix_source(text: &str, ext: Option<&str>, rule: &Rule<'_>) -> FixedSource {
    let mut current = text.to_string();
    let mut passes = 0;

    while passes < MAX_FIX_PASSES {
        let diagnostics = lint_source(&current, ext, rule);
        let Some(next) = apply_fixes(&current, &diagnostics) else {
            break;
        };
        if next == current {
            break;
        }
        current = next;
        passes += 1;
    }

    debug!(passes, "fix passes applied");
    FixedSource {
        text: current,
        passes,
    }
}

/// Lints one file, rewriting it first when `fix` is set.
pub fn lint_file(path: &Path, rule: &Rule<'_>, fix: bool) -> Result<LintedFile, LintError> {
    let text = fs::read_to_string(path).map_err(|source| LintError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());

    let mut fix_passes = 0;
    let text = if fix {
        let fixed = fix_source(&text, ext.as_deref(), rule);
        if fixed.passes > 0 {
            fs::write(path, &fixed.text).map_err(|source| LintError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), passes = fixed.passes, "applied fixes");
        }
        fix_passes = fixed.passes;
        fixed.text
    } else {
        text
    };

    let diagnostics = lint_source(&text, ext.as_deref(), rule)
        .into_iter()
        .map(|diagnostic| LocatedDiagnostic {
            location: Location::of(&text, diagnostic.span.start),
            diagnostic,
        })
        .collect();

    Ok(LintedFile {
        path: path.to_path_buf(),
        diagnostics,
        fix_passes,
    })
}
