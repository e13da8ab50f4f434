//! Decides which source fragments hold class lists and turns their
//! violations into diagnostics for the host.
//!
//! The host owns parsing: it hands over each candidate [`Fragment`] with the
//! syntactic site it was found in, and receives zero or more [`Diagnostic`]s
//! through a callback. Everything downstream of eligibility is deterministic.

use crate::config::{RuleOptions, Severity};
use crate::fix::{FixOutcome, synthesize};
use crate::mapping::{DEFAULT_PROPERTIES, MappingTable};
use crate::resolver::{ViolationKind, resolve};
use crate::tokenizer::tokenize;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

pub const RULE_ID: &str = "enforce-dark-mode-class-pairs";

const CLASS_ATTRIBUTES: [&str; 2] = ["className", "class"];
const CLASS_MEMBER: &str = "className";

/// Byte range of a fragment in its source, delimiters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Where a fragment appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSite {
    /// `<div className="...">`, `<div class="...">`.
    Attribute { name: String },
    /// `el.className = "..."`.
    MemberAssignment { property: String },
    /// `const cls = "..."`.
    VariableInit,
    /// `clsx("...", "...")`.
    CallArgument { callee: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentValue {
    /// Quoted string, raw text between the quotes.
    Literal { text: String, quote: char },
    /// Template literal split at its interpolations.
    Template { quasis: Vec<String> },
}

impl FragmentValue {
    pub fn interpolations(&self) -> usize {
        match self {
            FragmentValue::Literal { .. } => 0,
            FragmentValue::Template { quasis } => quasis.len().saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub site: FragmentSite,
    pub value: FragmentValue,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    MissingDarkMode,
    MismatchedDarkMode,
    DynamicExpression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub severity: Severity,
    pub class_name: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// Replacement for the whole fragment, delimiters included.
    pub fix: Option<String>,
}

impl Diagnostic {
    /// Dynamic expressions are advisory and never fail a run.
    pub fn is_advisory(&self) -> bool {
        self.kind == DiagnosticKind::DynamicExpression
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class_name = self.class_name.as_deref().unwrap_or_default();
        let expected = self.expected.as_deref().unwrap_or_default();
        match self.kind {
            DiagnosticKind::MissingDarkMode => write!(
                f,
                "Missing dark mode pair for \"{}\". Expected: \"{}\"",
                class_name, expected
            ),
            DiagnosticKind::MismatchedDarkMode => write!(
                f,
                "Mismatched dark mode value for \"{}\". Expected \"{}\" but found \"{}\"",
                class_name,
                expected,
                self.actual.as_deref().unwrap_or_default()
            ),
            DiagnosticKind::DynamicExpression => {
                f.write_str("Could not verify dark mode pairs in dynamic expression")
            }
        }
    }
}

/// The dark mode pairing rule, bound to one run's options.
#[derive(Debug, Clone, Copy)]
pub struct Rule<'a> {
    options: &'a RuleOptions,
    table: &'static MappingTable,
}

impl<'a> Rule<'a> {
    pub fn new(options: &'a RuleOptions) -> Self {
        Self {
            options,
            table: MappingTable::builtin(),
        }
    }

    pub fn options(&self) -> &RuleOptions {
        self.options
    }

    /// Analyzes a bare class list, with no fragment or delimiter attached.
    pub fn analyze(&self, class_list: &str) -> FixOutcome {
        let tokens = tokenize(class_list);
        let violations = resolve(
            &tokens,
            &self.options.properties,
            self.table,
            &self.options.mappings,
        );
        synthesize(class_list, violations, self.options.autofix)
    }

    pub fn is_eligible(&self, site: &FragmentSite) -> bool {
        match site {
            FragmentSite::Attribute { name } => CLASS_ATTRIBUTES.contains(&name.as_str()),
            FragmentSite::MemberAssignment { property } => property == CLASS_MEMBER,
            FragmentSite::VariableInit => true,
            FragmentSite::CallArgument { callee } => self.options.is_class_helper(callee),
        }
    }

    /// Checks one fragment, calling `report` once per diagnostic.
    pub fn check<F>(&self, fragment: &Fragment, mut report: F)
    where
        F: FnMut(Diagnostic),
    {
        if !self.is_eligible(&fragment.site) {
            return;
        }

        match &fragment.value {
            FragmentValue::Literal { text, quote } => {
                self.check_class_list(fragment.span, text, *quote, &mut report)
            }
            FragmentValue::Template { quasis } if quasis.len() <= 1 => {
                let text = quasis.first().map(String::as_str).unwrap_or_default();
                if text.contains("${") {
                    report(self.dynamic(fragment.span));
                    return;
                }
                self.check_class_list(fragment.span, text, '`', &mut report)
            }
            FragmentValue::Template { quasis } => {
                if !self.options.dynamic_heuristic
                    || looks_like_utility_classes(quasis, &self.options.properties)
                {
                    report(self.dynamic(fragment.span));
                }
            }
        }
    }

    pub fn check_all(&self, fragment: &Fragment) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.check(fragment, |diagnostic| diagnostics.push(diagnostic));
        diagnostics
    }

    fn check_class_list<F>(&self, span: Span, text: &str, delimiter: char, report: &mut F)
    where
        F: FnMut(Diagnostic),
    {
        let outcome = self.analyze(text);
        if !outcome.reports.is_empty() {
            debug!(
                start = span.start,
                violations = outcome.reports.len(),
                "class list has unpaired dark mode classes"
            );
        }

        for item in outcome.reports {
            let kind = match item.violation.kind {
                ViolationKind::Missing => DiagnosticKind::MissingDarkMode,
                ViolationKind::Mismatched => DiagnosticKind::MismatchedDarkMode,
            };
            report(Diagnostic {
                kind,
                span,
                severity: self.options.severity,
                class_name: Some(item.violation.class_name),
                expected: Some(item.violation.expected),
                actual: item.violation.actual,
                fix: item
                    .fix
                    .map(|fixed| format!("{}{}{}", delimiter, fixed, delimiter)),
            });
        }
    }

    fn dynamic(&self, span: Span) -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::DynamicExpression,
            span,
            severity: Severity::Warn,
            class_name: None,
            expected: None,
            actual: None,
            fix: None,
        }
    }
}

fn modifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?:^|\s)(?:dark|hover|focus|focus-visible|focus-within|active|visited|disabled|group-hover|peer-hover|first|last|odd|even):",
        )
        .expect("modifier pattern is valid")
    })
}

fn breakpoint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|\s)(?:sm|md|lg|xl|2xl):").expect("breakpoint pattern is valid")
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:[a-zA-Z][a-zA-Z0-9+.-]*:)?//|^\s*/[^\s]*$|[?&][\w.-]+=")
            .expect("url pattern is valid")
    })
}

/// Whether the static text of an interpolated template looks like a utility
/// class list rather than a URL, query string or prose.
pub fn looks_like_utility_classes(quasis: &[String], properties: &[String]) -> bool {
    let text = quasis.join(" ");
    if url_pattern().is_match(&text) {
        return false;
    }

    let has_property_prefix = text.split_whitespace().any(|word| {
        DEFAULT_PROPERTIES
            .iter()
            .copied()
            .chain(properties.iter().map(String::as_str))
            .any(|property| {
                word.strip_prefix(property)
                    .is_some_and(|rest| rest.starts_with('-'))
            })
    });

    has_property_prefix || modifier_pattern().is_match(&text) || breakpoint_pattern().is_match(&text)
}

#[cfg(test)]
mod tests {
    use super::{
        Diagnostic, DiagnosticKind, Fragment, FragmentSite, FragmentValue, Rule, Span,
        looks_like_utility_classes,
    };
    use crate::config::{Preset, RuleOptions, Severity};
    use std::collections::BTreeMap;

    fn attribute(text: &str) -> Fragment {
        Fragment {
            site: FragmentSite::Attribute {
                name: "className".to_string(),
            },
            value: FragmentValue::Literal {
                text: text.to_string(),
                quote: '"',
            },
            span: Span::new(0, text.len() + 2),
        }
    }

    fn template(site: FragmentSite, quasis: &[&str]) -> Fragment {
        Fragment {
            site,
            value: FragmentValue::Template {
                quasis: quasis.iter().map(|q| q.to_string()).collect(),
            },
            span: Span::new(0, 10),
        }
    }

    fn quasis(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn reports_missing_pair_with_quoted_fix() {
        let options = RuleOptions::default();
        let diagnostics = Rule::new(&options).check_all(&attribute("text-neutral-900"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingDarkMode);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(
            diagnostics[0].fix.as_deref(),
            Some("\"text-neutral-900 dark:text-neutral-100\"")
        );
        assert_eq!(
            diagnostics[0].to_string(),
            "Missing dark mode pair for \"text-neutral-900\". Expected: \"dark:text-neutral-100\""
        );
    }

    #[test]
    fn mismatch_message_names_actual_class() {
        let options = RuleOptions::default();
        let diagnostics =
            Rule::new(&options).check_all(&attribute("text-neutral-900 dark:text-neutral-200"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].to_string(),
            "Mismatched dark mode value for \"text-neutral-900\". Expected \"dark:text-neutral-100\" but found \"dark:text-neutral-200\""
        );
        assert_eq!(
            diagnostics[0].fix.as_deref(),
            Some("\"text-neutral-900 dark:text-neutral-100\"")
        );
    }

    #[test]
    fn custom_mapping_changes_expected_class() {
        let options = RuleOptions {
            mappings: BTreeMap::from([("red-500".to_string(), "red-700".to_string())]),
            ..RuleOptions::default()
        };
        let diagnostics = Rule::new(&options).check_all(&attribute("bg-red-500"));
        assert_eq!(diagnostics[0].expected.as_deref(), Some("dark:bg-red-700"));
        assert_eq!(
            diagnostics[0].fix.as_deref(),
            Some("\"bg-red-500 dark:bg-red-700\"")
        );
    }

    #[test]
    fn single_fix_per_fragment() {
        let options = RuleOptions::default();
        let diagnostics =
            Rule::new(&options).check_all(&attribute("text-neutral-900 bg-white border-zinc-300"));
        assert_eq!(diagnostics.len(), 3);
        let with_fix: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.fix.is_some()).collect();
        assert_eq!(with_fix.len(), 1);
        assert_eq!(
            with_fix[0].fix.as_deref(),
            Some("\"text-neutral-900 bg-white border-zinc-300 dark:text-neutral-100 dark:bg-black dark:border-zinc-700\"")
        );
    }

    #[test]
    fn autofix_off_reports_without_fix() {
        let options = RuleOptions {
            autofix: false,
            severity: Severity::Warn,
            ..RuleOptions::default()
        };
        let diagnostics = Rule::new(&options).check_all(&attribute("bg-white"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].fix, None);
        assert_eq!(diagnostics[0].severity, Severity::Warn);
    }

    #[test]
    fn plain_template_is_checked_and_rewrapped() {
        let options = RuleOptions::default();
        let diagnostics = Rule::new(&options).check_all(&template(
            FragmentSite::VariableInit,
            &["text-neutral-900"],
        ));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].fix.as_deref(),
            Some("`text-neutral-900 dark:text-neutral-100`")
        );
    }

    #[test]
    fn interpolated_template_is_dynamic_under_any_properties() {
        for options in [
            RuleOptions::default(),
            RuleOptions {
                properties: vec!["bg".to_string()],
                ..RuleOptions::default()
            },
        ] {
            let diagnostics = Rule::new(&options).check_all(&template(
                FragmentSite::VariableInit,
                &["text-neutral-", ""],
            ));
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::DynamicExpression);
            assert_eq!(diagnostics[0].fix, None);
            assert!(diagnostics[0].is_advisory());
        }
    }

    #[test]
    fn escaped_interpolation_is_dynamic() {
        let options = RuleOptions::default();
        let diagnostics = Rule::new(&options).check_all(&template(
            FragmentSite::VariableInit,
            &["text-neutral-${shade}"],
        ));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DynamicExpression);
    }

    #[test]
    fn heuristic_suppresses_unrelated_dynamic_strings() {
        let options = RuleOptions {
            dynamic_heuristic: true,
            ..RuleOptions::default()
        };
        let rule = Rule::new(&options);
        let url = template(FragmentSite::VariableInit, &["https://example.com/", ""]);
        assert!(rule.check_all(&url).is_empty());
        let prose = template(FragmentSite::VariableInit, &["Hello ", "!"]);
        assert!(rule.check_all(&prose).is_empty());
        let classes = template(FragmentSite::VariableInit, &["text-neutral-", ""]);
        assert_eq!(rule.check_all(&classes).len(), 1);
    }

    #[test]
    fn heuristic_patterns() {
        let properties = RuleOptions::default().properties;
        assert!(looks_like_utility_classes(&quasis(&["bg-", " p-4"]), &properties));
        assert!(looks_like_utility_classes(&quasis(&["p-4 hover:", ""]), &properties));
        assert!(looks_like_utility_classes(&quasis(&["md:", ""]), &properties));
        assert!(!looks_like_utility_classes(&quasis(&["/users/", "/edit"]), &properties));
        assert!(!looks_like_utility_classes(&quasis(&["?page=", "&sort=asc"]), &properties));
        assert!(!looks_like_utility_classes(&quasis(&["Loading ", " items"]), &properties));
        assert!(looks_like_utility_classes(
            &quasis(&["tint-", ""]),
            &["tint".to_string()]
        ));
    }

    #[test]
    fn eligibility_follows_site() {
        let options = RuleOptions {
            custom_prefixes: vec!["tw".to_string()],
            ..RuleOptions::default()
        };
        let rule = Rule::new(&options);
        let literal = FragmentValue::Literal {
            text: "bg-white".to_string(),
            quote: '\'',
        };
        let fragment = |site: FragmentSite| Fragment {
            site,
            value: literal.clone(),
            span: Span::new(0, 10),
        };

        for callee in ["clsx", "classnames", "cn", "tw"] {
            let diagnostics = rule.check_all(&fragment(FragmentSite::CallArgument {
                callee: callee.to_string(),
            }));
            assert_eq!(diagnostics.len(), 1, "{}", callee);
            assert_eq!(diagnostics[0].fix.as_deref(), Some("'bg-white dark:bg-black'"));
        }
        assert!(rule
            .check_all(&fragment(FragmentSite::CallArgument {
                callee: "translate".to_string()
            }))
            .is_empty());
        assert!(rule
            .check_all(&fragment(FragmentSite::Attribute {
                name: "title".to_string()
            }))
            .is_empty());
        assert_eq!(
            rule.check_all(&fragment(FragmentSite::MemberAssignment {
                property: "className".to_string()
            }))
            .len(),
            1
        );
        assert!(rule
            .check_all(&fragment(FragmentSite::MemberAssignment {
                property: "id".to_string()
            }))
            .is_empty());
    }

    #[test]
    fn corrected_string_is_idempotent() {
        for preset in [Preset::Recommended, Preset::Strict] {
            let options = RuleOptions::preset(preset);
            let rule = Rule::new(&options);
            let first = rule.analyze("text-neutral-900 bg-white border-gray-200 dark:border-gray-700");
            assert!(!first.reports.is_empty());
            let second = rule.analyze(&first.corrected);
            assert!(second.reports.is_empty(), "{}", first.corrected);
        }
    }

    #[test]
    fn ignores_class_lists_without_tracked_properties() {
        let options = RuleOptions::default();
        assert!(Rule::new(&options)
            .check_all(&attribute("flex items-center justify-between"))
            .is_empty());
    }
}
