use crate::resolver::{Violation, ViolationKind};

/// A violation as reported to the host, with the combined fix when it owns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    pub violation: Violation,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub corrected: String,
    pub reports: Vec<ViolationReport>,
}

/// Applies every violation of one class list to a single corrected string.
///
/// Missing pairs are appended in violation order and mismatched ones replace
/// the first whitespace-delimited occurrence of the offending class. Only the first report carries
/// the corrected string: hosts apply one edit per literal and re-run, so a
/// second edit on the same literal would conflict.
pub fn synthesize(original: &str, violations: Vec<Violation>, autofix: bool) -> FixOutcome {
    let mut corrected = original.to_string();

    for violation in &violations {
        match violation.kind {
            ViolationKind::Missing => {
                corrected.push(' ');
                corrected.push_str(&violation.expected);
            }
            ViolationKind::Mismatched => {
                if let Some(actual) = &violation.actual {
                    corrected = replace_class(&corrected, actual, &violation.expected);
                }
            }
        }
    }

    let reports = violations
        .into_iter()
        .enumerate()
        .map(|(idx, violation)| ViolationReport {
            violation,
            fix: (autofix && idx == 0).then(|| corrected.clone()),
        })
        .collect();

    FixOutcome { corrected, reports }
}

/// Replaces the first whole class equal to `from`, so `dark:bg-white` never
/// rewrites part of `dark:bg-white/50`. Falls back to the first substring
/// match when the class is glued to a comment.
fn replace_class(list: &str, from: &str, to: &str) -> String {
    let whole = list.match_indices(from).map(|(idx, _)| idx).find(|idx| {
        let before = list[..*idx].chars().next_back();
        let after = list[idx + from.len()..].chars().next();
        before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
    });
    match whole {
        Some(idx) => {
            let mut out = list.to_string();
            out.replace_range(idx..idx + from.len(), to);
            out
        }
        None => list.replacen(from, to, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::synthesize;
    use crate::resolver::{Violation, ViolationKind};

    fn missing(class_name: &str, expected: &str) -> Violation {
        Violation {
            class_name: class_name.to_string(),
            expected: expected.to_string(),
            actual: None,
            kind: ViolationKind::Missing,
        }
    }

    #[test]
    fn appends_missing_classes_in_order() {
        let outcome = synthesize(
            "text-neutral-900 bg-white",
            vec![
                missing("text-neutral-900", "dark:text-neutral-100"),
                missing("bg-white", "dark:bg-black"),
            ],
            true,
        );
        assert_eq!(
            outcome.corrected,
            "text-neutral-900 bg-white dark:text-neutral-100 dark:bg-black"
        );
    }

    #[test]
    fn only_first_report_carries_the_fix() {
        let outcome = synthesize(
            "text-white bg-white border-white",
            vec![
                missing("text-white", "dark:text-black"),
                missing("bg-white", "dark:bg-black"),
                missing("border-white", "dark:border-black"),
            ],
            true,
        );
        let fixes: Vec<Option<&str>> = outcome
            .reports
            .iter()
            .map(|report| report.fix.as_deref())
            .collect();
        assert_eq!(
            fixes,
            vec![
                Some("text-white bg-white border-white dark:text-black dark:bg-black dark:border-black"),
                None,
                None,
            ]
        );
    }

    #[test]
    fn replaces_mismatched_class() {
        let outcome = synthesize(
            "text-neutral-900 dark:text-neutral-200",
            vec![Violation {
                class_name: "text-neutral-900".to_string(),
                expected: "dark:text-neutral-100".to_string(),
                actual: Some("dark:text-neutral-200".to_string()),
                kind: ViolationKind::Mismatched,
            }],
            true,
        );
        assert_eq!(outcome.corrected, "text-neutral-900 dark:text-neutral-100");
        assert_eq!(
            outcome.reports[0].fix.as_deref(),
            Some("text-neutral-900 dark:text-neutral-100")
        );
    }

    #[test]
    fn mismatch_replaces_whole_class_only() {
        let outcome = synthesize(
            "bg-neutral-900 dark:bg-white/50 dark:bg-white",
            vec![Violation {
                class_name: "bg-neutral-900".to_string(),
                expected: "dark:bg-neutral-100".to_string(),
                actual: Some("dark:bg-white".to_string()),
                kind: ViolationKind::Mismatched,
            }],
            true,
        );
        assert_eq!(
            outcome.corrected,
            "bg-neutral-900 dark:bg-white/50 dark:bg-neutral-100"
        );
    }

    #[test]
    fn autofix_off_reports_without_fix() {
        let outcome = synthesize("bg-white", vec![missing("bg-white", "dark:bg-black")], false);
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].fix, None);
        assert_eq!(outcome.corrected, "bg-white dark:bg-black");
    }

    #[test]
    fn no_violations_leaves_string_untouched() {
        let outcome = synthesize("text-black dark:text-white", Vec::new(), true);
        assert_eq!(outcome.corrected, "text-black dark:text-white");
        assert!(outcome.reports.is_empty());
    }
}
