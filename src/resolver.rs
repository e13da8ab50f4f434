use crate::mapping::{MappingTable, is_color_value, needs_pair};
use crate::tokenizer::{ClassToken, build_dark_class};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    Mismatched,
}

/// A light class without an acceptable dark counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Base class of the light token, e.g. `text-neutral-900`.
    pub class_name: String,
    /// Full dark class that should be present, e.g. `dark:text-neutral-100`.
    pub expected: String,
    /// Full text of the dark class found instead, for mismatches.
    pub actual: Option<String>,
    pub kind: ViolationKind,
}

/// Finds light classes that lack a matching `dark:` variant.
///
/// Pairing is keyed by property. Every light color class claims at most one
/// dark class of the same property, preferring the one that already carries
/// the expected value, and a claimed dark class cannot satisfy another light
/// class. A dark class carrying the exact expected value always matches, even
/// when a custom mapping points outside the palette (`dark:bg-surface`).
/// Otherwise only dark classes with a color value take part, so `dark:text-lg`
/// is never treated as the counterpart of `text-white`.
pub fn resolve(
    tokens: &[ClassToken],
    properties: &[String],
    table: &MappingTable,
    overrides: &BTreeMap<String, String>,
) -> Vec<Violation> {
    let tracked: Vec<&ClassToken> = tokens
        .iter()
        .filter(|token| properties.iter().any(|property| *property == token.property))
        .collect();

    let darks: Vec<&ClassToken> = tracked
        .iter()
        .copied()
        .filter(|token| token.is_dark() && token.value.is_some())
        .collect();
    let mut claimed = vec![false; darks.len()];
    let mut violations = Vec::new();

    for light in tracked.iter().filter(|token| token.is_light()) {
        let Some(value) = light.value.as_deref() else {
            continue;
        };
        if !needs_pair(value) {
            continue;
        }

        let class_name = light.base_class();
        let expected_value = table.resolve_dark(value, overrides);
        let expected = build_dark_class(&class_name, expected_value.unwrap_or(value));

        match claim_counterpart(&darks, &mut claimed, &light.property, expected_value) {
            None => violations.push(Violation {
                class_name,
                expected,
                actual: None,
                kind: ViolationKind::Missing,
            }),
            Some(dark) => {
                let Some(expected_value) = expected_value else {
                    continue;
                };
                if dark.value.as_deref() != Some(expected_value) {
                    violations.push(Violation {
                        class_name,
                        expected,
                        actual: Some(dark.full.clone()),
                        kind: ViolationKind::Mismatched,
                    });
                }
            }
        }
    }

    trace!(
        tokens = tokens.len(),
        violations = violations.len(),
        "resolved dark mode pairs"
    );
    violations
}

fn claim_counterpart<'a>(
    darks: &[&'a ClassToken],
    claimed: &mut [bool],
    property: &str,
    expected_value: Option<&str>,
) -> Option<&'a ClassToken> {
    let available = |idx: &usize| !claimed[*idx] && darks[*idx].property == property;

    let exact = expected_value.and_then(|expected| {
        (0..darks.len())
            .filter(available)
            .find(|idx| darks[*idx].value.as_deref() == Some(expected))
    });
    let idx = exact.or_else(|| {
        (0..darks.len())
            .filter(available)
            .find(|idx| darks[*idx].value.as_deref().is_some_and(is_color_value))
    })?;

    claimed[idx] = true;
    Some(darks[idx])
}
