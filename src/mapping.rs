use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Property groups checked when no `properties` option is given.
pub const DEFAULT_PROPERTIES: [&str; 12] = [
    "text",
    "bg",
    "border",
    "outline",
    "divide",
    "ring",
    "shadow",
    "decoration",
    "accent",
    "caret",
    "fill",
    "stroke",
];

/// Color families whose `{family}-{shade}` values require a dark variant.
pub const COLOR_FAMILIES: [&str; 22] = [
    "neutral", "slate", "gray", "zinc", "stone", "red", "orange", "amber", "yellow", "lime",
    "green", "emerald", "teal", "cyan", "sky", "blue", "indigo", "violet", "purple", "fuchsia",
    "pink", "rose",
];

/// Literal values that never need a dark pair.
pub const EXEMPT_VALUES: [&str; 3] = ["current", "inherit", "transparent"];

const RAMP_FAMILIES: [&str; 4] = ["neutral", "slate", "gray", "zinc"];
const SHADES: [&str; 11] = [
    "50", "100", "200", "300", "400", "500", "600", "700", "800", "900", "950",
];

/// Immutable light value to dark value table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    /// The built-in table, constructed once and shared.
    pub fn builtin() -> &'static MappingTable {
        static BUILTIN: OnceLock<MappingTable> = OnceLock::new();
        BUILTIN.get_or_init(build_builtin_table)
    }

    /// Looks up `light_value` in `overrides` first, then in this table.
    pub fn resolve_dark<'a>(
        &'a self,
        light_value: &str,
        overrides: &'a BTreeMap<String, String>,
    ) -> Option<&'a str> {
        overrides
            .get(light_value)
            .or_else(|| self.entries.get(light_value))
            .map(String::as_str)
    }
}

fn build_builtin_table() -> MappingTable {
    let mut entries = BTreeMap::new();

    for family in RAMP_FAMILIES {
        for (idx, shade) in SHADES.iter().enumerate() {
            let inverse = SHADES[SHADES.len() - 1 - idx];
            entries.insert(
                format!("{}-{}", family, shade),
                format!("{}-{}", family, inverse),
            );
        }
    }

    entries.insert("white".to_string(), "black".to_string());
    entries.insert("black".to_string(), "white".to_string());
    entries.insert("transparent".to_string(), "transparent".to_string());

    MappingTable { entries }
}

/// Whether a utility value is a color that must be paired with a dark variant.
///
/// Sizes, keywords and numeric suffixes (`sm`, `2`, `solid`, `left`) are not
/// colors and return false, which is what keeps `text-sm` or `border-2` out of
/// the pairing check.
pub fn needs_pair(value: &str) -> bool {
    if EXEMPT_VALUES.contains(&value) {
        return false;
    }
    if value == "white" || value == "black" {
        return true;
    }
    COLOR_FAMILIES.iter().any(|family| {
        value
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('-'))
    })
}

/// Whether a value names a color at all, exempt keywords included.
pub fn is_color_value(value: &str) -> bool {
    EXEMPT_VALUES.contains(&value) || needs_pair(value)
}
