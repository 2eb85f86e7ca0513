//! Name-based special-type inference.
//!
//! A single ordered pattern table maps lower-cased column names, gated by
//! base type, to semantic types. Earlier rows win; suffix patterns sit
//! next to their exact-match counterparts so the documented precedence is
//! the table order itself.

use regex::Regex;

use crate::catalog::{BaseType, SpecialType};
use crate::error::{SyncError, SyncResult};

const FLOAT: &[BaseType] = &[BaseType::Float];
const INT_OR_TEXT: &[BaseType] = &[
    BaseType::BigInteger,
    BaseType::Integer,
    BaseType::Char,
    BaseType::Text,
];
const BOOL_OR_INT: &[BaseType] = &[
    BaseType::Boolean,
    BaseType::BigInteger,
    BaseType::Integer,
];
const TEXT: &[BaseType] = &[BaseType::Char, BaseType::Text];

/// The pattern table. Tuples of (anchored regex over the lower-cased
/// name, allowed base types or `None` for any, produced special type).
const NAME_PATTERNS: &[(&str, Option<&[BaseType]>, SpecialType)] = &[
    // Coordinates, float-gated. Suffix forms first, then exact names.
    (r"^.*_lat$", Some(FLOAT), SpecialType::Latitude),
    (r"^.*_lon$", Some(FLOAT), SpecialType::Longitude),
    (r"^.*_lng$", Some(FLOAT), SpecialType::Longitude),
    (r"^.*_long$", Some(FLOAT), SpecialType::Longitude),
    (r"^.*_longitude$", Some(FLOAT), SpecialType::Longitude),
    (r"^.*_latitude$", Some(FLOAT), SpecialType::Latitude),
    (r"^lat$", Some(FLOAT), SpecialType::Latitude),
    (r"^latitude$", Some(FLOAT), SpecialType::Latitude),
    (r"^lon$", Some(FLOAT), SpecialType::Longitude),
    (r"^lng$", Some(FLOAT), SpecialType::Longitude),
    (r"^long$", Some(FLOAT), SpecialType::Longitude),
    (r"^longitude$", Some(FLOAT), SpecialType::Longitude),
    // Enumerated-value columns, integer or text.
    (r"^.*_rating$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^.*_type$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^rating$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^role$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^sex$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^status$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^type$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^currency$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^gender$", Some(INT_OR_TEXT), SpecialType::Category),
    (r"^postalcode$", Some(INT_OR_TEXT), SpecialType::ZipCode),
    (r"^postal_code$", Some(INT_OR_TEXT), SpecialType::ZipCode),
    (r"^zip_code$", Some(INT_OR_TEXT), SpecialType::ZipCode),
    (r"^zipcode$", Some(INT_OR_TEXT), SpecialType::ZipCode),
    (r"^active$", Some(BOOL_OR_INT), SpecialType::Category),
    // Textual content.
    (r"^.*_url$", Some(TEXT), SpecialType::Url),
    (r"^url$", Some(TEXT), SpecialType::Url),
    (r"^city$", Some(TEXT), SpecialType::City),
    (r"^country$", Some(TEXT), SpecialType::Country),
    (r"^countrycode$", Some(TEXT), SpecialType::Country),
    (r"^first_name$", Some(TEXT), SpecialType::Name),
    (r"^last_name$", Some(TEXT), SpecialType::Name),
    (r"^full_name$", Some(TEXT), SpecialType::Name),
    (r"^name$", Some(TEXT), SpecialType::Name),
    (r"^state$", Some(TEXT), SpecialType::State),
];

struct NamePattern {
    regex: Regex,
    base_types: Option<&'static [BaseType]>,
    special_type: SpecialType,
}

/// Deterministic name/type → special-type inference.
///
/// Construction compiles and validates the pattern table; a malformed
/// entry refuses to start the engine rather than mis-inferring at runtime.
pub struct SpecialTypeInferrer {
    patterns: Vec<NamePattern>,
}

impl SpecialTypeInferrer {
    /// Compile the pattern table.
    pub fn new() -> SyncResult<Self> {
        let mut patterns = Vec::with_capacity(NAME_PATTERNS.len());
        for (pattern, base_types, special_type) in NAME_PATTERNS {
            let regex = Regex::new(pattern).map_err(|e| {
                SyncError::PatternTable(format!("invalid regex {pattern:?}: {e}"))
            })?;
            patterns.push(NamePattern {
                regex,
                base_types: *base_types,
                special_type: *special_type,
            });
        }
        if patterns.is_empty() {
            return Err(SyncError::PatternTable("pattern table is empty".to_string()));
        }
        Ok(Self { patterns })
    }

    /// Infer a special type for a field descriptor.
    ///
    /// Decision order: an already-set special type is returned unchanged,
    /// then primary keys and columns literally named `id` become
    /// [`SpecialType::Id`], then the first pattern-table row whose regex
    /// matches the lower-cased name and whose gate admits `base_type`
    /// wins. No match means no inference.
    pub fn infer(
        &self,
        name: &str,
        base_type: BaseType,
        pk: bool,
        prior: Option<SpecialType>,
    ) -> Option<SpecialType> {
        if prior.is_some() {
            return prior;
        }
        if pk {
            return Some(SpecialType::Id);
        }
        let lower = name.to_lowercase();
        if lower == "id" {
            return Some(SpecialType::Id);
        }
        self.patterns
            .iter()
            .find(|p| {
                p.regex.is_match(&lower)
                    && p.base_types.map_or(true, |types| types.contains(&base_type))
            })
            .map(|p| p.special_type)
    }
}
