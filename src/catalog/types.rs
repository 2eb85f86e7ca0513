//! Column type enumerations shared by the catalog and the sync engine.

use serde::{Deserialize, Serialize};

/// Physical column types reported by drivers.
///
/// This is a closed enumeration: a driver that cannot map a native type
/// reports [`BaseType::Unknown`] rather than inventing a new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    /// Boolean
    Boolean,
    /// 64-bit integer
    BigInteger,
    /// 32-bit integer
    Integer,
    /// Fixed-point decimal
    Decimal,
    /// Floating point
    Float,
    /// Bounded string
    Char,
    /// Unbounded string
    Text,
    /// Date (no time component)
    Date,
    /// Date and time
    DateTime,
    /// Time (no date component)
    Time,
    /// Nested document / map column; its subkeys become child fields
    Dictionary,
    /// Anything the driver could not map
    Unknown,
}

impl BaseType {
    /// Parse a wire-format type name like `"CharField"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BooleanField" => Some(Self::Boolean),
            "BigIntegerField" => Some(Self::BigInteger),
            "IntegerField" => Some(Self::Integer),
            "DecimalField" => Some(Self::Decimal),
            "FloatField" => Some(Self::Float),
            "CharField" => Some(Self::Char),
            "TextField" => Some(Self::Text),
            "DateField" => Some(Self::Date),
            "DateTimeField" => Some(Self::DateTime),
            "TimeField" => Some(Self::Time),
            "DictionaryField" => Some(Self::Dictionary),
            "UnknownField" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The wire-format name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "BooleanField",
            Self::BigInteger => "BigIntegerField",
            Self::Integer => "IntegerField",
            Self::Decimal => "DecimalField",
            Self::Float => "FloatField",
            Self::Char => "CharField",
            Self::Text => "TextField",
            Self::Date => "DateField",
            Self::DateTime => "DateTimeField",
            Self::Time => "TimeField",
            Self::Dictionary => "DictionaryField",
            Self::Unknown => "UnknownField",
        }
    }

    /// Whether this is a textual type eligible for content classification.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Char | Self::Text)
    }
}

impl std::fmt::Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inferred semantic role of a column, independent of its storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialType {
    /// Primary key or surrogate identifier
    Id,
    /// Foreign key; paired with exactly one [`ForeignKey`](super::ForeignKey) row
    Fk,
    /// Low-cardinality column suitable for pick-list UIs
    Category,
    /// Column of URLs
    Url,
    /// Column of serialized JSON objects or arrays
    Json,
    /// Human name (first, last, full)
    Name,
    /// Latitude coordinate
    Latitude,
    /// Longitude coordinate
    Longitude,
    /// City name
    City,
    /// State or province
    State,
    /// Country name or code
    Country,
    /// Postal code
    ZipCode,
}

impl SpecialType {
    /// Parse a keyword like `"category"`. A leading `:` is tolerated since
    /// metadata tables written by hand tend to carry it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches(':') {
            "id" => Some(Self::Id),
            "fk" => Some(Self::Fk),
            "category" => Some(Self::Category),
            "url" => Some(Self::Url),
            "json" => Some(Self::Json),
            "name" => Some(Self::Name),
            "latitude" => Some(Self::Latitude),
            "longitude" => Some(Self::Longitude),
            "city" => Some(Self::City),
            "state" => Some(Self::State),
            "country" => Some(Self::Country),
            "zip_code" => Some(Self::ZipCode),
            _ => None,
        }
    }

    /// The keyword form of this special type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Fk => "fk",
            Self::Category => "category",
            Self::Url => "url",
            Self::Json => "json",
            Self::Name => "name",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
            Self::ZipCode => "zip_code",
        }
    }
}

impl std::fmt::Display for SpecialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
