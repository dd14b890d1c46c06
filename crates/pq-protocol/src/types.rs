//! Built-in type identifiers.
//!
//! Type ids are assigned by the server catalog (`pg_type.oid`). The ids listed
//! here are fixed in every PostgreSQL installation; anything else is resolved
//! at runtime through the type registry or passed through as an opaque blob.

/// Server-assigned type identifier.
pub type Oid = u32;

/// Size of the variable-length header the server folds into type modifiers.
///
/// A `character(n)` column reports a modifier of `n + VARHDRSZ`.
pub const VARHDRSZ: i32 = 4;

/// Raw type ids of the built-in types.
pub mod oid {
    use super::Oid;

    /// `boolean`
    pub const BOOL: Oid = 16;
    /// `bytea`
    pub const BYTEA: Oid = 17;
    /// `"char"` (single byte)
    pub const CHAR: Oid = 18;
    /// `name`
    pub const NAME: Oid = 19;
    /// `bigint`
    pub const INT8: Oid = 20;
    /// `smallint`
    pub const INT2: Oid = 21;
    /// `integer`
    pub const INT4: Oid = 23;
    /// `text`
    pub const TEXT: Oid = 25;
    /// `oid`
    pub const OID: Oid = 26;
    /// `json`
    pub const JSON: Oid = 114;
    /// `real`
    pub const FLOAT4: Oid = 700;
    /// `double precision`
    pub const FLOAT8: Oid = 701;
    /// `boolean[]`
    pub const BOOL_ARRAY: Oid = 1000;
    /// `smallint[]`
    pub const INT2_ARRAY: Oid = 1005;
    /// `integer[]`
    pub const INT4_ARRAY: Oid = 1007;
    /// `text[]`
    pub const TEXT_ARRAY: Oid = 1009;
    /// `character varying[]`
    pub const VARCHAR_ARRAY: Oid = 1015;
    /// `bigint[]`
    pub const INT8_ARRAY: Oid = 1016;
    /// `real[]`
    pub const FLOAT4_ARRAY: Oid = 1021;
    /// `double precision[]`
    pub const FLOAT8_ARRAY: Oid = 1022;
    /// `character(n)`
    pub const BPCHAR: Oid = 1042;
    /// `character varying(n)`
    pub const VARCHAR: Oid = 1043;
    /// `timestamp without time zone`
    pub const TIMESTAMP: Oid = 1114;
    /// `timestamp without time zone[]`
    pub const TIMESTAMP_ARRAY: Oid = 1115;
    /// `timestamp with time zone`
    pub const TIMESTAMPTZ: Oid = 1184;
    /// `timestamp with time zone[]`
    pub const TIMESTAMPTZ_ARRAY: Oid = 1185;
    /// `interval`
    pub const INTERVAL: Oid = 1186;
    /// `regclass`
    pub const REGCLASS: Oid = 2205;
}

/// Built-in types the codec handles without consulting the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    // Fixed-width scalars
    /// Boolean, one byte.
    Bool,
    /// Single byte character.
    Char,
    /// 16-bit signed integer.
    Int2,
    /// 32-bit signed integer.
    Int4,
    /// 64-bit signed integer.
    Int8,
    /// Object identifier (unsigned 32-bit).
    Oid,
    /// Relation identifier (unsigned 32-bit).
    RegClass,
    /// 32-bit float.
    Float4,
    /// 64-bit float.
    Float8,

    // Variable-length
    /// Opaque binary string.
    Bytea,
    /// Text.
    Text,
    /// Variable-length character.
    Varchar,
    /// Identifier name.
    Name,
    /// JSON document as text.
    Json,
    /// Fixed-length, blank-padded character.
    Bpchar,

    // Temporal
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,
    /// Time interval.
    Interval,

    // Arrays
    /// `boolean[]`
    BoolArray,
    /// `smallint[]`
    Int2Array,
    /// `integer[]`
    Int4Array,
    /// `bigint[]`
    Int8Array,
    /// `real[]`
    Float4Array,
    /// `double precision[]`
    Float8Array,
    /// `text[]`
    TextArray,
    /// `character varying[]`
    VarcharArray,
    /// `timestamp[]`
    TimestampArray,
    /// `timestamptz[]`
    TimestampTzArray,
}

impl BuiltinType {
    /// Resolve a type id to a built-in type.
    #[must_use]
    pub fn from_oid(type_id: Oid) -> Option<Self> {
        let ty = match type_id {
            oid::BOOL => Self::Bool,
            oid::BYTEA => Self::Bytea,
            oid::CHAR => Self::Char,
            oid::NAME => Self::Name,
            oid::INT8 => Self::Int8,
            oid::INT2 => Self::Int2,
            oid::INT4 => Self::Int4,
            oid::TEXT => Self::Text,
            oid::OID => Self::Oid,
            oid::JSON => Self::Json,
            oid::FLOAT4 => Self::Float4,
            oid::FLOAT8 => Self::Float8,
            oid::BOOL_ARRAY => Self::BoolArray,
            oid::INT2_ARRAY => Self::Int2Array,
            oid::INT4_ARRAY => Self::Int4Array,
            oid::TEXT_ARRAY => Self::TextArray,
            oid::VARCHAR_ARRAY => Self::VarcharArray,
            oid::INT8_ARRAY => Self::Int8Array,
            oid::FLOAT4_ARRAY => Self::Float4Array,
            oid::FLOAT8_ARRAY => Self::Float8Array,
            oid::BPCHAR => Self::Bpchar,
            oid::VARCHAR => Self::Varchar,
            oid::TIMESTAMP => Self::Timestamp,
            oid::TIMESTAMP_ARRAY => Self::TimestampArray,
            oid::TIMESTAMPTZ => Self::TimestampTz,
            oid::TIMESTAMPTZ_ARRAY => Self::TimestampTzArray,
            oid::INTERVAL => Self::Interval,
            oid::REGCLASS => Self::RegClass,
            _ => return None,
        };
        Some(ty)
    }

    /// The catalog id of this type.
    #[must_use]
    pub const fn oid(self) -> Oid {
        match self {
            Self::Bool => oid::BOOL,
            Self::Char => oid::CHAR,
            Self::Int2 => oid::INT2,
            Self::Int4 => oid::INT4,
            Self::Int8 => oid::INT8,
            Self::Oid => oid::OID,
            Self::RegClass => oid::REGCLASS,
            Self::Float4 => oid::FLOAT4,
            Self::Float8 => oid::FLOAT8,
            Self::Bytea => oid::BYTEA,
            Self::Text => oid::TEXT,
            Self::Varchar => oid::VARCHAR,
            Self::Name => oid::NAME,
            Self::Json => oid::JSON,
            Self::Bpchar => oid::BPCHAR,
            Self::Timestamp => oid::TIMESTAMP,
            Self::TimestampTz => oid::TIMESTAMPTZ,
            Self::Interval => oid::INTERVAL,
            Self::BoolArray => oid::BOOL_ARRAY,
            Self::Int2Array => oid::INT2_ARRAY,
            Self::Int4Array => oid::INT4_ARRAY,
            Self::Int8Array => oid::INT8_ARRAY,
            Self::Float4Array => oid::FLOAT4_ARRAY,
            Self::Float8Array => oid::FLOAT8_ARRAY,
            Self::TextArray => oid::TEXT_ARRAY,
            Self::VarcharArray => oid::VARCHAR_ARRAY,
            Self::TimestampArray => oid::TIMESTAMP_ARRAY,
            Self::TimestampTzArray => oid::TIMESTAMPTZ_ARRAY,
        }
    }

    /// SQL name of the type, as `format_type` would print it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Char => "\"char\"",
            Self::Int2 => "smallint",
            Self::Int4 => "integer",
            Self::Int8 => "bigint",
            Self::Oid => "oid",
            Self::RegClass => "regclass",
            Self::Float4 => "real",
            Self::Float8 => "double precision",
            Self::Bytea => "bytea",
            Self::Text => "text",
            Self::Varchar => "character varying",
            Self::Name => "name",
            Self::Json => "json",
            Self::Bpchar => "character",
            Self::Timestamp => "timestamp without time zone",
            Self::TimestampTz => "timestamp with time zone",
            Self::Interval => "interval",
            Self::BoolArray => "boolean[]",
            Self::Int2Array => "smallint[]",
            Self::Int4Array => "integer[]",
            Self::Int8Array => "bigint[]",
            Self::Float4Array => "real[]",
            Self::Float8Array => "double precision[]",
            Self::TextArray => "text[]",
            Self::VarcharArray => "character varying[]",
            Self::TimestampArray => "timestamp without time zone[]",
            Self::TimestampTzArray => "timestamp with time zone[]",
        }
    }

    /// Element type of an array type, `None` for scalars.
    #[must_use]
    pub const fn element(self) -> Option<Self> {
        match self {
            Self::BoolArray => Some(Self::Bool),
            Self::Int2Array => Some(Self::Int2),
            Self::Int4Array => Some(Self::Int4),
            Self::Int8Array => Some(Self::Int8),
            Self::Float4Array => Some(Self::Float4),
            Self::Float8Array => Some(Self::Float8),
            Self::TextArray => Some(Self::Text),
            Self::VarcharArray => Some(Self::Varchar),
            Self::TimestampArray => Some(Self::Timestamp),
            Self::TimestampTzArray => Some(Self::TimestampTz),
            _ => None,
        }
    }

    /// Array type whose elements are this type, if the codec supports it.
    #[must_use]
    pub const fn array_of(self) -> Option<Self> {
        match self {
            Self::Bool => Some(Self::BoolArray),
            Self::Int2 => Some(Self::Int2Array),
            Self::Int4 => Some(Self::Int4Array),
            Self::Int8 => Some(Self::Int8Array),
            Self::Float4 => Some(Self::Float4Array),
            Self::Float8 => Some(Self::Float8Array),
            Self::Text => Some(Self::TextArray),
            Self::Varchar => Some(Self::VarcharArray),
            Self::Timestamp => Some(Self::TimestampArray),
            Self::TimestampTz => Some(Self::TimestampTzArray),
            _ => None,
        }
    }

    /// Check if this is an array type.
    #[must_use]
    pub const fn is_array(self) -> bool {
        self.element().is_some()
    }

    /// Encoded width of fixed-width scalars, `None` for variable-length types.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Char => Some(1),
            Self::Int2 => Some(2),
            Self::Int4 | Self::Oid | Self::RegClass | Self::Float4 => Some(4),
            Self::Int8 | Self::Float8 | Self::Timestamp | Self::TimestampTz => Some(8),
            Self::Interval => Some(16),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: &[BuiltinType] = &[
        BuiltinType::Bool,
        BuiltinType::Char,
        BuiltinType::Int2,
        BuiltinType::Int4,
        BuiltinType::Int8,
        BuiltinType::Oid,
        BuiltinType::RegClass,
        BuiltinType::Float4,
        BuiltinType::Float8,
        BuiltinType::Bytea,
        BuiltinType::Text,
        BuiltinType::Varchar,
        BuiltinType::Name,
        BuiltinType::Json,
        BuiltinType::Bpchar,
        BuiltinType::Timestamp,
        BuiltinType::TimestampTz,
        BuiltinType::Interval,
        BuiltinType::BoolArray,
        BuiltinType::Int2Array,
        BuiltinType::Int4Array,
        BuiltinType::Int8Array,
        BuiltinType::Float4Array,
        BuiltinType::Float8Array,
        BuiltinType::TextArray,
        BuiltinType::VarcharArray,
        BuiltinType::TimestampArray,
        BuiltinType::TimestampTzArray,
    ];

    #[test]
    fn test_oid_lookup_is_consistent() {
        for &ty in ALL {
            assert_eq!(BuiltinType::from_oid(ty.oid()), Some(ty), "{}", ty.name());
        }
    }

    #[test]
    fn test_timestamptz_and_interval_are_distinct() {
        assert_eq!(
            BuiltinType::from_oid(oid::TIMESTAMPTZ),
            Some(BuiltinType::TimestampTz)
        );
        assert_eq!(
            BuiltinType::from_oid(oid::INTERVAL),
            Some(BuiltinType::Interval)
        );
    }

    #[test]
    fn test_array_element_pairs() {
        for &ty in ALL {
            if let Some(elem) = ty.element() {
                assert_eq!(elem.array_of(), Some(ty));
                assert!(ty.is_array());
            }
        }
        assert_eq!(
            BuiltinType::from_oid(1007).unwrap().element(),
            Some(BuiltinType::Int4)
        );
    }

    #[test]
    fn test_unknown_oid() {
        assert_eq!(BuiltinType::from_oid(600), None);
        assert_eq!(BuiltinType::from_oid(0), None);
    }
}
