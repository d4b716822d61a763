/// Type Descriptor Module
///
/// Describes the database-side type of a column: a closed set of type kinds,
/// optional nullability, an optional sub-type for composite types (arrays,
/// record references) and an optional union of alternative types.
///
/// A descriptor renders to the canonical lower-case SurrealQL type name via
/// `Display`, e.g. `int`, `string`, `array<record<user>>`, `option<int>`
/// when nullable, and `int | string` for a union. Union rendering is
/// informational only: the statement builder never dispatches on the
/// alternatives, it keys on the primary kind.
use std::fmt;

/// Default strftime-style pattern for datetime columns.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y/%m/%dT%H:%M:%SZ";

/// The closed set of database type kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// 64-bit integer
    Int,
    /// Floating point number
    Float,
    /// Numeric with automatic conversion
    Number,
    /// Boolean
    Bool,
    /// String
    String,
    /// Byte payload
    Bytes,
    /// Date and time
    Datetime,
    /// List of values
    Array,
    /// String-keyed mapping
    Object,
    /// Reference to another record
    Record,
    /// A named type, used to spell out a record target table
    /// (e.g. `record<user>`). Stored lower-case.
    Custom(std::string::String),
}

impl TypeKind {
    fn name(&self) -> &str {
        match self {
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Number => "number",
            TypeKind::Bool => "bool",
            TypeKind::String => "string",
            TypeKind::Bytes => "bytes",
            TypeKind::Datetime => "datetime",
            TypeKind::Array => "array",
            TypeKind::Object => "object",
            TypeKind::Record => "record",
            TypeKind::Custom(name) => name,
        }
    }
}

/// A column's database type declaration.
///
/// Constructed once at schema-definition time and immutable afterwards.
/// Sub-type chains always terminate: `sub` boxes a fully built descriptor,
/// so a cycle cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub struct DbType {
    kind: TypeKind,
    nullable: bool,
    sub: Option<Box<DbType>>,
    alternatives: Vec<DbType>,
    datetime_format: String,
}

impl DbType {
    fn base(kind: TypeKind) -> Self {
        DbType {
            kind,
            nullable: false,
            sub: None,
            alternatives: Vec::new(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }

    pub fn int() -> Self {
        DbType::base(TypeKind::Int)
    }

    pub fn float() -> Self {
        DbType::base(TypeKind::Float)
    }

    pub fn number() -> Self {
        DbType::base(TypeKind::Number)
    }

    pub fn bool() -> Self {
        DbType::base(TypeKind::Bool)
    }

    pub fn string() -> Self {
        DbType::base(TypeKind::String)
    }

    pub fn bytes() -> Self {
        DbType::base(TypeKind::Bytes)
    }

    pub fn datetime() -> Self {
        DbType::base(TypeKind::Datetime)
    }

    pub fn object() -> Self {
        DbType::base(TypeKind::Object)
    }

    pub fn array() -> Self {
        DbType::base(TypeKind::Array)
    }

    /// An array with a declared element type, e.g. `array<string>`.
    pub fn array_of(element: DbType) -> Self {
        let mut ty = DbType::base(TypeKind::Array);
        ty.sub = Some(Box::new(element));
        ty
    }

    pub fn record() -> Self {
        DbType::base(TypeKind::Record)
    }

    /// A record reference with a declared target type, e.g. `record<user>`.
    pub fn record_of(target: DbType) -> Self {
        let mut ty = DbType::base(TypeKind::Record);
        ty.sub = Some(Box::new(target));
        ty
    }

    /// A bare named type, used as a record target: `DbType::table("User")`
    /// renders as `user`.
    pub fn table(name: &str) -> Self {
        DbType::base(TypeKind::Custom(name.to_lowercase()))
    }

    /// Marks the type as nullable; rendering wraps it in `option<...>`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds an alternative type, rendered as ` | <alt>`. Informational only.
    pub fn or(mut self, alternative: DbType) -> Self {
        self.alternatives.push(alternative);
        self
    }

    /// Overrides the datetime format pattern (Datetime kind only).
    pub fn with_format(mut self, format: &str) -> Self {
        self.datetime_format = format.to_string();
        self
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn datetime_format(&self) -> &str {
        &self.datetime_format
    }

    /// Renders the kind name with its sub-type chain, outside-in:
    /// the outermost name wraps the inner rendering until no further
    /// sub-type exists.
    fn composed(&self) -> String {
        match &self.sub {
            Some(sub) => format!("{}<{}>", self.kind.name(), sub.composed()),
            None => self.kind.name().to_string(),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = self.composed();
        for alternative in &self.alternatives {
            rendered.push_str(&format!(" | {}", alternative));
        }
        if self.nullable {
            write!(f, "option<{}>", rendered)
        } else {
            write!(f, "{}", rendered)
        }
    }
}
