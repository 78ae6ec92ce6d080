//! Field kinds and object schemas.
//!
//! Every handler parameter and every field of a bindable object carries a
//! [`FieldKind`], decided once when the route is registered. The binder and
//! the argument resolver branch on the kind instead of inspecting types at
//! request time.

use crate::value::{BoundObject, Value};
use std::sync::Arc;

/// Closed set of shapes a parameter or object field can take
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// UTF-8 string, bound verbatim
    Text,
    /// 64-bit signed integer
    Integer,
    /// Double precision number
    Real,
    /// Single precision number, widened to `f64` once parsed
    Float,
    /// `true` when the raw value equals "true" ignoring case, `false` otherwise
    Boolean,
    /// Nested object bound field by field from dotted keys
    Object(Arc<ObjectSchema>),
    /// Sequence sized from the largest index seen in `name[i]` keys
    Sequence(Box<FieldKind>),
    /// Generic key/value map of the raw parameters
    Mapping,
    /// The request's session handle
    Session,
    /// One uploaded multipart file
    FilePart,
}

impl FieldKind {
    /// Shorthand for `FieldKind::Sequence(Box::new(element))`
    pub fn sequence_of(element: FieldKind) -> Self {
        FieldKind::Sequence(Box::new(element))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Integer
                | FieldKind::Real
                | FieldKind::Float
                | FieldKind::Boolean
        )
    }

    /// Kinds that need recursive field-by-field binding
    pub fn is_complex(&self) -> bool {
        matches!(self, FieldKind::Object(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Real | FieldKind::Float)
    }

    /// Value substituted when nothing in the request binds this kind
    pub fn zero_value(&self) -> Value {
        match self {
            FieldKind::Integer => Value::Integer(0),
            FieldKind::Real | FieldKind::Float => Value::Real(0.0),
            FieldKind::Boolean => Value::Boolean(false),
            _ => Value::Null,
        }
    }

    /// Convert a raw request string into this kind.
    ///
    /// Returns `None` for unparsable numbers and for kinds that have no
    /// textual form. Integers must be bare digits with an optional sign;
    /// reals tolerate surrounding whitespace.
    pub fn convert(&self, raw: &str) -> Option<Value> {
        match self {
            FieldKind::Text => Some(Value::Text(raw.to_string())),
            FieldKind::Integer => raw.parse::<i64>().ok().map(Value::Integer),
            FieldKind::Real => raw.trim().parse::<f64>().ok().map(Value::Real),
            FieldKind::Float => raw
                .trim()
                .parse::<f32>()
                .ok()
                .map(|f| Value::Real(f64::from(f))),
            FieldKind::Boolean => Some(Value::Boolean(raw.eq_ignore_ascii_case("true"))),
            _ => None,
        }
    }

    /// Short name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Real => "real",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Object(_) => "object",
            FieldKind::Sequence(_) => "sequence",
            FieldKind::Mapping => "mapping",
            FieldKind::Session => "session",
            FieldKind::FilePart => "file",
        }
    }
}

/// Named field of an [`ObjectSchema`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Shape of a bindable object: a type name and its ordered fields
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ObjectSchema {
    pub fn builder(name: impl Into<String>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Position and spec of a field
    pub fn field(&self, name: &str) -> Option<(usize, &FieldSpec)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Default-constructed instance: numbers are zero, booleans false, the rest null
    pub fn instantiate(self: &Arc<Self>) -> BoundObject {
        BoundObject::new(self.clone())
    }
}

/// Builder for [`ObjectSchema`]
#[derive(Debug)]
pub struct ObjectSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ObjectSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text)
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn real(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Real)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Float)
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Boolean)
    }

    pub fn object(self, name: impl Into<String>, schema: Arc<ObjectSchema>) -> Self {
        self.field(name, FieldKind::Object(schema))
    }

    pub fn sequence(self, name: impl Into<String>, element: FieldKind) -> Self {
        self.field(name, FieldKind::sequence_of(element))
    }

    pub fn build(self) -> Arc<ObjectSchema> {
        Arc::new(ObjectSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(FieldKind::Text.convert("x y"), Some(Value::Text("x y".into())));
        assert_eq!(FieldKind::Integer.convert("42"), Some(Value::Integer(42)));
        assert_eq!(FieldKind::Integer.convert("-7"), Some(Value::Integer(-7)));
        assert_eq!(FieldKind::Integer.convert(" 42 "), None);
        assert_eq!(FieldKind::Real.convert(" 2.5 "), Some(Value::Real(2.5)));
        assert_eq!(FieldKind::Integer.convert("4.2"), None);
        assert_eq!(FieldKind::Real.convert("2.5"), Some(Value::Real(2.5)));
        assert_eq!(FieldKind::Float.convert("0.5"), Some(Value::Real(0.5)));
        assert_eq!(FieldKind::Real.convert("abc"), None);
        assert_eq!(FieldKind::Mapping.convert("a"), None);
    }

    #[test]
    fn test_boolean_conversion_never_fails() {
        assert_eq!(FieldKind::Boolean.convert("TRUE"), Some(Value::Boolean(true)));
        assert_eq!(FieldKind::Boolean.convert("true"), Some(Value::Boolean(true)));
        assert_eq!(FieldKind::Boolean.convert("yes"), Some(Value::Boolean(false)));
        assert_eq!(FieldKind::Boolean.convert(""), Some(Value::Boolean(false)));
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(FieldKind::Integer.zero_value(), Value::Integer(0));
        assert_eq!(FieldKind::Float.zero_value(), Value::Real(0.0));
        assert_eq!(FieldKind::Boolean.zero_value(), Value::Boolean(false));
        assert_eq!(FieldKind::Text.zero_value(), Value::Null);
        assert_eq!(FieldKind::sequence_of(FieldKind::Text).zero_value(), Value::Null);
    }

    #[test]
    fn test_schema_instantiate() {
        let dept = ObjectSchema::builder("Department").text("name").build();
        let schema = ObjectSchema::builder("Employee")
            .text("name")
            .integer("age")
            .boolean("active")
            .sequence("dept", FieldKind::Object(dept))
            .build();

        let obj = schema.instantiate();
        assert_eq!(obj.get("name"), Some(&Value::Null));
        assert_eq!(obj.get("age"), Some(&Value::Integer(0)));
        assert_eq!(obj.get("active"), Some(&Value::Boolean(false)));
        assert_eq!(obj.get("dept"), Some(&Value::Null));
        assert!(schema.field("missing").is_none());
        assert_eq!(schema.field("age").map(|(i, _)| i), Some(1));
    }
}
