use sqlx::mysql::MySqlArguments;
use sqlx::Arguments;

/// A value that can be bound to a named placeholder.
///
/// Values are stored owned, so a bound query can be executed more than once
/// without borrowing from the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    fn add_to(&self, args: &mut MySqlArguments) -> crate::Result<()> {
        let added = match self {
            Value::Null => args.add(None::<String>),
            Value::Bool(v) => args.add(*v),
            Value::Int(v) => args.add(*v),
            Value::Float(v) => args.add(*v),
            Value::Text(v) => args.add(v.clone()),
            Value::Bytes(v) => args.add(v.clone()),
        };
        added.map_err(sqlx::Error::Encode)?;
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A named parameter value, matched against the `{name}` placeholders of a
/// [`Query`](crate::Query).
///
/// # Examples
///
/// ```
/// use sqlx_upsert::{Param, Value};
///
/// let param = Param::value("name", "Alice");
/// assert_eq!(param.name(), "name");
/// assert_eq!(param.get(), &Value::Text("Alice".into()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    value: Value,
}

impl Param {
    /// Creates a parameter binding `value` to the placeholder `name`.
    pub fn value<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> &Value {
        &self.value
    }
}

/// Encodes the values in placeholder order.
pub(crate) fn arguments(values: &[Value]) -> crate::Result<MySqlArguments> {
    let mut args = MySqlArguments::default();
    for value in values {
        value.add_to(&mut args)?;
    }
    Ok(args)
}
