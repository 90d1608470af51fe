//! Values and rows accepted by the writer.
//!
//! Every value belongs to a closed set of semantic categories ([`ValueKind`]).
//! The category, not the Rust representation, decides the column type used in
//! generated DDL and the coercion applied before a value is bound.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use url::Url;

/// Semantic category of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Text,
    Integer,
    Fixed,
    Date,
    Time,
    Timestamp,
    Url,
    Ipv4Address,
    Ipv6Address,
    Ipv4Port,
    Ipv6Port,
    Hostname,
    Filename,
}

impl ValueKind {
    pub const ALL: [ValueKind; 13] = [
        ValueKind::Text,
        ValueKind::Integer,
        ValueKind::Fixed,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::Timestamp,
        ValueKind::Url,
        ValueKind::Ipv4Address,
        ValueKind::Ipv6Address,
        ValueKind::Ipv4Port,
        ValueKind::Ipv6Port,
        ValueKind::Hostname,
        ValueKind::Filename,
    ];

    /// Addresses and addresses-with-port of either family.
    #[must_use]
    pub fn is_ip_family(self) -> bool {
        matches!(
            self,
            ValueKind::Ipv4Address
                | ValueKind::Ipv6Address
                | ValueKind::Ipv4Port
                | ValueKind::Ipv6Port
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Integer => "integer",
            ValueKind::Fixed => "fixed-point",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Url => "url",
            ValueKind::Ipv4Address => "ipv4 address",
            ValueKind::Ipv6Address => "ipv6 address",
            ValueKind::Ipv4Port => "ipv4 address with port",
            ValueKind::Ipv6Port => "ipv6 address with port",
            ValueKind::Hostname => "hostname",
            ValueKind::Filename => "filename",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar value in a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`. Has no kind, so it cannot be used to infer a column type.
    Null,
    Text(String),
    Integer(i64),
    /// Integers wider than `i64`, e.g. an IPv6 address bound in integer form.
    BigInteger(BigInt),
    Fixed(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Url(Url),
    Ipv4Address(Ipv4Addr),
    Ipv6Address(Ipv6Addr),
    Ipv4Port(SocketAddrV4),
    Ipv6Port(SocketAddrV6),
    Hostname(String),
    Filename(String),
}

impl Value {
    pub fn hostname(name: impl Into<String>) -> Self {
        Value::Hostname(name.into())
    }

    pub fn filename(name: impl Into<String>) -> Self {
        Value::Filename(name.into())
    }

    /// The semantic category of this value, `None` for `NULL`.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            Value::Null => return None,
            Value::Text(_) => ValueKind::Text,
            Value::Integer(_) | Value::BigInteger(_) => ValueKind::Integer,
            Value::Fixed(_) => ValueKind::Fixed,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Url(_) => ValueKind::Url,
            Value::Ipv4Address(_) => ValueKind::Ipv4Address,
            Value::Ipv6Address(_) => ValueKind::Ipv6Address,
            Value::Ipv4Port(_) => ValueKind::Ipv4Port,
            Value::Ipv6Port(_) => ValueKind::Ipv6Port,
            Value::Hostname(_) => ValueKind::Hostname,
            Value::Filename(_) => ValueKind::Filename,
        };
        Some(kind)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Unquoted text form. `None` for `NULL`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Value::Null => return None,
            Value::Text(s) | Value::Hostname(s) | Value::Filename(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::BigInteger(i) => i.to_string(),
            Value::Fixed(x) => x.to_string(),
            Value::Date(d) => d.to_string(),
            Value::Time(t) => t.to_string(),
            Value::Timestamp(ts) => ts.to_string(),
            Value::Url(url) => url.as_str().to_string(),
            Value::Ipv4Address(ip) => ip.to_string(),
            Value::Ipv6Address(ip) => ip.to_string(),
            Value::Ipv4Port(addr) => addr.to_string(),
            Value::Ipv6Port(addr) => addr.to_string(),
        };
        Some(text)
    }

    /// Integer form of an IP-family value. Addresses-with-port convert their
    /// address part only.
    #[must_use]
    pub fn ip_to_integer(&self) -> Option<Value> {
        match self {
            Value::Ipv4Address(ip) => Some(Value::Integer(i64::from(u32::from(*ip)))),
            Value::Ipv4Port(addr) => Some(Value::Integer(i64::from(u32::from(*addr.ip())))),
            Value::Ipv6Address(ip) => Some(ipv6_to_integer(*ip)),
            Value::Ipv6Port(addr) => Some(ipv6_to_integer(*addr.ip())),
            _ => None,
        }
    }
}

fn ipv6_to_integer(ip: Ipv6Addr) -> Value {
    let bits = u128::from(ip);
    match i64::try_from(bits) {
        Ok(small) => Value::Integer(small),
        Err(_) => Value::BigInteger(BigInt::from(bits)),
    }
}

/// Renders the value the way it would be written as a SQL literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(_) | Value::BigInteger(_) | Value::Fixed(_) => {
                f.write_str(&self.to_text().unwrap_or_default())
            }
            other => {
                let text = other.to_text().unwrap_or_default();
                write!(f, "'{}'", text.replace('\'', "''"))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Fixed(x)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Url> for Value {
    fn from(url: Url) -> Self {
        Value::Url(url)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(ip: Ipv4Addr) -> Self {
        Value::Ipv4Address(ip)
    }
}

impl From<Ipv6Addr> for Value {
    fn from(ip: Ipv6Addr) -> Self {
        Value::Ipv6Address(ip)
    }
}

impl From<IpAddr> for Value {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => Value::Ipv4Address(ip),
            IpAddr::V6(ip) => Value::Ipv6Address(ip),
        }
    }
}

impl From<SocketAddrV4> for Value {
    fn from(addr: SocketAddrV4) -> Self {
        Value::Ipv4Port(addr)
    }
}

impl From<SocketAddrV6> for Value {
    fn from(addr: SocketAddrV6) -> Self {
        Value::Ipv6Port(addr)
    }
}

impl From<SocketAddr> for Value {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(addr) => Value::Ipv4Port(addr),
            SocketAddr::V6(addr) => Value::Ipv6Port(addr),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// An ordered tuple of values, optionally carrying field names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    names: Option<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            names: None,
            values,
        }
    }

    /// Build a row from `(name, value)` pairs.
    pub fn named<N, I>(fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let (names, values) = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            names: Some(names),
            values,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.names.is_some()
    }

    /// Field names of the row, synthesized as `field1..fieldN` for unnamed rows.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        match &self.names {
            Some(names) => names.clone(),
            None => (1..=self.values.len())
                .map(|i| format!("field{i}"))
                .collect(),
        }
    }

    /// Iterate `(field name, value)` pairs in row order.
    pub fn fields(&self) -> impl Iterator<Item = (String, &Value)> {
        self.field_names().into_iter().zip(self.values.iter())
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Row::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &self.names {
                Some(names) => write!(f, "{}={value}", names[i])?,
                None => write!(f, "{value}")?,
            }
        }
        f.write_str(")")
    }
}

/// Build a [`Row`] from expressions convertible into [`Value`].
///
/// `row!["a", 1, 3.5]` builds an unnamed row, `row![x = "a", y = 1]` a named one.
#[macro_export]
macro_rules! row {
    ($($name:ident = $value:expr),+ $(,)?) => {
        $crate::value::Row::named(vec![
            $((stringify!($name), $crate::value::Value::from($value))),+
        ])
    };
    ($($value:expr),* $(,)?) => {
        $crate::value::Row::new(vec![$($crate::value::Value::from($value)),*])
    };
}
