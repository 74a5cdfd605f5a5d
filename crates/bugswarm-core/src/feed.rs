// ── Local feeds ──
//
// A feed is a named piece of device data that peers can request. Structured
// feeds yield a JSON value map each time they are read; binary feeds yield
// a byte stream that must be re-opened for every response.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::io::AsyncRead;

/// String-keyed map of feed values.
pub type ValueMap = serde_json::Map<String, Value>;

// ── Sources ──────────────────────────────────────────────────────────

/// Produces the current values of a structured feed.
pub trait ValueSource: Send + Sync {
    fn read(&self) -> ValueMap;
}

impl<F> ValueSource for F
where
    F: Fn() -> ValueMap + Send + Sync,
{
    fn read(&self) -> ValueMap {
        self()
    }
}

/// A value map that never changes.
struct FixedValues(ValueMap);

impl ValueSource for FixedValues {
    fn read(&self) -> ValueMap {
        self.0.clone()
    }
}

/// Boxed reader returned by [`BinarySource::open`].
pub type BinaryReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opens the payload of a binary feed.
///
/// Readers are consumed once; every response opens a fresh one.
#[async_trait]
pub trait BinarySource: Send + Sync {
    async fn open(&self) -> io::Result<BinaryReader>;
}

/// Payload held in memory.
#[derive(Debug, Clone)]
pub struct BytesSource(pub Bytes);

#[async_trait]
impl BinarySource for BytesSource {
    async fn open(&self) -> io::Result<BinaryReader> {
        Ok(Box::new(io::Cursor::new(self.0.clone())))
    }
}

/// Payload read from a file on every request (e.g. a camera snapshot).
#[derive(Debug, Clone)]
pub struct FileSource(pub PathBuf);

#[async_trait]
impl BinarySource for FileSource {
    async fn open(&self) -> io::Result<BinaryReader> {
        let file = tokio::fs::File::open(&self.0).await?;
        Ok(Box::new(file))
    }
}

// ── Feed ─────────────────────────────────────────────────────────────

/// A feed whose value is a key/value map.
#[derive(Clone)]
pub struct StructuredFeed {
    pub name: String,
    pub source: Arc<dyn ValueSource>,
}

/// A feed whose value is an opaque byte payload.
#[derive(Clone)]
pub struct BinaryFeed {
    pub name: String,
    pub source: Arc<dyn BinarySource>,
}

/// One entry in the feed registry.
#[derive(Clone)]
pub enum Feed {
    Structured(StructuredFeed),
    Binary(BinaryFeed),
}

impl Feed {
    /// Structured feed backed by a closure or other [`ValueSource`].
    pub fn structured(name: impl Into<String>, source: impl ValueSource + 'static) -> Self {
        Self::Structured(StructuredFeed {
            name: name.into(),
            source: Arc::new(source),
        })
    }

    /// Structured feed with constant values.
    pub fn fixed(name: impl Into<String>, values: ValueMap) -> Self {
        Self::structured(name, FixedValues(values))
    }

    pub fn binary(name: impl Into<String>, source: impl BinarySource + 'static) -> Self {
        Self::Binary(BinaryFeed {
            name: name.into(),
            source: Arc::new(source),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Structured(f) => &f.name,
            Self::Binary(f) => &f.name,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Schema advertised in the capabilities document: a map of value key
    /// to JSON type name, or `"binary"`.
    pub fn schema(&self) -> Value {
        match self {
            Self::Binary(_) => Value::String("binary".into()),
            Self::Structured(f) => Value::Object(
                f.source
                    .read()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(json_type_name(v).into())))
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_binary() { "binary" } else { "structured" };
        f.debug_struct("Feed")
            .field("name", &self.name())
            .field("kind", &kind)
            .finish()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
