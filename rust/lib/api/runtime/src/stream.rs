//! Tagged value streams and the serialization contract of generated records.
//!
//! A [`Stream`] is an ordered log of start/end markers and tagged values.
//! Readers consume it strictly in order: asking for a tag or a kind other
//! than the next one written is an error, so any asymmetry between a
//! record's serialize and deserialize surfaces immediately.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("expected '{expected}' but found '{found}'")]
    TagMismatch { expected: String, found: String },

    #[error("field '{tag}': expected {expected}, found {found}")]
    KindMismatch {
        tag: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unexpected end of stream while reading '{0}'")]
    Eof(String),
}

/// A single wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    String(String),
    Json(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
    Uuid(Uuid),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::I8(_) => "I8",
            Value::I16(_) => "I16",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::U8(_) => "U8",
            Value::U16(_) => "U16",
            Value::U32(_) => "U32",
            Value::U64(_) => "U64",
            Value::F64(_) => "F64",
            Value::String(_) => "String",
            Value::Json(_) => "Json",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::DateTime(_) => "DateTime",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "Uuid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Start(String),
    StartList(String, usize),
    End(String),
    Value(String, Value),
}

impl Entry {
    pub fn tag(&self) -> &str {
        match self {
            Entry::Start(t) | Entry::StartList(t, _) | Entry::End(t) | Entry::Value(t, _) => t,
        }
    }
}

/// An in-memory request or response stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    entries: Vec<Entry>,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&mut self) -> StreamWriter<'_> {
        StreamWriter { stream: self }
    }

    pub fn reader(&self) -> StreamReader<'_> {
        StreamReader {
            entries: &self.entries,
            pos: 0,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags in write order, markers included.
    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::tag).collect()
    }
}

macro_rules! write_fn {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self, tag: &str, v: $ty) -> Result<(), StreamError> {
            self.write_value(tag, Value::$variant(v))
        }
    };
    ($name:ident, $variant:ident, $ty:ty, to_owned) => {
        fn $name(&mut self, tag: &str, v: $ty) -> Result<(), StreamError> {
            self.write_value(tag, Value::$variant(v.to_owned()))
        }
    };
}

macro_rules! read_fn {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self, tag: &str) -> Result<$ty, StreamError> {
            match self.read_value(tag)? {
                Value::$variant(v) => Ok(v),
                other => Err(StreamError::KindMismatch {
                    tag: tag.to_string(),
                    expected: stringify!($variant),
                    found: other.kind(),
                }),
            }
        }
    };
}

/// Sink for serialized records.
pub trait Writer {
    fn write_start(&mut self, name: &str) -> Result<(), StreamError>;
    fn write_start_list(&mut self, name: &str, len: usize) -> Result<(), StreamError>;
    fn write_end(&mut self, name: &str) -> Result<(), StreamError>;
    fn write_value(&mut self, tag: &str, value: Value) -> Result<(), StreamError>;

    write_fn!(write_bool, Bool, bool);
    write_fn!(write_char, Char, char);
    write_fn!(write_i8, I8, i8);
    write_fn!(write_i16, I16, i16);
    write_fn!(write_i32, I32, i32);
    write_fn!(write_i64, I64, i64);
    write_fn!(write_u8, U8, u8);
    write_fn!(write_u16, U16, u16);
    write_fn!(write_u32, U32, u32);
    write_fn!(write_u64, U64, u64);
    write_fn!(write_f64, F64, f64);
    write_fn!(write_string, String, &str, to_owned);
    write_fn!(write_json, Json, &str, to_owned);
    write_fn!(write_date, Date, NaiveDate);
    write_fn!(write_time, Time, NaiveTime);
    write_fn!(write_datetime, DateTime, NaiveDateTime);
    write_fn!(write_bytes, Bytes, &[u8], to_owned);
    write_fn!(write_uuid, Uuid, Uuid);
}

/// Source for deserialized records.
pub trait Reader {
    fn read_start(&mut self, name: &str) -> Result<(), StreamError>;
    /// Returns the element count.
    fn read_start_list(&mut self, name: &str) -> Result<usize, StreamError>;
    fn read_end(&mut self, name: &str) -> Result<(), StreamError>;
    fn read_value(&mut self, tag: &str) -> Result<Value, StreamError>;

    read_fn!(read_bool, Bool, bool);
    read_fn!(read_char, Char, char);
    read_fn!(read_i8, I8, i8);
    read_fn!(read_i16, I16, i16);
    read_fn!(read_i32, I32, i32);
    read_fn!(read_i64, I64, i64);
    read_fn!(read_u8, U8, u8);
    read_fn!(read_u16, U16, u16);
    read_fn!(read_u32, U32, u32);
    read_fn!(read_u64, U64, u64);
    read_fn!(read_f64, F64, f64);
    read_fn!(read_string, String, String);
    read_fn!(read_json, Json, String);
    read_fn!(read_date, Date, NaiveDate);
    read_fn!(read_time, Time, NaiveTime);
    read_fn!(read_datetime, DateTime, NaiveDateTime);
    read_fn!(read_bytes, Bytes, Vec<u8>);
    read_fn!(read_uuid, Uuid, Uuid);
}

pub struct StreamWriter<'a> {
    stream: &'a mut Stream,
}

impl Writer for StreamWriter<'_> {
    fn write_start(&mut self, name: &str) -> Result<(), StreamError> {
        self.stream.entries.push(Entry::Start(name.to_string()));
        Ok(())
    }

    fn write_start_list(&mut self, name: &str, len: usize) -> Result<(), StreamError> {
        self.stream
            .entries
            .push(Entry::StartList(name.to_string(), len));
        Ok(())
    }

    fn write_end(&mut self, name: &str) -> Result<(), StreamError> {
        self.stream.entries.push(Entry::End(name.to_string()));
        Ok(())
    }

    fn write_value(&mut self, tag: &str, value: Value) -> Result<(), StreamError> {
        self.stream
            .entries
            .push(Entry::Value(tag.to_string(), value));
        Ok(())
    }
}

pub struct StreamReader<'a> {
    entries: &'a [Entry],
    pos: usize,
}

impl<'a> StreamReader<'a> {
    fn next(&mut self, expected: &str) -> Result<&'a Entry, StreamError> {
        let entry = self
            .entries
            .get(self.pos)
            .ok_or_else(|| StreamError::Eof(expected.to_string()))?;
        if entry.tag() != expected {
            return Err(StreamError::TagMismatch {
                expected: expected.to_string(),
                found: entry.tag().to_string(),
            });
        }
        self.pos += 1;
        Ok(entry)
    }

    fn marker_mismatch(expected: &str, entry: &Entry) -> StreamError {
        StreamError::TagMismatch {
            expected: expected.to_string(),
            found: format!("{entry:?}"),
        }
    }

    /// True once every entry has been consumed.
    pub fn is_done(&self) -> bool {
        self.pos >= self.entries.len()
    }
}

impl Reader for StreamReader<'_> {
    fn read_start(&mut self, name: &str) -> Result<(), StreamError> {
        match self.next(name)? {
            Entry::Start(_) => Ok(()),
            other => Err(Self::marker_mismatch(name, other)),
        }
    }

    fn read_start_list(&mut self, name: &str) -> Result<usize, StreamError> {
        match self.next(name)? {
            Entry::StartList(_, len) => Ok(*len),
            other => Err(Self::marker_mismatch(name, other)),
        }
    }

    fn read_end(&mut self, name: &str) -> Result<(), StreamError> {
        match self.next(name)? {
            Entry::End(_) => Ok(()),
            other => Err(Self::marker_mismatch(name, other)),
        }
    }

    fn read_value(&mut self, tag: &str) -> Result<Value, StreamError> {
        match self.next(tag)? {
            Entry::Value(_, v) => Ok(v.clone()),
            other => Err(Self::marker_mismatch(tag, other)),
        }
    }
}

/// Implemented by every generated record and list.
pub trait Serializable {
    /// Writes `self` as one object named `name` (the type's own name when
    /// `None`).
    fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError>;

    fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError>;
}

/// A primitive that can be an element of a `Vec` field.
pub trait Item: Sized {
    fn write_item(&self, w: &mut dyn Writer, tag: &str) -> Result<(), StreamError>;
    fn read_item(r: &mut dyn Reader, tag: &str) -> Result<Self, StreamError>;
}

macro_rules! item_copy {
    ($($ty:ty => $write:ident, $read:ident;)*) => {$(
        impl Item for $ty {
            fn write_item(&self, w: &mut dyn Writer, tag: &str) -> Result<(), StreamError> {
                w.$write(tag, *self)
            }
            fn read_item(r: &mut dyn Reader, tag: &str) -> Result<Self, StreamError> {
                r.$read(tag)
            }
        }
    )*};
}

item_copy! {
    bool => write_bool, read_bool;
    char => write_char, read_char;
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    f64 => write_f64, read_f64;
    NaiveDate => write_date, read_date;
    NaiveTime => write_time, read_time;
    NaiveDateTime => write_datetime, read_datetime;
    Uuid => write_uuid, read_uuid;
}

impl Item for String {
    fn write_item(&self, w: &mut dyn Writer, tag: &str) -> Result<(), StreamError> {
        w.write_string(tag, self)
    }
    fn read_item(r: &mut dyn Reader, tag: &str) -> Result<Self, StreamError> {
        r.read_string(tag)
    }
}

impl Item for Vec<u8> {
    fn write_item(&self, w: &mut dyn Writer, tag: &str) -> Result<(), StreamError> {
        w.write_bytes(tag, self)
    }
    fn read_item(r: &mut dyn Reader, tag: &str) -> Result<Self, StreamError> {
        r.read_bytes(tag)
    }
}

const ITEM_TAG: &str = "item";

impl<T: Item> Serializable for Vec<T> {
    fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("list");
        w.write_start_list(name, self.len())?;
        for item in self {
            item.write_item(w, ITEM_TAG)?;
        }
        w.write_end(name)
    }

    fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("list");
        let count = r.read_start_list(name)?;
        self.clear();
        self.reserve(count);
        for _ in 0..count {
            self.push(T::read_item(r, ITEM_TAG)?);
        }
        r.read_end(name)
    }
}
