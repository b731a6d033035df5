use std::{any::Any, fmt};

use super::{Format, SequenceReader, StructFormat, StructMember};
use crate::error::*;

/// A value as described by a [`Format`].
///
/// Data and strings borrow from the buffer they were decoded from, or from
/// the caller when encoding.
///
/// Equality compares sequences built from a [`SequenceSource`] item by
/// item. A decoded sequence is lazy and only equal to itself, so to compare
/// a decoded value against the one it was encoded from, collect the items of
/// its [`SequenceReader`] first.
#[derive(Debug, PartialEq)]
pub enum Value<'a> {
    Enum(u8),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Data(&'a [u8]),
    String(&'a str),
    Custom(Custom),
    Sequence(Sequence<'a>),
    Struct(StructValue<'a>),
    Union(UnionValue<'a>),
}

macro_rules! value_getter {
    ($($name:ident: $variant:ident -> $t:ty),*) => {
        $(
            pub fn $name(&self) -> Option<$t> {
                match self {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        )*
    };
}

impl<'a> Value<'a> {
    value_getter!(
        as_enum: Enum -> u8,
        as_u8: UInt8 -> u8,
        as_u16: UInt16 -> u16,
        as_u32: UInt32 -> u32,
        as_u64: UInt64 -> u64,
        as_i8: Int8 -> i8,
        as_i16: Int16 -> i16,
        as_i32: Int32 -> i32,
        as_i64: Int64 -> i64,
        as_data: Data -> &'a [u8],
        as_str: String -> &'a str
    );

    pub fn as_custom<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(c) => c.downcast_ref(),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue<'a>> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionValue<'a>> {
        match self {
            Value::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<Sequence<'a>> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

/// Value type of an opaque [`Format::Value`]
pub trait CustomValue: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq_value(&self, other: &dyn CustomValue) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq> CustomValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

pub struct Custom(Box<dyn CustomValue>);

impl Custom {
    pub fn new<T: CustomValue>(value: T) -> Self {
        Custom(Box::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref()
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        (*self.0).eq_value(&*other.0)
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Source of the items of a sequence being encoded
pub trait SequenceSource {
    /// Call `f` for every item in order, stopping at the first error
    fn enumerate(&self, f: &mut dyn FnMut(&Value<'_>) -> Result<(), Error>) -> Result<(), Error>;
}

impl<'a> SequenceSource for Vec<Value<'a>> {
    fn enumerate(&self, f: &mut dyn FnMut(&Value<'_>) -> Result<(), Error>) -> Result<(), Error> {
        for item in self {
            f(item)?;
        }
        Ok(())
    }
}

/// Items of a sequence.
///
/// A decoded sequence is read lazily from the input buffer and can only be
/// walked once.
pub enum Sequence<'a> {
    Decoded(SequenceReader<'a>),
    Source(Box<dyn SequenceSource + 'a>),
}

impl<'a> Sequence<'a> {
    pub fn from_values(values: Vec<Value<'a>>) -> Self {
        Sequence::Source(Box::new(values))
    }

    pub fn from_source<S: SequenceSource + 'a>(source: S) -> Self {
        Sequence::Source(Box::new(source))
    }

    pub fn decoded(self) -> Option<SequenceReader<'a>> {
        match self {
            Sequence::Decoded(r) => Some(r),
            Sequence::Source(_) => None,
        }
    }
}

// Sources are compared item by item. A decoded sequence can only be walked
// once, so it is only equal to itself.
impl<'a> PartialEq for Sequence<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Sequence::Source(a), Sequence::Source(b)) => sources_eq(a.as_ref(), b.as_ref()),
            (Sequence::Decoded(a), Sequence::Decoded(b)) => std::ptr::eq(a, b),
            _ => false,
        }
    }
}

fn source_len(source: &dyn SequenceSource) -> Result<usize, Error> {
    let mut len = 0;
    source.enumerate(&mut |_| {
        len += 1;
        Ok(())
    })?;
    Ok(len)
}

// Sources only hand out items through a callback, so item `i` of `a` is
// looked up with a walk over `b`. A failing source is never equal.
fn sources_eq(a: &dyn SequenceSource, b: &dyn SequenceSource) -> bool {
    match (source_len(a), source_len(b)) {
        (Ok(m), Ok(n)) if m == n => (),
        _ => return false,
    }
    let mut i = 0;
    let mut equal = true;
    let walked = a.enumerate(&mut |x| {
        let mut j = 0;
        b.enumerate(&mut |y| {
            if j == i && !Value::eq(x, y) {
                equal = false;
            }
            j += 1;
            Ok(())
        })?;
        i += 1;
        Ok(())
    });
    walked.is_ok() && equal
}

impl<'a> fmt::Debug for Sequence<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Decoded(_) => write!(f, "Sequence(decoded)"),
            Sequence::Source(_) => write!(f, "Sequence(source)"),
        }
    }
}

/// Value of a struct, one slot per member of its format
pub struct StructValue<'a> {
    format: &'static StructFormat,
    members: Vec<Option<Value<'a>>>,
}

impl<'a> StructValue<'a> {
    /// Start building a value of the struct `format`
    pub fn builder(format: &'static Format) -> StructBuilder<'a> {
        match format {
            Format::Struct(f) => StructBuilder {
                value: StructValue::new(f, f.members.iter().map(|_| None).collect()),
            },
            _ => panic!("Not a struct format"),
        }
    }

    pub(crate) fn new(format: &'static StructFormat, members: Vec<Option<Value<'a>>>) -> Self {
        StructValue { format, members }
    }

    fn position(&self, name: &str) -> usize {
        self.format
            .members
            .iter()
            .position(|m| m.name == name)
            .unwrap_or_else(|| panic!("No struct member named {}", name))
    }

    /// Value of the member `name`, `None` if an optional member is not set
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        self.members[self.position(name)].as_ref()
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Move the value of member `name` out, leaving it unset
    pub fn take(&mut self, name: &str) -> Option<Value<'a>> {
        let i = self.position(name);
        self.members[i].take()
    }

    pub fn members(&self) -> impl Iterator<Item = (&'static StructMember, Option<&Value<'a>>)> {
        self.format.members.iter().zip(self.members.iter().map(|m| m.as_ref()))
    }
}

impl<'a> PartialEq for StructValue<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<'a> fmt::Debug for StructValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StructValue");
        for (member, value) in self.members() {
            s.field(member.name, &value);
        }
        s.finish()
    }
}

pub struct StructBuilder<'a> {
    value: StructValue<'a>,
}

impl<'a> StructBuilder<'a> {
    pub fn set(mut self, name: &str, value: Value<'a>) -> Self {
        let i = self.value.position(name);
        self.value.members[i] = Some(value);
        self
    }

    pub fn build(self) -> StructValue<'a> {
        self.value
    }
}

/// Value of a union, `tag` selects the variant
#[derive(Debug, PartialEq)]
pub struct UnionValue<'a> {
    pub tag: u8,
    pub value: Box<Value<'a>>,
}

impl<'a> UnionValue<'a> {
    pub fn new(tag: u8, value: Value<'a>) -> Self {
        UnionValue {
            tag,
            value: Box::new(value),
        }
    }
}
