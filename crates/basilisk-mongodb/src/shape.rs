//! Serde shape capture
//!
//! BSON alone cannot tell a struct from a map: both serialize to a document.
//! [`ShapeSerializer`] walks a `Serialize` value and records only which parts
//! were structs and which were sequences, so the flattener can descend into
//! structs and treat maps as opaque leaves.

use serde::ser::{self, Serialize};

type ShapeResult<T> = std::result::Result<T, bson::ser::Error>;

/// Structural outline of a serialized value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape {
    /// Anything that is neither a struct nor a sequence, maps included
    Leaf,
    /// A struct with its serialized field names in declaration order
    Record(Vec<(&'static str, Shape)>),
    /// A sequence with one outline per element
    Sequence(Vec<Shape>),
}

impl Shape {
    /// Outline of the field serialized under `name`, if it was serialized.
    pub(crate) fn field(&self, name: &str) -> Option<&Shape> {
        match self {
            Shape::Record(fields) => fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, shape)| shape),
            _ => None,
        }
    }
}

/// Capture the outline of `value`.
pub(crate) fn shape_of<T: Serialize + ?Sized>(value: &T) -> ShapeResult<Shape> {
    value.serialize(ShapeSerializer)
}

pub(crate) struct ShapeSerializer;

pub(crate) struct RecordShape {
    fields: Vec<(&'static str, Shape)>,
}

pub(crate) struct SequenceShape {
    elements: Vec<Shape>,
}

/// Swallows the contents of compound values that flatten as a single leaf.
pub(crate) struct OpaqueShape;

impl ser::Serializer for ShapeSerializer {
    type Ok = Shape;
    type Error = bson::ser::Error;

    type SerializeSeq = SequenceShape;
    type SerializeTuple = OpaqueShape;
    type SerializeTupleStruct = OpaqueShape;
    type SerializeTupleVariant = OpaqueShape;
    type SerializeMap = OpaqueShape;
    type SerializeStruct = RecordShape;
    type SerializeStructVariant = OpaqueShape;

    fn serialize_bool(self, _v: bool) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_i8(self, _v: i8) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_i16(self, _v: i16) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_i32(self, _v: i32) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_i64(self, _v: i64) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_u8(self, _v: u8) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_u16(self, _v: u16) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_u32(self, _v: u32) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_u64(self, _v: u64) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_f32(self, _v: f32) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_f64(self, _v: f64) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_char(self, _v: char) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_str(self, _v: &str) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_bytes(self, _v: &[u8]) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_none(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> ShapeResult<Shape> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> ShapeResult<Shape> {
        value.serialize(self)
    }

    // Encoded by BSON as `{variant: value}`, which is not a struct.
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }

    fn serialize_seq(self, len: Option<usize>) -> ShapeResult<SequenceShape> {
        Ok(SequenceShape {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, _len: usize) -> ShapeResult<OpaqueShape> {
        Ok(OpaqueShape)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> ShapeResult<OpaqueShape> {
        Ok(OpaqueShape)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> ShapeResult<OpaqueShape> {
        Ok(OpaqueShape)
    }

    fn serialize_map(self, _len: Option<usize>) -> ShapeResult<OpaqueShape> {
        Ok(OpaqueShape)
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> ShapeResult<RecordShape> {
        Ok(RecordShape {
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> ShapeResult<OpaqueShape> {
        Ok(OpaqueShape)
    }
}

impl ser::SerializeStruct for RecordShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> ShapeResult<()> {
        self.fields.push((key, value.serialize(ShapeSerializer)?));
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Record(self.fields))
    }
}

impl ser::SerializeSeq for SequenceShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> ShapeResult<()> {
        self.elements.push(value.serialize(ShapeSerializer)?);
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Sequence(self.elements))
    }
}

impl ser::SerializeTuple for OpaqueShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, _value: &T) -> ShapeResult<()> {
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }
}

impl ser::SerializeTupleStruct for OpaqueShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> ShapeResult<()> {
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }
}

impl ser::SerializeTupleVariant for OpaqueShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _value: &T) -> ShapeResult<()> {
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }
}

impl ser::SerializeMap for OpaqueShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, _key: &T) -> ShapeResult<()> {
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, _value: &T) -> ShapeResult<()> {
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }
}

impl ser::SerializeStructVariant for OpaqueShape {
    type Ok = Shape;
    type Error = bson::ser::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> ShapeResult<()> {
        Ok(())
    }

    fn end(self) -> ShapeResult<Shape> {
        Ok(Shape::Leaf)
    }
}
