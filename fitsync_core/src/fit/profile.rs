//! The subset of the FIT profile we need to write activity files. The full
//! profile is published by Garmin as a spreadsheet; only the messages,
//! fields and enumeration values used by the encoder are carried here.
//!
//! A `Profile` is built once and then only ever read, so it can be shared
//! freely between threads.

use std::collections::HashMap;

use crate::error::{SyncError, SyncResult};

/// The FIT base types, with their identifiers as written into definition
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    Float32,
    Float64,
    UInt8z,
    UInt16z,
    UInt32z,
}

impl BaseType {
    /// The identifier written into field definitions. The top bit flags
    /// multi-byte types that are subject to endian conversion.
    pub fn id(self) -> u8 {
        match self {
            BaseType::Enum => 0x00,
            BaseType::SInt8 => 0x01,
            BaseType::UInt8 => 0x02,
            BaseType::SInt16 => 0x83,
            BaseType::UInt16 => 0x84,
            BaseType::SInt32 => 0x85,
            BaseType::UInt32 => 0x86,
            BaseType::Float32 => 0x88,
            BaseType::Float64 => 0x89,
            BaseType::UInt8z => 0x0A,
            BaseType::UInt16z => 0x8B,
            BaseType::UInt32z => 0x8C,
        }
    }

    /// Size of one value in bytes.
    pub fn size(self) -> u8 {
        match self {
            BaseType::Enum | BaseType::SInt8 | BaseType::UInt8 | BaseType::UInt8z => 1,
            BaseType::SInt16 | BaseType::UInt16 | BaseType::UInt16z => 2,
            BaseType::SInt32 | BaseType::UInt32 | BaseType::UInt32z | BaseType::Float32 => 4,
            BaseType::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, BaseType::Float32 | BaseType::Float64)
    }

    /// The range of values that can be stored without colliding with the
    /// invalid marker. Not meaningful for floats.
    fn valid_range(self) -> (f64, f64) {
        match self {
            BaseType::Enum | BaseType::UInt8 => (0.0, 254.0),
            BaseType::SInt8 => (i8::MIN as f64, (i8::MAX - 1) as f64),
            BaseType::SInt16 => (i16::MIN as f64, (i16::MAX - 1) as f64),
            BaseType::UInt16 => (0.0, (u16::MAX - 1) as f64),
            BaseType::SInt32 => (i32::MIN as f64, (i32::MAX - 1) as f64),
            BaseType::UInt32 => (0.0, (u32::MAX - 1) as f64),
            BaseType::UInt8z => (1.0, u8::MAX as f64),
            BaseType::UInt16z => (1.0, u16::MAX as f64),
            BaseType::UInt32z => (1.0, u32::MAX as f64),
            BaseType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            BaseType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Rounds a stored value to what this type can hold. Returns None if it
    /// cannot be represented, in which case the invalid marker is written.
    pub fn fit(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }

        let value = if self.is_float() { value } else { value.round() };
        let (min, max) = self.valid_range();
        (min..=max).contains(&value).then_some(value)
    }

    /// Appends the little-endian representation of `value`, which must
    /// already have gone through `fit`. None writes the invalid marker.
    pub fn write(self, value: Option<f64>, out: &mut Vec<u8>) {
        let Some(v) = value else {
            self.write_invalid(out);
            return;
        };

        match self {
            BaseType::Enum | BaseType::UInt8 | BaseType::UInt8z => out.push(v as u8),
            BaseType::SInt8 => out.extend_from_slice(&(v as i8).to_le_bytes()),
            BaseType::SInt16 => out.extend_from_slice(&(v as i16).to_le_bytes()),
            BaseType::UInt16 | BaseType::UInt16z => out.extend_from_slice(&(v as u16).to_le_bytes()),
            BaseType::SInt32 => out.extend_from_slice(&(v as i32).to_le_bytes()),
            BaseType::UInt32 | BaseType::UInt32z => out.extend_from_slice(&(v as u32).to_le_bytes()),
            BaseType::Float32 => out.extend_from_slice(&(v as f32).to_le_bytes()),
            BaseType::Float64 => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn write_invalid(self, out: &mut Vec<u8>) {
        match self {
            BaseType::Enum | BaseType::UInt8 => out.push(0xFF),
            BaseType::SInt8 => out.push(0x7F),
            BaseType::SInt16 => out.extend_from_slice(&i16::MAX.to_le_bytes()),
            BaseType::UInt16 => out.extend_from_slice(&u16::MAX.to_le_bytes()),
            BaseType::SInt32 => out.extend_from_slice(&i32::MAX.to_le_bytes()),
            BaseType::UInt32 | BaseType::Float32 => out.extend_from_slice(&u32::MAX.to_le_bytes()),
            BaseType::Float64 => out.extend_from_slice(&u64::MAX.to_le_bytes()),
            BaseType::UInt8z => out.push(0),
            BaseType::UInt16z => out.extend_from_slice(&0u16.to_le_bytes()),
            BaseType::UInt32z => out.extend_from_slice(&0u32.to_le_bytes()),
        }
    }
}

/// A named enumeration, e.g. 'manufacturer'. Values are written as their
/// numeric code.
#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: &'static str,
    pub values: &'static [(&'static str, u32)],
}

impl EnumType {
    pub fn code(&self, symbol: &str) -> Option<u32> {
        self.values
            .iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, code)| *code)
    }
}

/// One field of a message. Stored value = (value + offset) * scale.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub number: u8,
    pub name: &'static str,
    pub base: BaseType,
    /// The enumeration used to translate symbolic values, if any.
    pub enum_type: Option<&'static str>,
    pub scale: f64,
    pub offset: f64,
    pub units: &'static str,
    /// Alternative interpretations of the same field, selected by name.
    /// 'product' becomes 'garmin_product' when the manufacturer is Garmin.
    pub subfields: Vec<SubfieldSpec>,
}

#[derive(Debug, Clone)]
pub struct SubfieldSpec {
    pub name: &'static str,
    pub enum_type: Option<&'static str>,
    pub scale: f64,
    pub offset: f64,
}

/// A global message, e.g. 'record'.
#[derive(Debug, Clone)]
pub struct MessageSpec {
    pub number: u16,
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// A field as it will be encoded: the wire layout of the parent field plus
/// the value transform of whichever (sub)field was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: &'static str,
    pub number: u8,
    pub base: BaseType,
    pub enum_type: Option<&'static str>,
    pub scale: f64,
    pub offset: f64,
    pub units: &'static str,
}

impl MessageSpec {
    /// Looks up a field by name. Subfield names are accepted too and
    /// resolve to their parent's field number and base type.
    pub fn field(&self, name: &str) -> SyncResult<ResolvedField> {
        for f in &self.fields {
            if f.name == name {
                return Ok(ResolvedField {
                    name: f.name,
                    number: f.number,
                    base: f.base,
                    enum_type: f.enum_type,
                    scale: f.scale,
                    offset: f.offset,
                    units: f.units,
                });
            }

            if let Some(sf) = f.subfields.iter().find(|sf| sf.name == name) {
                return Ok(ResolvedField {
                    name: sf.name,
                    number: f.number,
                    base: f.base,
                    enum_type: sf.enum_type,
                    scale: sf.scale,
                    offset: sf.offset,
                    units: f.units,
                });
            }
        }

        Err(SyncError::schema(
            "field",
            format!("{}.{}", self.name, name),
        ))
    }
}

/// The message-schema table.
#[derive(Debug, Clone)]
pub struct Profile {
    messages: HashMap<&'static str, MessageSpec>,
    types: HashMap<&'static str, EnumType>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl Profile {
    /// Builds the table of messages and types used for activity files.
    pub fn new() -> Self {
        let types = [
            EnumType {
                name: "file",
                values: &[
                    ("device", 1),
                    ("settings", 2),
                    ("sport", 3),
                    ("activity", 4),
                    ("workout", 5),
                    ("course", 6),
                ],
            },
            EnumType {
                name: "manufacturer",
                values: &[
                    ("garmin", 1),
                    ("dynastream", 15),
                    ("development", 255),
                    ("bryton", 267),
                ],
            },
            EnumType {
                name: "garmin_product",
                values: &[
                    ("edge500", 1036),
                    ("edge800", 1169),
                    ("edge510", 1561),
                    ("edge810", 1567),
                ],
            },
        ];

        let messages = [
            MessageSpec {
                number: 0,
                name: "file_id",
                fields: vec![
                    field(0, "type", BaseType::Enum).enum_type("file"),
                    field(1, "manufacturer", BaseType::UInt16).enum_type("manufacturer"),
                    field(2, "product", BaseType::UInt16).subfield(SubfieldSpec {
                        name: "garmin_product",
                        enum_type: Some("garmin_product"),
                        scale: 1.0,
                        offset: 0.0,
                    }),
                    field(3, "serial_number", BaseType::UInt32z),
                    field(4, "time_created", BaseType::UInt32).units("s"),
                ],
            },
            MessageSpec {
                number: 20,
                name: "record",
                fields: vec![
                    field(253, "timestamp", BaseType::UInt32).units("s"),
                    field(0, "position_lat", BaseType::SInt32).units("semicircles"),
                    field(1, "position_long", BaseType::SInt32).units("semicircles"),
                    field(2, "altitude", BaseType::UInt16).scaled(5.0, 500.0).units("m"),
                    field(3, "heart_rate", BaseType::UInt8).units("bpm"),
                    field(4, "cadence", BaseType::UInt8).units("rpm"),
                    field(5, "distance", BaseType::UInt32).scaled(100.0, 0.0).units("m"),
                    field(6, "speed", BaseType::UInt16).scaled(1000.0, 0.0).units("m/s"),
                    field(13, "temperature", BaseType::SInt8).units("C"),
                ],
            },
        ];

        Self {
            messages: messages.into_iter().map(|m| (m.name, m)).collect(),
            types: types.into_iter().map(|t| (t.name, t)).collect(),
        }
    }

    pub fn message(&self, name: &str) -> SyncResult<&MessageSpec> {
        self.messages
            .get(name)
            .ok_or_else(|| SyncError::schema("message", name))
    }

    /// Translates a symbolic value of the named enumeration to its code.
    pub fn enum_code(&self, type_name: &str, symbol: &str) -> SyncResult<u32> {
        self.types
            .get(type_name)
            .ok_or_else(|| SyncError::schema("type", type_name))?
            .code(symbol)
            .ok_or_else(|| SyncError::schema("value", format!("{type_name}.{symbol}")))
    }
}

fn field(number: u8, name: &'static str, base: BaseType) -> FieldSpec {
    FieldSpec {
        number,
        name,
        base,
        enum_type: None,
        scale: 1.0,
        offset: 0.0,
        units: "",
        subfields: Vec::new(),
    }
}

impl FieldSpec {
    fn enum_type(mut self, enum_type: &'static str) -> Self {
        self.enum_type = Some(enum_type);
        self
    }

    fn scaled(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    fn units(mut self, units: &'static str) -> Self {
        self.units = units;
        self
    }

    fn subfield(mut self, subfield: SubfieldSpec) -> Self {
        self.subfields.push(subfield);
        self
    }
}
