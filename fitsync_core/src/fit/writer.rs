use std::collections::HashMap;

use log::debug;

use crate::error::{SyncError, SyncResult};

use super::{
    crc::fit_crc,
    profile::{Profile, ResolvedField},
};

pub const HEADER_SIZE: u8 = 12;
pub const PROTOCOL_VERSION: u8 = 0x10;
pub const PROFILE_VERSION: u16 = 152;
pub const FILE_TAG: &[u8; 4] = b".FIT";

const DEFINITION_FLAG: u8 = 0x40;
const MAX_LOCAL_ID: u8 = 0x0F;
const LITTLE_ENDIAN: u8 = 0;

/// A value for one field of a data message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Write the field's invalid marker.
    Invalid,
    Number(f64),
    /// A symbol of the field's enumeration, e.g. "garmin".
    Symbol(&'static str),
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&'static str> for Value {
    fn from(v: &'static str) -> Self {
        Value::Symbol(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Invalid, Into::into)
    }
}

#[derive(Debug)]
struct Definition {
    message: &'static str,
    fields: Vec<ResolvedField>,
}

/// Builds the body of a FIT file message by message, then wraps it with
/// the header and CRC. Field names are checked against the profile when a
/// definition is written, so a data message can only fail on a bad
/// enumeration symbol.
#[derive(Debug)]
pub struct FitWriter<'p> {
    profile: &'p Profile,
    definitions: HashMap<u8, Definition>,
    body: Vec<u8>,
    data_messages: usize,
}

impl<'p> FitWriter<'p> {
    pub fn new(profile: &'p Profile) -> Self {
        Self {
            profile,
            definitions: HashMap::new(),
            body: Vec::with_capacity(4096),
            data_messages: 0,
        }
    }

    /// Writes a definition message binding `local_id` to the named global
    /// message and list of fields. Any previous binding of `local_id` is
    /// replaced.
    pub fn define(&mut self, local_id: u8, message: &str, fields: &[&str]) -> SyncResult<()> {
        assert!(local_id <= MAX_LOCAL_ID, "local message id {local_id} out of range");

        let spec = self.profile.message(message)?;
        let fields = fields
            .iter()
            .map(|name| spec.field(name))
            .collect::<SyncResult<Vec<_>>>()?;

        self.body.push(DEFINITION_FLAG | local_id);
        self.body.push(0); // reserved
        self.body.push(LITTLE_ENDIAN);
        self.body.extend_from_slice(&spec.number.to_le_bytes());
        self.body.push(fields.len() as u8);
        for f in &fields {
            self.body.extend_from_slice(&[f.number, f.base.size(), f.base.id()]);
        }

        debug!(
            "FIT definition: local {local_id} -> {} [{}]",
            spec.name,
            describe_fields(&fields)
        );

        self.definitions.insert(
            local_id,
            Definition {
                message: spec.name,
                fields,
            },
        );

        Ok(())
    }

    /// Writes a data message using the definition previously bound to
    /// `local_id`. `values` must line up with the defined fields.
    ///
    /// # Panics
    /// If `local_id` has not been defined, or the number of values does not
    /// match the definition. Both are bugs in the caller and would produce
    /// a file no reader could make sense of.
    pub fn write_data(&mut self, local_id: u8, values: &[Value]) -> SyncResult<()> {
        let Some(def) = self.definitions.get(&local_id) else {
            panic!("data message for local id {local_id} written before its definition");
        };
        assert_eq!(
            values.len(),
            def.fields.len(),
            "wrong number of values for a '{}' message",
            def.message
        );

        // Encode into a scratch buffer first so a bad symbol leaves the body
        // untouched.
        let mut msg = Vec::with_capacity(1 + def.fields.len() * 4);
        msg.push(local_id);
        for (field, value) in def.fields.iter().zip(values) {
            let stored = stored_value(self.profile, field, value)?;
            if stored.is_none() && !matches!(value, Value::Invalid) {
                debug!("{}.{}: {value:?} cannot be represented, writing invalid", def.message, field.name);
            }
            field.base.write(stored, &mut msg);
        }

        self.body.extend_from_slice(&msg);
        self.data_messages += 1;
        Ok(())
    }

    pub fn data_messages(&self) -> usize {
        self.data_messages
    }

    /// Prepends the header and appends the CRC, returning the complete file.
    pub fn finish(self) -> Vec<u8> {
        let mut file = Vec::with_capacity(HEADER_SIZE as usize + self.body.len() + 2);
        file.push(HEADER_SIZE);
        file.push(PROTOCOL_VERSION);
        file.extend_from_slice(&PROFILE_VERSION.to_le_bytes());
        file.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
        file.extend_from_slice(FILE_TAG);
        file.extend_from_slice(&self.body);

        let crc = fit_crc(&file);
        file.extend_from_slice(&crc.to_le_bytes());
        file
    }
}

/// "name (units)" for each field, in definition order.
fn describe_fields(fields: &[ResolvedField]) -> String {
    fields
        .iter()
        .map(|f| match f.units {
            "" => f.name.to_string(),
            units => format!("{} ({units})", f.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Applies, in order, enumeration lookup, offset and scale, then rounds to
/// the base type. None means "write the invalid marker".
fn stored_value(profile: &Profile, field: &ResolvedField, value: &Value) -> SyncResult<Option<f64>> {
    let v = match value {
        Value::Invalid => return Ok(None),
        Value::Number(n) => *n,
        Value::Symbol(symbol) => {
            let type_name = field.enum_type.ok_or_else(|| {
                SyncError::schema("value", format!("{}={symbol} (field has no enumeration)", field.name))
            })?;
            profile.enum_code(type_name, symbol)? as f64
        }
    };

    Ok(field.base.fit((v + field.offset) * field.scale))
}
