use std::{
    collections::{hash_map::Entry, HashMap},
    str::FromStr,
};

use anyhow::{bail, Result};
use quick_xml::{events::BytesStart, Reader};

use super::XmlReaderConversions;

#[derive(Debug)]
pub(crate) struct Attributes {
    element: String,
    data: HashMap<String, String>,
}

impl Attributes {
    /// Creates a new Attributes object by parsing out all the attributes of the
    /// specified tag.
    pub(crate) fn new<R>(tag: &BytesStart<'_>, xml_reader: &Reader<R>) -> Result<Self> {
        let element = xml_reader.bytes_to_string(tag.name().as_ref())?;
        let mut data = HashMap::new();

        for attr in tag.attributes() {
            let attr = attr?;
            let key = attr.key.into_inner();
            let key = xml_reader.bytes_to_string(key)?;
            let value = xml_reader.cow_to_string(attr.value)?;

            data.insert(key, value);
        }

        Ok(Self { element, data })
    }

    /// Returns true if every attribute has been taken.
    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The names of the attributes nobody asked for, sorted.
    pub(crate) fn remaining_keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Gets a mandatory attribute. The attribute is removed from the list
    /// of attributes and returned to the caller.
    pub(crate) fn get<T: FromStr>(&mut self, key: &str) -> Result<T> {
        match self.get_optional(key)? {
            Some(v) => Ok(v),
            None => bail!(
                "Mandatory attribute '{key}' was missing on the '{}' element",
                self.element
            ),
        }
    }

    /// Gets an optional attribute. If present it must parse.
    pub(crate) fn get_optional<T: FromStr>(&mut self, key: &str) -> Result<Option<T>> {
        let value = match self.data.entry(key.to_string()) {
            Entry::Occupied(occupied_entry) => occupied_entry.remove(),
            Entry::Vacant(_) => return Ok(None),
        };

        match value.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => bail!(
                "Could not parse attribute '{key}={value}' on the '{}' element into {}",
                self.element,
                std::any::type_name::<T>()
            ),
        }
    }
}
