//! Master element operations: finding, creating and replacing children, typed access with schema
//! defaults, mandatory-child checks and CRC-32 checksums.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::element::Element;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::schema;
use crate::value::{DateValue, Value};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The CRC-32 stored by EBML checksum elements (the IEEE polynomial, as used by zlib).
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

impl Element {
    /// Finds the first child with the given ID.
    pub fn find_first(&self, id: Id) -> Option<&Element> {
        self.children().iter().find(|c| c.id == id)
    }

    /// Finds the first child with the given ID, for editing.
    pub fn find_first_mut(&mut self, id: Id) -> Option<&mut Element> {
        self.children_mut()
            .ok()
            .and_then(|children| children.iter_mut().find(|c| c.id == id))
    }

    /// Finds all children with the given ID, in order.
    pub fn find_all(&self, id: Id) -> impl Iterator<Item = &Element> {
        self.children().iter().filter(move |c| c.id == id)
    }

    /// Finds the first child with the given ID, appending a new one (see `Element::new`) if there
    /// is none.
    pub fn find_or_create(&mut self, id: Id) -> EbmlResult<&mut Element> {
        let children = self.children_mut()?;
        let index = match children.iter().position(|c| c.id == id) {
            Some(index) => index,
            None => {
                children.push(Element::new(id));
                children.len() - 1
            }
        };
        Ok(&mut children[index])
    }

    fn check_child(&self, child: Id) -> EbmlResult<()> {
        if !self.is_master() {
            return Err(EbmlError::NotAMaster(self.id));
        }
        if schema::is_legal_child(Some(self.id), child) {
            Ok(())
        } else {
            Err(EbmlError::IllegalChild {
                parent: self.name(),
                child: schema::name_of(child),
            })
        }
    }

    /// Appends a new child of the given type and returns it. Fails if the schema does not allow
    /// it here.
    pub fn add_new(&mut self, id: Id) -> EbmlResult<&mut Element> {
        self.check_child(id)?;
        let children = self.children_mut()?;
        children.push(Element::new(id));
        let last = children.len() - 1;
        Ok(&mut children[last])
    }

    /// Appends an existing element as a child. Fails if the schema does not allow it here.
    pub fn push_child(&mut self, child: Element) -> EbmlResult<()> {
        self.check_child(child.id)?;
        self.children_mut()?.push(child);
        Ok(())
    }

    /// Replaces the first child with the same ID, or appends the element if there is none.
    pub fn replace(&mut self, child: Element) -> EbmlResult<()> {
        self.check_child(child.id)?;
        let children = self.children_mut()?;
        match children.iter().position(|c| c.id == child.id) {
            Some(index) => children[index] = child,
            None => children.push(child),
        }
        Ok(())
    }

    /// Removes all children with the given ID, returning how many there were.
    pub fn remove_all(&mut self, id: Id) -> usize {
        match self.children_mut() {
            Ok(children) => {
                let before = children.len();
                children.retain(|c| c.id != id);
                before - children.len()
            }
            Err(_) => 0,
        }
    }

    // The child's value, or the schema default if the child is absent.
    fn child_value(&self, id: Id) -> Option<Value> {
        match self.find_first(id) {
            Some(child) => child.value().cloned(),
            None => schema::lookup(id).and_then(|ctx| ctx.default_value()),
        }
    }

    /// The unsigned integer value of the first child with the given ID, or its default.
    pub fn get_uint(&self, id: Id) -> Option<u64> {
        self.child_value(id).and_then(|v| v.as_uint())
    }

    /// The signed integer value of the first child with the given ID, or its default.
    pub fn get_sint(&self, id: Id) -> Option<i64> {
        self.child_value(id).and_then(|v| v.as_sint())
    }

    /// The float value of the first child with the given ID, or its default.
    pub fn get_float(&self, id: Id) -> Option<f64> {
        self.child_value(id).and_then(|v| v.as_float())
    }

    /// The string value of the first child with the given ID, or its default.
    pub fn get_string(&self, id: Id) -> Option<String> {
        match self.child_value(id) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The binary value of the first child with the given ID.
    pub fn get_binary(&self, id: Id) -> Option<&[u8]> {
        self.find_first(id).and_then(Element::as_binary)
    }

    /// The date value of the first child with the given ID.
    pub fn get_date(&self, id: Id) -> Option<DateValue> {
        self.find_first(id).and_then(Element::as_date)
    }

    /// Sets the value of the first child with the given ID, creating the child if needed.
    pub fn set_child<V: Into<Value>>(&mut self, id: Id, value: V) -> EbmlResult<()> {
        self.check_child(id)?;
        self.find_or_create(id)?.set_value(value);
        Ok(())
    }

    /// Sets an unsigned integer child.
    pub fn set_uint(&mut self, id: Id, value: u64) -> EbmlResult<()> {
        self.set_child(id, value)
    }

    /// Sets a signed integer child.
    pub fn set_sint(&mut self, id: Id, value: i64) -> EbmlResult<()> {
        self.set_child(id, value)
    }

    /// Sets a float child.
    pub fn set_float(&mut self, id: Id, value: f64) -> EbmlResult<()> {
        self.set_child(id, value)
    }

    /// Sets a string child.
    pub fn set_string<S: Into<String>>(&mut self, id: Id, value: S) -> EbmlResult<()> {
        self.set_child(id, value.into())
    }

    /// Sets a binary child.
    pub fn set_binary<B: Into<Vec<u8>>>(&mut self, id: Id, value: B) -> EbmlResult<()> {
        self.set_child(id, value.into())
    }

    /// Sets a date child.
    pub fn set_date(&mut self, id: Id, value: DateValue) -> EbmlResult<()> {
        self.set_child(id, value)
    }

    /// Names of the mandatory elements without a default that are missing from this master or,
    /// recursively, from its children. Every missing name is reported, not just the first.
    pub fn check_mandatory(&self) -> Vec<&'static str> {
        if !self.is_master() || self.dummy {
            return Vec::new();
        }
        let mut missing: Vec<&'static str> = schema::children_of(Some(self.id))
            .into_iter()
            .filter(|ctx| ctx.is_required() && self.find_first(ctx.id).is_none())
            .map(|ctx| ctx.name)
            .collect();
        for child in self.children() {
            missing.extend(child.check_mandatory());
        }
        missing
    }

    /// Fails with `MissingMandatory` if `check_mandatory` reports anything.
    pub fn validate(&self) -> EbmlResult<()> {
        let missing = self.check_mandatory();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EbmlError::MissingMandatory(
                missing.into_iter().map(String::from).collect(),
            ))
        }
    }

    /// Writes a CRC-32 element in front of the children when rendering.
    pub fn enable_checksum(&mut self, enabled: bool) -> EbmlResult<()> {
        if !self.is_master() {
            return Err(EbmlError::NotAMaster(self.id));
        }
        self.checksum = enabled;
        Ok(())
    }

    /// True if the master is written with a CRC-32 element.
    pub fn has_checksum(&self) -> bool {
        self.checksum
    }

    /// The outcome of checking the CRC-32 element found when the master was read, or `None` if
    /// it had none.
    pub fn verify_checksum(&self) -> Option<bool> {
        self.checksum_valid
    }
}
