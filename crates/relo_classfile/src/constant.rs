//! The constant pool.

use std::collections::HashMap;

use crate::bytes::ByteReader;
use crate::error::ClassFileError;
use crate::mutf8;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Largest number of pool slots (the count field is a `u16`).
const MAX_SLOTS: usize = u16::MAX as usize;

/// One constant-pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0, and the slot following every `Long` and `Double`.
    Unusable,
    /// Raw modified UTF-8 bytes.
    Utf8(Vec<u8>),
    /// A 32-bit integer.
    Integer(u32),
    /// A 32-bit float, as raw bits.
    Float(u32),
    /// A 64-bit integer. Occupies two slots.
    Long(u64),
    /// A 64-bit float, as raw bits. Occupies two slots.
    Double(u64),
    /// A class or array type; `name` points at an internal name or descriptor.
    Class {
        /// Index of the `Utf8` name.
        name: u16,
    },
    /// A string literal.
    String {
        /// Index of the `Utf8` value.
        string: u16,
    },
    /// A field reference.
    Fieldref {
        /// Index of the owning `Class`.
        class: u16,
        /// Index of the `NameAndType`.
        name_and_type: u16,
    },
    /// A class method reference.
    Methodref {
        /// Index of the owning `Class`.
        class: u16,
        /// Index of the `NameAndType`.
        name_and_type: u16,
    },
    /// An interface method reference.
    InterfaceMethodref {
        /// Index of the owning `Class`.
        class: u16,
        /// Index of the `NameAndType`.
        name_and_type: u16,
    },
    /// A member name and descriptor.
    NameAndType {
        /// Index of the `Utf8` member name.
        name: u16,
        /// Index of the `Utf8` field or method descriptor.
        descriptor: u16,
    },
    /// A method handle.
    MethodHandle {
        /// Reference kind (1..=9).
        kind: u8,
        /// Index of the referenced member.
        reference: u16,
    },
    /// A method type.
    MethodType {
        /// Index of the `Utf8` method descriptor.
        descriptor: u16,
    },
    /// A dynamically computed constant.
    Dynamic {
        /// Index into `BootstrapMethods`.
        bootstrap: u16,
        /// Index of the `NameAndType`.
        name_and_type: u16,
    },
    /// An `invokedynamic` call site.
    InvokeDynamic {
        /// Index into `BootstrapMethods`.
        bootstrap: u16,
        /// Index of the `NameAndType`.
        name_and_type: u16,
    },
    /// A module name (module-info only).
    Module {
        /// Index of the `Utf8` name.
        name: u16,
    },
    /// A package name in internal form (module-info only).
    Package {
        /// Index of the `Utf8` name.
        name: u16,
    },
}

impl Constant {
    fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// An indexable constant pool.
///
/// Slot 0 is always [`Constant::Unusable`], so pool indices map directly to
/// vector positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
    utf8_index: HashMap<Vec<u8>, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Creates a pool holding only the unusable slot 0.
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
            utf8_index: HashMap::new(),
        }
    }

    /// Parses the `constant_pool_count` and the entries that follow it.
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        let mut pool = Self::new();
        pool.entries.reserve(usize::from(count));
        let mut index: u16 = 1;
        while index < count {
            let tag = r.u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = usize::from(r.u16()?);
                    Constant::Utf8(r.bytes(len)?.to_vec())
                }
                TAG_INTEGER => Constant::Integer(r.u32()?),
                TAG_FLOAT => Constant::Float(r.u32()?),
                TAG_LONG => Constant::Long(r.u64()?),
                TAG_DOUBLE => Constant::Double(r.u64()?),
                TAG_CLASS => Constant::Class { name: r.u16()? },
                TAG_STRING => Constant::String { string: r.u16()? },
                TAG_FIELDREF => Constant::Fieldref {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_METHODREF => Constant::Methodref {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_INTERFACE_METHODREF => Constant::InterfaceMethodref {
                    class: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: r.u16()?,
                    descriptor: r.u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    kind: r.u8()?,
                    reference: r.u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor: r.u16()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap: r.u16()?,
                    name_and_type: r.u16()?,
                },
                TAG_MODULE => Constant::Module { name: r.u16()? },
                TAG_PACKAGE => Constant::Package { name: r.u16()? },
                _ => return Err(ClassFileError::BadConstantTag { index, tag }),
            };
            let wide = constant.is_wide();
            pool.push_parsed(constant);
            index += 1;
            if wide {
                if index >= count {
                    return Err(ClassFileError::BadConstantIndex {
                        index,
                        expected: "second slot of a wide",
                    });
                }
                pool.entries.push(Constant::Unusable);
                index += 1;
            }
        }
        Ok(pool)
    }

    fn push_parsed(&mut self, constant: Constant) {
        let index = self.entries.len() as u16;
        if let Constant::Utf8(bytes) = &constant {
            self.utf8_index.entry(bytes.clone()).or_insert(index);
        }
        self.entries.push(constant);
    }

    /// Serializes the count and all entries.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for constant in &self.entries[1..] {
            match constant {
                Constant::Unusable => {}
                Constant::Utf8(bytes) => {
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                    out.extend_from_slice(bytes);
                }
                Constant::Integer(v) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Float(v) => {
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Long(v) => {
                    out.push(TAG_LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Double(v) => {
                    out.push(TAG_DOUBLE);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Constant::Class { name } => put(out, TAG_CLASS, &[*name]),
                Constant::String { string } => put(out, TAG_STRING, &[*string]),
                Constant::Fieldref {
                    class,
                    name_and_type,
                } => put(out, TAG_FIELDREF, &[*class, *name_and_type]),
                Constant::Methodref {
                    class,
                    name_and_type,
                } => put(out, TAG_METHODREF, &[*class, *name_and_type]),
                Constant::InterfaceMethodref {
                    class,
                    name_and_type,
                } => put(out, TAG_INTERFACE_METHODREF, &[*class, *name_and_type]),
                Constant::NameAndType { name, descriptor } => {
                    put(out, TAG_NAME_AND_TYPE, &[*name, *descriptor])
                }
                Constant::MethodHandle { kind, reference } => {
                    out.push(TAG_METHOD_HANDLE);
                    out.push(*kind);
                    out.extend_from_slice(&reference.to_be_bytes());
                }
                Constant::MethodType { descriptor } => put(out, TAG_METHOD_TYPE, &[*descriptor]),
                Constant::Dynamic {
                    bootstrap,
                    name_and_type,
                } => put(out, TAG_DYNAMIC, &[*bootstrap, *name_and_type]),
                Constant::InvokeDynamic {
                    bootstrap,
                    name_and_type,
                } => put(out, TAG_INVOKE_DYNAMIC, &[*bootstrap, *name_and_type]),
                Constant::Module { name } => put(out, TAG_MODULE, &[*name]),
                Constant::Package { name } => put(out, TAG_PACKAGE, &[*name]),
            }
        }
    }

    /// Number of slots, including slot 0. This is the on-disk count field.
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the entry at `index`.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(usize::from(index))
    }

    pub(crate) fn get_mut(&mut self, index: u16) -> Option<&mut Constant> {
        self.entries.get_mut(usize::from(index))
    }

    /// Iterates over `(index, entry)` pairs, skipping unusable slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != Constant::Unusable)
            .map(|(i, c)| (i as u16, c))
    }

    /// Returns the raw bytes of the `Utf8` entry at `index`.
    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8], ClassFileError> {
        match self.get(index) {
            Some(Constant::Utf8(bytes)) => Ok(bytes),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Decodes the `Utf8` entry at `index`.
    pub fn utf8(&self, index: u16) -> Result<String, ClassFileError> {
        mutf8::decode(self.utf8_bytes(index)?).ok_or(ClassFileError::InvalidUtf8 { index })
    }

    /// Returns the name of the `Class` entry at `index`.
    pub fn class_name(&self, index: u16) -> Result<String, ClassFileError> {
        match self.get(index) {
            Some(Constant::Class { name }) => self.utf8(*name),
            _ => Err(ClassFileError::BadConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// Returns the index of a `Utf8` entry holding `value`, appending one if
    /// no identical entry exists.
    pub fn intern_utf8(&mut self, value: &str) -> Result<u16, ClassFileError> {
        let bytes = mutf8::encode(value);
        if let Some(&index) = self.utf8_index.get(&bytes) {
            return Ok(index);
        }
        if bytes.len() > usize::from(u16::MAX) {
            return Err(ClassFileError::BadDescriptor {
                descriptor: value.chars().take(64).collect(),
                reason: "longer than 65535 encoded bytes".into(),
            });
        }
        let index = self.push(Constant::Utf8(bytes))?;
        Ok(index)
    }

    /// Returns the index of a `Class` entry named `internal_name`, appending
    /// one (and its `Utf8` name) if needed.
    pub fn intern_class(&mut self, internal_name: &str) -> Result<u16, ClassFileError> {
        let name = self.intern_utf8(internal_name)?;
        let existing = self
            .iter()
            .find(|(_, c)| **c == Constant::Class { name })
            .map(|(i, _)| i);
        match existing {
            Some(index) => Ok(index),
            None => self.push(Constant::Class { name }),
        }
    }

    /// Appends an entry and returns its index.
    pub fn push(&mut self, constant: Constant) -> Result<u16, ClassFileError> {
        let needed = if constant.is_wide() { 2 } else { 1 };
        if self.entries.len() + needed > MAX_SLOTS {
            return Err(ClassFileError::PoolOverflow);
        }
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.push_parsed(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index)
    }
}

fn put(out: &mut Vec<u8>, tag: u8, values: &[u16]) {
    out.push(tag);
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(pool: &ConstantPool) -> ConstantPool {
        let mut out = Vec::new();
        pool.write(&mut out);
        ConstantPool::parse(&mut ByteReader::new(&out)).unwrap()
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.push(Constant::Long(42)).unwrap();
        let after = pool.intern_utf8("x").unwrap();
        assert_eq!(long, 1);
        assert_eq!(after, 3);
        assert_eq!(pool.get(2), Some(&Constant::Unusable));

        let parsed = roundtrip(&pool);
        assert_eq!(parsed.get(1), Some(&Constant::Long(42)));
        assert_eq!(parsed.utf8(3).unwrap(), "x");
        assert_eq!(parsed.slot_count(), 4);
    }

    #[test]
    fn intern_reuses_identical_entries() {
        let mut pool = ConstantPool::new();
        let a = pool.intern_utf8("com/acme/Foo").unwrap();
        let b = pool.intern_utf8("com/acme/Foo").unwrap();
        assert_eq!(a, b);

        let c1 = pool.intern_class("com/acme/Foo").unwrap();
        let c2 = pool.intern_class("com/acme/Foo").unwrap();
        assert_eq!(c1, c2);
        assert_eq!(pool.class_name(c1).unwrap(), "com/acme/Foo");
        assert_eq!(pool.slot_count(), 3);
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let mut pool = ConstantPool::new();
        let utf8 = pool.intern_utf8("x").unwrap();
        assert!(matches!(
            pool.class_name(utf8),
            Err(ClassFileError::BadConstantIndex { expected: "Class", .. })
        ));
        assert!(pool.utf8(99).is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let data = [0x00, 0x02, 0x63];
        let err = ConstantPool::parse(&mut ByteReader::new(&data)).unwrap_err();
        assert_eq!(err, ClassFileError::BadConstantTag { index: 1, tag: 0x63 });
    }

    #[test]
    fn overflow_is_detected() {
        let mut pool = ConstantPool::new();
        for i in 0..(MAX_SLOTS - 1) {
            pool.push(Constant::Integer(i as u32)).unwrap();
        }
        assert_eq!(pool.slot_count(), MAX_SLOTS);
        assert_eq!(
            pool.push(Constant::Integer(0)),
            Err(ClassFileError::PoolOverflow)
        );
    }

    #[test]
    fn every_kind_roundtrips() {
        let mut pool = ConstantPool::new();
        let name = pool.intern_utf8("run").unwrap();
        let desc = pool.intern_utf8("()V").unwrap();
        let class = pool.intern_class("com/acme/Task").unwrap();
        let nat = pool
            .push(Constant::NameAndType {
                name,
                descriptor: desc,
            })
            .unwrap();
        let mref = pool
            .push(Constant::Methodref {
                class,
                name_and_type: nat,
            })
            .unwrap();
        pool.push(Constant::MethodHandle {
            kind: 5,
            reference: mref,
        })
        .unwrap();
        pool.push(Constant::MethodType { descriptor: desc }).unwrap();
        pool.push(Constant::InvokeDynamic {
            bootstrap: 0,
            name_and_type: nat,
        })
        .unwrap();
        pool.push(Constant::Double(0x4000_0000_0000_0000)).unwrap();
        pool.push(Constant::Float(0x3f80_0000)).unwrap();
        pool.push(Constant::String { string: name }).unwrap();

        let parsed = roundtrip(&pool);
        assert_eq!(parsed, pool);
    }
}
