//! The class-file structure.

use crate::bytes::ByteReader;
use crate::constant::{Constant, ConstantPool};
use crate::error::ClassFileError;

const MAGIC: u32 = 0xCAFE_BABE;

/// Java 8, the default version for classes built from scratch.
const DEFAULT_MAJOR_VERSION: u16 = 52;

/// `ACC_PUBLIC | ACC_SUPER`.
const DEFAULT_CLASS_ACCESS: u16 = 0x0021;

/// An attribute with its body kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Index of the `Utf8` attribute name.
    pub name_index: u16,
    /// The attribute body, without the name and length header.
    pub info: Vec<u8>,
}

/// A field or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Access flags.
    pub access_flags: u16,
    /// Index of the `Utf8` member name.
    pub name_index: u16,
    /// Index of the `Utf8` descriptor.
    pub descriptor_index: u16,
    /// Member attributes.
    pub attributes: Vec<Attribute>,
}

/// A parsed class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    /// Minor version.
    pub minor_version: u16,
    /// Major version.
    pub major_version: u16,
    /// The constant pool.
    pub pool: ConstantPool,
    /// Class access flags.
    pub access_flags: u16,
    /// `Class` index of this class.
    pub this_class: u16,
    /// `Class` index of the superclass, or 0 for `java/lang/Object`.
    pub super_class: u16,
    /// `Class` indices of implemented interfaces.
    pub interfaces: Vec<u16>,
    /// Declared fields.
    pub fields: Vec<Member>,
    /// Declared methods.
    pub methods: Vec<Member>,
    /// Class-level attributes.
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Creates an empty public class extending `super_name`.
    pub fn new(this_name: &str, super_name: Option<&str>) -> Result<Self, ClassFileError> {
        let mut pool = ConstantPool::new();
        let this_class = pool.intern_class(this_name)?;
        let super_class = match super_name {
            Some(name) => pool.intern_class(name)?,
            None => 0,
        };
        Ok(Self {
            minor_version: 0,
            major_version: DEFAULT_MAJOR_VERSION,
            pool,
            access_flags: DEFAULT_CLASS_ACCESS,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Decodes a class file.
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFileError> {
        let mut r = ByteReader::new(bytes);
        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;
        let pool = ConstantPool::parse(&mut r)?;
        let access_flags = r.u16()?;
        let this_class = r.u16()?;
        let super_class = r.u16()?;

        let interface_count = r.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| r.u16())
            .collect::<Result<Vec<_>, _>>()?;
        let fields = parse_members(&mut r)?;
        let methods = parse_members(&mut r)?;
        let attributes = parse_attributes(&mut r)?;

        if r.remaining() != 0 {
            return Err(ClassFileError::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            minor_version,
            major_version,
            pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Serializes the class file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        self.pool.write(&mut out);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for i in &self.interfaces {
            out.extend_from_slice(&i.to_be_bytes());
        }
        write_members(&mut out, &self.fields);
        write_members(&mut out, &self.methods);
        write_attributes(&mut out, &self.attributes);
        out
    }

    /// Internal name of this class.
    pub fn name(&self) -> Result<String, ClassFileError> {
        self.pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, if any.
    pub fn super_name(&self) -> Result<Option<String>, ClassFileError> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    /// Internal names of the implemented interfaces.
    pub fn interface_names(&self) -> Result<Vec<String>, ClassFileError> {
        self.interfaces
            .iter()
            .map(|&i| self.pool.class_name(i))
            .collect()
    }

    /// Every name held by a `Class` constant, in pool order.
    pub fn referenced_classes(&self) -> Result<Vec<String>, ClassFileError> {
        self.pool
            .iter()
            .filter_map(|(_, c)| match c {
                Constant::Class { name } => Some(self.pool.utf8(*name)),
                _ => None,
            })
            .collect()
    }

    /// Name of an attribute.
    pub fn attribute_name(&self, attribute: &Attribute) -> Result<String, ClassFileError> {
        self.pool.utf8(attribute.name_index)
    }

    /// Returns `(name, descriptor)` of a field or method.
    pub fn member_signature(&self, member: &Member) -> Result<(String, String), ClassFileError> {
        Ok((
            self.pool.utf8(member.name_index)?,
            self.pool.utf8(member.descriptor_index)?,
        ))
    }

    /// Adds an implemented interface.
    pub fn add_interface(&mut self, name: &str) -> Result<(), ClassFileError> {
        let index = self.pool.intern_class(name)?;
        self.interfaces.push(index);
        Ok(())
    }

    /// Adds a field and returns its position.
    pub fn add_field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<usize, ClassFileError> {
        let member = self.member(access_flags, name, descriptor)?;
        self.fields.push(member);
        Ok(self.fields.len() - 1)
    }

    /// Adds a method and returns its position.
    pub fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<usize, ClassFileError> {
        let member = self.member(access_flags, name, descriptor)?;
        self.methods.push(member);
        Ok(self.methods.len() - 1)
    }

    /// Builds a named attribute, interning its name.
    pub fn attribute(&mut self, name: &str, info: Vec<u8>) -> Result<Attribute, ClassFileError> {
        Ok(Attribute {
            name_index: self.pool.intern_utf8(name)?,
            info,
        })
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<Member, ClassFileError> {
        Ok(Member {
            access_flags,
            name_index: self.pool.intern_utf8(name)?,
            descriptor_index: self.pool.intern_utf8(descriptor)?,
            attributes: Vec::new(),
        })
    }
}

fn parse_members(r: &mut ByteReader<'_>) -> Result<Vec<Member>, ClassFileError> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        members.push(Member {
            access_flags: r.u16()?,
            name_index: r.u16()?,
            descriptor_index: r.u16()?,
            attributes: parse_attributes(r)?,
        });
    }
    Ok(members)
}

pub(crate) fn parse_attributes(r: &mut ByteReader<'_>) -> Result<Vec<Attribute>, ClassFileError> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let name_index = r.u16()?;
        let len = r.u32()? as usize;
        attributes.push(Attribute {
            name_index,
            info: r.bytes(len)?.to_vec(),
        });
    }
    Ok(attributes)
}

fn write_members(out: &mut Vec<u8>, members: &[Member]) {
    out.extend_from_slice(&(members.len() as u16).to_be_bytes());
    for m in members {
        out.extend_from_slice(&m.access_flags.to_be_bytes());
        out.extend_from_slice(&m.name_index.to_be_bytes());
        out.extend_from_slice(&m.descriptor_index.to_be_bytes());
        write_attributes(out, &m.attributes);
    }
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute]) {
    out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for a in attributes {
        out.extend_from_slice(&a.name_index.to_be_bytes());
        out.extend_from_slice(&(a.info.len() as u32).to_be_bytes());
        out.extend_from_slice(&a.info);
    }
}
