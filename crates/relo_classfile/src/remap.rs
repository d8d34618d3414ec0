//! Type-reference remapping.
//!
//! Every reference is redirected, never edited: a rewritten name is interned
//! as a (possibly new) `Utf8` constant and only the 16-bit index pointing at
//! it changes. Existing `Utf8` entries may be shared with string literals or
//! member names, so they are left untouched. Because only indices change,
//! attribute lengths stay the same and unknown attributes (including
//! `StackMapTable`, whose types go through `Class` constants) remain valid.
//!
//! Old names therefore stay in the pool even when nothing points at them any
//! more, and `javap -v` still lists them. Dropping them would mean
//! renumbering every index, including those inside attributes this module
//! cannot parse. The JVM ignores unreferenced `Utf8` entries.

use std::collections::HashMap;

use crate::bytes::{get_u16, get_u32, put_u16};
use crate::class::{Attribute, ClassFile};
use crate::constant::{Constant, ConstantPool};
use crate::error::ClassFileError;
use crate::signature::{remap_class_name, remap_signature};

/// Decides the new internal name of a type.
pub trait TypeMapper {
    /// Returns the relocated internal name of `internal_name`, or `None` to
    /// leave it unchanged.
    fn map_type(&self, internal_name: &str) -> Option<String>;

    /// Returns the relocated internal name of a package (as referenced from
    /// `module-info`), or `None` to leave it unchanged.
    fn map_package(&self, internal_name: &str) -> Option<String> {
        let _ = internal_name;
        None
    }
}

impl TypeMapper for HashMap<String, String> {
    fn map_type(&self, internal_name: &str) -> Option<String> {
        self.get(internal_name).cloned()
    }
}

/// Rewrites a serialized class file. Returns the input unchanged when no
/// reference had to move.
pub fn remap_class(bytes: &[u8], mapper: &dyn TypeMapper) -> Result<Vec<u8>, ClassFileError> {
    let mut class = ClassFile::parse(bytes)?;
    if remap_class_file(&mut class, mapper)? {
        Ok(class.to_bytes())
    } else {
        Ok(bytes.to_vec())
    }
}

/// Rewrites a parsed class file in place. Returns `true` if anything changed.
pub fn remap_class_file(
    class: &mut ClassFile,
    mapper: &dyn TypeMapper,
) -> Result<bool, ClassFileError> {
    let ClassFile {
        pool,
        fields,
        methods,
        attributes,
        ..
    } = class;
    let mut remapper = Remapper {
        pool,
        mapper,
        cache: HashMap::new(),
        changed: false,
    };

    remapper.remap_pool()?;
    for member in fields.iter_mut().chain(methods.iter_mut()) {
        member.descriptor_index = remapper.remap_index(member.descriptor_index, Kind::Descriptor)?;
        remapper.remap_attributes(&mut member.attributes)?;
    }
    remapper.remap_attributes(attributes)?;
    Ok(remapper.changed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    ClassName,
    Descriptor,
    Signature,
    Package,
}

struct Remapper<'a> {
    pool: &'a mut ConstantPool,
    mapper: &'a dyn TypeMapper,
    cache: HashMap<(u16, Kind), u16>,
    changed: bool,
}

impl Remapper<'_> {
    fn remap_pool(&mut self) -> Result<(), ClassFileError> {
        let targets: Vec<(u16, Constant)> = self
            .pool
            .iter()
            .filter(|(_, c)| {
                matches!(
                    c,
                    Constant::Class { .. }
                        | Constant::NameAndType { .. }
                        | Constant::MethodType { .. }
                        | Constant::Package { .. }
                )
            })
            .map(|(i, c)| (i, c.clone()))
            .collect();

        for (index, constant) in targets {
            let updated = match constant {
                Constant::Class { name } => Constant::Class {
                    name: self.remap_index(name, Kind::ClassName)?,
                },
                Constant::NameAndType { name, descriptor } => Constant::NameAndType {
                    name,
                    descriptor: self.remap_index(descriptor, Kind::Descriptor)?,
                },
                Constant::MethodType { descriptor } => Constant::MethodType {
                    descriptor: self.remap_index(descriptor, Kind::Descriptor)?,
                },
                Constant::Package { name } => Constant::Package {
                    name: self.remap_index(name, Kind::Package)?,
                },
                other => other,
            };
            if let Some(slot) = self.pool.get_mut(index) {
                *slot = updated;
            }
        }
        Ok(())
    }

    /// Maps the `Utf8` at `index` and returns the index holding the result.
    fn remap_index(&mut self, index: u16, kind: Kind) -> Result<u16, ClassFileError> {
        if let Some(&mapped) = self.cache.get(&(index, kind)) {
            return Ok(mapped);
        }

        let text = self.pool.utf8(index)?;
        let mapper = self.mapper;
        let map = |name: &str| mapper.map_type(name);
        let result = match kind {
            Kind::ClassName => remap_class_name(&text, &map),
            Kind::Descriptor | Kind::Signature => remap_signature(&text, &map),
            Kind::Package => Ok(mapper.map_package(&text)),
        };
        let mapped = match result {
            Ok(mapped) => mapped,
            Err(err) if kind == Kind::Signature => {
                tracing::debug!(signature = %text, error = %err, "leaving malformed signature unchanged");
                None
            }
            Err(err) => {
                return Err(ClassFileError::BadDescriptor {
                    descriptor: text,
                    reason: err.to_string(),
                })
            }
        };

        let new_index = match mapped {
            Some(new_text) if new_text != text => {
                self.changed = true;
                self.pool.intern_utf8(&new_text)?
            }
            _ => index,
        };
        self.cache.insert((index, kind), new_index);
        Ok(new_index)
    }

    fn redirect(&mut self, info: &mut [u8], at: usize, kind: Kind) -> Result<(), ClassFileError> {
        let old = get_u16(info, at)?;
        let new = self.remap_index(old, kind)?;
        if new != old {
            put_u16(info, at, new)?;
        }
        Ok(())
    }

    fn remap_attributes(&mut self, attributes: &mut [Attribute]) -> Result<(), ClassFileError> {
        for attribute in attributes {
            let name = self.pool.utf8(attribute.name_index)?;
            self.remap_attribute(&name, &mut attribute.info)?;
        }
        Ok(())
    }

    fn remap_attribute(&mut self, name: &str, info: &mut [u8]) -> Result<(), ClassFileError> {
        let result = match name {
            "Signature" => self.redirect(info, 0, Kind::Signature),
            "Code" => self.code(info),
            "LocalVariableTable" => self.local_variables(info, Kind::Descriptor),
            "LocalVariableTypeTable" => self.local_variables(info, Kind::Signature),
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                self.annotations(info, 0).map(|_| ())
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                self.parameter_annotations(info)
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                self.type_annotations(info)
            }
            "AnnotationDefault" => self.element_value(info, 0).map(|_| ()),
            "Record" => self.record(info),
            _ => Ok(()),
        };
        result.map_err(|err| match err {
            ClassFileError::Truncated { .. } => ClassFileError::BadAttribute {
                attribute: name.to_string(),
                reason: err.to_string(),
            },
            other => other,
        })
    }

    /// Walks a nested attribute table starting at `pos`; returns the end.
    fn nested_attributes(&mut self, info: &mut [u8], pos: usize) -> Result<usize, ClassFileError> {
        let count = get_u16(info, pos)?;
        let mut p = pos + 2;
        for _ in 0..count {
            let name_index = get_u16(info, p)?;
            let len = get_u32(info, p + 2)? as usize;
            let start = p + 6;
            let end = start + len;
            let name = self.pool.utf8(name_index)?;
            let body = info.get_mut(start..end).ok_or(ClassFileError::Truncated {
                offset: start,
                needed: len,
            })?;
            self.remap_attribute(&name, body)?;
            p = end;
        }
        Ok(p)
    }

    fn code(&mut self, info: &mut [u8]) -> Result<(), ClassFileError> {
        let code_length = get_u32(info, 4)? as usize;
        let exceptions_at = 8 + code_length;
        let exception_count = usize::from(get_u16(info, exceptions_at)?);
        self.nested_attributes(info, exceptions_at + 2 + 8 * exception_count)?;
        Ok(())
    }

    fn local_variables(&mut self, info: &mut [u8], kind: Kind) -> Result<(), ClassFileError> {
        let count = usize::from(get_u16(info, 0)?);
        for i in 0..count {
            self.redirect(info, 2 + 10 * i + 6, kind)?;
        }
        Ok(())
    }

    fn record(&mut self, info: &mut [u8]) -> Result<(), ClassFileError> {
        let count = get_u16(info, 0)?;
        let mut p = 2;
        for _ in 0..count {
            self.redirect(info, p + 2, Kind::Descriptor)?;
            p = self.nested_attributes(info, p + 4)?;
        }
        Ok(())
    }

    /// Walks `num_annotations` + annotations at `pos`; returns the end.
    fn annotations(&mut self, info: &mut [u8], pos: usize) -> Result<usize, ClassFileError> {
        let count = get_u16(info, pos)?;
        let mut p = pos + 2;
        for _ in 0..count {
            p = self.annotation(info, p)?;
        }
        Ok(p)
    }

    fn parameter_annotations(&mut self, info: &mut [u8]) -> Result<(), ClassFileError> {
        let params = *info.first().ok_or(ClassFileError::Truncated {
            offset: 0,
            needed: 1,
        })?;
        let mut p = 1;
        for _ in 0..params {
            p = self.annotations(info, p)?;
        }
        Ok(())
    }

    fn type_annotations(&mut self, info: &mut [u8]) -> Result<(), ClassFileError> {
        let count = get_u16(info, 0)?;
        let mut p = 2;
        for _ in 0..count {
            let target_type = byte_at(info, p)?;
            p += 1;
            p += match target_type {
                0x00 | 0x01 | 0x16 => 1,
                0x10 | 0x11 | 0x12 | 0x17 | 0x42..=0x46 => 2,
                0x13..=0x15 => 0,
                0x40 | 0x41 => 2 + 6 * usize::from(get_u16(info, p)?),
                0x47..=0x4b => 3,
                other => {
                    return Err(ClassFileError::BadAttribute {
                        attribute: "type annotation".into(),
                        reason: format!("unknown target type {other:#04x}"),
                    })
                }
            };
            let path_length = usize::from(byte_at(info, p)?);
            p += 1 + 2 * path_length;
            p = self.annotation(info, p)?;
        }
        Ok(())
    }

    fn annotation(&mut self, info: &mut [u8], pos: usize) -> Result<usize, ClassFileError> {
        self.redirect(info, pos, Kind::Descriptor)?;
        let pairs = get_u16(info, pos + 2)?;
        let mut p = pos + 4;
        for _ in 0..pairs {
            p = self.element_value(info, p + 2)?;
        }
        Ok(p)
    }

    fn element_value(&mut self, info: &mut [u8], pos: usize) -> Result<usize, ClassFileError> {
        match byte_at(info, pos)? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => Ok(pos + 3),
            b'e' => {
                self.redirect(info, pos + 1, Kind::Descriptor)?;
                Ok(pos + 5)
            }
            b'c' => {
                self.redirect(info, pos + 1, Kind::Descriptor)?;
                Ok(pos + 3)
            }
            b'@' => self.annotation(info, pos + 1),
            b'[' => {
                let count = get_u16(info, pos + 1)?;
                let mut p = pos + 3;
                for _ in 0..count {
                    p = self.element_value(info, p)?;
                }
                Ok(p)
            }
            tag => Err(ClassFileError::BadAttribute {
                attribute: "annotation".into(),
                reason: format!("unknown element value tag {tag:#04x}"),
            }),
        }
    }
}

fn byte_at(info: &[u8], at: usize) -> Result<u8, ClassFileError> {
    info.get(at).copied().ok_or(ClassFileError::Truncated {
        offset: at,
        needed: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> HashMap<String, String> {
        [
            ("com/acme/Foo", "ns/com/acme/Foo"),
            ("com/acme/Bar", "ns/com/acme/Bar"),
            ("com/acme/Marker", "ns/com/acme/Marker"),
            ("com/acme/Color", "ns/com/acme/Color"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
    }

    fn u16s(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn class_constants_and_descriptors_move() {
        let mut class = ClassFile::new("com/acme/Foo", Some("java/lang/Object")).unwrap();
        class.add_interface("com/acme/Marker").unwrap();
        class.add_field(0x0002, "bar", "Lcom/acme/Bar;").unwrap();
        class.add_field(0x0002, "name", "Ljava/lang/String;").unwrap();
        class
            .add_method(0x0001, "make", "(Lcom/acme/Bar;[I)[Lcom/acme/Foo;")
            .unwrap();

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        assert_eq!(parsed.name().unwrap(), "ns/com/acme/Foo");
        assert_eq!(parsed.super_name().unwrap().as_deref(), Some("java/lang/Object"));
        assert_eq!(parsed.interface_names().unwrap(), vec!["ns/com/acme/Marker"]);
        let (_, bar) = parsed.member_signature(&parsed.fields[0]).unwrap();
        assert_eq!(bar, "Lns/com/acme/Bar;");
        let (_, name) = parsed.member_signature(&parsed.fields[1]).unwrap();
        assert_eq!(name, "Ljava/lang/String;");
        let (_, make) = parsed.member_signature(&parsed.methods[0]).unwrap();
        assert_eq!(make, "(Lns/com/acme/Bar;[I)[Lns/com/acme/Foo;");
    }

    #[test]
    fn old_names_stay_in_the_pool_at_their_index() {
        let mut class = ClassFile::new("com/acme/Foo", None).unwrap();
        let old = class.pool.intern_utf8("com/acme/Foo").unwrap();
        let slots = class.pool.slot_count();

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        assert_eq!(parsed.name().unwrap(), "ns/com/acme/Foo");
        assert_eq!(parsed.pool.utf8(old).unwrap(), "com/acme/Foo");
        // Appended, never replaced.
        assert_eq!(parsed.pool.slot_count(), slots + 1);
    }

    #[test]
    fn untouched_class_is_returned_verbatim() {
        let mut class = ClassFile::new("org/other/Thing", Some("java/lang/Object")).unwrap();
        class.add_field(0, "x", "I").unwrap();
        let bytes = class.to_bytes();
        assert_eq!(remap_class(&bytes, &mapper()).unwrap(), bytes);
    }

    #[test]
    fn string_literals_are_not_rewritten() {
        let mut class = ClassFile::new("com/acme/Foo", None).unwrap();
        // A literal sharing the exact Utf8 entry of a descriptor.
        let desc = class.pool.intern_utf8("Lcom/acme/Bar;").unwrap();
        let literal = class.pool.push(Constant::String { string: desc }).unwrap();
        class.add_field(0, "bar", "Lcom/acme/Bar;").unwrap();

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        match parsed.pool.get(literal) {
            Some(Constant::String { string }) => {
                assert_eq!(parsed.pool.utf8(*string).unwrap(), "Lcom/acme/Bar;");
            }
            other => panic!("expected string constant, got {other:?}"),
        }
        let (_, field) = parsed.member_signature(&parsed.fields[0]).unwrap();
        assert_eq!(field, "Lns/com/acme/Bar;");
    }

    #[test]
    fn signature_and_local_variable_tables_inside_code() {
        let mut class = ClassFile::new("com/acme/Foo", Some("java/lang/Object")).unwrap();
        let m = class
            .add_method(0x0001, "use", "(Ljava/util/List;)V")
            .unwrap();

        let sig = class
            .pool
            .intern_utf8("(Ljava/util/List<Lcom/acme/Bar;>;)V")
            .unwrap();
        let signature = class.attribute("Signature", u16s(&[sig])).unwrap();

        let lv_name = class.pool.intern_utf8("bar").unwrap();
        let lv_desc = class.pool.intern_utf8("Lcom/acme/Bar;").unwrap();
        let lvt_sig = class
            .pool
            .intern_utf8("Ljava/util/List<Lcom/acme/Foo;>;")
            .unwrap();
        let lvt = class
            .attribute("LocalVariableTable", u16s(&[1, 0, 1, lv_name, lv_desc, 1]))
            .unwrap();
        let lvtt = class
            .attribute("LocalVariableTypeTable", u16s(&[1, 0, 1, lv_name, lvt_sig, 1]))
            .unwrap();

        // max_stack, max_locals, code_length = 1, `return`, no handlers, 2 attributes.
        let mut code = u16s(&[1, 2]);
        code.extend_from_slice(&1u32.to_be_bytes());
        code.push(0xb1);
        code.extend_from_slice(&u16s(&[0, 2]));
        for nested in [&lvt, &lvtt] {
            code.extend_from_slice(&nested.name_index.to_be_bytes());
            code.extend_from_slice(&(nested.info.len() as u32).to_be_bytes());
            code.extend_from_slice(&nested.info);
        }
        let code = class.attribute("Code", code).unwrap();
        class.methods[m].attributes = vec![code, signature];

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        let method = &parsed.methods[m];

        let sig_attr = &method.attributes[1];
        let sig_index = get_u16(&sig_attr.info, 0).unwrap();
        assert_eq!(
            parsed.pool.utf8(sig_index).unwrap(),
            "(Ljava/util/List<Lns/com/acme/Bar;>;)V"
        );

        let code = &method.attributes[0].info;
        // Code header (8) + 1 byte + exception count (2) + attribute count (2).
        let lvt_at = 8 + 1 + 2 + 2 + 6;
        let desc_index = get_u16(code, lvt_at + 2 + 6).unwrap();
        assert_eq!(parsed.pool.utf8(desc_index).unwrap(), "Lns/com/acme/Bar;");
        let lvtt_at = lvt_at + 12 + 6;
        let sig_index = get_u16(code, lvtt_at + 2 + 6).unwrap();
        assert_eq!(
            parsed.pool.utf8(sig_index).unwrap(),
            "Ljava/util/List<Lns/com/acme/Foo;>;"
        );
        // The name slot is untouched.
        assert_eq!(get_u16(code, lvt_at + 2 + 4).unwrap(), lv_name);
    }

    #[test]
    fn annotations_and_enum_values() {
        let mut class = ClassFile::new("com/acme/Foo", None).unwrap();
        let marker = class.pool.intern_utf8("Lcom/acme/Marker;").unwrap();
        let value = class.pool.intern_utf8("value").unwrap();
        let color = class.pool.intern_utf8("Lcom/acme/Color;").unwrap();
        let red = class.pool.intern_utf8("RED").unwrap();
        let bar = class.pool.intern_utf8("Lcom/acme/Bar;").unwrap();
        let kind = class.pool.intern_utf8("kind").unwrap();

        // @Marker(value = Color.RED, kind = {Bar.class})
        let mut body = u16s(&[1, marker, 2, value]);
        body.push(b'e');
        body.extend_from_slice(&u16s(&[color, red, kind]));
        body.push(b'[');
        body.extend_from_slice(&u16s(&[1]));
        body.push(b'c');
        body.extend_from_slice(&u16s(&[bar]));
        let attr = class.attribute("RuntimeVisibleAnnotations", body).unwrap();
        class.attributes.push(attr);

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        let info = &parsed.attributes[0].info;
        let text = |at: usize| parsed.pool.utf8(get_u16(info, at).unwrap()).unwrap();
        assert_eq!(text(2), "Lns/com/acme/Marker;");
        assert_eq!(text(9), "Lns/com/acme/Color;");
        assert_eq!(text(11), "RED");
        assert_eq!(text(19), "Lns/com/acme/Bar;");
    }

    #[test]
    fn type_annotation_targets_are_skipped_correctly() {
        let mut class = ClassFile::new("com/acme/Foo", None).unwrap();
        let marker = class.pool.intern_utf8("Lcom/acme/Marker;").unwrap();
        // One annotation: target 0x10 (supertype, 2 bytes), empty path, no pairs.
        let mut body = u16s(&[1]);
        body.push(0x10);
        body.extend_from_slice(&u16s(&[0xffff]));
        body.push(0);
        body.extend_from_slice(&u16s(&[marker, 0]));
        let attr = class.attribute("RuntimeInvisibleTypeAnnotations", body).unwrap();
        class.attributes.push(attr);

        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        let info = &parsed.attributes[0].info;
        assert_eq!(
            parsed.pool.utf8(get_u16(info, 6).unwrap()).unwrap(),
            "Lns/com/acme/Marker;"
        );
    }

    #[test]
    fn truncated_attribute_is_reported() {
        let mut class = ClassFile::new("com/acme/Foo", None).unwrap();
        let attr = class
            .attribute("RuntimeVisibleAnnotations", u16s(&[3]))
            .unwrap();
        class.attributes.push(attr);
        let err = remap_class(&class.to_bytes(), &mapper()).unwrap_err();
        assert!(matches!(
            err,
            ClassFileError::BadAttribute { attribute, .. } if attribute == "RuntimeVisibleAnnotations"
        ));
    }

    #[test]
    fn array_class_constants() {
        let mut class = ClassFile::new("org/other/User", None).unwrap();
        let arr = class.pool.intern_class("[Lcom/acme/Foo;").unwrap();
        let out = remap_class(&class.to_bytes(), &mapper()).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        assert_eq!(parsed.pool.class_name(arr).unwrap(), "[Lns/com/acme/Foo;");
    }

    #[test]
    fn package_constants_use_package_mapping() {
        struct Packages;
        impl TypeMapper for Packages {
            fn map_type(&self, _: &str) -> Option<String> {
                None
            }
            fn map_package(&self, name: &str) -> Option<String> {
                Some(format!("ns/{name}"))
            }
        }

        let mut class = ClassFile::new("module-info", None).unwrap();
        let name = class.pool.intern_utf8("com/acme").unwrap();
        let pkg = class.pool.push(Constant::Package { name }).unwrap();
        let out = remap_class(&class.to_bytes(), &Packages).unwrap();
        let parsed = ClassFile::parse(&out).unwrap();
        match parsed.pool.get(pkg) {
            Some(Constant::Package { name }) => {
                assert_eq!(parsed.pool.utf8(*name).unwrap(), "ns/com/acme")
            }
            other => panic!("expected package, got {other:?}"),
        }
    }
}
