//! Descriptor and generic-signature remapping.
//!
//! One recursive-descent parser covers field descriptors, method descriptors
//! and the class, method and field forms of the `Signature` attribute. Only
//! the outer class name of a `ClassTypeSignature` is passed to the mapper;
//! `.Inner` suffixes are simple names and are copied verbatim.

use std::fmt;

/// A descriptor or signature that does not follow the JVM grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureError {
    /// Byte offset of the problem.
    pub offset: usize,
    /// What the parser expected.
    pub reason: &'static str,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.reason, self.offset)
    }
}

impl std::error::Error for SignatureError {}

/// Rewrites every class name in `signature` through `map`.
///
/// `map` receives internal names (`java/lang/String`) and returns `None` to
/// keep a name. Returns `Ok(None)` when nothing changed.
pub fn remap_signature(
    signature: &str,
    map: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<String>, SignatureError> {
    let mut parser = Parser {
        src: signature,
        pos: 0,
        out: String::with_capacity(signature.len() + 16),
        map,
        changed: false,
    };
    parser.top()?;
    Ok(parser.changed.then_some(parser.out))
}

/// Rewrites the name stored in a `Class` constant, which is either an
/// internal name or, for array classes, a field descriptor.
pub fn remap_class_name(
    name: &str,
    map: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<String>, SignatureError> {
    if name.starts_with('[') {
        remap_signature(name, map)
    } else {
        Ok(map(name))
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    out: String,
    map: &'a dyn Fn(&str) -> Option<String>,
    changed: bool,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn error(&self, reason: &'static str) -> SignatureError {
        SignatureError {
            offset: self.pos,
            reason,
        }
    }

    fn expect(&mut self, byte: u8, reason: &'static str) -> Result<(), SignatureError> {
        if self.peek() == Some(byte) {
            self.out.push(byte as char);
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    /// Copies bytes up to (not including) the first of `stops`.
    fn take_until(&mut self, stops: &[u8]) -> Result<&str, SignatureError> {
        let start = self.pos;
        let rest = &self.src.as_bytes()[start..];
        let len = rest
            .iter()
            .position(|b| stops.contains(b))
            .ok_or_else(|| self.error("unterminated identifier"))?;
        if len == 0 {
            return Err(self.error("empty identifier"));
        }
        self.pos += len;
        Ok(&self.src[start..start + len])
    }

    fn top(&mut self) -> Result<(), SignatureError> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.expect(b'(', "expected `(`")?;
            while self.peek() != Some(b')') {
                if self.peek().is_none() {
                    return Err(self.error("unterminated parameter list"));
                }
                self.type_signature()?;
            }
            self.expect(b')', "expected `)`")?;
            self.type_signature()?;
            while self.peek() == Some(b'^') {
                self.expect(b'^', "expected `^`")?;
                self.type_signature()?;
            }
        } else {
            if self.peek().is_none() {
                return Err(self.error("empty signature"));
            }
            while self.peek().is_some() {
                self.type_signature()?;
            }
        }
        if self.pos != self.src.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<(), SignatureError> {
        self.expect(b'<', "expected `<`")?;
        while self.peek() != Some(b'>') {
            let name = self.take_until(b":")?.to_string();
            self.out.push_str(&name);
            if self.peek() != Some(b':') {
                return Err(self.error("expected `:` after type parameter"));
            }
            while self.peek() == Some(b':') {
                self.expect(b':', "expected `:`")?;
                if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                    self.type_signature()?;
                }
            }
        }
        self.expect(b'>', "expected `>`")
    }

    fn type_signature(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V')) => {
                self.out.push(b as char);
                self.pos += 1;
                Ok(())
            }
            Some(b'[') => {
                self.expect(b'[', "expected `[`")?;
                self.type_signature()
            }
            Some(b'T') => {
                self.expect(b'T', "expected `T`")?;
                let name = self.take_until(b";")?.to_string();
                self.out.push_str(&name);
                self.expect(b';', "expected `;`")
            }
            Some(b'L') => self.class_type(),
            _ => Err(self.error("expected a type")),
        }
    }

    fn class_type(&mut self) -> Result<(), SignatureError> {
        self.expect(b'L', "expected `L`")?;
        let name = self.take_until(b"<.;")?.to_string();
        match (self.map)(&name) {
            Some(mapped) if mapped != name => {
                self.out.push_str(&mapped);
                self.changed = true;
            }
            _ => self.out.push_str(&name),
        }
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }
        while self.peek() == Some(b'.') {
            self.expect(b'.', "expected `.`")?;
            let inner = self.take_until(b"<.;")?.to_string();
            self.out.push_str(&inner);
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
        }
        self.expect(b';', "expected `;`")
    }

    fn type_arguments(&mut self) -> Result<(), SignatureError> {
        self.expect(b'<', "expected `<`")?;
        if self.peek() == Some(b'>') {
            return Err(self.error("empty type argument list"));
        }
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => {
                    self.out.push('*');
                    self.pos += 1;
                }
                Some(b @ (b'+' | b'-')) => {
                    self.out.push(b as char);
                    self.pos += 1;
                    self.type_signature()?;
                }
                Some(_) => self.type_signature()?,
                None => return Err(self.error("unterminated type arguments")),
            }
        }
        self.expect(b'>', "expected `>`")
    }
}
