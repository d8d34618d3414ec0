//! Class-file model and type-reference remapper.
//!
//! [`ClassFile::parse`] decodes a compiled class into its constant pool,
//! members and raw attributes; [`remap_class`] redirects every type
//! reference through a [`TypeMapper`] and re-serializes the result. Unknown
//! attributes are carried over byte for byte.

#![warn(missing_docs)]

pub mod bytes;
pub mod class;
pub mod constant;
pub mod error;
pub mod mutf8;
pub mod remap;
pub mod signature;

pub use class::{Attribute, ClassFile, Member};
pub use constant::{Constant, ConstantPool};
pub use error::ClassFileError;
pub use remap::{remap_class, TypeMapper};
pub use signature::{remap_signature, SignatureError};
