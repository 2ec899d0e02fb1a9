use allocative::Allocative;

/// Represents the supported column types in a table schema.
/// Each type corresponds to exactly one [crate::Value] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Allocative)]
pub enum DataType {
    /// A 64-bit signed integer.
    Int,
    /// A variable-length UTF-8 character string.
    Text,
}
