//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (`Salary(4200)` equals any other `Salary(4200)`). To "modify" one, build a
/// new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Salary(i64);
///
/// impl ValueObject for Salary {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
