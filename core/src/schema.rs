//! Explicit per-property classification.
//!
//! Shape inference only works when the default value reveals its shape. A
//! [`PropertySchema`] states the classification of every property instead;
//! feed it to [`BulkConfig::with_schema`](crate::bulk::BulkConfig::with_schema).
//!
//! The `statekit-macros` crate derives this trait from a struct's field types.

use crate::property::PropertyKind;

/// Per-property classification of a state record.
///
/// # Example
///
/// ```
/// use statekit_core::bulk::BulkConfig;
/// use statekit_core::schema::PropertySchema;
/// use statekit_core::PropertyKind;
///
/// struct TodoState;
///
/// impl PropertySchema for TodoState {
///     fn property_kinds() -> Vec<(&'static str, PropertyKind)> {
///         vec![("todos", PropertyKind::Array), ("filter", PropertyKind::Generic)]
///     }
/// }
///
/// let config = BulkConfig::new("TODO").with_schema::<TodoState>();
/// assert_eq!(config.type_suggestions["todos"], PropertyKind::Array);
/// ```
pub trait PropertySchema {
    /// `(property, kind)` pairs in declaration order.
    fn property_kinds() -> Vec<(&'static str, PropertyKind)>;
}
