//! Typed, self-describing values used to hand query results to callers.
//!
//! A select produces one [`ValueContainer`] whose `"row"` field is a sequence of
//! embedded row containers, each keyed by column name.

mod map;
mod value;

pub use map::{ROW_FIELD, ValueContainer};
pub use value::{Value, ValueType};
