//! Codec between Rust values and the store's attribute values.
//!
//! Records derive `serde::Serialize` / `serde::Deserialize`; [`to_item`] and
//! [`from_item`] convert them to and from [`Item`](crate::types::Item)s.

pub mod bytes;
pub mod de;
pub mod number;
pub mod ser;

pub use bytes::Binary;
pub use de::{from_attr, from_item};
pub use ser::{to_attr, to_item};
