//! Protocol module - message shape, error codes, and payload field codec.
//!
//! This module defines the data plane vocabulary:
//! - `Message`: one addressed, sequenced command or response frame
//! - `ErrorCode`: closed enumeration of response outcomes
//! - field codec: ordinal-indexed big-endian unsigned payload fields

mod error_code;
mod fields;
mod message;

pub use error_code::ErrorCode;
pub use fields::{decode_fields, encode_fields, FieldMap, FieldSpec, FieldValue, MAX_FIELD_SIZE};
pub use message::{Message, SEQ_UNASSIGNED};
