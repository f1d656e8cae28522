//! Wire format for the sensorlink telemetry protocol.
//!
//! Every request and response travels as a frame: a 4-byte big-endian length
//! prefix followed by exactly that many bytes of MessagePack. Requests are
//! positional arrays (a base record and a list of unit records), responses are
//! keyed maps (a base action and one action per unit).
//!
//! MessagePack is self-describing, so readings of any shape and unit ids of
//! any scalar type cross the wire without a schema. The framing layer never
//! looks inside a payload and the codec never touches a socket.
//!
//! # Layers
//!
//! - [`frame`]: length-prefixed framing over any async byte stream
//! - [`codec`]: MessagePack encoding and decoding of payloads
//! - [`value`]: dynamic values for the untyped parts of a request
//! - [`message`]: inbound telemetry ([`Message`])
//! - [`response`]: outbound actions ([`Response`])
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod frame;
pub mod message;
pub mod response;
pub mod value;

pub use errors::{DecodeError, EncodeError, FrameError, ModelError};
pub use frame::{FrameStage, encode_frame, read_frame, read_frame_limited, write_frame};
pub use message::{BaseData, Message, SensorReading, UnitData, UnitId};
pub use response::{BaseAction, ParseActionError, Response, UnitAction, UnitCommand};
pub use value::Value;
