//! MessagePack codec for request and response payloads.
//!
//! Requests are decoded in two steps. [`decode`] checks the outer structure
//! (valid MessagePack, a top-level array of at least two elements, records that
//! are arrays) and hands back raw records; [`Message::from_records`] then
//! checks field counts. [`decode_message`] runs both.
//!
//! Both directions decode with a nesting limit of [`MAX_NESTING_DEPTH`]. The
//! value visitor recurses once per level, and rmp-serde's own limit of 1024
//! is deep enough to exhaust a 2 MiB task stack in an unoptimized build.
//!
//! Responses are always written with `rmp_serde::to_vec_named` so structs
//! become maps keyed by field name. Plain `to_vec` would emit positional
//! arrays, which peers reading `response["base"]` cannot use.

use serde::Deserialize;

use crate::{
    errors::{DecodeError, EncodeError},
    message::Message,
    response::Response,
    value::Value,
};

/// Nesting limit for decoded payloads, counting the top-level container.
///
/// Payloads must nest strictly less deeply than this.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Base record and unit records of a request, as decoded.
pub type Records = (Vec<Value>, Vec<Vec<Value>>);

/// Decode a request payload into its raw records.
pub fn decode(payload: &[u8]) -> Result<Records, DecodeError> {
    let value: Value = from_slice(payload)
        .map_err(|e| DecodeError::MalformedPayload(format!("invalid MessagePack: {e}")))?;

    let top = match value {
        Value::Array(top) => top,
        other => {
            return Err(DecodeError::MalformedPayload(format!(
                "expected top-level array, found {}",
                other.kind()
            )));
        },
    };

    let len = top.len();
    let mut fields = top.into_iter();
    let (Some(base), Some(units)) = (fields.next(), fields.next()) else {
        return Err(DecodeError::MalformedPayload(format!(
            "top-level array has {len} elements, expected at least 2"
        )));
    };

    let base = into_record(base, "base record")?;
    let units = into_record(units, "unit list")?
        .into_iter()
        .enumerate()
        .map(|(index, unit)| into_record(unit, &format!("unit record {index}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((base, units))
}

fn into_record(value: Value, what: &str) -> Result<Vec<Value>, DecodeError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(DecodeError::MalformedPayload(format!(
            "{what} must be an array, found {}",
            other.kind()
        ))),
    }
}

/// Decode a request payload into a [`Message`].
pub fn decode_message(payload: &[u8]) -> Result<Message, DecodeError> {
    let (base, units) = decode(payload)?;
    Ok(Message::from_records(base, units)?)
}

/// Encode a response as a keyed map.
pub fn encode(response: &Response) -> Result<Vec<u8>, EncodeError> {
    Ok(rmp_serde::to_vec_named(response)?)
}

/// Encode a request in the positional layout [`decode`] expects.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, EncodeError> {
    Ok(rmp_serde::to_vec(message)?)
}

/// Encode an arbitrary value, for peers that build payloads by hand.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, EncodeError> {
    Ok(rmp_serde::to_vec(value)?)
}

/// Decode a response payload.
pub fn decode_response(payload: &[u8]) -> Result<Response, DecodeError> {
    from_slice(payload)
        .map_err(|e| DecodeError::MalformedPayload(format!("invalid response: {e}")))
}

fn from_slice<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, rmp_serde::decode::Error> {
    let mut deserializer = rmp_serde::Deserializer::from_read_ref(payload);
    deserializer.set_max_depth(MAX_NESTING_DEPTH);
    T::deserialize(&mut deserializer)
}
