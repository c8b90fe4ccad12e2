//! Wire model and protobuf codec for the sync transport.
//!
//! Deltas keep a flexible JSON payload (`serde_json::Value`) while encoding
//! over protobuf for compact binary transport; the vector clock rides along
//! as a string→string map so counters stay exact past the 53-bit float-safe
//! range on any peer's JSON stack. Laser presence has its own lightweight
//! message since it never carries a clock or payload.

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;

use std::collections::BTreeMap;

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::presence::LaserUpdate;

/// Error returned by [`decode_delta`] and [`decode_laser`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf message.
    #[error("failed to decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// A single board operation on the sync wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Unique identifier for this delta (UUID string).
    pub id: String,
    /// Milliseconds since the Unix epoch when the delta was created.
    pub ts: u64,
    /// Sender identifier; absent only for system-originated deltas.
    pub from: Option<String>,
    /// Namespaced operation name, e.g. `"stroke.add"`.
    pub op: String,
    /// Target page, when the operation addresses one.
    pub page_id: Option<String>,
    /// Sender's vector clock as decimal-string counters.
    pub clock: BTreeMap<String, String>,
    /// Arbitrary JSON payload.
    pub payload: Value,
}

/// Encode a delta into protobuf bytes.
#[must_use]
pub fn encode_delta(delta: &Delta) -> Vec<u8> {
    let wire = WireDelta {
        id: delta.id.clone(),
        ts: delta.ts,
        from: delta.from.clone(),
        op: delta.op.clone(),
        page_id: delta.page_id.clone(),
        clock: delta.clock.clone(),
        payload: Some(json_to_proto_value(&delta.payload)),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a Vec<u8> is infallible; the only error prost returns
    // here is `BufferTooSmall`, which cannot occur with a growable Vec.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a delta.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes.
pub fn decode_delta(bytes: &[u8]) -> Result<Delta, CodecError> {
    let wire = WireDelta::decode(bytes)?;
    Ok(Delta {
        id: wire.id,
        ts: wire.ts,
        from: wire.from,
        op: wire.op,
        page_id: wire.page_id,
        clock: wire.clock,
        payload: wire
            .payload
            .map_or(Value::Object(Map::new()), |v| proto_to_json_value(&v)),
    })
}

/// Encode a laser presence update into protobuf bytes.
#[must_use]
pub fn encode_laser(update: &LaserUpdate) -> Vec<u8> {
    let wire = WireLaser {
        user_id: update.user_id.clone(),
        display_name: update.display_name.clone(),
        x: update.x,
        y: update.y,
        page_id: update.page_id.clone(),
        color: update.color.clone(),
        active: update.active,
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a laser presence update.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes.
pub fn decode_laser(bytes: &[u8]) -> Result<LaserUpdate, CodecError> {
    let wire = WireLaser::decode(bytes)?;
    Ok(LaserUpdate {
        user_id: wire.user_id,
        display_name: wire.display_name,
        x: wire.x,
        y: wire.y,
        page_id: wire.page_id,
        color: wire.color,
        active: wire.active,
    })
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => {
            prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32)
        }
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => {
            serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
        }
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        prost_types::value::Kind::ListValue(v) => {
            Value::Array(v.values.iter().map(proto_to_json_value).collect())
        }
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireDelta {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(uint64, tag = "2")]
    ts: u64,
    #[prost(string, optional, tag = "3")]
    from: Option<String>,
    #[prost(string, tag = "4")]
    op: String,
    #[prost(string, optional, tag = "5")]
    page_id: Option<String>,
    #[prost(btree_map = "string, string", tag = "6")]
    clock: BTreeMap<String, String>,
    #[prost(message, optional, tag = "7")]
    payload: Option<prost_types::Value>,
}

#[derive(Clone, PartialEq, Message)]
struct WireLaser {
    #[prost(string, tag = "1")]
    user_id: String,
    #[prost(string, tag = "2")]
    display_name: String,
    #[prost(double, tag = "3")]
    x: f64,
    #[prost(double, tag = "4")]
    y: f64,
    #[prost(string, tag = "5")]
    page_id: String,
    #[prost(string, tag = "6")]
    color: String,
    #[prost(bool, tag = "7")]
    active: bool,
}
