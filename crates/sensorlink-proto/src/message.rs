//! Inbound telemetry.
//!
//! A request carries one base and zero or more units. On the wire both are
//! positional arrays:
//!
//! ```text
//! [ [sensor_1, sensor_2, ...], [ [id, sensor_1, sensor_2, ...], ... ] ]
//! ```
//!
//! The model only checks that each record has enough fields. Reading shapes
//! and element types are whatever the sender chose; trailing fields are
//! ignored.

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    ser::{SerializeSeq, SerializeTuple},
};

use crate::{errors::ModelError, value::Value};

/// Minimum number of fields in a base record.
pub const BASE_RECORD_FIELDS: usize = 2;

/// Minimum number of fields in a unit record.
pub const UNIT_RECORD_FIELDS: usize = 3;

/// One sensor reading: a scalar or an arbitrarily nested array of numbers.
///
/// Shapes are not validated, so a reading may be ragged or hold non-numeric
/// leaves. [`shape`](Self::shape) and [`flatten`](Self::flatten) return `None`
/// for such readings.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading(Value);

impl SensorReading {
    /// Wrap a decoded value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// The reading as decoded.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the decoded value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Dimensions of a rectangular numeric reading, outermost first.
    ///
    /// A scalar has shape `[]`, `[[1, 2, 3], [4, 5, 6]]` has shape `[2, 3]`.
    pub fn shape(&self) -> Option<Vec<usize>> {
        shape_of(&self.0)
    }

    /// All numbers in row-major order, if every leaf is numeric.
    pub fn flatten(&self) -> Option<Vec<f64>> {
        let mut out = Vec::new();
        flatten_into(&self.0, &mut out).then_some(out)
    }
}

fn shape_of(value: &Value) -> Option<Vec<usize>> {
    match value {
        v if v.is_number() => Some(Vec::new()),
        Value::Array(items) => {
            let Some((first, rest)) = items.split_first() else {
                return Some(vec![0]);
            };
            let inner = shape_of(first)?;
            for item in rest {
                if shape_of(item)? != inner {
                    return None;
                }
            }
            let mut shape = Vec::with_capacity(inner.len() + 1);
            shape.push(items.len());
            shape.extend(inner);
            Some(shape)
        },
        _ => None,
    }
}

fn flatten_into(value: &Value, out: &mut Vec<f64>) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| flatten_into(item, out)),
        v => match v.as_f64() {
            Some(n) => {
                out.push(n);
                true
            },
            None => false,
        },
    }
}

impl Serialize for SensorReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Identifier of a unit, echoed back verbatim in the response.
///
/// Senders use integers or strings; anything else is kept as a raw
/// [`Value`] rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitId {
    /// Integer id in `i64` range
    Int(i64),
    /// Integer id above `i64::MAX`
    UInt(u64),
    /// String id
    Text(String),
    /// Any other value used as an id
    Other(Value),
}

impl From<Value> for UnitId {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(i) => Self::Int(i),
            Value::UInt(u) => Self::UInt(u),
            Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }
}

impl From<UnitId> for Value {
    fn from(id: UnitId) -> Self {
        match id {
            UnitId::Int(i) => Self::Int(i),
            UnitId::UInt(u) => Self::UInt(u),
            UnitId::Text(s) => Self::String(s),
            UnitId::Other(v) => v,
        }
    }
}

impl From<i64> for UnitId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<u32> for UnitId {
    fn from(id: u32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Other(v) => write!(f, "{v:?}"),
        }
    }
}

impl Serialize for UnitId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Other(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

/// Readings of the base entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseData {
    /// First sensor
    pub sensor_1: SensorReading,
    /// Second sensor
    pub sensor_2: SensorReading,
}

impl BaseData {
    /// Build from a positional record `[sensor_1, sensor_2, ...]`.
    pub fn from_record(record: Vec<Value>) -> Result<Self, ModelError> {
        let found = record.len();
        let mut fields = record.into_iter();
        match (fields.next(), fields.next()) {
            (Some(sensor_1), Some(sensor_2)) => Ok(Self {
                sensor_1: SensorReading(sensor_1),
                sensor_2: SensorReading(sensor_2),
            }),
            _ => Err(ModelError::InsufficientBaseFields { found }),
        }
    }
}

impl Serialize for BaseData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_tuple(BASE_RECORD_FIELDS)?;
        record.serialize_element(&self.sensor_1)?;
        record.serialize_element(&self.sensor_2)?;
        record.end()
    }
}

/// Readings of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitData {
    /// Unit identifier
    pub id: UnitId,
    /// First sensor
    pub sensor_1: SensorReading,
    /// Second sensor
    pub sensor_2: SensorReading,
}

impl UnitData {
    /// Build from a positional record `[id, sensor_1, sensor_2, ...]`.
    ///
    /// `index` is the unit's position in the request, reported on failure.
    pub fn from_record(index: usize, record: Vec<Value>) -> Result<Self, ModelError> {
        let found = record.len();
        let mut fields = record.into_iter();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(id), Some(sensor_1), Some(sensor_2)) => Ok(Self {
                id: UnitId::from(id),
                sensor_1: SensorReading(sensor_1),
                sensor_2: SensorReading(sensor_2),
            }),
            _ => Err(ModelError::InsufficientUnitFields { index, found }),
        }
    }
}

impl Serialize for UnitData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_tuple(UNIT_RECORD_FIELDS)?;
        record.serialize_element(&self.id)?;
        record.serialize_element(&self.sensor_1)?;
        record.serialize_element(&self.sensor_2)?;
        record.end()
    }
}

/// One telemetry request.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The base entity
    pub base: BaseData,
    /// Units, in wire order
    pub units: Vec<UnitData>,
}

impl Message {
    /// Create a message from typed parts.
    pub fn new(base: BaseData, units: Vec<UnitData>) -> Self {
        Self { base, units }
    }

    /// Build from the records produced by [`codec::decode`](crate::codec::decode).
    ///
    /// Fails on the base record first, then on the first short unit record.
    pub fn from_records(
        base_record: Vec<Value>,
        unit_records: Vec<Vec<Value>>,
    ) -> Result<Self, ModelError> {
        let base = BaseData::from_record(base_record)?;
        let units = unit_records
            .into_iter()
            .enumerate()
            .map(|(index, record)| UnitData::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { base, units })
    }

    /// Unit ids in wire order.
    pub fn unit_ids(&self) -> impl Iterator<Item = &UnitId> {
        self.units.iter().map(|unit| &unit.id)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Units<'a>(&'a [UnitData]);

        impl Serialize for Units<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for unit in self.0 {
                    seq.serialize_element(unit)?;
                }
                seq.end()
            }
        }

        let mut top = serializer.serialize_tuple(2)?;
        top.serialize_element(&self.base)?;
        top.serialize_element(&Units(&self.units))?;
        top.end()
    }
}
