//! Reference telemetry used by the probe.
//!
//! A base with two 3x4 integer readings and one unit (id 10) with two 3x3
//! readings.

use sensorlink_proto::{BaseData, Message, SensorReading, UnitData, UnitId};

/// Build the reference message.
pub fn reference_message() -> Message {
    let base = BaseData {
        sensor_1: SensorReading::new([[1, 2, 3, 4], [5, 6, 7, 8], [9, 10, 11, 12]]),
        sensor_2: SensorReading::new([[13, 14, 15, 16], [17, 18, 19, 20], [21, 22, 23, 24]]),
    };
    let unit = UnitData {
        id: UnitId::Int(10),
        sensor_1: SensorReading::new([[10, 20, 30], [40, 50, 60], [70, 80, 90]]),
        sensor_2: SensorReading::new([[100, 110, 120], [130, 140, 150], [160, 170, 180]]),
    };
    Message::new(base, vec![unit])
}
