//! Property tests for framing and request decoding.
//!
//! - Any payload written with `write_frame` reads back unchanged, including
//!   several frames back to back on one stream.
//! - Decoding never panics on arbitrary bytes.
//! - Unit ids survive a request round trip in order, whatever their type.

use proptest::prelude::*;
use sensorlink_proto::{
    BaseData, Message, SensorReading, UnitData, UnitId, Value,
    codec::{decode_message, encode_message},
    read_frame, write_frame,
};

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(fut)
}

fn unit_id() -> impl Strategy<Value = UnitId> {
    prop_oneof![
        any::<i64>().prop_map(UnitId::Int),
        (i64::MAX as u64 + 1..=u64::MAX).prop_map(UnitId::UInt),
        "[a-z0-9_]{0,12}".prop_map(UnitId::Text),
    ]
}

fn reading() -> impl Strategy<Value = SensorReading> {
    prop::collection::vec(prop::collection::vec(-1.0e6f64..1.0e6, 0..4), 0..4)
        .prop_map(|rows| SensorReading::new(rows))
}

proptest! {
    #[test]
    fn frames_round_trip(payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 1..8)) {
        let read_back = block_on(async {
            let mut wire = Vec::new();
            for payload in &payloads {
                write_frame(&mut wire, payload).await.expect("write");
            }

            let mut input = wire.as_slice();
            let mut out = Vec::new();
            for _ in 0..payloads.len() {
                out.push(read_frame(&mut input).await.expect("read").to_vec());
            }
            assert!(read_frame(&mut input).await.is_err_and(|e| e.is_clean_close()));
            out
        });

        prop_assert_eq!(read_back, payloads);
    }

    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_message(&bytes);
    }

    #[test]
    fn unit_ids_survive_request_round_trip(
        ids in prop::collection::vec(unit_id(), 0..16),
        s1 in reading(),
        s2 in reading(),
    ) {
        let units = ids
            .iter()
            .cloned()
            .map(|id| UnitData {
                id,
                sensor_1: s1.clone(),
                sensor_2: SensorReading::new(Value::Float(0.0)),
            })
            .collect();
        let message = Message::new(BaseData { sensor_1: s1, sensor_2: s2 }, units);

        let decoded = decode_message(&encode_message(&message).expect("encode")).expect("decode");

        let decoded_ids: Vec<_> = decoded.unit_ids().cloned().collect();
        prop_assert_eq!(decoded_ids, ids);
        prop_assert_eq!(decoded.base, message.base);
    }
}
