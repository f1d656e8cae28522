//! End-to-end tests over the simulated network.
//!
//! A real server runs on the `server` host behind a [`SimListener`]; clients
//! talk raw frames or go through [`Client`].
//!
//! [`SimListener`]: sensorlink_harness::SimListener

use std::time::Duration;

use hex_literal::hex;
use sensorlink_client::Client;
use sensorlink_harness::{CloseLog, SERVER_HOST, serve, serve_default};
use sensorlink_proto::{
    UnitCommand, UnitId, Value, codec::encode_value, encode_frame, read_frame, write_frame,
};
use sensorlink_server::{FixedPolicy, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use turmoil::net::TcpStream;

const SERVER_ADDR: &str = "server:12345";

/// `[[[1.0,2.0],[3.0,4.0]], [[7,[0.1],[0.2]]]]`
fn reference_request() -> Vec<u8> {
    let base = Value::from([[1.0, 2.0], [3.0, 4.0]]);
    let unit = Value::Array(vec![Value::Int(7), Value::from([0.1]), Value::from([0.2])]);
    encode_value(&Value::Array(vec![base, Value::Array(vec![unit])])).unwrap()
}

/// Reference base with no units.
fn empty_request() -> Vec<u8> {
    let base = Value::from([[1.0, 2.0], [3.0, 4.0]]);
    encode_value(&Value::Array(vec![base, Value::Array(Vec::new())])).unwrap()
}

/// `{"base":"NOP","units":[{"id":7,"action":"MOVE"}]}` with its length prefix.
const REFERENCE_RESPONSE_FRAME: [u8; 38] = hex!(
    "00000022"
    "82"
    "a4 62617365" "a3 4e4f50"
    "a5 756e697473" "91"
    "82" "a2 6964" "07" "a6 616374696f6e" "a4 4d4f5645"
);

fn sim_with_server(log: &CloseLog) -> turmoil::Sim<'static> {
    let mut sim = turmoil::Builder::new().build();
    let log = log.clone();
    sim.host(SERVER_HOST, move || serve_default(log.clone()));
    sim
}

#[test]
fn reference_request_gets_exact_response_bytes() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    sim.client("client", async {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;
        write_frame(&mut stream, &reference_request()).await?;

        let mut reply = [0u8; REFERENCE_RESPONSE_FRAME.len()];
        stream.read_exact(&mut reply).await?;
        assert_eq!(reply, REFERENCE_RESPONSE_FRAME);

        Ok(())
    });

    sim.run()
}

#[test]
fn empty_unit_list_keeps_connection_open() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    sim.client("client", async {
        let stream = TcpStream::connect(SERVER_ADDR).await?;
        let mut client = Client::new(stream);

        client.send_payload(&empty_request()).await?;
        let first = client.receive_response().await?;
        assert!(first.units.is_empty());

        client.send_payload(&reference_request()).await?;
        let second = client.receive_response().await?;
        assert_eq!(second.units.len(), 1);
        assert_eq!(second.units[0].id, UnitId::Int(7));
        assert_eq!(second.units[0].action, UnitCommand::Move);

        Ok(())
    });

    sim.run()
}

#[test]
fn close_before_sending_is_recorded_as_clean() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    let observed = log.clone();
    sim.client("client", async move {
        let stream = TcpStream::connect(SERVER_ADDR).await?;
        drop(stream);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let closed = observed.entries();
        assert_eq!(closed.len(), 1);
        assert!(closed[0].clean, "unexpected close: {}", closed[0].reason);
        assert_eq!(closed[0].responses_sent, 0);
        assert_eq!(closed[0].requests_rejected, 0);

        Ok(())
    });

    sim.run()
}

#[test]
fn one_byte_segments_are_reassembled() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    sim.client("client", async {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;
        let frame = encode_frame(&reference_request())?;

        for byte in frame.iter() {
            stream.write_all(&[*byte]).await?;
            stream.flush().await?;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let mut reply = [0u8; REFERENCE_RESPONSE_FRAME.len()];
        stream.read_exact(&mut reply).await?;
        assert_eq!(reply, REFERENCE_RESPONSE_FRAME);

        Ok(())
    });

    sim.run()
}

#[test]
fn malformed_request_is_skipped_without_reply() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    let observed = log.clone();
    sim.client("client", async move {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;

        // Not MessagePack, then a base record with a single sensor
        write_frame(&mut stream, &hex!("c1")).await?;
        let short_base = Value::Array(vec![Value::from([[1.0]]), Value::Array(Vec::new())]);
        write_frame(&mut stream, &encode_value(&short_base)?).await?;
        write_frame(&mut stream, &reference_request()).await?;

        // The first reply on the stream answers the third request
        let mut reply = [0u8; REFERENCE_RESPONSE_FRAME.len()];
        stream.read_exact(&mut reply).await?;
        assert_eq!(reply, REFERENCE_RESPONSE_FRAME);

        drop(stream);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let closed = observed.entries();
        assert_eq!(closed.len(), 1);
        assert!(closed[0].clean);
        assert_eq!(closed[0].requests_rejected, 2);
        assert_eq!(closed[0].responses_sent, 1);

        Ok(())
    });

    sim.run()
}

#[test]
fn truncated_frame_is_recorded_as_fault() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    let observed = log.clone();
    sim.client("client", async move {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;

        // Declares 10 bytes, delivers 3
        stream.write_all(&hex!("0000000a 93 01 02")).await?;
        stream.flush().await?;
        drop(stream);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let closed = observed.entries();
        assert_eq!(closed.len(), 1);
        assert!(!closed[0].clean);
        assert_eq!(closed[0].responses_sent, 0);

        Ok(())
    });

    sim.run()
}

#[test]
fn oversized_declaration_drops_connection() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = turmoil::Builder::new().build();

    let server_log = log.clone();
    sim.host(SERVER_HOST, move || {
        let config = ServerConfig { max_payload_size: 64, ..ServerConfig::default() };
        serve(config, std::sync::Arc::new(FixedPolicy::default()), server_log.clone())
    });

    let observed = log.clone();
    sim.client("client", async move {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;
        stream.write_all(&65u32.to_be_bytes()).await?;
        stream.flush().await?;

        // Server hangs up without reading a payload or replying
        let mut buf = [0u8; 1];
        let read = stream.read(&mut buf).await.unwrap_or(0);
        assert_eq!(read, 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let closed = observed.entries();
        assert_eq!(closed.len(), 1);
        assert!(!closed[0].clean);

        Ok(())
    });

    sim.run()
}

#[test]
fn concurrent_clients_are_served_independently() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = sim_with_server(&log);

    for name in ["alpha", "beta", "gamma"] {
        sim.client(name, async move {
            let stream = TcpStream::connect(SERVER_ADDR).await?;
            let mut client = Client::new(stream);

            for _ in 0..3 {
                client.send_payload(&reference_request()).await?;
                let response = client.receive_response().await?;
                assert_eq!(response.units[0].id, UnitId::Int(7));
            }

            Ok(())
        });
    }

    sim.run()
}

#[test]
fn request_round_trips_under_latency() -> turmoil::Result {
    let log = CloseLog::new();
    let mut sim = turmoil::Builder::new()
        .simulation_duration(Duration::from_secs(60))
        .min_message_latency(Duration::from_millis(20))
        .max_message_latency(Duration::from_millis(100))
        .rng_seed(12345)
        .build();

    let server_log = log.clone();
    sim.host(SERVER_HOST, move || serve_default(server_log.clone()));

    sim.client("client", async {
        let mut stream = TcpStream::connect(SERVER_ADDR).await?;
        for _ in 0..5 {
            write_frame(&mut stream, &reference_request()).await?;
            let payload = read_frame(&mut stream).await?;
            assert_eq!(&payload[..], &REFERENCE_RESPONSE_FRAME[4..]);
        }
        Ok(())
    });

    sim.run()
}
