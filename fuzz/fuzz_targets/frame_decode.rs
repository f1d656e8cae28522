#![no_main]

use libfuzzer_sys::fuzz_target;
use sensorlink_proto::{FrameError, read_frame_limited};

const MAX: u32 = 1 << 16;

fuzz_target!(|data: &[u8]| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let mut reader = data;
        let mut consumed = 0usize;
        loop {
            match read_frame_limited(&mut reader, MAX).await {
                Ok(payload) => {
                    consumed += 4 + payload.len();
                    assert!(payload.len() <= MAX as usize);
                },
                Err(FrameError::PayloadTooLarge { size, max }) => {
                    assert!(size > max);
                    break;
                },
                Err(err) => {
                    // Stream ran out; clean only on a frame boundary
                    assert_eq!(err.is_clean_close(), consumed == data.len());
                    break;
                },
            }
        }
    });
});
