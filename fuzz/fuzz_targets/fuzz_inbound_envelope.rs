#![no_main]

use libfuzzer_sys::fuzz_target;
use socketlink_client::protocol::InboundEnvelope;

fuzz_target!(|data: &[u8]| {
    // Raw-byte path, including serde_json's own UTF-8 validation.
    let _ = serde_json::from_slice::<InboundEnvelope>(data);

    // The str path the connection task takes for every text frame.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(envelope) = InboundEnvelope::parse(s) {
            let _ = envelope.into_event();
        }
    }
});
