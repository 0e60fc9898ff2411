#![no_main]

use coup_client::codec;
use coup_client::ui;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Raw bytes straight into serde_json, UTF-8 validation included.
    let _ = serde_json::from_slice::<coup_client::protocol::InboundMessage>(data);

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Anything the codec accepts must be renderable for every seated player.
    if let Ok(coup_client::protocol::InboundMessage::State { state }) = codec::try_decode(text) {
        for player in &state.players {
            let _ = ui::derive(true, Some(&state), &player.name);
        }
        let _ = state.winner();
    }
});
