//! Fuzz target: history document decoder
//!
//! Drives `History::from_json` with arbitrary input, then appends a
//! snapshot to whatever was accepted.  Verifies:
//! - No panics under arbitrary bytes
//! - Accepted histories have unique capture times matching their keys,
//!   so a re-encode decodes to the same history
//! - Appending a copy of the latest entry is always a no-op
//!
//! cargo fuzz run fuzz_history_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use wellflow::Error;
use wellflow::history::History;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let mut history = match History::from_json(text) {
        Ok(h) => h,
        Err(Error::CorruptState { .. }) => return,
        Err(other) => panic!("unexpected error class: {other}"),
    };

    let json = history.to_json().expect("accepted history must encode");
    let back = History::from_json(&json).expect("re-encoded history must decode");
    assert_eq!(back, history);

    if let Some(latest) = history.latest().cloned() {
        let len = history.len();
        assert!(!history.append(latest));
        assert_eq!(history.len(), len);
    }
});
