//! Fuzz target: snapshot document decoder
//!
//! The snapshot file is read back at every start, so its decoder sees
//! whatever a crash, a full disk or a hand edit left behind.  Verifies:
//! - No panics under arbitrary bytes
//! - Every failure is `Error::CorruptState` (the controller's fallback path)
//! - Anything accepted has a level in 0..=100 and re-encodes to an equal value
//!
//! cargo fuzz run fuzz_snapshot_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use wellflow::Error;
use wellflow::snapshot::Snapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    match Snapshot::from_json(text) {
        Ok(snapshot) => {
            assert!(snapshot.well_level.get() <= 100);
            let json = snapshot.to_json().expect("accepted snapshot must encode");
            let back = Snapshot::from_json(&json).expect("re-encoded snapshot must decode");
            assert_eq!(back, snapshot);
            assert_eq!(back.time, snapshot.time);
        }
        Err(Error::CorruptState { .. }) => {}
        Err(other) => panic!("unexpected error class: {other}"),
    }
});
