//! Fuzz target for line reassembly
//!
//! The first byte picks a chunk size; the rest is fed to a `LineBuffer` in
//! chunks of that size. Reassembly must never panic and the buffer must
//! never hold more than its capacity.

#![no_main]

use irclink::LineBuffer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&size, stream)) = data.split_first() else {
        return;
    };

    let mut buffer = LineBuffer::with_capacity(64);
    for chunk in stream.chunks(usize::from(size).max(1)) {
        if let Ok(lines) = buffer.feed(chunk) {
            for line in lines {
                assert!(!line.contains('\n'));
            }
        }
        assert!(buffer.pending() < buffer.capacity());
    }
});
