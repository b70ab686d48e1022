#![no_main]
use libfuzzer_sys::fuzz_target;
use linkpress::CompressHandle;

// First byte picks the model id (any value, registered or not), second
// byte scales the output buffer; the rest is the wire payload.
fuzz_target!(|data: &[u8]| {
    let [model, scale, payload @ ..] = data else {
        return;
    };

    let handle = CompressHandle::new();
    let mut out = vec![0u8; usize::from(*scale) * 256];
    if let Ok(n) = handle.decompress(*model, payload, &mut out) {
        assert!(n <= out.len());
    }
});
