#![no_main]
use libfuzzer_sys::fuzz_target;
use linkpress::{CompressHandle, CompressOutcome, CompressionConfig, Registry};

fuzz_target!(|data: &[u8]| {
    let [selector, level_byte, payload @ ..] = data else {
        return;
    };

    let registry = Registry::builtin();
    let models: Vec<_> = registry.supported().collect();
    if models.is_empty() {
        return;
    }
    let model = models[usize::from(*selector) % models.len()];
    let Ok(backend) = model.backend() else {
        return;
    };
    let levels = backend.levels();
    let span = i64::from(*levels.end()) - i64::from(*levels.start()) + 1;
    let level = *levels.start() + (i64::from(*level_byte) % span) as i32;

    let sender = CompressHandle::new();
    if sender.configure(&CompressionConfig::new(model.id, level)).is_err() {
        return;
    }

    let mut wire = vec![0u8; payload.len()];
    let Ok(CompressOutcome::Compressed { model: id, len }) = sender.compress(payload, &mut wire)
    else {
        return;
    };
    assert!(len < payload.len());

    let receiver = CompressHandle::new();
    let mut plain = vec![0u8; payload.len()];
    let n = receiver
        .decompress(id, &wire[..len], &mut plain)
        .expect("peer failed to decode its own model");
    assert_eq!(&plain[..n], payload);
});
