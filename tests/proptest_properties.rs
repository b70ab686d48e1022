use linkpress::{
    CompressError, CompressHandle, CompressOutcome, CompressionConfig, PassThrough, Registry,
};
use proptest::prelude::*;

/// (model id, level) pairs accepted by `configure` in this build. Levels are
/// sampled from each backend's range, with extreme lz4 accelerations and
/// negative zstd levels included.
fn model_and_level() -> impl Strategy<Value = (u8, i32)> {
    let pairs: Vec<(u8, i32)> = Registry::builtin()
        .supported()
        .flat_map(|m| {
            let levels = m.backend().map(|b| b.levels()).unwrap_or(0..=0);
            let (lo, hi) = (*levels.start(), *levels.end());
            let mid = lo + (hi - lo) / 2;
            let mut picks = vec![lo, hi, mid, 1.clamp(lo, hi)];
            picks.dedup();
            picks.into_iter().map(move |level| (m.id, level))
        })
        .collect();
    proptest::sample::select(pairs)
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 1..2048),
        // Low-entropy input that every model can shrink.
        (proptest::collection::vec(any::<u8>(), 1..16), 1usize..256)
            .prop_map(|(seed, reps)| seed.repeat(reps)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_compress_decompress_roundtrip(
        (model, level) in model_and_level(),
        data in payload(),
    ) {
        let sender = CompressHandle::new();
        sender.configure(&CompressionConfig::new(model, level)).unwrap();
        let receiver = CompressHandle::new();

        let mut wire = vec![0u8; data.len()];
        match sender.compress(&data, &mut wire).unwrap() {
            CompressOutcome::Compressed { model: id, len } => {
                prop_assert_eq!(id, model);
                let mut plain = vec![0u8; data.len()];
                let n = receiver.decompress(id, &wire[..len], &mut plain).unwrap();
                prop_assert_eq!(&plain[..n], &data[..]);
            }
            CompressOutcome::PassThrough(reason) => {
                prop_assert_eq!(reason, PassThrough::Ineffective);
            }
        }
    }

    #[test]
    fn prop_never_sends_larger_form(
        (model, level) in model_and_level(),
        data in payload(),
        slack in 0usize..128,
    ) {
        let handle = CompressHandle::new();
        handle.configure(&CompressionConfig::new(model, level)).unwrap();
        let mut wire = vec![0u8; data.len() + slack];
        if let CompressOutcome::Compressed { len, .. } = handle.compress(&data, &mut wire).unwrap() {
            prop_assert!(len < data.len(), "len={} input={}", len, data.len());
        }
    }

    #[test]
    fn prop_threshold_is_respected(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        threshold in 0usize..512,
    ) {
        let registry = Registry::builtin();
        let Some(model) = registry.supported().next() else {
            return Ok(());
        };
        let level = model.backend().map(|b| *b.levels().start()).unwrap_or(0);
        let handle = CompressHandle::new();
        handle
            .configure(&CompressionConfig::new(model.id, level).with_threshold(threshold))
            .unwrap();

        let mut wire = vec![0u8; data.len()];
        let outcome = handle.compress(&data, &mut wire).unwrap();
        if data.len() <= threshold {
            prop_assert_eq!(outcome, CompressOutcome::PassThrough(PassThrough::BelowThreshold));
        } else {
            prop_assert_ne!(outcome, CompressOutcome::PassThrough(PassThrough::BelowThreshold));
        }
    }

    #[test]
    fn prop_arbitrary_input_never_panics_decompress(
        model in any::<u8>(),
        data in proptest::collection::vec(any::<u8>(), 0..512),
        capacity in 0usize..4096,
    ) {
        let handle = CompressHandle::new();
        let mut out = vec![0u8; capacity];
        match handle.decompress(model, &data, &mut out) {
            Ok(n) => prop_assert!(n <= capacity),
            Err(CompressError::UnknownModel(id)) => prop_assert_eq!(id, model),
            Err(_) => {}
        }
        // The handle stays usable after any failure.
        prop_assert_eq!(handle.configured(), None);
    }

    #[test]
    fn prop_invalid_level_keeps_configuration(
        (model, level) in model_and_level(),
        offset in 1i32..1000,
    ) {
        let handle = CompressHandle::new();
        handle.configure(&CompressionConfig::new(model, level)).unwrap();
        let before = handle.configured();

        let backend = Registry::builtin().lookup(model).unwrap().backend().unwrap();
        let bad = backend.levels().end().saturating_add(offset);
        let is_invalid_level = matches!(
            handle.configure(&CompressionConfig::new(model, bad)),
            Err(CompressError::InvalidLevel { .. })
        );
        prop_assert!(is_invalid_level);
        prop_assert_eq!(handle.configured(), before);
    }
}
