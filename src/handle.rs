// Per-handle compression state: configuration, lazy backend lifecycle and
// packet dispatch.
//
// One `CompressHandle` belongs to one transport handle and is shared by its
// sender and receiver threads. Everything mutable sits behind a single
// handle-scoped lock, held for the whole of each operation:
//   - `configure` cannot race with a packet being compressed
//   - two threads loading the same model never both call `init`
//   - calls into one backend context are serialized
//
// Outgoing packets use the configured model. Incoming packets name their
// model on the wire, and any model this binary supports is loaded on
// demand to decode them, whatever the local configuration says.

use std::mem;
use std::time::Instant;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::backend::BackendContext;
use crate::buffer::OutputBuffer;
use crate::config::{CompressionConfig, MAX_PAYLOAD_SIZE};
use crate::error::CompressError;
use crate::registry::Registry;
use crate::stats::CompressStats;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The model a handle compresses outgoing traffic with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredModel {
    pub id: u8,
    pub name: &'static str,
    pub level: i32,
    pub threshold: usize,
}

/// Introspection entry for one registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStatus {
    pub id: u8,
    pub name: &'static str,
    /// The library is compiled in and usable.
    pub built_in: bool,
    /// A context exists for this handle.
    pub loaded: bool,
}

/// Why a payload is sent uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThrough {
    /// No model configured.
    NotConfigured,
    /// Payload not larger than the configured threshold.
    BelowThreshold,
    /// Compressed form would not be smaller than the input.
    Ineffective,
}

/// Result of [`CompressHandle::compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOutcome {
    /// `len` bytes of the output buffer hold the payload compressed with
    /// `model`; the framing layer tags the packet with that id.
    Compressed { model: u8, len: usize },
    /// Send the input unmodified, tagged uncompressed.
    PassThrough(PassThrough),
}

impl CompressOutcome {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

// ---------------------------------------------------------------------------
// Handle state
// ---------------------------------------------------------------------------

enum ModelSlot {
    NotLoaded,
    Loaded(Box<dyn BackendContext>),
}

struct HandleState {
    configured: Option<ConfiguredModel>,
    /// Indexed by model id.
    slots: Vec<ModelSlot>,
    stats: CompressStats,
}

impl HandleState {
    fn new(registry: Registry) -> Self {
        let slots = (0..=registry.max_id()).map(|_| ModelSlot::NotLoaded).collect();
        Self {
            configured: None,
            slots,
            stats: CompressStats::default(),
        }
    }

    fn teardown(&mut self, registry: Registry) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let ModelSlot::Loaded(context) = mem::replace(slot, ModelSlot::NotLoaded) else {
                continue;
            };
            let id = index as u8;
            match registry.lookup(id).and_then(|m| m.backend()) {
                Ok(backend) => {
                    backend.teardown(context);
                    debug!("compression model '{}' unloaded", backend.name());
                }
                Err(_) => drop(context),
            }
        }
    }
}

/// Return model `id`'s context, initializing it first if needed.
fn load(
    slots: &mut [ModelSlot],
    registry: Registry,
    id: u8,
) -> Result<&mut Box<dyn BackendContext>, CompressError> {
    let index = usize::from(id);
    if !matches!(slots.get(index), Some(ModelSlot::Loaded(_))) {
        let model = registry.lookup(id)?;
        let backend = model.backend()?;
        let context = backend.init().inspect_err(|err| {
            warn!("compression model '{}' failed to initialize: {err}", model.name);
        })?;
        let slot = slots
            .get_mut(index)
            .ok_or(CompressError::UnknownModel(id))?;
        *slot = ModelSlot::Loaded(context);
        debug!("compression model '{}' (id {id}) loaded", model.name);
    }
    match slots.get_mut(index) {
        Some(ModelSlot::Loaded(context)) => Ok(context),
        _ => Err(CompressError::UnknownModel(id)),
    }
}

// ---------------------------------------------------------------------------
// CompressHandle
// ---------------------------------------------------------------------------

/// Compression state of one transport handle.
///
/// Share it between threads with `Arc`. Dropping the last reference tears
/// down every loaded backend.
pub struct CompressHandle {
    registry: Registry,
    state: Mutex<HandleState>,
}

impl Default for CompressHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompressHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressHandle")
            .field("configured", &self.configured())
            .field("models", &self.models())
            .finish()
    }
}

impl CompressHandle {
    /// A handle over the built-in model table, compression disabled.
    pub fn new() -> Self {
        Self::with_registry(Registry::builtin())
    }

    /// A handle over a custom model table.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            state: Mutex::new(HandleState::new(registry)),
        }
    }

    pub fn registry(&self) -> Registry {
        self.registry
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Select the model and level for outgoing traffic.
    ///
    /// Everything is validated before anything is stored; on error the
    /// previous configuration stays in place. No backend is initialized
    /// here: that happens on the first packet.
    pub fn configure(&self, config: &CompressionConfig) -> Result<(), CompressError> {
        let Some(id) = config.model else {
            if let Some(previous) = self.state.lock().configured.take() {
                info!("compression disabled (was '{}')", previous.name);
            }
            return Ok(());
        };

        let model = self.registry.lookup(id)?;
        let backend = model.backend()?;
        if !backend.validate_level(config.level) {
            let levels = backend.levels();
            return Err(CompressError::InvalidLevel {
                model: model.name,
                level: config.level,
                min: *levels.start(),
                max: *levels.end(),
            });
        }
        config.validate_limits()?;

        let configured = ConfiguredModel {
            id,
            name: model.name,
            level: config.level,
            threshold: config.threshold,
        };
        self.state.lock().configured = Some(configured);
        info!(
            "compression set to '{}' (id {id}), level {}, threshold {}",
            model.name, config.level, config.threshold
        );
        Ok(())
    }

    /// The current outgoing configuration, if any.
    pub fn configured(&self) -> Option<ConfiguredModel> {
        self.state.lock().configured
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Make sure model `id` has a context on this handle.
    pub fn ensure_loaded(&self, id: u8) -> Result<(), CompressError> {
        let mut state = self.state.lock();
        load(&mut state.slots, self.registry, id).map(|_| ())
    }

    pub fn is_loaded(&self, id: u8) -> bool {
        let state = self.state.lock();
        matches!(state.slots.get(usize::from(id)), Some(ModelSlot::Loaded(_)))
    }

    /// Tear down every loaded model. The configuration is kept; the next
    /// packet loads what it needs again.
    pub fn teardown_all(&self) {
        self.state.lock().teardown(self.registry);
    }

    /// Every registered model with its build and load state.
    pub fn models(&self) -> Vec<ModelStatus> {
        let state = self.state.lock();
        self.registry
            .iter()
            .map(|m| ModelStatus {
                id: m.id,
                name: m.name,
                built_in: m.backend().is_ok(),
                loaded: matches!(
                    state.slots.get(usize::from(m.id)),
                    Some(ModelSlot::Loaded(_))
                ),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Compress an outgoing payload with the configured model.
    ///
    /// An `out` of `input.len()` bytes is always enough: anything that
    /// would not fit in it is not worth sending compressed.
    pub fn compress(&self, input: &[u8], out: &mut [u8]) -> Result<CompressOutcome, CompressError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(cfg) = state.configured else {
            return Ok(CompressOutcome::PassThrough(PassThrough::NotConfigured));
        };
        if input.len() <= cfg.threshold {
            state.stats.tx_passthrough_packets += 1;
            return Ok(CompressOutcome::PassThrough(PassThrough::BelowThreshold));
        }
        if input.len() > MAX_PAYLOAD_SIZE {
            state.stats.tx_failed_to_compress += 1;
            return Err(CompressError::PayloadTooLarge {
                len: input.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let capacity = out.len();
        let started = Instant::now();
        let result = load(&mut state.slots, self.registry, cfg.id).and_then(|context| {
            let mut buf = OutputBuffer::new(out);
            context.compress(cfg.level, input, &mut buf).map(|()| buf.len())
        });
        let stats = &mut state.stats;

        match result {
            Ok(len) if len < input.len() => {
                stats.tx_compress_time.record(started.elapsed());
                stats.tx_compressed_packets += 1;
                stats.tx_compressed_original_bytes += input.len() as u64;
                stats.tx_compressed_size_bytes += len as u64;
                trace!("compressed {} -> {len} bytes with '{}'", input.len(), cfg.name);
                Ok(CompressOutcome::Compressed { model: cfg.id, len })
            }
            Ok(_) => {
                stats.tx_passthrough_packets += 1;
                Ok(CompressOutcome::PassThrough(PassThrough::Ineffective))
            }
            Err(CompressError::BufferTooSmall { .. }) if capacity >= input.len() => {
                stats.tx_passthrough_packets += 1;
                Ok(CompressOutcome::PassThrough(PassThrough::Ineffective))
            }
            Err(err) => {
                stats.tx_failed_to_compress += 1;
                debug!("compression with '{}' failed: {err}", cfg.name);
                Err(err)
            }
        }
    }

    /// Decompress an incoming payload that the peer tagged with `model`.
    ///
    /// The local configuration plays no part. Returns the number of bytes
    /// written to `out`.
    pub fn decompress(&self, model: u8, input: &[u8], out: &mut [u8]) -> Result<usize, CompressError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let started = Instant::now();
        let result = load(&mut state.slots, self.registry, model).and_then(|context| {
            let mut buf = OutputBuffer::new(out);
            context.decompress(input, &mut buf).map(|()| buf.len())
        });
        let stats = &mut state.stats;

        match &result {
            Ok(len) => {
                stats.rx_decompress_time.record(started.elapsed());
                stats.rx_compressed_packets += 1;
                stats.rx_compressed_size_bytes += input.len() as u64;
                stats.rx_compressed_original_bytes += *len as u64;
                trace!("decompressed {} -> {len} bytes with model {model}", input.len());
            }
            Err(err) => {
                stats.rx_failed_to_decompress += 1;
                debug!("decompression with model {model} failed: {err}");
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> CompressStats {
        self.state.lock().stats
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats = CompressStats::default();
    }
}

impl Drop for CompressHandle {
    fn drop(&mut self) {
        let registry = self.registry;
        self.state.get_mut().teardown(registry);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
