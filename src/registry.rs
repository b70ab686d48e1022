// Model descriptor table.
//
// Every model this crate knows about has a fixed small-integer id. Models
// whose library is not compiled in stay listed with no backend, so a peer
// using them gets a clear "not built in" answer instead of "unknown".

use std::fmt;

use crate::backend::CompressBackend;
use crate::error::CompressError;

/// Reserved id meaning "no compression". Never registered.
pub const MODEL_NONE: u8 = 0;

/// Name accepted by [`Registry::resolve`] for "no compression".
pub const MODEL_NONE_NAME: &str = "none";

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One registered compression model.
pub struct ModelDescriptor {
    /// Wire identifier.
    pub id: u8,
    /// Display name.
    pub name: &'static str,
    backend: Option<&'static dyn CompressBackend>,
}

impl ModelDescriptor {
    /// A model whose library is part of this binary.
    pub const fn new(id: u8, name: &'static str, backend: &'static dyn CompressBackend) -> Self {
        Self {
            id,
            name,
            backend: Some(backend),
        }
    }

    /// A model known by id and name whose library is absent.
    pub const fn unavailable(id: u8, name: &'static str) -> Self {
        Self {
            id,
            name,
            backend: None,
        }
    }

    /// Whether the library was compiled in.
    pub fn built_in(&self) -> bool {
        self.backend.is_some()
    }

    /// The backend, or `ModelNotBuiltIn`.
    ///
    /// A compiled-in backend whose availability probe fails is treated the
    /// same as one that was never built.
    pub fn backend(&self) -> Result<&'static dyn CompressBackend, CompressError> {
        match self.backend {
            Some(backend) if backend.is_available() => Ok(backend),
            _ => Err(CompressError::ModelNotBuiltIn {
                id: self.id,
                name: self.name,
            }),
        }
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("built_in", &self.built_in())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

#[cfg(feature = "zlib")]
const ZLIB: ModelDescriptor = ModelDescriptor::new(1, "zlib", &crate::backend::zlib::ZLIB);
#[cfg(not(feature = "zlib"))]
const ZLIB: ModelDescriptor = ModelDescriptor::unavailable(1, "zlib");

#[cfg(feature = "zlib")]
const DEFLATE: ModelDescriptor =
    ModelDescriptor::new(2, "deflate", &crate::backend::zlib::DEFLATE);
#[cfg(not(feature = "zlib"))]
const DEFLATE: ModelDescriptor = ModelDescriptor::unavailable(2, "deflate");

#[cfg(feature = "lz4")]
const LZ4: ModelDescriptor = ModelDescriptor::new(3, "lz4", &crate::backend::lz4::LZ4);
#[cfg(not(feature = "lz4"))]
const LZ4: ModelDescriptor = ModelDescriptor::unavailable(3, "lz4");

#[cfg(feature = "lz4")]
const LZ4HC: ModelDescriptor = ModelDescriptor::new(4, "lz4hc", &crate::backend::lz4::LZ4HC);
#[cfg(not(feature = "lz4"))]
const LZ4HC: ModelDescriptor = ModelDescriptor::unavailable(4, "lz4hc");

#[cfg(feature = "lzma")]
const LZMA: ModelDescriptor = ModelDescriptor::new(6, "lzma", &crate::backend::lzma::LZMA);
#[cfg(not(feature = "lzma"))]
const LZMA: ModelDescriptor = ModelDescriptor::unavailable(6, "lzma");

#[cfg(feature = "zstd")]
const ZSTD: ModelDescriptor = ModelDescriptor::new(8, "zstd", &crate::backend::zstd::ZSTD);
#[cfg(not(feature = "zstd"))]
const ZSTD: ModelDescriptor = ModelDescriptor::unavailable(8, "zstd");

/// Every model known to this crate, ordered by id.
static BUILTIN_MODELS: [ModelDescriptor; 8] = [
    ZLIB,
    DEFLATE,
    LZ4,
    LZ4HC,
    ModelDescriptor::unavailable(5, "lzo2"),
    LZMA,
    ModelDescriptor::unavailable(7, "bzip2"),
    ZSTD,
];

/// Checked once, at compile time.
static BUILTIN_REGISTRY: Registry = Registry::new(&BUILTIN_MODELS);

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only view of a model table. Cheap to copy, safe to share.
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    models: &'static [ModelDescriptor],
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    /// A registry over a caller-supplied table.
    ///
    /// # Panics
    ///
    /// If an id is [`MODEL_NONE`] or appears twice. Per-handle slots are
    /// indexed by id, so either would let two models share one slot. In a
    /// `const` or `static` initializer this is a compile error.
    pub const fn new(models: &'static [ModelDescriptor]) -> Self {
        let mut i = 0;
        while i < models.len() {
            assert!(models[i].id != MODEL_NONE, "model id 0 is reserved");
            let mut j = i + 1;
            while j < models.len() {
                assert!(models[i].id != models[j].id, "duplicate model id");
                j += 1;
            }
            i += 1;
        }
        Self { models }
    }

    /// The models compiled into this crate.
    pub fn builtin() -> Self {
        BUILTIN_REGISTRY
    }

    /// Find a model by id.
    pub fn lookup(&self, id: u8) -> Result<&'static ModelDescriptor, CompressError> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or(CompressError::UnknownModel(id))
    }

    /// Find a model by name (ASCII case-insensitive).
    pub fn find(&self, name: &str) -> Option<&'static ModelDescriptor> {
        self.models.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Resolve an operator-facing name to a model id; `"none"` maps to
    /// `None`.
    pub fn resolve(&self, name: &str) -> Result<Option<u8>, CompressError> {
        if name.eq_ignore_ascii_case(MODEL_NONE_NAME) {
            return Ok(None);
        }
        self.find(name)
            .map(|m| Some(m.id))
            .ok_or_else(|| CompressError::UnknownModelName(name.to_string()))
    }

    /// All registered models, ordered as in the table.
    pub fn iter(&self) -> impl Iterator<Item = &'static ModelDescriptor> + use<> {
        let models = self.models;
        models.iter()
    }

    /// Models this binary can actually compress and decompress.
    pub fn supported(&self) -> impl Iterator<Item = &'static ModelDescriptor> + use<> {
        self.iter().filter(|m| m.backend().is_ok())
    }

    /// Largest registered id, for sizing per-handle slot tables.
    pub fn max_id(&self) -> u8 {
        self.models.iter().map(|m| m.id).max().unwrap_or(MODEL_NONE)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_nonzero() {
        let registry = Registry::builtin();
        let ids: HashSet<u8> = registry.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), registry.len());
        assert!(!ids.contains(&MODEL_NONE));
        assert_eq!(registry.max_id(), 8);
    }

    #[test]
    #[should_panic(expected = "duplicate model id")]
    fn duplicate_ids_are_rejected() {
        static MODELS: [ModelDescriptor; 3] = [
            ModelDescriptor::unavailable(3, "first"),
            ModelDescriptor::unavailable(4, "other"),
            ModelDescriptor::unavailable(3, "second"),
        ];
        let _ = Registry::new(&MODELS);
    }

    #[test]
    #[should_panic(expected = "model id 0 is reserved")]
    fn reserved_id_is_rejected() {
        static MODELS: [ModelDescriptor; 2] = [
            ModelDescriptor::unavailable(1, "one"),
            ModelDescriptor::unavailable(MODEL_NONE, "zero"),
        ];
        let _ = Registry::new(&MODELS);
    }

    #[test]
    fn custom_table_with_gaps_is_accepted() {
        static MODELS: [ModelDescriptor; 2] = [
            ModelDescriptor::unavailable(9, "nine"),
            ModelDescriptor::unavailable(2, "two"),
        ];
        let registry = Registry::new(&MODELS);
        assert_eq!(registry.max_id(), 9);
        assert_eq!(registry.lookup(2).unwrap().name, "two");
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = Registry::builtin().iter().map(|m| m.name).collect();
        assert_eq!(names.len(), Registry::builtin().len());
        assert!(!names.contains(MODEL_NONE_NAME));
    }

    #[test]
    fn lookup_by_id() {
        let registry = Registry::builtin();
        assert_eq!(registry.lookup(1).unwrap().name, "zlib");
        assert_eq!(registry.lookup(8).unwrap().name, "zstd");
        assert!(matches!(
            registry.lookup(99),
            Err(CompressError::UnknownModel(99))
        ));
        assert!(matches!(
            registry.lookup(MODEL_NONE),
            Err(CompressError::UnknownModel(0))
        ));
    }

    #[test]
    fn models_without_library_are_listed_but_not_built_in() {
        let registry = Registry::builtin();
        for name in ["lzo2", "bzip2"] {
            let model = registry.find(name).unwrap();
            assert!(!model.built_in());
            assert!(matches!(
                model.backend(),
                Err(CompressError::ModelNotBuiltIn { .. })
            ));
        }
        assert!(registry.supported().all(|m| m.built_in()));
    }

    #[test]
    fn built_in_flag_follows_features() {
        let registry = Registry::builtin();
        assert_eq!(registry.find("zlib").unwrap().built_in(), cfg!(feature = "zlib"));
        assert_eq!(registry.find("lz4").unwrap().built_in(), cfg!(feature = "lz4"));
        assert_eq!(registry.find("lzma").unwrap().built_in(), cfg!(feature = "lzma"));
        assert_eq!(registry.find("zstd").unwrap().built_in(), cfg!(feature = "zstd"));
    }

    #[test]
    fn resolve_names() {
        let registry = Registry::builtin();
        assert_eq!(registry.resolve("none").unwrap(), None);
        assert_eq!(registry.resolve("NONE").unwrap(), None);
        assert_eq!(registry.resolve("Zstd").unwrap(), Some(8));
        assert!(matches!(
            registry.resolve("snappy"),
            Err(CompressError::UnknownModelName(_))
        ));
    }
}
