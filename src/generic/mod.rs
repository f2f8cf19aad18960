// Generic data engine for schemata
//
// Schema-driven operations over `Datum` values: validation, union
// resolution, ordering, hashing, deep copy, default materialization, schema
// induction and rendering. A `GenericData` instance owns the logical type
// conversions it applies and a cache of materialized field defaults.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::codec::{BinaryCodec, Datum, DatumCodec};

pub mod compare;
pub mod conversion;
pub mod copy;
pub mod defaults;
pub mod hash;
pub mod render;
pub mod validate;

pub use self::conversion::Conversion;

use self::defaults::DefaultValueCache;

/// Configuration for the generic data engine
#[derive(Debug, Clone)]
pub struct GenericDataConfig {
    /// Hash budget counter; it is spent before each record field or array
    /// element and hashing stops at zero, so `limit - 1` values contribute
    pub hash_contribution_limit: usize,

    /// Initial capacity of the set of records being rendered
    pub render_seen_capacity: usize,
}

impl Default for GenericDataConfig {
    fn default() -> Self {
        Self {
            hash_contribution_limit: 10,
            render_seen_capacity: 16,
        }
    }
}

/// Schema-driven operations over generic datums
pub struct GenericData {
    config: GenericDataConfig,
    conversions: DashMap<(String, String), Arc<dyn Conversion>>,
    codec: Arc<dyn DatumCodec>,
    default_cache: DefaultValueCache,
}

/// Stand-in for record slots missing from a narrower instance.
pub(crate) static NULL_DATUM: Datum = Datum::Null;

static DEFAULT_INSTANCE: Lazy<GenericData> = Lazy::new(GenericData::new);

impl Default for GenericData {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericData {
    /// Creates an engine with the default configuration, the binary codec
    /// and the built-in conversions.
    pub fn new() -> Self {
        Self::with_config(GenericDataConfig::default())
    }

    /// Creates an engine with a custom configuration
    pub fn with_config(config: GenericDataConfig) -> Self {
        Self::with_codec(config, Arc::new(BinaryCodec::new()))
    }

    /// Creates an engine that materializes defaults through `codec`
    pub fn with_codec(config: GenericDataConfig, codec: Arc<dyn DatumCodec>) -> Self {
        let data = Self {
            config,
            conversions: DashMap::new(),
            codec,
            default_cache: DefaultValueCache::new(),
        };
        for conversion in conversion::builtin_conversions() {
            data.add_logical_type_conversion(conversion);
        }
        data
    }

    /// The process-wide default instance.
    pub fn get() -> &'static GenericData {
        &DEFAULT_INSTANCE
    }

    pub fn config(&self) -> &GenericDataConfig {
        &self.config
    }

    pub fn codec(&self) -> &Arc<dyn DatumCodec> {
        &self.codec
    }
}
