//! # vtmem-layout
//!
//! Physical layout of value, identity and array objects under a
//! [`RuntimeConfig`]: which fields and arrays are flattened, header shapes,
//! object sizes and field offsets.
//!
//! All computations go through a [`LayoutEngine`], which owns the configuration
//! and caches layouts per type.
use dashmap::DashMap;
use vtmem_types::{TypeDescriptor, TypeRegistry};
use vtmem_utils::{sync::Arc, TypeId};

pub mod classifier;
pub mod config;
pub mod error;
pub mod factory;
pub mod header;
pub mod layout;
pub mod metrics;
pub mod offsets;
pub mod size;

pub use config::{AddressingMode, GcHeaderPolicy, GcPolicy, RuntimeConfig};
pub use error::{ConfigError, LayoutError};
pub use header::{ArrayHeaderShape, HeaderSizeCalculator, ObjectHeaderShape};
pub use layout::{
    ArrayLayout, FieldLayout, FieldSummary, FlatValue, HasLayout, InstanceLayout, LayoutManager,
    ObjectLayout, ReferenceSlot, Scalar,
};
pub use metrics::{CacheStat, CacheStats, LayoutMetrics};
pub use offsets::SlotLayout;

use factory::LayoutFactory;

pub struct LayoutEngine {
    config: RuntimeConfig,
    registry: Arc<TypeRegistry>,
    instance_layouts: DashMap<TypeId, Arc<InstanceLayout>>,
    array_layouts: DashMap<TypeId, Arc<ArrayLayout>>,
    metrics: LayoutMetrics,
}

impl LayoutEngine {
    pub fn new(config: RuntimeConfig, registry: Arc<TypeRegistry>) -> Self {
        Self {
            config,
            registry,
            instance_layouts: DashMap::new(),
            array_layouts: DashMap::new(),
            metrics: LayoutMetrics::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn cache_statistics(&self) -> CacheStats {
        self.metrics
            .cache_statistics(self.instance_layouts.len(), self.array_layouts.len())
    }

    pub fn instance_layout(&self, ty: &TypeDescriptor) -> Result<Arc<InstanceLayout>, LayoutError> {
        if let Some(cached) = self.instance_layouts.get(&ty.id) {
            self.metrics.record_instance_layout_cache_hit();
            return Ok(Arc::clone(&cached));
        }

        self.metrics.record_instance_layout_cache_miss();
        // No map guard is held here; computing a layout recurses into the
        // layouts of flattened field types.
        let result = Arc::new(LayoutFactory::create_instance_layout(self, ty)?);
        self.instance_layouts.insert(ty.id, Arc::clone(&result));
        Ok(result)
    }

    pub fn array_layout(&self, ty: &TypeDescriptor) -> Result<Arc<ArrayLayout>, LayoutError> {
        if let Some(cached) = self.array_layouts.get(&ty.id) {
            self.metrics.record_array_layout_cache_hit();
            return Ok(Arc::clone(&cached));
        }

        self.metrics.record_array_layout_cache_miss();
        let result = Arc::new(LayoutFactory::create_array_layout(self, ty)?);
        self.array_layouts.insert(ty.id, Arc::clone(&result));
        Ok(result)
    }

    pub fn object_layout(&self, ty: &TypeDescriptor) -> Result<ObjectLayout, LayoutError> {
        if ty.is_array() {
            Ok(ObjectLayout::Array(self.array_layout(ty)?))
        } else {
            Ok(ObjectLayout::Instance(self.instance_layout(ty)?))
        }
    }
}
