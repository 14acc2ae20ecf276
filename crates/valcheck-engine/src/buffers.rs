//! Buffer Dependency Resolver.
//!
//! Buffers are built in catalogue order. A buffer sourced from another buffer
//! is an outside-only ring around it, so its source must already exist; the
//! catalogue is never reordered.

use crate::scope::TempDatasets;
use std::collections::BTreeMap;
use valcheck_core::models::{BufferCatalogue, BufferSource};
use valcheck_core::{GeometryEngine, LayerHandle, Result, ValcheckError};

/// Materialised buffer layers keyed by class name
#[derive(Debug, Clone, Default)]
pub struct BufferSet {
    layers: BTreeMap<String, LayerHandle>,
    /// Build order
    built: Vec<String>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: &str) -> Option<&LayerHandle> {
        self.layers.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.layers.contains_key(class)
    }

    /// Class names in the order they were built
    pub fn build_order(&self) -> &[String] {
        &self.built
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }

    fn insert(&mut self, class: &str, handle: LayerHandle) {
        self.layers.insert(class.to_string(), handle);
        self.built.push(class.to_string());
    }
}

/// Build every catalogue buffer missing from `buffers`.
///
/// Returns how many buffers were built; classes already present are left
/// alone. Referencing a source buffer that has not been built yet is a fatal
/// catalogue error.
pub fn resolve_buffers<E: GeometryEngine + ?Sized>(
    engine: &E,
    catalogue: &BufferCatalogue,
    works: &LayerHandle,
    buffers: &mut BufferSet,
    scope: &mut TempDatasets<'_, E>,
) -> Result<usize> {
    let mut created = 0;

    for spec in catalogue.specs() {
        if buffers.contains(&spec.name) {
            tracing::debug!("Buffer {} already exists, skipping", spec.name);
            continue;
        }

        let input = match &spec.source {
            BufferSource::Works => works.clone(),
            BufferSource::Buffer(source) => match buffers.get(source) {
                Some(handle) => handle.clone(),
                None => {
                    return Err(ValcheckError::BufferCatalogue {
                        buffer: spec.name.clone(),
                        reason: format!(
                            "source buffer '{}' has not been built; it must be declared before '{}'",
                            source, spec.name
                        ),
                    })
                }
            },
        };

        tracing::info!(
            "Creating buffer {} ({}, {} from {})",
            spec.name,
            spec.distance,
            spec.style,
            spec.source
        );
        let handle = scope.track(engine.buffer(&input, spec.distance, spec.style)?);
        buffers.insert(&spec.name, handle);
        created += 1;
    }

    Ok(created)
}
