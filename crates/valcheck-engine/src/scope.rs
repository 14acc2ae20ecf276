//! Lifetime of intermediate layers.

use valcheck_core::{GeometryEngine, LayerHandle};

/// Intermediate layers created during a job.
///
/// Every tracked handle is deleted when the scope is dropped, on success and
/// on every error path. Deletion failures are logged and otherwise ignored.
pub struct TempDatasets<'e, E: GeometryEngine + ?Sized> {
    engine: &'e E,
    handles: Vec<LayerHandle>,
}

impl<'e, E: GeometryEngine + ?Sized> TempDatasets<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self { engine, handles: Vec::new() }
    }

    /// Track a handle for disposal, returning it for chaining
    pub fn track(&mut self, handle: LayerHandle) -> LayerHandle {
        self.handles.push(handle.clone());
        handle
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<E: GeometryEngine + ?Sized> Drop for TempDatasets<'_, E> {
    fn drop(&mut self) {
        let count = self.handles.len();
        for handle in self.handles.drain(..).rev() {
            if let Err(e) = self.engine.delete(&handle) {
                tracing::warn!("Failed to delete temporary dataset {}: {}", handle, e);
            }
        }
        if count > 0 {
            tracing::debug!("Disposed of {} temporary datasets", count);
        }
    }
}
