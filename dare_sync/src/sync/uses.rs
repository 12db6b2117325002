use crate::resource::{BufferHandle, ImageHandle};
use crate::scope::{BufferScope, ImageScope};

/// Every resource one command touches, with one merged scope per resource.
///
/// A resource referenced more than once (the same buffer as copy source and destination, the
/// same image through two descriptors) ends up with the union of its scopes so it receives a
/// single barrier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceUses {
    buffers: Vec<(BufferHandle, BufferScope)>,
    images: Vec<(ImageHandle, ImageScope)>,
}

impl ResourceUses {
    pub fn add_buffer(&mut self, handle: BufferHandle, scope: BufferScope) -> &mut Self {
        match self.buffers.iter_mut().find(|(existing, _)| *existing == handle) {
            Some((_, existing)) => *existing |= scope,
            None => self.buffers.push((handle, scope)),
        }
        self
    }

    pub fn add_image(&mut self, handle: ImageHandle, scope: ImageScope) -> &mut Self {
        match self.images.iter_mut().find(|(existing, _)| *existing == handle) {
            Some((_, existing)) => *existing |= scope,
            None => self.images.push((handle, scope)),
        }
        self
    }

    pub fn extend(&mut self, other: &ResourceUses) -> &mut Self {
        for (handle, scope) in other.buffers.iter() {
            self.add_buffer(*handle, *scope);
        }
        for (handle, scope) in other.images.iter() {
            self.add_image(*handle, *scope);
        }
        self
    }

    pub fn buffers(&self) -> &[(BufferHandle, BufferScope)] {
        &self.buffers
    }

    pub fn images(&self) -> &[(ImageHandle, ImageScope)] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }

    pub(crate) fn retain_buffers(&mut self, keep: impl FnMut(&(BufferHandle, BufferScope)) -> bool) {
        self.buffers.retain(keep);
    }

    pub(crate) fn retain_images(&mut self, keep: impl FnMut(&(ImageHandle, ImageScope)) -> bool) {
        self.images.retain(keep);
    }
}
