use ash::vk;
use dare_containers::slot::Slot;

use crate::error::SyncError;
use crate::scope::ImageScope;
use crate::sync::{ImageState, SubresourceRange};
use crate::util::format;

pub type ImageHandle = Slot<ImageRecord>;

/// Describes an externally created image to be tracked
#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub handle: vk::Image,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: vk::ImageUsageFlags,
    pub name: Option<String>,
    /// Scope [`release_image`](crate::CommandRecorder::release_image) returns to. Derived from
    /// `usage` when unset.
    pub baseline: Option<ImageScope>,
}

impl ImageDesc {
    pub fn new(
        handle: vk::Image,
        format: vk::Format,
        extent: vk::Extent3D,
        usage: vk::ImageUsageFlags,
    ) -> Self {
        Self {
            handle,
            format,
            extent,
            mip_levels: 1,
            array_layers: 1,
            usage,
            name: None,
            baseline: None,
        }
    }

    /// Shorthand for a single layer 2D image
    pub fn new_2d(
        handle: vk::Image,
        format: vk::Format,
        width: u32,
        height: u32,
        usage: vk::ImageUsageFlags,
    ) -> Self {
        Self::new(
            handle,
            format,
            vk::Extent3D {
                width,
                height,
                depth: 1,
            },
            usage,
        )
    }

    pub fn mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    pub fn array_layers(mut self, array_layers: u32) -> Self {
        self.array_layers = array_layers;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn baseline(mut self, baseline: ImageScope) -> Self {
        self.baseline = Some(baseline);
        self
    }
}

#[derive(Debug)]
pub struct ImageRecord {
    handle: vk::Image,
    format: vk::Format,
    extent: vk::Extent3D,
    aspect: vk::ImageAspectFlags,
    mip_levels: u32,
    array_layers: u32,
    usage: vk::ImageUsageFlags,
    name: Option<String>,
    baseline: Option<ImageScope>,
    pub(crate) state: ImageState,
}

impl ImageRecord {
    pub(crate) fn new(desc: ImageDesc) -> Result<Self, SyncError> {
        if desc.usage.is_empty() {
            return Err(SyncError::NoUsage);
        }
        let baseline = match desc.baseline {
            Some(baseline) => {
                baseline.validate_usage(desc.usage)?;
                // must resolve to a layout
                baseline.layout()?;
                Some(baseline)
            }
            None => ImageScope::baseline_for_usage(desc.usage),
        };
        Ok(Self {
            handle: desc.handle,
            format: desc.format,
            extent: desc.extent,
            aspect: format::aspect_from_format(desc.format),
            mip_levels: desc.mip_levels.max(1),
            array_layers: desc.array_layers.max(1),
            usage: desc.usage,
            name: desc.name,
            baseline,
            state: ImageState::default(),
        })
    }

    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn usage(&self) -> vk::ImageUsageFlags {
        self.usage
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn baseline(&self) -> Option<ImageScope> {
        self.baseline
    }

    pub fn state(&self) -> &ImageState {
        &self.state
    }

    pub fn whole_range(&self) -> SubresourceRange {
        SubresourceRange::whole(self.aspect)
    }

    pub(crate) fn check_layers(
        &self,
        layers: &vk::ImageSubresourceLayers,
    ) -> Result<(), SyncError> {
        let layer_end = layers.base_array_layer.checked_add(layers.layer_count);
        let in_range = layers.mip_level < self.mip_levels
            && layers.layer_count > 0
            && matches!(layer_end, Some(end) if end <= self.array_layers)
            && !layers.aspect_mask.is_empty()
            && self.aspect.contains(layers.aspect_mask);
        if in_range {
            Ok(())
        } else {
            Err(SyncError::RegionOutOfBounds)
        }
    }

    /// Checks a region of `extent` texels at `offset` fits the addressed mip level
    pub(crate) fn check_region(
        &self,
        layers: &vk::ImageSubresourceLayers,
        offset: vk::Offset3D,
        extent: vk::Extent3D,
    ) -> Result<(), SyncError> {
        self.check_layers(layers)?;
        let mip = format::mip_extent(self.extent, layers.mip_level);
        let fits = |offset: i32, size: u32, limit: u32| {
            offset >= 0 && size > 0 && (offset as u64) + (size as u64) <= limit as u64
        };
        if fits(offset.x, extent.width, mip.width)
            && fits(offset.y, extent.height, mip.height)
            && fits(offset.z, extent.depth, mip.depth)
        {
            Ok(())
        } else {
            Err(SyncError::RegionOutOfBounds)
        }
    }

    /// Checks both corners of a blit region lie within the addressed mip level
    pub(crate) fn check_corners(
        &self,
        layers: &vk::ImageSubresourceLayers,
        corners: &[vk::Offset3D; 2],
    ) -> Result<(), SyncError> {
        self.check_layers(layers)?;
        let mip = format::mip_extent(self.extent, layers.mip_level);
        let within = |value: i32, limit: u32| value >= 0 && value as u64 <= limit as u64;
        if corners.iter().all(|corner| {
            within(corner.x, mip.width) && within(corner.y, mip.height) && within(corner.z, mip.depth)
        }) {
            Ok(())
        } else {
            Err(SyncError::RegionOutOfBounds)
        }
    }

    pub(crate) fn check_subresource_range(
        &self,
        range: &vk::ImageSubresourceRange,
    ) -> Result<(), SyncError> {
        let within = |base: u32, count: u32, limit: u32| {
            base < limit
                && (count == vk::REMAINING_MIP_LEVELS
                    || (count > 0 && base.checked_add(count).is_some_and(|end| end <= limit)))
        };
        if within(range.base_mip_level, range.level_count, self.mip_levels)
            && within(range.base_array_layer, range.layer_count, self.array_layers)
            && self.aspect.contains(range.aspect_mask)
        {
            Ok(())
        } else {
            Err(SyncError::RegionOutOfBounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    fn texture() -> ImageRecord {
        ImageRecord::new(
            ImageDesc::new_2d(
                vk::Image::from_raw(1),
                vk::Format::R8G8B8A8_UNORM,
                64,
                32,
                vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            )
            .mip_levels(3),
        )
        .unwrap()
    }

    #[test]
    fn record_defaults() {
        let record = texture();
        assert_eq!(record.aspect(), vk::ImageAspectFlags::COLOR);
        assert_eq!(record.baseline(), Some(ImageScope::SHADER_SAMPLED));
        assert_eq!(record.state().layout(), vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn region_checks_use_mip_extent() {
        let record = texture();
        let extent = vk::Extent3D {
            width: 16,
            height: 8,
            depth: 1,
        };
        let origin = vk::Offset3D { x: 0, y: 0, z: 0 };
        assert!(record.check_region(&color_layers(2), origin, extent).is_ok());
        assert!(record
            .check_region(&color_layers(2), vk::Offset3D { x: 1, y: 0, z: 0 }, extent)
            .is_err());
        assert!(record.check_region(&color_layers(3), origin, extent).is_err());
    }

    #[test]
    fn aspect_must_match_format() {
        let record = texture();
        let depth = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::DEPTH,
            ..color_layers(0)
        };
        assert!(record.check_layers(&depth).is_err());
    }

    #[test]
    fn empty_usage_is_rejected() {
        let desc = ImageDesc::new_2d(
            vk::Image::from_raw(1),
            vk::Format::R8G8B8A8_UNORM,
            4,
            4,
            vk::ImageUsageFlags::empty(),
        );
        assert!(matches!(ImageRecord::new(desc), Err(SyncError::NoUsage)));
    }
}
