use ash::vk;

/// Aspects a barrier on an image of `format` has to cover
pub fn aspect_from_format(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D32_SFLOAT => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// Size in bytes of one texel of an uncompressed format, if known
pub fn texel_size(format: vk::Format) -> Option<vk::DeviceSize> {
    let size = match format {
        vk::Format::R8_UNORM
        | vk::Format::R8_SNORM
        | vk::Format::R8_UINT
        | vk::Format::R8_SINT
        | vk::Format::R8_SRGB
        | vk::Format::S8_UINT => 1,
        vk::Format::R8G8_UNORM
        | vk::Format::R8G8_SNORM
        | vk::Format::R8G8_UINT
        | vk::Format::R8G8_SINT
        | vk::Format::R8G8_SRGB
        | vk::Format::R16_UNORM
        | vk::Format::R16_SNORM
        | vk::Format::R16_UINT
        | vk::Format::R16_SINT
        | vk::Format::R16_SFLOAT
        | vk::Format::R5G6B5_UNORM_PACK16
        | vk::Format::D16_UNORM => 2,
        vk::Format::R8G8B8_UNORM | vk::Format::R8G8B8_SRGB | vk::Format::B8G8R8_UNORM => 3,
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SNORM
        | vk::Format::R8G8B8A8_UINT
        | vk::Format::R8G8B8A8_SINT
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB
        | vk::Format::A2B10G10R10_UNORM_PACK32
        | vk::Format::B10G11R11_UFLOAT_PACK32
        | vk::Format::R16G16_SFLOAT
        | vk::Format::R16G16_UNORM
        | vk::Format::R32_UINT
        | vk::Format::R32_SINT
        | vk::Format::R32_SFLOAT
        | vk::Format::X8_D24_UNORM_PACK32
        | vk::Format::D32_SFLOAT => 4,
        vk::Format::R16G16B16A16_UNORM
        | vk::Format::R16G16B16A16_SFLOAT
        | vk::Format::R16G16B16A16_UINT
        | vk::Format::R32G32_UINT
        | vk::Format::R32G32_SFLOAT => 8,
        vk::Format::R32G32B32_SFLOAT => 12,
        vk::Format::R32G32B32A32_UINT
        | vk::Format::R32G32B32A32_SINT
        | vk::Format::R32G32B32A32_SFLOAT => 16,
        // compressed and combined depth/stencil formats have no single texel size
        _ => return None,
    };
    Some(size)
}

/// Smallest addressable unit of an image format as laid out in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexelBlock {
    pub width: u32,
    pub height: u32,
    pub size: vk::DeviceSize,
}

impl TexelBlock {
    const fn texel(size: vk::DeviceSize) -> Self {
        Self {
            width: 1,
            height: 1,
            size,
        }
    }

    const fn compressed(width: u32, height: u32, size: vk::DeviceSize) -> Self {
        Self {
            width,
            height,
            size,
        }
    }
}

/// Block layout of `aspect` of `format` in a buffer/image copy.
///
/// Depth/stencil copies address a single aspect, each with its own packed size. `None` when the
/// format is unknown or `aspect` is not a single copyable aspect of it.
pub fn texel_block(format: vk::Format, aspect: vk::ImageAspectFlags) -> Option<TexelBlock> {
    let format_aspect = aspect_from_format(format);
    if format_aspect != vk::ImageAspectFlags::COLOR {
        return depth_stencil_block(format, aspect).map(TexelBlock::texel);
    }
    if aspect != vk::ImageAspectFlags::COLOR {
        return None;
    }
    if let Some(size) = texel_size(format) {
        return Some(TexelBlock::texel(size));
    }
    compressed_block(format)
}

fn depth_stencil_block(
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> Option<vk::DeviceSize> {
    if aspect == vk::ImageAspectFlags::STENCIL {
        return match format {
            vk::Format::S8_UINT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT => Some(1),
            _ => None,
        };
    }
    if aspect != vk::ImageAspectFlags::DEPTH {
        return None;
    }
    match format {
        vk::Format::D16_UNORM | vk::Format::D16_UNORM_S8_UINT => Some(2),
        // 24-bit depth is copied padded to 32 bits
        vk::Format::X8_D24_UNORM_PACK32
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT
        | vk::Format::D32_SFLOAT_S8_UINT => Some(4),
        _ => None,
    }
}

fn compressed_block(format: vk::Format) -> Option<TexelBlock> {
    let block = match format {
        vk::Format::BC1_RGB_UNORM_BLOCK
        | vk::Format::BC1_RGB_SRGB_BLOCK
        | vk::Format::BC1_RGBA_UNORM_BLOCK
        | vk::Format::BC1_RGBA_SRGB_BLOCK
        | vk::Format::BC4_UNORM_BLOCK
        | vk::Format::BC4_SNORM_BLOCK
        | vk::Format::ETC2_R8G8B8_UNORM_BLOCK
        | vk::Format::ETC2_R8G8B8_SRGB_BLOCK
        | vk::Format::ETC2_R8G8B8A1_UNORM_BLOCK
        | vk::Format::ETC2_R8G8B8A1_SRGB_BLOCK
        | vk::Format::EAC_R11_UNORM_BLOCK
        | vk::Format::EAC_R11_SNORM_BLOCK => TexelBlock::compressed(4, 4, 8),
        vk::Format::BC2_UNORM_BLOCK
        | vk::Format::BC2_SRGB_BLOCK
        | vk::Format::BC3_UNORM_BLOCK
        | vk::Format::BC3_SRGB_BLOCK
        | vk::Format::BC5_UNORM_BLOCK
        | vk::Format::BC5_SNORM_BLOCK
        | vk::Format::BC6H_UFLOAT_BLOCK
        | vk::Format::BC6H_SFLOAT_BLOCK
        | vk::Format::BC7_UNORM_BLOCK
        | vk::Format::BC7_SRGB_BLOCK
        | vk::Format::ETC2_R8G8B8A8_UNORM_BLOCK
        | vk::Format::ETC2_R8G8B8A8_SRGB_BLOCK
        | vk::Format::EAC_R11G11_UNORM_BLOCK
        | vk::Format::EAC_R11G11_SNORM_BLOCK => TexelBlock::compressed(4, 4, 16),
        // every ASTC block is 128 bits
        vk::Format::ASTC_4X4_UNORM_BLOCK | vk::Format::ASTC_4X4_SRGB_BLOCK => {
            TexelBlock::compressed(4, 4, 16)
        }
        vk::Format::ASTC_5X4_UNORM_BLOCK | vk::Format::ASTC_5X4_SRGB_BLOCK => {
            TexelBlock::compressed(5, 4, 16)
        }
        vk::Format::ASTC_5X5_UNORM_BLOCK | vk::Format::ASTC_5X5_SRGB_BLOCK => {
            TexelBlock::compressed(5, 5, 16)
        }
        vk::Format::ASTC_6X5_UNORM_BLOCK | vk::Format::ASTC_6X5_SRGB_BLOCK => {
            TexelBlock::compressed(6, 5, 16)
        }
        vk::Format::ASTC_6X6_UNORM_BLOCK | vk::Format::ASTC_6X6_SRGB_BLOCK => {
            TexelBlock::compressed(6, 6, 16)
        }
        vk::Format::ASTC_8X5_UNORM_BLOCK | vk::Format::ASTC_8X5_SRGB_BLOCK => {
            TexelBlock::compressed(8, 5, 16)
        }
        vk::Format::ASTC_8X6_UNORM_BLOCK | vk::Format::ASTC_8X6_SRGB_BLOCK => {
            TexelBlock::compressed(8, 6, 16)
        }
        vk::Format::ASTC_8X8_UNORM_BLOCK | vk::Format::ASTC_8X8_SRGB_BLOCK => {
            TexelBlock::compressed(8, 8, 16)
        }
        vk::Format::ASTC_10X5_UNORM_BLOCK | vk::Format::ASTC_10X5_SRGB_BLOCK => {
            TexelBlock::compressed(10, 5, 16)
        }
        vk::Format::ASTC_10X6_UNORM_BLOCK | vk::Format::ASTC_10X6_SRGB_BLOCK => {
            TexelBlock::compressed(10, 6, 16)
        }
        vk::Format::ASTC_10X8_UNORM_BLOCK | vk::Format::ASTC_10X8_SRGB_BLOCK => {
            TexelBlock::compressed(10, 8, 16)
        }
        vk::Format::ASTC_10X10_UNORM_BLOCK | vk::Format::ASTC_10X10_SRGB_BLOCK => {
            TexelBlock::compressed(10, 10, 16)
        }
        vk::Format::ASTC_12X10_UNORM_BLOCK | vk::Format::ASTC_12X10_SRGB_BLOCK => {
            TexelBlock::compressed(12, 10, 16)
        }
        vk::Format::ASTC_12X12_UNORM_BLOCK | vk::Format::ASTC_12X12_SRGB_BLOCK => {
            TexelBlock::compressed(12, 12, 16)
        }
        _ => return None,
    };
    Some(block)
}

/// Extent of mip `level` of an image with base `extent`
pub fn mip_extent(extent: vk::Extent3D, level: u32) -> vk::Extent3D {
    let shrink = |value: u32| value.checked_shr(level).unwrap_or(0).max(1);
    vk::Extent3D {
        width: shrink(extent.width),
        height: shrink(extent.height),
        depth: shrink(extent.depth),
    }
}
