use flagset::flags;
use num_derive::FromPrimitive;

#[derive(Copy, Clone, FromPrimitive, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ImageFormat {
    NONE = -1,
    RGBA8888 = 0,
    ABGR8888,
    RGB888,
    BGR888,
    RGB565,
    I8,
    IA88,
    P8,
    A8,
    RGB888BLUESCREEN,
    BGR888BLUESCREEN,
    ARGB8888,
    BGRA8888,
    DXT1,
    DXT3,
    DXT5,
    BGRX8888,
    BGR565,
    BGRX5551,
    BGRA4444,
    DXT1ONEBITALPHA,
    BGRA5551,
    UV88,
    UVWQ8888,
    RGBA16161616F,
    RGBA16161616,
    UVLX8888,
}

impl ImageFormat {
    /// Bytes per 4x4 block for block compressed formats.
    pub fn block_bytes(&self) -> Option<usize> {
        match self {
            ImageFormat::DXT1 | ImageFormat::DXT1ONEBITALPHA => Some(8),
            // 4x4 block has 64bits of color and 64 bits of alpha
            ImageFormat::DXT3 | ImageFormat::DXT5 => Some(16),
            _ => None,
        }
    }

    pub fn is_block_compressed(&self) -> bool {
        self.block_bytes().is_some()
    }

    /// Bytes per texel for uncompressed formats, 0 for block compressed ones.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::NONE => 0,
            ImageFormat::UVLX8888
            | ImageFormat::UVWQ8888
            | ImageFormat::BGRA8888
            | ImageFormat::ARGB8888
            | ImageFormat::RGBA8888
            | ImageFormat::ABGR8888
            | ImageFormat::BGRX8888 => 4,
            ImageFormat::RGB888BLUESCREEN
            | ImageFormat::BGR888BLUESCREEN
            | ImageFormat::RGB888
            | ImageFormat::BGR888 => 3,
            ImageFormat::I8 | ImageFormat::P8 | ImageFormat::A8 => 1,
            ImageFormat::IA88
            | ImageFormat::RGB565
            | ImageFormat::UV88
            | ImageFormat::BGRA5551
            | ImageFormat::BGRX5551
            | ImageFormat::BGR565
            | ImageFormat::BGRA4444 => 2,
            ImageFormat::RGBA16161616F | ImageFormat::RGBA16161616 => 8,
            ImageFormat::DXT1
            | ImageFormat::DXT1ONEBITALPHA
            | ImageFormat::DXT3
            | ImageFormat::DXT5 => 0,
        }
    }

    /// Encoded size of one image of the given dimensions.
    pub fn bytes_for_size(&self, width: usize, height: usize) -> usize {
        match self.block_bytes() {
            Some(block) => width.div_ceil(4) * height.div_ceil(4) * block,
            None => width * height * self.bytes_per_pixel(),
        }
    }
}

flags! {
    #[repr(u32)]
    pub enum CompiledVtfFlags: u32 {
        // Flags from the *.txt config file
        POINTSAMPLE = 0x00000001,
        TRILINEAR = 0x00000002,
        CLAMPS = 0x00000004,
        CLAMPT = 0x00000008,
        ANISOTROPIC = 0x00000010,
        HINTDXT5 = 0x00000020,
        PWLCORRECTED = 0x00000040,
        NORMAL = 0x00000080,
        NOMIP = 0x00000100,
        NOLOD = 0x00000200,
        ALLMIPS = 0x00000400,
        PROCEDURAL = 0x00000800,

        // These are automatically generated by vtex from the texture data.
        ONEBITALPHA = 0x00001000,
        EIGHTBITALPHA = 0x00002000,

        // Newer flags from the *.txt config file
        ENVMAP = 0x00004000,
        RENDERTARGET = 0x00008000,
        DEPTHRENDERTARGET = 0x00010000,
        NODEBUGOVERRIDE = 0x00020000,
        SINGLECOPY	= 0x00040000,
        PRESRGB = 0x00080000,

        NODEPTHBUFFER = 0x00800000,

        CLAMPU = 0x02000000,
        VERTEXTEXTURE = 0x04000000,
        SSBUMP = 0x08000000,

        BORDER = 0x20000000,
    }
}

/// Resource tags of the 7.3+ resource directory.
pub const LOW_RES_TAG: [u8; 3] = [0x01, 0, 0];
pub const HIGH_RES_TAG: [u8; 3] = [0x30, 0, 0];
pub const CRC_TAG: [u8; 3] = *b"CRC";

/// Resource entry flag marking data stored inline in the offset field.
pub const RESOURCE_NO_DATA: u8 = 0x2;

/// The largest resource directory VTFLib accepts.
pub const MAX_RESOURCES: usize = 32;
