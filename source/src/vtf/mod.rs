// Valve Texture File

pub mod consts;
mod convert;
mod dxt;
mod header;
mod image;

use std::{fmt, mem};

use flagset::FlagSet;
use glam::Vec3;
use num_traits::FromPrimitive;
use thiserror::Error;

use crate::binaries::{read_slice, BinaryData, OutOfBounds};

use self::consts::{
    CompiledVtfFlags, ImageFormat, HIGH_RES_TAG, LOW_RES_TAG, MAX_RESOURCES, RESOURCE_NO_DATA,
};
pub use self::header::{ResourceEntryInfo, VTFHeader, VTFHeader73};
pub use self::image::{DecodedImage, Pixels};

const SIGNATURE: [u8; 4] = *b"VTF\0";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VTFError {
    #[error("not a vtf file, signature {0:?}")]
    InvalidSignature([u8; 4]),
    #[error("unsupported vtf version {0}.{1}")]
    UnsupportedVersion(u32, u32),
    #[error("invalid vtf header: {0}")]
    InvalidHeader(String),
    #[error("unsupported image format {0:?}")]
    UnsupportedFormat(ImageFormat),
    #[error("truncated vtf: {0}")]
    Truncated(#[from] OutOfBounds),
    #[error("mip {mip} requested, texture has {count}")]
    MipOutOfRange { mip: usize, count: usize },
    #[error("frame {frame} requested, texture has {count}")]
    FrameOutOfRange { frame: usize, count: usize },
}

/// A parsed VTF file borrowing its image data from the input buffer.
pub struct VTF<'a> {
    data: &'a [u8],
    header: VTFHeader,
    header_7_3: Option<VTFHeader73>,
    resources: Vec<ResourceEntryInfo>,
    high_res_format: ImageFormat,
    low_res_format: ImageFormat,
    flags: FlagSet<CompiledVtfFlags>,
    high_res_offset: usize,
    low_res_offset: Option<usize>,
}

impl fmt::Debug for VTF<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ".vtf: {:?}", self.header)?;
        write!(f, "7.3 data: {:?}", self.header_7_3)
    }
}

impl<'a> VTF<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, VTFError> {
        let header = VTFHeader::read(data, 0)?;

        let signature = header.signature;
        if signature != SIGNATURE {
            return Err(VTFError::InvalidSignature(signature));
        }
        let [major, minor] = header.version;
        if major != 7 || minor > 5 {
            return Err(VTFError::UnsupportedVersion(major, minor));
        }

        let header_size = header.header_size as usize;
        if header_size < mem::size_of::<VTFHeader>() {
            return Err(invalid(format!("header size {header_size} is too small")));
        }
        let (width, height) = (header.width, header.height);
        if width == 0 || height == 0 {
            return Err(invalid(format!("image is {width}x{height}")));
        }
        if header.mipmap_count == 0 {
            return Err(invalid("no mipmaps"));
        }

        let high_res_format = image_format(header.high_res_image_format)?;
        let low_res_format = match ImageFormat::from_i32(header.low_res_image_format) {
            Some(format) => format,
            // Older files need the thumbnail size to locate the image data.
            None if minor < 3 => return Err(unknown_format(header.low_res_image_format)),
            None => {
                log::warn!(
                    "Unknown thumbnail format {}, ignoring thumbnail",
                    { header.low_res_image_format }
                );
                ImageFormat::NONE
            }
        };
        let flags = FlagSet::<CompiledVtfFlags>::new_truncated(header.flags);

        let header_7_3 = if minor >= 2 {
            Some(VTFHeader73::read(data, mem::size_of::<VTFHeader>())?)
        } else {
            None
        };

        let low_res_size = match low_res_format {
            ImageFormat::NONE => 0,
            format => format.bytes_for_size(
                header.low_res_image_width as usize,
                header.low_res_image_height as usize,
            ),
        };

        let mut resources = Vec::new();
        let (high_res_offset, low_res_offset) = match header_7_3 {
            Some(h) if minor >= 3 => {
                let count = h.num_resources as usize;
                if count > MAX_RESOURCES {
                    return Err(invalid(format!("{count} resources")));
                }
                resources = ResourceEntryInfo::read_array(
                    data,
                    mem::size_of::<VTFHeader>() + mem::size_of::<VTFHeader73>(),
                    count,
                )?;

                let find = |tag: [u8; 3]| {
                    resources
                        .iter()
                        .find(|r| r.tag == tag && r.flags & RESOURCE_NO_DATA == 0)
                        .map(|r| r.offset as usize)
                };
                let high = find(HIGH_RES_TAG)
                    .ok_or_else(|| invalid("no high resolution image resource"))?;
                (high, find(LOW_RES_TAG))
            }
            _ => (
                header_size + low_res_size,
                (low_res_size > 0).then_some(header_size),
            ),
        };

        log::debug!(
            "vtf {major}.{minor} {width}x{height} {high_res_format:?}, {} mips, {} resources, image data at {high_res_offset}",
            header.mipmap_count,
            resources.len(),
        );

        Ok(Self {
            data,
            header,
            header_7_3,
            resources,
            high_res_format,
            low_res_format,
            flags,
            high_res_offset,
            low_res_offset,
        })
    }

    pub fn header(&self) -> &VTFHeader {
        &self.header
    }

    pub fn header_7_3(&self) -> Option<&VTFHeader73> {
        self.header_7_3.as_ref()
    }

    pub fn resources(&self) -> &[ResourceEntryInfo] {
        &self.resources
    }

    pub fn version(&self) -> (u32, u32) {
        let [major, minor] = self.header.version;
        (major, minor)
    }

    pub fn width(&self) -> u32 {
        self.header.width as u32
    }
    pub fn height(&self) -> u32 {
        self.header.height as u32
    }

    pub fn low_res_width(&self) -> u32 {
        self.header.low_res_image_width as u32
    }
    pub fn low_res_height(&self) -> u32 {
        self.header.low_res_image_height as u32
    }

    pub fn high_res_format(&self) -> ImageFormat {
        self.high_res_format
    }

    pub fn low_res_format(&self) -> ImageFormat {
        self.low_res_format
    }

    pub fn flags(&self) -> FlagSet<CompiledVtfFlags> {
        self.flags
    }

    pub fn frames(&self) -> usize {
        (self.header.frames as usize).max(1)
    }

    pub fn first_frame(&self) -> u16 {
        self.header.first_frame
    }

    /// Cube maps carry six faces, older files a seventh sphere map.
    pub fn faces(&self) -> usize {
        if !self.flags.contains(CompiledVtfFlags::ENVMAP) {
            return 1;
        }
        let (_, minor) = self.version();
        if minor < 5 && self.header.first_frame == 0xFFFF {
            7
        } else {
            6
        }
    }

    pub fn depth(&self) -> usize {
        self.header_7_3.map_or(1, |h| h.depth.max(1) as usize)
    }

    pub fn mip_count(&self) -> usize {
        self.header.mipmap_count as usize
    }

    pub fn reflectivity(&self) -> Vec3 {
        Vec3::from_array(self.header.reflectivity)
    }

    pub fn bumpmap_scale(&self) -> f32 {
        self.header.bumpmap_scale
    }

    pub fn has_alpha(&self) -> bool {
        !self
            .flags
            .is_disjoint(CompiledVtfFlags::ONEBITALPHA | CompiledVtfFlags::EIGHTBITALPHA)
    }

    /// Dimensions of mip level `mip`, never smaller than 1x1.
    pub fn mip_size(&self, mip: usize) -> (usize, usize) {
        (
            mip_dimension(self.header.width, mip),
            mip_dimension(self.header.height, mip),
        )
    }

    fn mip_depth(&self, mip: usize) -> usize {
        self.depth().checked_shr(mip as u32).unwrap_or(0).max(1)
    }

    /// Bytes of a single face slice at `mip`.
    fn image_bytes(&self, mip: usize) -> usize {
        let (width, height) = self.mip_size(mip);
        self.high_res_format.bytes_for_size(width, height)
    }

    /// Byte offset of face 0, slice 0 of `frame` at `mip`.
    ///
    /// Mips are stored smallest first, each holding every frame, face and slice.
    pub fn image_offset(&self, frame: usize, mip: usize) -> Result<usize, VTFError> {
        self.check_range(frame, mip)?;

        let overflow = || {
            VTFError::Truncated(OutOfBounds {
                offset: self.high_res_offset,
                size: usize::MAX,
                len: self.data.len(),
            })
        };
        let per_frame = |m: usize| {
            self.image_bytes(m)
                .checked_mul(self.faces())
                .and_then(|s| s.checked_mul(self.mip_depth(m)))
        };

        let mut offset = self.high_res_offset;
        for smaller in mip + 1..self.mip_count() {
            offset = per_frame(smaller)
                .and_then(|s| s.checked_mul(self.frames()))
                .and_then(|s| offset.checked_add(s))
                .ok_or_else(overflow)?;
        }
        per_frame(mip)
            .and_then(|s| s.checked_mul(frame))
            .and_then(|s| offset.checked_add(s))
            .ok_or_else(overflow)
    }

    fn check_range(&self, frame: usize, mip: usize) -> Result<(), VTFError> {
        if mip >= self.mip_count() {
            return Err(VTFError::MipOutOfRange {
                mip,
                count: self.mip_count(),
            });
        }
        if frame >= self.frames() {
            return Err(VTFError::FrameOutOfRange {
                frame,
                count: self.frames(),
            });
        }
        Ok(())
    }

    /// Decode face 0 of `frame` at `mip`, rows top to bottom.
    pub fn decode(&self, frame: usize, mip: usize) -> Result<DecodedImage, VTFError> {
        let offset = self.image_offset(frame, mip)?;
        let (width, height) = self.mip_size(mip);
        let bytes = read_slice(self.data, offset, self.image_bytes(mip))?;

        log::trace!("decoding {width}x{height} {:?} at {offset}", self.high_res_format);

        let pixels = convert::decode_pixels(self.high_res_format, bytes, width, height)?;
        let mut image = DecodedImage::new(width as u32, height as u32, self.has_alpha(), pixels);
        image.flip_vertical();
        Ok(image)
    }

    /// Decode the thumbnail, if the file has one.
    pub fn decode_low_res(&self) -> Result<Option<DecodedImage>, VTFError> {
        let Some(offset) = self.low_res_offset else {
            return Ok(None);
        };
        let (width, height) = (
            self.low_res_width() as usize,
            self.low_res_height() as usize,
        );
        if self.low_res_format == ImageFormat::NONE || width == 0 || height == 0 {
            return Ok(None);
        }

        let bytes = read_slice(
            self.data,
            offset,
            self.low_res_format.bytes_for_size(width, height),
        )?;
        let pixels = convert::decode_pixels(self.low_res_format, bytes, width, height)?;
        let mut image = DecodedImage::new(width as u32, height as u32, false, pixels);
        image.flip_vertical();
        Ok(Some(image))
    }
}

/// Parse `bytes` and decode face 0 of `frame` at `mip`.
pub fn decode(bytes: &[u8], frame: usize, mip: usize) -> Result<DecodedImage, VTFError> {
    VTF::parse(bytes)?.decode(frame, mip)
}

fn invalid(reason: impl Into<String>) -> VTFError {
    VTFError::InvalidHeader(reason.into())
}

fn image_format(code: i32) -> Result<ImageFormat, VTFError> {
    ImageFormat::from_i32(code).ok_or_else(|| unknown_format(code))
}

fn unknown_format(code: i32) -> VTFError {
    invalid(format!("unknown image format {code}"))
}

fn mip_dimension(size: u16, mip: usize) -> usize {
    (size as usize).checked_shr(mip as u32).unwrap_or(0).max(1)
}

#[cfg(test)]
mod vtf_tests {
    use super::*;

    const RED: u16 = 0xf800;
    const BLUE: u16 = 0x001f;

    fn header(minor: u32, width: u16, height: u16, format: ImageFormat, mips: u8) -> VTFHeader {
        let mut header: VTFHeader = bytemuck::Zeroable::zeroed();
        header.signature = SIGNATURE;
        header.version = [7, minor];
        header.header_size = if minor >= 2 { 80 } else { 64 };
        header.width = width;
        header.height = height;
        header.frames = 1;
        header.high_res_image_format = format as i32;
        header.mipmap_count = mips;
        header.low_res_image_format = ImageFormat::NONE as i32;
        header
    }

    /// Serialise a header, resource directory and body.
    fn file(mut header: VTFHeader, resources: &[ResourceEntryInfo], body: &[u8]) -> Vec<u8> {
        let [_, minor] = header.version;
        if minor >= 3 {
            header.header_size = 80 + 8 * resources.len() as u32;
        }

        let mut bytes = bytemuck::bytes_of(&header).to_vec();
        if minor >= 2 {
            let mut tail: VTFHeader73 = bytemuck::Zeroable::zeroed();
            tail.depth = 1;
            tail.num_resources = resources.len() as u32;
            bytes.extend_from_slice(bytemuck::bytes_of(&tail));
        }
        for resource in resources {
            bytes.extend_from_slice(bytemuck::bytes_of(resource));
        }
        bytes.resize(header.header_size as usize, 0);
        bytes.extend_from_slice(body);
        bytes
    }

    fn dxt1_block(c0: u16, c1: u16, indices: u32) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend_from_slice(&c0.to_le_bytes());
        block.extend_from_slice(&c1.to_le_bytes());
        block.extend_from_slice(&indices.to_le_bytes());
        block
    }

    fn row(image: &DecodedImage, y: usize) -> Vec<u8> {
        let stride = image.width() as usize * 4;
        image.to_rgba8()[y * stride..(y + 1) * stride].to_vec()
    }

    #[test]
    fn test_dxt1_rows_reversed() {
        let data = file(
            header(2, 4, 4, ImageFormat::DXT1, 1),
            &[],
            &dxt1_block(RED, BLUE, 0x5555_55e4),
        );
        let image = decode(&data, 0, 0).unwrap();

        assert_eq!((image.width(), image.height()), (4, 4));
        assert!(!image.has_alpha());
        assert_eq!(
            row(&image, 3),
            vec![255, 0, 0, 255, 0, 0, 255, 255, 170, 0, 85, 255, 85, 0, 170, 255]
        );
        for y in 0..3 {
            assert_eq!(row(&image, y), [0, 0, 255, 255].repeat(4));
        }
    }

    #[test]
    fn test_out_of_range() {
        let data = file(header(2, 4, 4, ImageFormat::DXT1, 1), &[], &[0; 8]);
        assert_eq!(
            decode(&data, 0, 1),
            Err(VTFError::MipOutOfRange { mip: 1, count: 1 })
        );
        assert_eq!(
            decode(&data, 1, 0),
            Err(VTFError::FrameOutOfRange { frame: 1, count: 1 })
        );
    }

    #[test]
    fn test_mip_and_frame_offsets() {
        let mut h = header(2, 2, 1, ImageFormat::RGBA8888, 2);
        h.frames = 2;
        let mut body = Vec::new();
        // mip 1 (1x1) for both frames, then mip 0 (2x1)
        body.extend([5; 4]);
        body.extend([6; 4]);
        body.extend([7; 8]);
        body.extend([8; 8]);
        let data = file(h, &[], &body);
        let vtf = VTF::parse(&data).unwrap();

        assert_eq!(vtf.mip_size(1), (1, 1));
        assert_eq!(vtf.decode(0, 1).unwrap().to_rgba8(), vec![5; 4]);
        assert_eq!(vtf.decode(1, 1).unwrap().to_rgba8(), vec![6; 4]);
        assert_eq!(vtf.decode(0, 0).unwrap().to_rgba8(), vec![7; 8]);
        assert_eq!(vtf.decode(1, 0).unwrap().to_rgba8(), vec![8; 8]);
    }

    #[test]
    fn test_envmap_faces() {
        let mut h = header(2, 1, 1, ImageFormat::RGBA8888, 1);
        h.flags = FlagSet::from(CompiledVtfFlags::ENVMAP).bits();
        h.frames = 2;
        let mut body = vec![1; 6 * 4];
        body.extend([2; 6 * 4]);
        let data = file(h, &[], &body);
        let vtf = VTF::parse(&data).unwrap();
        assert_eq!(vtf.faces(), 6);
        assert_eq!(vtf.decode(1, 0).unwrap().to_rgba8(), vec![2; 4]);

        h.first_frame = 0xFFFF;
        assert_eq!(VTF::parse(&file(h, &[], &body)).unwrap().faces(), 7);
        h.version = [7, 5];
        let resources = [ResourceEntryInfo {
            tag: HIGH_RES_TAG,
            flags: 0,
            offset: 88,
        }];
        assert_eq!(VTF::parse(&file(h, &resources, &body)).unwrap().faces(), 6);
    }

    #[test]
    fn test_truncated() {
        let data = file(header(2, 4, 4, ImageFormat::DXT1, 1), &[], &[0; 4]);
        assert!(matches!(decode(&data, 0, 0), Err(VTFError::Truncated(_))));

        assert!(matches!(
            VTF::parse(&data[..40]),
            Err(VTFError::Truncated(OutOfBounds { len: 40, .. }))
        ));
    }

    #[test]
    fn test_bad_header() {
        let mut h = header(2, 1, 1, ImageFormat::RGBA8888, 1);
        h.signature = *b"VTX\0";
        assert_eq!(
            VTF::parse(&file(h, &[], &[0; 4])).unwrap_err(),
            VTFError::InvalidSignature(*b"VTX\0")
        );

        let mut h = header(2, 1, 1, ImageFormat::RGBA8888, 1);
        h.version = [7, 6];
        assert_eq!(
            VTF::parse(&file(h, &[], &[0; 4])).unwrap_err(),
            VTFError::UnsupportedVersion(7, 6)
        );

        let h = header(2, 0, 1, ImageFormat::RGBA8888, 1);
        assert!(matches!(
            VTF::parse(&file(h, &[], &[])),
            Err(VTFError::InvalidHeader(_))
        ));

        let mut h = header(2, 1, 1, ImageFormat::RGBA8888, 1);
        h.high_res_image_format = 99;
        assert!(matches!(
            VTF::parse(&file(h, &[], &[0; 4])),
            Err(VTFError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_uncompressed_reorder() {
        let data = file(
            header(1, 1, 2, ImageFormat::BGR888, 1),
            &[],
            &[1, 2, 3, 4, 5, 6],
        );
        let image = decode(&data, 0, 0).unwrap();
        assert_eq!(image.to_rgba8(), vec![6, 5, 4, 255, 3, 2, 1, 255]);

        let mut h = header(2, 1, 1, ImageFormat::BGRA8888, 1);
        h.flags = FlagSet::from(CompiledVtfFlags::EIGHTBITALPHA).bits();
        let image = decode(&file(h, &[], &[1, 2, 3, 4]), 0, 0).unwrap();
        assert!(image.has_alpha());
        assert_eq!(image.to_rgba8(), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_alpha_flags() {
        let mut h = header(2, 1, 1, ImageFormat::BGRA8888, 1);
        let body = [1, 2, 3, 4];
        assert!(!VTF::parse(&file(h, &[], &body)).unwrap().has_alpha());

        h.flags = FlagSet::from(CompiledVtfFlags::ONEBITALPHA).bits();
        let data = file(h, &[], &body);
        let vtf = VTF::parse(&data).unwrap();
        assert!(vtf.has_alpha());
        assert!(vtf.decode(0, 0).unwrap().has_alpha());
        assert_eq!(vtf.faces(), 1);

        h.flags = (CompiledVtfFlags::CLAMPS | CompiledVtfFlags::EIGHTBITALPHA).bits();
        assert!(VTF::parse(&file(h, &[], &body)).unwrap().has_alpha());

        h.flags = FlagSet::from(CompiledVtfFlags::CLAMPS).bits();
        assert!(!VTF::parse(&file(h, &[], &body)).unwrap().has_alpha());
    }

    #[test]
    fn test_thumbnail_before_image_data() {
        let mut h = header(2, 1, 1, ImageFormat::RGBA8888, 1);
        h.low_res_image_format = ImageFormat::DXT1 as i32;
        h.low_res_image_width = 4;
        h.low_res_image_height = 4;
        let mut body = dxt1_block(RED, RED, 0);
        body.extend([9, 8, 7, 6]);
        let vtf_data = file(h, &[], &body);
        let vtf = VTF::parse(&vtf_data).unwrap();

        assert_eq!(vtf.decode(0, 0).unwrap().to_rgba8(), vec![9, 8, 7, 6]);
        let thumb = vtf.decode_low_res().unwrap().unwrap();
        assert_eq!(thumb.to_rgba8(), [255, 0, 0, 255].repeat(16));
    }

    #[test]
    fn test_resource_directory() {
        // header 80 + 3 entries = 104, thumbnail at 104, gap, image at 120
        let resources = [
            ResourceEntryInfo {
                tag: consts::CRC_TAG,
                flags: RESOURCE_NO_DATA,
                offset: 0xdead_beef,
            },
            ResourceEntryInfo {
                tag: LOW_RES_TAG,
                flags: 0,
                offset: 104,
            },
            ResourceEntryInfo {
                tag: HIGH_RES_TAG,
                flags: 0,
                offset: 120,
            },
        ];
        let mut h = header(3, 1, 1, ImageFormat::BGRX8888, 1);
        h.low_res_image_format = ImageFormat::DXT1 as i32;
        h.low_res_image_width = 1;
        h.low_res_image_height = 1;
        let mut body = dxt1_block(BLUE, BLUE, 0);
        body.extend([0xff; 8]);
        body.extend([1, 2, 3, 4]);
        let data = file(h, &resources, &body);

        let vtf = VTF::parse(&data).unwrap();
        assert_eq!(vtf.version(), (7, 3));
        assert_eq!(vtf.resources().len(), 3);
        assert_eq!(vtf.image_offset(0, 0), Ok(120));
        assert_eq!(vtf.decode(0, 0).unwrap().to_rgba8(), vec![3, 2, 1, 255]);
        assert_eq!(
            vtf.decode_low_res().unwrap().unwrap().to_rgba8(),
            vec![0, 0, 255, 255]
        );
    }

    #[test]
    fn test_resource_directory_without_image() {
        let resources = [ResourceEntryInfo {
            tag: LOW_RES_TAG,
            flags: 0,
            offset: 88,
        }];
        let data = file(header(3, 1, 1, ImageFormat::RGBA8888, 1), &resources, &[0; 4]);
        assert!(matches!(
            VTF::parse(&data),
            Err(VTFError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_no_thumbnail() {
        let data = file(header(2, 1, 1, ImageFormat::RGBA8888, 1), &[], &[0; 4]);
        assert_eq!(VTF::parse(&data).unwrap().decode_low_res(), Ok(None));
    }

    #[test]
    fn test_unknown_thumbnail_format() {
        let resources = [
            ResourceEntryInfo {
                tag: LOW_RES_TAG,
                flags: 0,
                offset: 96,
            },
            ResourceEntryInfo {
                tag: HIGH_RES_TAG,
                flags: 0,
                offset: 96,
            },
        ];
        let mut h = header(3, 1, 1, ImageFormat::RGBA8888, 1);
        h.low_res_image_format = 99;
        h.low_res_image_width = 1;
        h.low_res_image_height = 1;
        let data = file(h, &resources, &[1, 2, 3, 4]);

        let vtf = VTF::parse(&data).unwrap();
        assert_eq!(vtf.low_res_format(), ImageFormat::NONE);
        assert_eq!(vtf.decode_low_res(), Ok(None));
        assert_eq!(vtf.decode(0, 0).unwrap().to_rgba8(), vec![1, 2, 3, 4]);

        // Without a resource directory the thumbnail size is needed to find the image.
        h.version = [7, 2];
        assert!(matches!(
            VTF::parse(&file(h, &[], &[0; 8])),
            Err(VTFError::InvalidHeader(_))
        ));
    }
}
