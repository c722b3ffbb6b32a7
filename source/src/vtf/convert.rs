use half::f16;

use super::{
    consts::ImageFormat,
    dxt::{self, BlockFormat},
    image::Pixels,
    VTFError,
};

/// Convert one image of `format` into four channel pixels, in storage row order.
///
/// `data` must be exactly `format.bytes_for_size(width, height)` long.
pub(super) fn decode_pixels(
    format: ImageFormat,
    data: &[u8],
    width: usize,
    height: usize,
) -> Result<Pixels, VTFError> {
    let rgba8 = |bpp: usize, f: fn(&[u8]) -> [u8; 4]| {
        Ok(Pixels::Rgba8(
            data.chunks_exact(bpp).flat_map(f).collect(),
        ))
    };

    match format {
        ImageFormat::NONE | ImageFormat::P8 => Err(VTFError::UnsupportedFormat(format)),

        ImageFormat::DXT1 | ImageFormat::DXT1ONEBITALPHA => Ok(Pixels::Rgba8(
            dxt::decode_blocks(BlockFormat::Dxt1, data, width, height),
        )),
        ImageFormat::DXT3 => Ok(Pixels::Rgba8(dxt::decode_blocks(
            BlockFormat::Dxt3,
            data,
            width,
            height,
        ))),
        ImageFormat::DXT5 => Ok(Pixels::Rgba8(dxt::decode_blocks(
            BlockFormat::Dxt5,
            data,
            width,
            height,
        ))),

        ImageFormat::RGBA8888 | ImageFormat::UVWQ8888 | ImageFormat::UVLX8888 => {
            Ok(Pixels::Rgba8(data.to_vec()))
        }
        // ABGR8888 => RGBA8888
        ImageFormat::ABGR8888 => rgba8(4, |p| [p[3], p[2], p[1], p[0]]),
        // ARGB8888 => RGBA8888
        ImageFormat::ARGB8888 => rgba8(4, |p| [p[1], p[2], p[3], p[0]]),
        // BGRA8888 => RGBA8888
        ImageFormat::BGRA8888 => rgba8(4, |p| [p[2], p[1], p[0], p[3]]),
        // BGRX8888 => RGBA8888, the fourth byte is unused
        ImageFormat::BGRX8888 => rgba8(4, |p| [p[2], p[1], p[0], 0xFF]),
        ImageFormat::RGB888 => rgba8(3, |p| [p[0], p[1], p[2], 0xFF]),
        ImageFormat::BGR888 => rgba8(3, |p| [p[2], p[1], p[0], 0xFF]),
        ImageFormat::RGB888BLUESCREEN => rgba8(3, |p| bluescreen([p[0], p[1], p[2]])),
        ImageFormat::BGR888BLUESCREEN => rgba8(3, |p| bluescreen([p[2], p[1], p[0]])),
        ImageFormat::I8 => rgba8(1, |p| [p[0], p[0], p[0], 0xFF]),
        ImageFormat::IA88 => rgba8(2, |p| [p[0], p[0], p[0], p[1]]),
        ImageFormat::A8 => rgba8(1, |p| [0, 0, 0, p[0]]),
        ImageFormat::UV88 => rgba8(2, |p| [p[0], p[1], 0, 0xFF]),

        // Packed formats list their channels from the least significant bit up.
        ImageFormat::RGB565 => rgba8(2, |p| {
            let v = u16::from_le_bytes([p[0], p[1]]);
            [expand5(v), expand6(v >> 5), expand5(v >> 11), 0xFF]
        }),
        ImageFormat::BGR565 => rgba8(2, |p| {
            let v = u16::from_le_bytes([p[0], p[1]]);
            [expand5(v >> 11), expand6(v >> 5), expand5(v), 0xFF]
        }),
        ImageFormat::BGRX5551 => rgba8(2, |p| {
            let v = u16::from_le_bytes([p[0], p[1]]);
            [expand5(v >> 10), expand5(v >> 5), expand5(v), 0xFF]
        }),
        ImageFormat::BGRA5551 => rgba8(2, |p| {
            let v = u16::from_le_bytes([p[0], p[1]]);
            let a = if v & 0x8000 != 0 { 0xFF } else { 0 };
            [expand5(v >> 10), expand5(v >> 5), expand5(v), a]
        }),
        ImageFormat::BGRA4444 => rgba8(2, |p| {
            let v = u16::from_le_bytes([p[0], p[1]]);
            [expand4(v >> 8), expand4(v >> 4), expand4(v), expand4(v >> 12)]
        }),

        ImageFormat::RGBA16161616F => Ok(Pixels::Rgba32F(
            data.chunks_exact(2)
                .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
        )),
        ImageFormat::RGBA16161616 => Ok(Pixels::Rgba32F(
            data.chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32 / u16::MAX as f32)
                .collect(),
        )),
    }
}

/// Pure blue marks transparent texels.
fn bluescreen(rgb: [u8; 3]) -> [u8; 4] {
    if rgb == [0, 0, 0xFF] {
        [0, 0, 0, 0]
    } else {
        [rgb[0], rgb[1], rgb[2], 0xFF]
    }
}

fn expand4(v: u16) -> u8 {
    (v & 0xf) as u8 * 17
}

fn expand5(v: u16) -> u8 {
    let v = v & 0x1f;
    ((v << 3) | (v >> 2)) as u8
}

fn expand6(v: u16) -> u8 {
    let v = v & 0x3f;
    ((v << 2) | (v >> 4)) as u8
}

#[cfg(test)]
mod convert_tests {
    use super::*;

    fn rgba8(format: ImageFormat, data: &[u8], width: usize, height: usize) -> Vec<u8> {
        match decode_pixels(format, data, width, height).unwrap() {
            Pixels::Rgba8(data) => data,
            Pixels::Rgba32F(_) => panic!("expected 8 bit output"),
        }
    }

    #[test]
    fn test_byte_orders() {
        let px = [10, 20, 30, 40];
        assert_eq!(rgba8(ImageFormat::RGBA8888, &px, 1, 1), vec![10, 20, 30, 40]);
        assert_eq!(rgba8(ImageFormat::ABGR8888, &px, 1, 1), vec![40, 30, 20, 10]);
        assert_eq!(rgba8(ImageFormat::ARGB8888, &px, 1, 1), vec![20, 30, 40, 10]);
        assert_eq!(rgba8(ImageFormat::BGRA8888, &px, 1, 1), vec![30, 20, 10, 40]);
        assert_eq!(rgba8(ImageFormat::BGRX8888, &px, 1, 1), vec![30, 20, 10, 255]);
        assert_eq!(
            rgba8(ImageFormat::RGB888, &[1, 2, 3, 4, 5, 6], 2, 1),
            vec![1, 2, 3, 255, 4, 5, 6, 255]
        );
        assert_eq!(
            rgba8(ImageFormat::BGR888, &[1, 2, 3, 4, 5, 6], 2, 1),
            vec![3, 2, 1, 255, 6, 5, 4, 255]
        );
    }

    #[test]
    fn test_single_channel() {
        assert_eq!(rgba8(ImageFormat::I8, &[7], 1, 1), vec![7, 7, 7, 255]);
        assert_eq!(rgba8(ImageFormat::IA88, &[7, 9], 1, 1), vec![7, 7, 7, 9]);
        assert_eq!(rgba8(ImageFormat::A8, &[9], 1, 1), vec![0, 0, 0, 9]);
        assert_eq!(rgba8(ImageFormat::UV88, &[1, 2], 1, 1), vec![1, 2, 0, 255]);
    }

    #[test]
    fn test_bluescreen() {
        assert_eq!(
            rgba8(ImageFormat::RGB888BLUESCREEN, &[0, 0, 255, 1, 2, 3], 2, 1),
            vec![0, 0, 0, 0, 1, 2, 3, 255]
        );
        assert_eq!(
            rgba8(ImageFormat::BGR888BLUESCREEN, &[255, 0, 0], 1, 1),
            vec![0, 0, 0, 0]
        );
    }

    #[test]
    fn test_packed() {
        let red = 0x001fu16.to_le_bytes();
        assert_eq!(rgba8(ImageFormat::RGB565, &red, 1, 1), vec![255, 0, 0, 255]);
        assert_eq!(rgba8(ImageFormat::BGR565, &red, 1, 1), vec![0, 0, 255, 255]);

        let v = 0b1_11111_00000_00000u16.to_le_bytes();
        assert_eq!(rgba8(ImageFormat::BGRA5551, &v, 1, 1), vec![255, 0, 0, 255]);
        assert_eq!(rgba8(ImageFormat::BGRX5551, &v, 1, 1), vec![255, 0, 0, 255]);
        let v = 0b0_00000_00000_11111u16.to_le_bytes();
        assert_eq!(rgba8(ImageFormat::BGRA5551, &v, 1, 1), vec![0, 0, 255, 0]);

        let v = 0x8f21u16.to_le_bytes();
        assert_eq!(
            rgba8(ImageFormat::BGRA4444, &v, 1, 1),
            vec![0xff, 0x22, 0x11, 0x88]
        );
    }

    #[test]
    fn test_float_formats() {
        let mut data = Vec::new();
        for v in [1.0f32, 0.5, 2.0, -1.0] {
            data.extend_from_slice(&f16::from_f32(v).to_le_bytes());
        }
        assert_eq!(
            decode_pixels(ImageFormat::RGBA16161616F, &data, 1, 1).unwrap(),
            Pixels::Rgba32F(vec![1.0, 0.5, 2.0, -1.0])
        );

        let data = [0xff, 0xff, 0, 0, 0xff, 0xff, 0, 0];
        assert_eq!(
            decode_pixels(ImageFormat::RGBA16161616, &data, 1, 1).unwrap(),
            Pixels::Rgba32F(vec![1.0, 0.0, 1.0, 0.0])
        );
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(
            decode_pixels(ImageFormat::P8, &[0], 1, 1),
            Err(VTFError::UnsupportedFormat(ImageFormat::P8))
        );
    }
}
