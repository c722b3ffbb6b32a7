//! S3TC block decompression (DXT1, DXT3, DXT5).
//!
//! Each 4x4 block stores two RGB565 endpoints and 2-bit indices into a palette derived from
//! them. DXT3 prefixes every block with explicit 4-bit alpha, DXT5 with two 8-bit alpha
//! endpoints and 3-bit indices.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum BlockFormat {
    Dxt1,
    Dxt3,
    Dxt5,
}

impl BlockFormat {
    fn block_bytes(self) -> usize {
        match self {
            BlockFormat::Dxt1 => 8,
            BlockFormat::Dxt3 | BlockFormat::Dxt5 => 16,
        }
    }
}

type Texels = [[u8; 4]; 16];

/// Decode `data` into a `width * height` RGBA8 buffer in block storage row order.
///
/// `data` must hold every block covering the image, partial edge blocks included.
pub(super) fn decode_blocks(
    format: BlockFormat,
    data: &[u8],
    width: usize,
    height: usize,
) -> Vec<u8> {
    let blocks_x = width.div_ceil(4);
    let mut out = vec![0; width * height * 4];

    for (i, block) in data
        .chunks_exact(format.block_bytes())
        .take(blocks_x * height.div_ceil(4))
        .enumerate()
    {
        let texels = match format {
            BlockFormat::Dxt1 => color_block(block, false),
            BlockFormat::Dxt3 => {
                let mut texels = color_block(&block[8..], true);
                explicit_alpha(&block[..8], &mut texels);
                texels
            }
            BlockFormat::Dxt5 => {
                let mut texels = color_block(&block[8..], true);
                interpolated_alpha(&block[..8], &mut texels);
                texels
            }
        };

        let bx = (i % blocks_x) * 4;
        let by = (i / blocks_x) * 4;
        for (t, texel) in texels.iter().enumerate() {
            let x = bx + t % 4;
            let y = by + t / 4;
            if x < width && y < height {
                let p = (y * width + x) * 4;
                out[p..p + 4].copy_from_slice(texel);
            }
        }
    }

    out
}

pub(super) fn rgb565(c: u16) -> [u8; 4] {
    let r = (c >> 11) & 0x1f;
    let g = (c >> 5) & 0x3f;
    let b = c & 0x1f;
    [
        ((r << 3) | (r >> 2)) as u8,
        ((g << 2) | (g >> 4)) as u8,
        ((b << 3) | (b >> 2)) as u8,
        255,
    ]
}

fn mix(a: [u8; 4], b: [u8; 4], wa: u16, wb: u16) -> [u8; 4] {
    let d = wa + wb;
    let m = |x: u8, y: u8| ((x as u16 * wa + y as u16 * wb) / d) as u8;
    [m(a[0], b[0]), m(a[1], b[1]), m(a[2], b[2]), 255]
}

/// 8 byte colour block. DXT3/5 always use the four colour palette.
fn color_block(block: &[u8], always_four: bool) -> Texels {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

    let a = rgb565(c0);
    let b = rgb565(c1);
    let palette = if always_four || c0 > c1 {
        [a, b, mix(a, b, 2, 1), mix(a, b, 1, 2)]
    } else {
        // three colours plus transparent black
        [a, b, mix(a, b, 1, 1), [0, 0, 0, 0]]
    };

    let mut texels = [[0; 4]; 16];
    for (i, texel) in texels.iter_mut().enumerate() {
        *texel = palette[((indices >> (2 * i)) & 0b11) as usize];
    }
    texels
}

fn explicit_alpha(block: &[u8], texels: &mut Texels) {
    let bits = u64::from_le_bytes([
        block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
    ]);
    for (i, texel) in texels.iter_mut().enumerate() {
        texel[3] = ((bits >> (4 * i)) & 0xf) as u8 * 17;
    }
}

fn interpolated_alpha(block: &[u8], texels: &mut Texels) {
    let a0 = block[0] as u16;
    let a1 = block[1] as u16;

    let mut palette = [0u8; 8];
    palette[0] = a0 as u8;
    palette[1] = a1 as u8;
    if a0 > a1 {
        for i in 1..7u16 {
            palette[i as usize + 1] = (((7 - i) * a0 + i * a1) / 7) as u8;
        }
    } else {
        for i in 1..5u16 {
            palette[i as usize + 1] = (((5 - i) * a0 + i * a1) / 5) as u8;
        }
        palette[6] = 0;
        palette[7] = 255;
    }

    let bits = u64::from_le_bytes([
        block[2], block[3], block[4], block[5], block[6], block[7], 0, 0,
    ]);
    for (i, texel) in texels.iter_mut().enumerate() {
        texel[3] = palette[((bits >> (3 * i)) & 0b111) as usize];
    }
}
