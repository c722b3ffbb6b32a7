use glam::Vec4;

#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// 0-255 per channel.
    Rgba8(Vec<u8>),
    /// Widened from 16 bit formats; half float data is not clamped.
    Rgba32F(Vec<f32>),
}

impl Pixels {
    pub fn len(&self) -> usize {
        match self {
            Pixels::Rgba8(data) => data.len(),
            Pixels::Rgba32F(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded image, rows top to bottom, four channels per texel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    has_alpha: bool,
    pixels: Pixels,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, has_alpha: bool, pixels: Pixels) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            has_alpha,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the texture was flagged as carrying alpha, one bit or eight bit.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn into_pixels(self) -> Pixels {
        self.pixels
    }

    /// Texel at `(x, y)` from the top left, 8 bit images scaled to `0..=1`.
    pub fn texel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let p = (y as usize * self.width as usize + x as usize) * 4;
        Some(match &self.pixels {
            Pixels::Rgba8(data) => {
                Vec4::new(
                    data[p] as f32,
                    data[p + 1] as f32,
                    data[p + 2] as f32,
                    data[p + 3] as f32,
                ) / 255.0
            }
            Pixels::Rgba32F(data) => Vec4::from_slice(&data[p..p + 4]),
        })
    }

    /// All channels as bytes, float images clamped to `0..=1` first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        match &self.pixels {
            Pixels::Rgba8(data) => data.clone(),
            Pixels::Rgba32F(data) => data
                .iter()
                .map(|&c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        }
    }

    pub fn flip_vertical(&mut self) {
        let row = self.width as usize * 4;
        match &mut self.pixels {
            Pixels::Rgba8(data) => flip_rows(data, row),
            Pixels::Rgba32F(data) => flip_rows(data, row),
        }
    }
}

fn flip_rows<T>(data: &mut [T], row: usize) {
    if row == 0 {
        return;
    }
    let rows = data.len() / row;
    for i in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - i) * row);
        top[i * row..(i + 1) * row].swap_with_slice(&mut bottom[..row]);
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DecodedImage {
        let data = (0..width * height)
            .flat_map(|i| [i as u8, 0, 0, 255])
            .collect();
        DecodedImage::new(width, height, false, Pixels::Rgba8(data))
    }

    #[test]
    fn test_flip() {
        let mut image = gradient(2, 3);
        image.flip_vertical();
        let reds: Vec<u8> = image.to_rgba8().chunks(4).map(|p| p[0]).collect();
        assert_eq!(reds, vec![4, 5, 2, 3, 0, 1]);

        let mut image = gradient(1, 4);
        image.flip_vertical();
        let reds: Vec<u8> = image.to_rgba8().chunks(4).map(|p| p[0]).collect();
        assert_eq!(reds, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_texel() {
        let image = gradient(2, 2);
        assert_eq!(image.texel(1, 1), Some(Vec4::new(3.0 / 255.0, 0.0, 0.0, 1.0)));
        assert_eq!(image.texel(2, 0), None);

        let image = DecodedImage::new(1, 1, true, Pixels::Rgba32F(vec![2.0, 0.5, -1.0, 1.0]));
        assert_eq!(image.texel(0, 0), Some(Vec4::new(2.0, 0.5, -1.0, 1.0)));
        assert_eq!(image.to_rgba8(), vec![255, 128, 0, 255]);
    }
}
