use crate::acquisition::domain::frame_converter::{ConvertError, FrameConverter};
use crate::acquisition::domain::frame_source::{PixelFormat, RawFrame};
use crate::shared::frame::Frame;

/// Pure-Rust sensor format converter producing packed RGB8.
///
/// Deep mono formats are reduced to 8 bits by keeping the most significant
/// bits. Bayer mosaics use nearest-neighbour 2x2 demosaicing, which is
/// plenty for detection and display at 960x600.
pub struct PixelFormatConverter;

impl PixelFormatConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PixelFormatConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConverter for PixelFormatConverter {
    fn convert(&self, raw: &RawFrame, index: usize) -> Result<Frame, ConvertError> {
        check_buffer(raw)?;
        let w = raw.width as usize;
        let h = raw.height as usize;

        let rgb: Vec<u8> = match raw.pixel_format {
            PixelFormat::Mono8 => raw.data.iter().flat_map(|&v| [v, v, v]).collect(),
            PixelFormat::Mono10 | PixelFormat::Mono12 | PixelFormat::Mono16 => {
                let shift = raw.pixel_format.bit_depth() - 8;
                raw.data
                    .chunks_exact(2)
                    .map(|s| msb_aligned(u16::from_le_bytes([s[0], s[1]]), shift))
                    .flat_map(|v| [v, v, v])
                    .collect()
            }
            PixelFormat::Rgb8 => raw.data.clone(),
            PixelFormat::Bgr8 => {
                let mut out = raw.data.clone();
                for px in out.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                out
            }
            PixelFormat::BayerRg8
            | PixelFormat::BayerBg8
            | PixelFormat::BayerGr8
            | PixelFormat::BayerGb8 => demosaic(&raw.data, w, h, raw.pixel_format),
        };

        Ok(Frame::new(rgb, raw.width, raw.height, 3, index))
    }
}

fn check_buffer(raw: &RawFrame) -> Result<(), ConvertError> {
    if raw.width == 0 || raw.height == 0 {
        return Err(ConvertError::Empty {
            width: raw.width,
            height: raw.height,
        });
    }
    let expected =
        raw.width as usize * raw.height as usize * raw.pixel_format.bytes_per_pixel();
    if raw.data.len() != expected {
        return Err(ConvertError::BufferSize {
            format: raw.pixel_format,
            width: raw.width,
            height: raw.height,
            expected,
            actual: raw.data.len(),
        });
    }
    Ok(())
}

fn msb_aligned(sample: u16, shift: u32) -> u8 {
    (sample >> shift).min(255) as u8
}

/// Offsets of the red and blue sites within a 2x2 Bayer tile, as `(dx, dy)`.
/// The two remaining sites are green.
fn bayer_sites(format: PixelFormat) -> ((usize, usize), (usize, usize)) {
    match format {
        PixelFormat::BayerRg8 => ((0, 0), (1, 1)),
        PixelFormat::BayerBg8 => ((1, 1), (0, 0)),
        PixelFormat::BayerGr8 => ((1, 0), (0, 1)),
        _ => ((0, 1), (1, 0)), // GB
    }
}

fn demosaic(data: &[u8], w: usize, h: usize, format: PixelFormat) -> Vec<u8> {
    let ((rx, ry), (bx, by)) = bayer_sites(format);
    let sample = |x: usize, y: usize| data[y.min(h - 1) * w + x.min(w - 1)];

    let mut out = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        let ty = y & !1;
        for x in 0..w {
            let tx = x & !1;
            let r = sample(tx + rx, ty + ry);
            let b = sample(tx + bx, ty + by);
            // Greens sit on the anti-diagonal of the red/blue pair
            let g1 = sample(tx + bx, ty + ry);
            let g2 = sample(tx + rx, ty + by);
            let g = ((g1 as u16 + g2 as u16) / 2) as u8;
            out.extend_from_slice(&[r, g, b]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn raw(data: Vec<u8>, width: u32, height: u32, pixel_format: PixelFormat) -> RawFrame {
        RawFrame {
            data,
            width,
            height,
            pixel_format,
        }
    }

    #[test]
    fn test_mono8_replicates_channels() {
        let frame = PixelFormatConverter::new()
            .convert(&raw(vec![10, 200], 2, 1, PixelFormat::Mono8), 3)
            .unwrap();
        assert_eq!(frame.data(), &[10, 10, 10, 200, 200, 200]);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 3);
    }

    #[rstest]
    #[case::mono10(PixelFormat::Mono10, 0x03FF, 255)]
    #[case::mono12(PixelFormat::Mono12, 0x0800, 128)]
    #[case::mono16(PixelFormat::Mono16, 0xABCD, 0xAB)]
    fn test_deep_mono_keeps_msbs(
        #[case] format: PixelFormat,
        #[case] sample: u16,
        #[case] expected: u8,
    ) {
        let bytes = sample.to_le_bytes().to_vec();
        let frame = PixelFormatConverter::new()
            .convert(&raw(bytes, 1, 1, format), 0)
            .unwrap();
        assert_eq!(frame.data(), &[expected, expected, expected]);
    }

    #[test]
    fn test_rgb8_passthrough() {
        let data = vec![1, 2, 3, 4, 5, 6];
        let frame = PixelFormatConverter::new()
            .convert(&raw(data.clone(), 2, 1, PixelFormat::Rgb8), 0)
            .unwrap();
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_bgr8_swapped_to_rgb() {
        let frame = PixelFormatConverter::new()
            .convert(&raw(vec![0, 0, 255], 1, 1, PixelFormat::Bgr8), 0)
            .unwrap();
        assert_eq!(frame.data(), &[255, 0, 0]);
    }

    #[rstest]
    #[case::rg(PixelFormat::BayerRg8, vec![200, 100, 100, 50])]
    #[case::bg(PixelFormat::BayerBg8, vec![50, 100, 100, 200])]
    #[case::gr(PixelFormat::BayerGr8, vec![100, 200, 50, 100])]
    #[case::gb(PixelFormat::BayerGb8, vec![100, 50, 200, 100])]
    fn test_bayer_tile_to_uniform_rgb(#[case] format: PixelFormat, #[case] tile: Vec<u8>) {
        // Each tile encodes R=200, G=100, B=50
        let frame = PixelFormatConverter::new()
            .convert(&raw(tile, 2, 2, format), 0)
            .unwrap();
        for px in frame.data().chunks_exact(3) {
            assert_eq!(px, &[200, 100, 50]);
        }
    }

    #[test]
    fn test_bayer_odd_dimensions_clamp() {
        let data = vec![200, 100, 200, 100, 50, 100, 200, 100, 200];
        let frame = PixelFormatConverter::new()
            .convert(&raw(data, 3, 3, PixelFormat::BayerRg8), 0)
            .unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.data().len(), 27);
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let err = PixelFormatConverter::new()
            .convert(&raw(vec![0; 5], 2, 1, PixelFormat::Rgb8), 0)
            .unwrap_err();
        assert_eq!(
            err,
            ConvertError::BufferSize {
                format: PixelFormat::Rgb8,
                width: 2,
                height: 1,
                expected: 6,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = PixelFormatConverter::new()
            .convert(&raw(vec![], 0, 4, PixelFormat::Mono8), 0)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Empty { .. }));
    }
}
