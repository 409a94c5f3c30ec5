/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only (sensor formats on the
/// way in, BGR for OpenCV on the way out); the domain layer treats pixel
/// data as packed RGB8.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Loop iteration this frame was acquired in.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Copy of the pixel data with the first and third channels swapped.
    pub fn to_bgr(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.channels >= 3 {
            for px in out.chunks_exact_mut(self.channels as usize) {
                px.swap(0, 2);
            }
        }
        out
    }
}
