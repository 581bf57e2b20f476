use std::fmt;
use std::sync::Arc;

/// Full copy of a surface's pixels at one instant.
///
/// Snapshots are immutable once captured. Cloning shares the underlying
/// buffer, so moving one between the undo and redo stacks never copies pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl Snapshot {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Fixed-size RGBA8 bitmap (straight alpha, row-major, origin top-left).
pub struct DrawingSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    revision: u64,
}

impl DrawingSurface {
    /// Creates a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(
            width > 0 && height > 0,
            "surface dimensions must be non-zero, got {width}x{height}"
        );
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .expect("surface dimensions overflow");
        Self {
            width,
            height,
            pixels: vec![0; len],
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn read_all(&self) -> Snapshot {
        Snapshot {
            width: self.width,
            height: self.height,
            pixels: Arc::from(self.pixels.as_slice()),
        }
    }

    /// Replaces every pixel with the snapshot's contents.
    ///
    /// # Panics
    ///
    /// If the snapshot was taken from a surface of a different size.
    pub fn write_all(&mut self, snapshot: &Snapshot) {
        assert_eq!(
            (snapshot.width, snapshot.height),
            (self.width, self.height),
            "snapshot dimensions do not match the surface"
        );
        self.pixels.copy_from_slice(&snapshot.pixels);
        self.touch();
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.touch();
    }

    /// True when no pixel carries any alpha.
    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(out)
    }

    /// Source-over composite of one pixel. Coordinates off the surface are clipped.
    pub fn blend_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if rgba[3] == 0 {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        let dst = &mut self.pixels[idx..idx + 4];
        if rgba[3] == 255 {
            dst.copy_from_slice(&rgba);
        } else {
            let blended = source_over(rgba, [dst[0], dst[1], dst[2], dst[3]]);
            dst.copy_from_slice(&blended);
        }
        self.revision = self.revision.wrapping_add(1);
    }

    /// Composites an RGBA8 image at the surface origin, clipped to the surface.
    pub fn draw_image(&mut self, rgba: &[u8], width: u32, height: u32) {
        assert_eq!(
            rgba.len(),
            width as usize * height as usize * 4,
            "image buffer does not match its dimensions"
        );
        let w = width.min(self.width);
        let h = height.min(self.height);
        for y in 0..h {
            for x in 0..w {
                let src = (y as usize * width as usize + x as usize) * 4;
                let px = [rgba[src], rgba[src + 1], rgba[src + 2], rgba[src + 3]];
                self.blend_pixel(x as i32, y as i32, px);
            }
        }
        self.touch();
    }

    /// Surface composited over an opaque background color.
    pub fn flatten_onto(&self, background: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(4) {
            let a = px[3] as u32;
            for c in 0..3 {
                let v = (px[c] as u32 * a + background[c] as u32 * (255 - a) + 127) / 255;
                out.push(v as u8);
            }
            out.push(255);
        }
        out
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize * self.width as usize) + x as usize) * 4
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn source_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_blank() {
        let surface = DrawingSurface::new(4, 3);
        assert!(surface.is_blank());
        assert_eq!(surface.pixels().len(), 4 * 3 * 4);
    }

    #[test]
    fn snapshot_does_not_alias_later_writes() {
        let mut surface = DrawingSurface::new(2, 2);
        let before = surface.read_all();
        surface.blend_pixel(1, 1, [10, 20, 30, 255]);
        assert!(before.pixels().iter().all(|&b| b == 0));

        surface.write_all(&before);
        assert!(surface.is_blank());
    }

    #[test]
    #[should_panic(expected = "snapshot dimensions do not match")]
    fn restoring_mismatched_snapshot_panics() {
        let small = DrawingSurface::new(2, 2).read_all();
        let mut big = DrawingSurface::new(3, 3);
        big.write_all(&small);
    }

    #[test]
    fn off_surface_writes_are_clipped() {
        let mut surface = DrawingSurface::new(2, 2);
        surface.blend_pixel(-1, 0, [255, 0, 0, 255]);
        surface.blend_pixel(0, 2, [255, 0, 0, 255]);
        assert!(surface.is_blank());
    }

    #[test]
    fn translucent_pixels_composite_over_existing_ink() {
        let mut surface = DrawingSurface::new(1, 1);
        surface.blend_pixel(0, 0, [0, 0, 255, 255]);
        surface.blend_pixel(0, 0, [255, 0, 0, 128]);
        let px = surface.pixel(0, 0).unwrap();
        assert_eq!(px[3], 255);
        assert!(px[0] > 120 && px[2] > 120);
    }

    #[test]
    fn clear_blanks_everything_and_bumps_revision() {
        let mut surface = DrawingSurface::new(3, 3);
        surface.blend_pixel(1, 1, [0, 0, 0, 255]);
        let rev = surface.revision();
        surface.clear();
        assert!(surface.is_blank());
        assert!(surface.revision() > rev);
    }

    #[test]
    fn flatten_renders_transparent_pixels_as_background() {
        let mut surface = DrawingSurface::new(2, 1);
        surface.blend_pixel(0, 0, [255, 0, 0, 255]);
        let flat = surface.flatten_onto([255, 255, 255]);
        assert_eq!(&flat[0..4], &[255, 0, 0, 255]);
        assert_eq!(&flat[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn draw_image_is_clipped_to_surface() {
        let mut surface = DrawingSurface::new(2, 2);
        let image: Vec<u8> = std::iter::repeat([9u8, 8, 7, 255])
            .take(9)
            .flatten()
            .collect();
        surface.draw_image(&image, 3, 3);
        assert_eq!(surface.pixel(1, 1), Some([9, 8, 7, 255]));
        assert!(!surface.is_blank());
    }

    #[test]
    fn draw_image_reads_rows_by_source_width() {
        let mut surface = DrawingSurface::new(2, 2);
        let image: Vec<u8> = (0..10u8).flat_map(|i| [i, 0, 0, 255]).collect();
        surface.draw_image(&image, 5, 2);
        assert_eq!(surface.pixel(1, 0), Some([1, 0, 0, 255]));
        assert_eq!(surface.pixel(0, 1), Some([5, 0, 0, 255]));
        assert_eq!(surface.pixel(1, 1), Some([6, 0, 0, 255]));
    }
}
