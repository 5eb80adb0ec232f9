//! RGBA8 pixel buffer with scanline polygon fill

/// Owned RGBA8 framebuffer
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major
    pub fn data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width * height * 4) as usize];
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Write one pixel, alpha-blending over the existing value
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let a = color[3] as u32;
        if a == 255 {
            self.pixels[i..i + 4].copy_from_slice(&color);
            return;
        }
        for c in 0..3 {
            let src = color[c] as u32;
            let dst = self.pixels[i + c] as u32;
            self.pixels[i + c] = ((src * a + dst * (255 - a)) / 255) as u8;
        }
        self.pixels[i + 3] = self.pixels[i + 3].max(color[3]);
    }

    /// Stroke a one-pixel line, blending along its length
    pub fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 4]) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.blend_pixel(
                (x0 + dx * t).round() as i32,
                (y0 + dy * t).round() as i32,
                color,
            );
        }
    }

    /// Stroke the polygon outline edge by edge
    pub fn stroke_polygon(&mut self, points: &[(f32, f32)], color: [u8; 4]) {
        if points.len() < 2 {
            return;
        }
        for i in 0..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            self.line(x0, y0, x1, y1, color);
        }
    }

    /// Scanline fill of a convex polygon given in screen space
    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: [u8; 4]) {
        if points.len() < 3 {
            return;
        }

        let y_min = points
            .iter()
            .map(|p| p.1)
            .fold(f32::INFINITY, f32::min)
            .floor()
            .max(0.0) as i32;
        let y_max = points
            .iter()
            .map(|p| p.1)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.height as f32 - 1.0) as i32;

        for y in y_min..=y_max {
            let scan = y as f32 + 0.5;
            let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
            for i in 0..points.len() {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % points.len()];
                if (y0 <= scan && y1 > scan) || (y1 <= scan && y0 > scan) {
                    let t = (scan - y0) / (y1 - y0);
                    crossings.push(x0 + t * (x1 - x0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for pair in crossings.chunks_exact(2) {
                let x_start = pair[0].round().max(0.0) as i32;
                let x_end = pair[1].round().min(self.width as f32) as i32;
                for x in x_start..x_end {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_fills_every_pixel() {
        let mut surface = PixelSurface::new(4, 4);
        surface.clear([10, 20, 30, 255]);
        assert_eq!(surface.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(surface.pixel(3, 3), [10, 20, 30, 255]);
    }

    #[test]
    fn test_fill_polygon_covers_interior_only() {
        let mut surface = PixelSurface::new(20, 20);
        surface.clear([0, 0, 0, 255]);
        surface.fill_polygon(
            &[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)],
            [255, 0, 0, 255],
        );
        assert_eq!(surface.pixel(10, 10), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(2, 2), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(18, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn test_fill_polygon_clips_to_bounds() {
        let mut surface = PixelSurface::new(8, 8);
        surface.clear([0, 0, 0, 255]);
        // Must not panic with points far outside the surface
        surface.fill_polygon(
            &[(-10.0, -10.0), (30.0, -10.0), (30.0, 30.0), (-10.0, 30.0)],
            [0, 255, 0, 255],
        );
        assert_eq!(surface.pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(surface.pixel(7, 7), [0, 255, 0, 255]);
    }

    #[test]
    fn test_stroke_polygon_outlines_without_filling() {
        let mut surface = PixelSurface::new(20, 20);
        surface.clear([0, 0, 0, 255]);
        surface.stroke_polygon(
            &[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)],
            [255, 255, 255, 255],
        );
        assert_eq!(surface.pixel(10, 5), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(15, 10), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(10, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn test_blend_pixel_mixes_colors() {
        let mut surface = PixelSurface::new(2, 2);
        surface.clear([0, 0, 0, 255]);
        surface.blend_pixel(0, 0, [255, 255, 255, 128]);
        let [r, g, b, a] = surface.pixel(0, 0);
        assert!(r > 100 && r < 150);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_degenerate_polygon_is_ignored() {
        let mut surface = PixelSurface::new(4, 4);
        surface.clear([0, 0, 0, 255]);
        surface.fill_polygon(&[(1.0, 1.0), (2.0, 2.0)], [255, 0, 0, 255]);
        assert_eq!(surface.pixel(1, 1), [0, 0, 0, 255]);
    }
}
