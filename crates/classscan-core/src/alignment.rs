//! Face alignment via 4-DOF similarity transform.
//!
//! Warps each detected face in an RGB photo onto the canonical 112×112 ArcFace
//! crop, fitting the five detector landmarks to the InsightFace reference
//! positions by least squares.

use image::{Rgb, RgbImage};

/// ArcFace reference landmarks for a 112×112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: u32 = 112;

/// Similarity transform `dst = [[a, -b], [b, a]] * src + [tx, ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Least-squares fit of `src` onto `dst`.
    ///
    /// Closed form: with both point sets centered, `a` and `b` are the
    /// projections of the cross-covariance onto the source variance.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let mut var = 0.0f32;
        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (sx - smx, sy - smy);
            let (dx, dy) = (dx - dmx, dy - dmy);
            var += sx * sx + sy * sy;
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
        }

        if var < 1e-12 {
            // Degenerate landmarks: translate only.
            return Self { a: 1.0, b: 0.0, tx: dmx - smx, ty: dmy - smy };
        }

        let a = dot / var;
        let b = cross / var;
        Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        }
    }

    fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.a * x - self.b * y + self.tx, self.b * x + self.a * y + self.ty)
    }

    /// Inverse mapping, or `None` when the transform collapses the plane.
    fn invert(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let a = self.a / det;
        let b = -self.b / det;
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

/// Bilinear sample of one pixel; out-of-bounds neighbours read as black.
fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (w, h) = (image.width() as i64, image.height() as i64);

    let texel = |px: i64, py: i64| -> [f32; 3] {
        if px >= 0 && px < w && py >= 0 && py < h {
            let p = image.get_pixel(px as u32, py as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32]
        } else {
            [0.0; 3]
        }
    };

    let (ix, iy) = (x0 as i64, y0 as i64);
    let tl = texel(ix, iy);
    let tr = texel(ix + 1, iy);
    let bl = texel(ix, iy + 1);
    let br = texel(ix + 1, iy + 1);

    Rgb(std::array::from_fn(|c| {
        let top = tl[c] * (1.0 - fx) + tr[c] * fx;
        let bottom = bl[c] * (1.0 - fx) + br[c] * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }))
}

/// Warp `image` through `transform` into a square `out_size` crop.
fn warp(image: &RgbImage, transform: &Similarity, out_size: u32) -> RgbImage {
    let Some(inverse) = transform.invert() else {
        return RgbImage::new(out_size, out_size);
    };
    RgbImage::from_fn(out_size, out_size, |ox, oy| {
        let (sx, sy) = inverse.apply((ox as f32, oy as f32));
        sample_bilinear(image, sx, sy)
    })
}

/// Align a detected face to a canonical 112×112 RGB crop for ArcFace.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> RgbImage {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);
    warp(image, &transform, ALIGNED_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, tol: f32, what: &str) {
        assert!((actual - expected).abs() < tol, "{what} = {actual}, expected {expected}");
    }

    #[test]
    fn test_identity_transform() {
        let t = Similarity::estimate(&REFERENCE_LANDMARKS_112, &REFERENCE_LANDMARKS_112);
        assert_close(t.a, 1.0, 1e-4, "a");
        assert_close(t.b, 0.0, 1e-4, "b");
        assert_close(t.tx, 0.0, 1e-3, "tx");
        assert_close(t.ty, 0.0, 1e-3, "ty");
    }

    #[test]
    fn test_scaled_transform() {
        // Source landmarks at 2x scale → a ≈ 0.5
        let src = REFERENCE_LANDMARKS_112.map(|(x, y)| (x * 2.0, y * 2.0));
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS_112);
        assert_close(t.a, 0.5, 1e-4, "a");
        assert_close(t.b, 0.0, 1e-4, "b");
    }

    #[test]
    fn test_rotation_recovered() {
        // Rotate reference by 90°: (x, y) -> (-y, x). Fitting back needs b = -1.
        let src = REFERENCE_LANDMARKS_112.map(|(x, y)| (-y, x));
        let t = Similarity::estimate(&src, &REFERENCE_LANDMARKS_112);
        assert_close(t.a, 0.0, 1e-4, "a");
        assert_close(t.b, -1.0, 1e-4, "b");
        for (s, d) in src.iter().zip(REFERENCE_LANDMARKS_112.iter()) {
            let (x, y) = t.apply(*s);
            assert_close(x, d.0, 1e-2, "x");
            assert_close(y, d.1, 1e-2, "y");
        }
    }

    #[test]
    fn test_invert_roundtrip() {
        let t = Similarity { a: 0.8, b: 0.3, tx: 12.0, ty: -4.0 };
        let inv = t.invert().unwrap();
        let (x, y) = inv.apply(t.apply((17.0, 42.0)));
        assert_close(x, 17.0, 1e-3, "x");
        assert_close(y, 42.0, 1e-3, "y");
    }

    #[test]
    fn test_degenerate_transform_yields_black_crop() {
        let t = Similarity { a: 0.0, b: 0.0, tx: 0.0, ty: 0.0 };
        let image = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let out = warp(&image, &t, 8);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_align_face_output_size() {
        let image = RgbImage::from_pixel(640, 480, Rgb([128, 64, 32]));
        let aligned = align_face(&image, &REFERENCE_LANDMARKS_112);
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        // Interior of a uniform photo stays uniform and keeps channel order.
        assert_eq!(aligned.get_pixel(56, 56).0, [128, 64, 32]);
    }

    #[test]
    fn test_landmark_roundtrip() {
        // A bright patch at the left eye must land near the reference left eye.
        let mut image = RgbImage::new(200, 200);
        let src_landmarks: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        for y in 58..63 {
            for x in 78..83 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }

        let aligned = align_face(&image, &src_landmarks);

        let ref_x = REFERENCE_LANDMARKS_112[0].0.round() as u32;
        let ref_y = REFERENCE_LANDMARKS_112[0].1.round() as u32;
        let brightest = (ref_y - 1..=ref_y + 1)
            .flat_map(|y| (ref_x - 1..=ref_x + 1).map(move |x| (x, y)))
            .map(|(x, y)| aligned.get_pixel(x, y)[0])
            .max()
            .unwrap_or(0);
        assert!(brightest > 100, "expected bright patch near ({ref_x}, {ref_y}), max={brightest}");
    }
}
