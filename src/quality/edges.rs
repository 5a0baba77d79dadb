//! Luminance-domain operators: Laplacian sharpness and Canny edge density.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::laplacian_filter;

/// Population variance of the 4-neighbour Laplacian `[0 1 0; 1 -4 1; 0 1 0]`.
pub(crate) fn laplacian_variance(gray: &GrayImage) -> f64 {
    let response = laplacian_filter(gray);
    let values = response.as_raw();
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    values
        .iter()
        .map(|v| {
            let d = f64::from(*v) - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Percentage of pixels marked by the Canny detector with hysteresis
/// thresholds `low` and `high` on the gradient magnitude.
pub(crate) fn edge_density_percent(gray: &GrayImage, low: f64, high: f64) -> f64 {
    // canny() asserts high >= low and walks off the frame when low is zero.
    let low = (low as f32).max(f32::EPSILON);
    let high = (high as f32).max(low);

    let edges = canny(gray, low, high);
    let pixels = edges.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let on = pixels.iter().filter(|p| **p > 0).count();
    on as f64 * 100.0 / pixels.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| image::Luma([f(x, y)]))
    }

    fn edge_map(gray: &GrayImage) -> GrayImage {
        canny(gray, 50.0, 150.0)
    }

    fn edge_count(gray: &GrayImage) -> usize {
        edge_map(gray).as_raw().iter().filter(|p| **p > 0).count()
    }

    #[test]
    fn flat_image_has_no_edges_and_no_laplacian_energy() {
        let gray = image(32, 24, |_, _| 128);
        assert_eq!(edge_density_percent(&gray, 50.0, 150.0), 0.0);
        assert_eq!(laplacian_variance(&gray), 0.0);
    }

    #[test]
    fn linear_ramp_is_smooth() {
        let gray = image(64, 64, |x, _| (x * 4) as u8);
        assert_eq!(edge_count(&gray), 0);
        assert!(laplacian_variance(&gray) < 100.0);
    }

    #[test]
    fn vertical_step_yields_a_line_at_the_step() {
        let gray = image(64, 64, |x, _| if x < 32 { 0 } else { 255 });
        let edges = edge_map(&gray);

        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel[0] > 0 {
                assert!(x == 31 || x == 32, "stray edge at ({}, {})", x, y);
            }
        }
        for y in 1..63 {
            assert!(
                (31..=32).any(|x| edges.get_pixel(x, y)[0] > 0),
                "row {} has no edge",
                y
            );
        }
    }

    #[test]
    fn weak_pixels_join_only_when_connected_to_a_strong_seed() {
        // A faint step stays between the two thresholds everywhere.
        let faint = image(40, 20, |x, _| if x < 20 { 90 } else { 120 });
        assert_eq!(edge_count(&faint), 0);

        // A step that is strong at the top and fades to the same faint contrast.
        let fading = image(40, 20, |x, y| {
            if x < 20 {
                90
            } else {
                90 + 160u32.saturating_sub(10 * y).max(30) as u8
            }
        });
        let edges = edge_map(&fading);
        assert!(
            (19..=20).any(|x| edges.get_pixel(x, 15)[0] > 0),
            "faint segment grows from the strong seed"
        );
    }

    #[test]
    fn checkerboard_is_edge_dense_and_sharp() {
        let gray = image(64, 64, |x, y| if (x / 4 + y / 4) % 2 == 0 { 255 } else { 0 });
        let density = edge_density_percent(&gray, 50.0, 150.0);
        assert!(density > 30.0, "density {}", density);
        assert!(laplacian_variance(&gray) > 10_000.0);
    }

    #[test]
    fn degenerate_thresholds_do_not_panic() {
        let gray = image(16, 16, |x, _| if x < 8 { 0 } else { 255 });
        assert!(edge_density_percent(&gray, 0.0, 0.0) > 0.0);
        assert!(edge_density_percent(&gray, 200.0, 100.0) >= 0.0);
        assert_eq!(edge_density_percent(&image(1, 1, |_, _| 9), 50.0, 150.0), 0.0);
    }
}
