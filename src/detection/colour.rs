//! Region sampling over captured frames.
//!
//! Every colour-class detector used by the routines reduces to either the
//! average colour of a region or the share of its pixels that satisfy a
//! per-pixel predicate.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capture::Frame;
use crate::error::DetectionError;

/// A rectangle in frame-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// The 1x1 region at the origin, returned by a cancelled calibration request.
    pub const DEGENERATE: Region = Region {
        x: 0,
        y: 0,
        width: 1,
        height: 1,
    };

    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region covering the whole frame.
    pub fn full(frame: &Frame) -> Self {
        Self::new(0, 0, frame.width(), frame.height())
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Checks that the region is non-empty and lies inside a `width` x `height` frame.
    pub fn check_within(&self, width: u32, height: u32) -> Result<(), DetectionError> {
        if self.width == 0 || self.height == 0 {
            return Err(DetectionError::EmptyRegion { region: *self });
        }

        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        match (right, bottom) {
            (Some(r), Some(b)) if r <= width && b <= height => Ok(()),
            _ => Err(DetectionError::InvalidRegion {
                region: *self,
                frame_width: width,
                frame_height: height,
            }),
        }
    }

    /// The part of the region that lies inside a `width` x `height` frame,
    /// or `None` if nothing overlaps.
    pub fn clipped_to(&self, width: u32, height: u32) -> Option<Region> {
        let right = self.x.saturating_add(self.width).min(width);
        let bottom = self.y.saturating_add(self.height).min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Region::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} w={} h={}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Per-channel averages over a region at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColourSample {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ColourSample {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Largest absolute per-channel difference from `baseline`.
    pub fn max_deviation(&self, baseline: &ColourSample) -> f64 {
        (self.r - baseline.r)
            .abs()
            .max((self.g - baseline.g).abs())
            .max((self.b - baseline.b).abs())
    }

    /// True if any channel differs from `baseline` by more than `tolerance`.
    pub fn deviates_from(&self, baseline: &ColourSample, tolerance: u32) -> bool {
        self.max_deviation(baseline) > tolerance as f64
    }
}

impl fmt::Display for ColourSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R:{:.1} G:{:.1} B:{:.1}", self.r, self.g, self.b)
    }
}

/// Threshold-based colour classes for single pixels.
///
/// Bounds are strict: a dark pixel has every channel below `max`, a bright
/// one every channel above `min`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelClass {
    Dark { max: u8 },
    Bright { min: u8 },
    Red { min_red: u8, max_green: u8 },
    Yellow { min_red_green: u8, max_blue: u8 },
}

impl PixelClass {
    pub fn matches(&self, pixel: Rgb<u8>) -> bool {
        let [r, g, b] = pixel.0;
        match *self {
            PixelClass::Dark { max } => r < max && g < max && b < max,
            PixelClass::Bright { min } => r > min && g > min && b > min,
            PixelClass::Red { min_red, max_green } => r > min_red && g < max_green,
            PixelClass::Yellow {
                min_red_green,
                max_blue,
            } => r > min_red_green && g > min_red_green && b < max_blue,
        }
    }
}

fn region_pixels<'a>(
    frame: &'a Frame,
    region: &Region,
) -> Result<impl Iterator<Item = Rgb<u8>> + 'a, DetectionError> {
    region.check_within(frame.width(), frame.height())?;
    let Region {
        x,
        y,
        width,
        height,
    } = *region;
    Ok((y..y + height).flat_map(move |py| (x..x + width).map(move |px| *frame.get_pixel(px, py))))
}

/// Mean of each channel over every pixel in `region`.
pub fn average_colour(frame: &Frame, region: &Region) -> Result<ColourSample, DetectionError> {
    let mut totals = [0u64; 3];
    for pixel in region_pixels(frame, region)? {
        for (total, channel) in totals.iter_mut().zip(pixel.0) {
            *total += channel as u64;
        }
    }

    let count = region.area() as f64;
    Ok(ColourSample::new(
        totals[0] as f64 / count,
        totals[1] as f64 / count,
        totals[2] as f64 / count,
    ))
}

/// Number of pixels in `region` for which `predicate` holds.
pub fn count_matching<F>(frame: &Frame, region: &Region, predicate: F) -> Result<u64, DetectionError>
where
    F: Fn(Rgb<u8>) -> bool,
{
    Ok(region_pixels(frame, region)?
        .filter(|pixel| predicate(*pixel))
        .count() as u64)
}

/// Fraction (0.0 to 1.0) of pixels in `region` for which `predicate` holds.
pub fn fraction_matching<F>(
    frame: &Frame,
    region: &Region,
    predicate: F,
) -> Result<f64, DetectionError>
where
    F: Fn(Rgb<u8>) -> bool,
{
    let matched = count_matching(frame, region, predicate)?;
    Ok(matched as f64 / region.area() as f64)
}

/// Convenience wrapper over [`fraction_matching`] for a [`PixelClass`].
pub fn fraction_of_class(
    frame: &Frame,
    region: &Region,
    class: PixelClass,
) -> Result<f64, DetectionError> {
    fraction_matching(frame, region, |pixel| class.matches(pixel))
}

/// Convenience wrapper over [`count_matching`] for a [`PixelClass`].
pub fn count_of_class(
    frame: &Frame,
    region: &Region,
    class: PixelClass,
) -> Result<u64, DetectionError> {
    count_matching(frame, region, |pixel| class.matches(pixel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn gradient(width: u32, height: u32) -> Frame {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        })
    }

    #[test]
    fn test_average_of_uniform_region_is_exact() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([17, 200, 63]));
        for region in [
            Region::new(0, 0, 40, 30),
            Region::new(5, 7, 3, 2),
            Region::new(39, 29, 1, 1),
        ] {
            let sample = average_colour(&frame, &region).unwrap();
            assert_eq!(sample, ColourSample::new(17.0, 200.0, 63.0));
        }
    }

    #[test]
    fn test_average_of_mixed_region() {
        let mut frame = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
        frame.put_pixel(1, 0, Rgb([100, 50, 25]));

        let sample = average_colour(&frame, &Region::new(0, 0, 2, 1)).unwrap();
        assert_eq!(sample, ColourSample::new(50.0, 25.0, 12.5));
    }

    #[test]
    fn test_region_outside_frame_is_rejected() {
        let frame = gradient(100, 100);
        let region = Region::new(95, 0, 10, 10);

        let err = average_colour(&frame, &region).unwrap_err();
        assert_eq!(
            err,
            DetectionError::InvalidRegion {
                region,
                frame_width: 100,
                frame_height: 100
            }
        );
        assert!(fraction_of_class(&frame, &region, PixelClass::Dark { max: 60 }).is_err());
    }

    #[test]
    fn test_region_overflowing_u32_is_rejected() {
        let frame = gradient(10, 10);
        let region = Region::new(u32::MAX, 0, 2, 2);
        assert!(matches!(
            average_colour(&frame, &region),
            Err(DetectionError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let frame = gradient(10, 10);
        let region = Region::new(0, 0, 0, 4);
        assert_eq!(
            average_colour(&frame, &region),
            Err(DetectionError::EmptyRegion { region })
        );
    }

    #[test]
    fn test_clipping_to_frame() {
        let region = Region::new(100, 100, 440, 300);
        assert_eq!(region.clipped_to(640, 480), Some(region));
        assert_eq!(
            region.clipped_to(320, 240),
            Some(Region::new(100, 100, 220, 140))
        );
        assert_eq!(region.clipped_to(100, 480), None);
        assert_eq!(Region::new(u32::MAX, 0, 5, 5).clipped_to(10, 10), None);
    }

    #[test]
    fn test_fraction_matching_dark_quarter() {
        let mut frame = RgbImage::from_pixel(20, 20, Rgb([220, 220, 220]));
        for y in 0..10 {
            for x in 0..10 {
                frame.put_pixel(x, y, Rgb([50, 50, 50]));
            }
        }

        let dark = PixelClass::Dark { max: 60 };
        let whole = Region::full(&frame);
        assert_eq!(fraction_of_class(&frame, &whole, dark).unwrap(), 0.25);
        assert_eq!(count_of_class(&frame, &whole, dark).unwrap(), 100);
        assert_eq!(
            fraction_of_class(&frame, &Region::new(0, 0, 10, 10), dark).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_fraction_matching_is_monotonic_in_threshold() {
        let frame = gradient(64, 48);
        let region = Region::new(3, 4, 50, 40);

        let mut previous = 0.0;
        for max in (0..=255u8).step_by(5) {
            let fraction = fraction_of_class(&frame, &region, PixelClass::Dark { max }).unwrap();
            assert!(fraction >= previous, "max={} shrank the fraction", max);
            assert!((0.0..=1.0).contains(&fraction));
            previous = fraction;
        }

        let mut previous = 0.0;
        for min in (0..=255u8).rev().step_by(5) {
            let fraction = fraction_of_class(&frame, &region, PixelClass::Bright { min }).unwrap();
            assert!(fraction >= previous, "min={} shrank the fraction", min);
            previous = fraction;
        }
    }

    #[test]
    fn test_pixel_classes() {
        let red = PixelClass::Red {
            min_red: 180,
            max_green: 100,
        };
        assert!(red.matches(Rgb([200, 40, 40])));
        assert!(!red.matches(Rgb([200, 150, 40])));

        let yellow = PixelClass::Yellow {
            min_red_green: 180,
            max_blue: 90,
        };
        assert!(yellow.matches(Rgb([230, 210, 20])));
        assert!(!yellow.matches(Rgb([230, 210, 200])));

        let white = PixelClass::Bright { min: 200 };
        assert!(white.matches(Rgb([250, 250, 250])));
        assert!(!white.matches(Rgb([250, 250, 100])));

        // Bounds are strict
        assert!(!PixelClass::Dark { max: 50 }.matches(Rgb([50, 0, 0])));
    }

    #[test]
    fn test_deviation_against_baseline() {
        let baseline = ColourSample::new(100.0, 120.0, 80.0);
        let close = ColourSample::new(110.0, 115.0, 94.0);
        let shifted = ColourSample::new(100.0, 140.0, 80.0);

        assert_eq!(close.max_deviation(&baseline), 14.0);
        assert!(!close.deviates_from(&baseline, 15));
        assert!(shifted.deviates_from(&baseline, 15));
        // Exactly at tolerance is not a deviation
        assert!(!shifted.deviates_from(&baseline, 20));
    }
}
