//! Cover-fit arithmetic. Pure functions, no pixels involved.

/// How to turn a `src_w`×`src_h` image into a cover-fitted variant:
/// optionally scale down, then crop `width`×`height` at (`crop_x`, `crop_y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverPlan {
    /// Intermediate size after scaling. `None` when no scaling is needed.
    pub scaled: Option<(u32, u32)>,
    pub crop_x: u32,
    pub crop_y: u32,
    pub width: u32,
    pub height: u32,
}

impl CoverPlan {
    pub fn is_noop(&self, src_w: u32, src_h: u32) -> bool {
        self.scaled.is_none() && self.width == src_w && self.height == src_h
    }
}

/// Scales the source so it fully covers the target box, anchored at center.
///
/// The box is clamped to the source first, so the scale factor is never
/// above 1 and a source smaller than the box keeps its own resolution.
pub fn cover_plan(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> CoverPlan {
    let box_w = box_w.clamp(1, src_w.max(1));
    let box_h = box_h.clamp(1, src_h.max(1));

    let scale = f64::max(
        box_w as f64 / src_w as f64,
        box_h as f64 / src_h as f64,
    );

    let scaled = if scale < 1.0 {
        let w = ((src_w as f64 * scale).round() as u32).clamp(box_w, src_w);
        let h = ((src_h as f64 * scale).round() as u32).clamp(box_h, src_h);
        Some((w, h))
    } else {
        None
    };

    let (scaled_w, scaled_h) = scaled.unwrap_or((src_w, src_h));

    CoverPlan {
        scaled,
        crop_x: (scaled_w - box_w) / 2,
        crop_y: (scaled_h - box_h) / 2,
        width: box_w,
        height: box_h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_downscale() {
        let plan = cover_plan(1000, 1000, 150, 150);
        assert_eq!(plan.scaled, Some((150, 150)));
        assert_eq!((plan.crop_x, plan.crop_y), (0, 0));
        assert_eq!((plan.width, plan.height), (150, 150));
    }

    #[test]
    fn test_landscape_covers_and_crops_center() {
        // 400x200 into 100x100: scale 0.5 -> 200x100, crop 50px from the left
        let plan = cover_plan(400, 200, 100, 100);
        assert_eq!(plan.scaled, Some((200, 100)));
        assert_eq!((plan.crop_x, plan.crop_y), (50, 0));
        assert_eq!((plan.width, plan.height), (100, 100));
    }

    #[test]
    fn test_small_source_is_never_upscaled() {
        let plan = cover_plan(50, 50, 1200, 1200);
        assert_eq!(plan.scaled, None);
        assert_eq!((plan.width, plan.height), (50, 50));
        assert!(plan.is_noop(50, 50));
    }

    #[test]
    fn test_partially_small_source_crops_without_scaling() {
        // Narrower than the box but taller: keep width, crop height around center
        let plan = cover_plan(100, 2000, 150, 150);
        assert_eq!(plan.scaled, None);
        assert_eq!((plan.width, plan.height), (100, 150));
        assert_eq!((plan.crop_x, plan.crop_y), (0, 925));
    }

    #[test]
    fn test_exact_fit_is_noop() {
        assert!(cover_plan(500, 500, 500, 500).is_noop(500, 500));
    }
}
