use egui::{Pos2, Vec2};

/// Angle between the shaft and each head segment, in degrees.
pub const ARROW_HEAD_ANGLE_DEG: f32 = 30.0;
/// Length of each head segment in surface units. Independent of stroke width.
pub const ARROW_HEAD_LENGTH: f32 = 15.0;

/// The two short segments forming the arrow head, both anchored at the tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowHead {
    pub tip: Pos2,
    pub left: Pos2,
    pub right: Pos2,
}

impl ArrowHead {
    /// Computes the head for a shaft running from `start` to `end`.
    ///
    /// Returns `None` for a zero-length shaft, which has no direction.
    pub fn from_shaft(start: Pos2, end: Pos2) -> Option<Self> {
        let shaft = end - start;
        if shaft.length_sq() == 0.0 {
            return None;
        }

        let angle = shaft.angle();
        let spread = ARROW_HEAD_ANGLE_DEG.to_radians();
        let tail = |offset: f32| end - Vec2::angled(angle + offset) * ARROW_HEAD_LENGTH;

        Some(Self {
            tip: end,
            left: tail(-spread),
            right: tail(spread),
        })
    }

    /// Segments as (from, to) pairs, tip first.
    pub fn segments(&self) -> [(Pos2, Pos2); 2] {
        [(self.tip, self.left), (self.tip, self.right)]
    }
}
