//! Rectangle collision and the per-platform resolution rules.
//!
//! World coordinates are screen-style: origin at the top-left, y grows
//! downward, so "falling" means positive vertical velocity and a platform's
//! top edge is its smallest y.
//!
//! Platform resolution does not sweep. Landing and bonking reconstruct the
//! body's previous edge as `edge - velocity_y` (one frame of lookback). That
//! only holds while `velocity_y` is the distance actually travelled this
//! frame: once anything else has moved the body or rewritten its velocity
//! (an earlier bonk, a push-out, a respawn into geometry), the lookback is
//! wrong and the body can pass straight through a platform. That is accepted
//! behaviour; see `lookback_misses_body_already_inside_platform`.

use glam::Vec2;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.right() > other.left() && self.left() < other.right()
    }

    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.bottom() > other.top() && self.top() < other.bottom()
    }

    /// Strict AABB overlap: touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.overlaps_horizontally(other) && self.overlaps_vertically(other)
    }

    /// Bounding box of two points.
    pub fn spanning(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

/// Anything the level loop can test for contact.
pub trait Collidable {
    fn bounds(&self) -> Rect;

    fn touches(&self, body: &Rect) -> bool {
        self.bounds().intersects(body)
    }
}

impl Collidable for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// Three tracked points approximating a spike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub points: [Vec2; 3],
}

impl Triangle {
    pub fn edges(&self) -> [(Vec2, Vec2); 3] {
        let [a, b, c] = self.points;
        [(a, b), (b, c), (c, a)]
    }
}

impl Collidable for Triangle {
    fn bounds(&self) -> Rect {
        let [a, b, c] = self.points;
        let min = a.min(b).min(c);
        let max = a.max(b).max(c);
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Hit when the body overlaps the bounding box of any edge. Coarse near
    /// the slanted edges in both directions, and a purely horizontal edge has
    /// a zero-height box that only catches bodies straddling it.
    fn touches(&self, body: &Rect) -> bool {
        self.edges()
            .iter()
            .any(|&(p1, p2)| body.intersects(&Rect::spanning(p1, p2)))
    }
}

/// Held horizontal intent. Side blocking keys off what the player is
/// holding, not off the sign of any velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HorizontalIntent {
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformContact {
    pub landed: bool,
    pub bonked: bool,
    pub blocked_left: bool,
    pub blocked_right: bool,
}

/// Snap the body onto the platform top if its bottom edge reached or crossed
/// it this frame while horizontally overlapping.
pub fn land_on(body: &mut Rect, velocity_y: &mut f32, platform: &Rect) -> bool {
    let bottom = body.bottom();
    let previous_bottom = bottom - *velocity_y;
    if bottom >= platform.top()
        && previous_bottom <= platform.top()
        && body.overlaps_horizontally(platform)
    {
        body.y = platform.top() - body.height;
        *velocity_y = 0.0;
        return true;
    }
    false
}

/// Push the body back under the platform if its top edge crossed the
/// platform bottom this frame. Velocity becomes `bonk_velocity` (small and
/// positive) so the body starts falling immediately.
pub fn bonk_under(
    body: &mut Rect,
    velocity_y: &mut f32,
    platform: &Rect,
    bonk_velocity: f32,
) -> bool {
    let top = body.top();
    let previous_top = top - *velocity_y;
    if top < platform.bottom()
        && previous_top >= platform.bottom()
        && body.overlaps_horizontally(platform)
    {
        body.y = platform.bottom();
        *velocity_y = bonk_velocity;
        return true;
    }
    false
}

/// While overlapping the platform, holding right pins the body to the
/// platform's left edge and holding left pins it to the right edge. With
/// both held the left push is applied last and wins.
pub fn block_sides(body: &mut Rect, platform: &Rect, intent: HorizontalIntent) -> (bool, bool) {
    if !body.intersects(platform) {
        return (false, false);
    }
    let mut blocked_right = false;
    let mut blocked_left = false;
    if intent.right {
        body.x = platform.left() - body.width;
        blocked_right = true;
    }
    if intent.left {
        body.x = platform.right();
        blocked_left = true;
    }
    (blocked_left, blocked_right)
}

/// Resolve one body against one platform with priority
/// landing > bonk > side block: a later rule only runs when no earlier rule
/// fired this frame.
pub fn resolve_platform(
    body: &mut Rect,
    velocity_y: &mut f32,
    platform: &Rect,
    intent: HorizontalIntent,
    bonk_velocity: f32,
) -> PlatformContact {
    let mut contact = PlatformContact::default();
    if land_on(body, velocity_y, platform) {
        contact.landed = true;
    } else if bonk_under(body, velocity_y, platform, bonk_velocity) {
        contact.bonked = true;
    } else {
        let (left, right) = block_sides(body, platform, intent);
        contact.blocked_left = left;
        contact.blocked_right = right;
    }
    contact
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierPush {
    ToLeft,
    ToRight,
}

/// Two-sided single-axis push-out against a barrier taller than the
/// playable range. The side is chosen against the barrier's midpoint.
pub fn push_out_of_barrier(body: &mut Rect, barrier: &Rect) -> Option<BarrierPush> {
    if !body.intersects(barrier) {
        return None;
    }
    let mid = barrier.center_x();
    if body.right() > barrier.left() && body.left() < mid {
        body.x = barrier.left() - body.width;
        Some(BarrierPush::ToLeft)
    } else if body.left() < barrier.right() && body.right() > mid {
        body.x = barrier.right();
        Some(BarrierPush::ToRight)
    } else {
        None
    }
}
