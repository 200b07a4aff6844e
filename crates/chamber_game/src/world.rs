//! Level entities: platforms, spike obstacles, the door, the one-shot pickup
//! and the end trigger. Everything here is created once at level setup and
//! lives until the session is torn down.

use glam::Vec2;
use serde::Deserialize;

use crate::collision::{land_on, Collidable, Rect, Triangle};

/// Vertical triangle-wave oscillation between two bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation {
    pub y_min: f32,
    pub y_max: f32,
    pub step: f32,
    pub moving_up: bool,
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub id: String,
    pub rect: Rect,
    pub motion: Option<Oscillation>,
}

impl Platform {
    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Move one step and return the vertical displacement. Direction flips
    /// on reaching a bound; the position never leaves `[y_min, y_max]`.
    pub fn advance(&mut self) -> f32 {
        let Some(motion) = self.motion.as_mut() else {
            return 0.0;
        };
        let before = self.rect.y;
        if motion.moving_up {
            self.rect.y = (self.rect.y - motion.step).max(motion.y_min);
            if self.rect.y <= motion.y_min {
                motion.moving_up = false;
            }
        } else {
            self.rect.y = (self.rect.y + motion.step).min(motion.y_max);
            if self.rect.y >= motion.y_max {
                motion.moving_up = true;
            }
        }
        self.rect.y - before
    }
}

/// Offsets of the tracked triangle relative to the obstacle origin: apex at
/// the origin, base `height` below it spanning `half_base` either side.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpikeShape {
    #[serde(default = "default_half_base")]
    pub half_base: f32,
    #[serde(default = "default_spike_height")]
    pub height: f32,
}

impl Default for SpikeShape {
    fn default() -> Self {
        Self {
            half_base: default_half_base(),
            height: default_spike_height(),
        }
    }
}

/// A gravity-affected spike. Its triangle is recomputed after every position
/// change so hit tests always see the current frame's geometry.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub body: Rect,
    pub velocity_y: f32,
    pub shape: SpikeShape,
    triangle: Triangle,
}

impl Obstacle {
    pub fn new(body: Rect, shape: SpikeShape) -> Self {
        let mut obstacle = Self {
            body,
            velocity_y: 0.0,
            shape,
            triangle: Triangle {
                points: [Vec2::ZERO; 3],
            },
        };
        obstacle.recompute_points();
        obstacle
    }

    pub fn triangle(&self) -> &Triangle {
        &self.triangle
    }

    fn recompute_points(&mut self) {
        let apex = Vec2::new(self.body.x, self.body.y);
        let base_y = apex.y + self.shape.height;
        self.triangle.points = [
            apex,
            Vec2::new(apex.x + self.shape.half_base, base_y),
            Vec2::new(apex.x - self.shape.half_base, base_y),
        ];
    }

    /// Fall under gravity and land on the first platform crossed. A moving
    /// platform that rose into a falling spike pushes it back onto its top.
    /// The spike never sinks below `floor`.
    pub fn step(&mut self, gravity: f32, platforms: &[Platform], floor: f32) -> bool {
        self.velocity_y += gravity;
        self.body.y += self.velocity_y;
        let mut landed = false;
        for platform in platforms {
            if land_on(&mut self.body, &mut self.velocity_y, &platform.rect) {
                landed = true;
            } else if platform.is_moving()
                && self.velocity_y >= 0.0
                && self.body.intersects(&platform.rect)
            {
                self.body.y = platform.rect.top() - self.body.height;
                self.velocity_y = 0.0;
                landed = true;
            }
        }
        if self.body.bottom() > floor {
            self.body.y = floor - self.body.height;
            self.velocity_y = 0.0;
            landed = true;
        }
        self.recompute_points();
        landed
    }

    pub fn hits(&self, body: &Rect) -> bool {
        self.triangle.touches(body)
    }
}

/// What repeated door contact does while a transition is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retrigger {
    /// The first contact arms the transition; later contacts are ignored.
    #[default]
    Once,
    /// Each fresh contact (entering the door again) restarts the countdown.
    Rearm,
}

#[derive(Debug, Clone)]
pub struct Door {
    pub rect: Rect,
    pub delay_ms: f64,
    pub next_level: Option<String>,
    pub retrigger: Retrigger,
    pub message: Option<String>,
    pub(crate) in_contact: bool,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: String,
    pub rect: Rect,
    pub asset: Option<String>,
    pub inventory_slot: Option<usize>,
    pub starts_dialogue: bool,
    pub modal: Option<String>,
    exists: bool,
}

impl Pickup {
    pub fn new(
        id: String,
        rect: Rect,
        asset: Option<String>,
        inventory_slot: Option<usize>,
        starts_dialogue: bool,
        modal: Option<String>,
    ) -> Self {
        Self {
            id,
            rect,
            asset,
            inventory_slot,
            starts_dialogue,
            modal,
            exists: true,
        }
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// True exactly once: on the first contact while the pickup exists.
    pub fn collect(&mut self, body: &Rect) -> bool {
        if !self.exists || !self.rect.intersects(body) {
            return false;
        }
        self.exists = false;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeConfig {
    pub step: f32,
    pub interval_ms: f64,
    pub hold_ms: f64,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            step: 0.02,
            interval_ms: 100.0,
            hold_ms: 7000.0,
        }
    }
}

/// Terminal trigger: ends the game with a fade to black.
#[derive(Debug, Clone)]
pub struct EndTrigger {
    pub rect: Rect,
    pub target: String,
    pub sound: Option<String>,
    pub fade: FadeConfig,
    armed: bool,
}

impl EndTrigger {
    pub fn new(rect: Rect, target: String, sound: Option<String>, fade: FadeConfig) -> Self {
        Self {
            rect,
            target,
            sound,
            fade,
            armed: true,
        }
    }

    pub fn fire(&mut self, body: &Rect) -> bool {
        if !self.armed || !self.rect.intersects(body) {
            return false;
        }
        self.armed = false;
        true
    }
}

const fn default_half_base() -> f32 {
    10.0
}

const fn default_spike_height() -> f32 {
    20.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving(y: f32, y_min: f32, y_max: f32, moving_up: bool) -> Platform {
        Platform {
            id: "lift".to_string(),
            rect: Rect::new(670.0, y, 150.0, 20.0),
            motion: Some(Oscillation {
                y_min,
                y_max,
                step: 1.0,
                moving_up,
            }),
        }
    }

    #[test]
    fn static_platform_does_not_move() {
        let mut p = Platform {
            id: "ground".to_string(),
            rect: Rect::new(0.0, 760.0, 1280.0, 40.0),
            motion: None,
        };
        assert_eq!(p.advance(), 0.0);
        assert_eq!(p.rect.y, 760.0);
    }

    #[test]
    fn oscillation_stays_in_bounds_and_reverses_at_them() {
        let mut p = moving(450.0, 400.0, 500.0, true);
        let mut reversals = Vec::new();
        let mut last_up = true;
        for _ in 0..1000 {
            p.advance();
            assert!(p.rect.y >= 400.0 && p.rect.y <= 500.0);
            let up = p.motion.expect("moving").moving_up;
            if up != last_up {
                reversals.push(p.rect.y);
                last_up = up;
            }
        }
        assert!(!reversals.is_empty());
        for y in reversals {
            assert!(y == 400.0 || y == 500.0, "reversed at {y}");
        }
    }

    #[test]
    fn oscillation_never_overshoots_with_uneven_step() {
        let mut p = moving(405.0, 400.0, 500.0, true);
        if let Some(m) = p.motion.as_mut() {
            m.step = 3.0;
        }
        for _ in 0..500 {
            p.advance();
            assert!(p.rect.y >= 400.0 && p.rect.y <= 500.0);
        }
    }

    #[test]
    fn obstacle_falls_and_lands_with_points_tracking() {
        let platforms = vec![Platform {
            id: "p".to_string(),
            rect: Rect::new(200.0, 350.0, 300.0, 30.0),
            motion: None,
        }];
        let mut spike = Obstacle::new(Rect::new(300.0, 300.0, 30.0, 30.0), SpikeShape::default());
        let mut landed = false;
        for _ in 0..30 {
            landed |= spike.step(0.6, &platforms, 800.0);
        }
        assert!(landed);
        assert_eq!(spike.body.bottom(), 350.0);
        assert_eq!(spike.velocity_y, 0.0);
        let [apex, right, left] = spike.triangle().points;
        assert_eq!(apex, Vec2::new(300.0, 320.0));
        assert_eq!(right, Vec2::new(310.0, 340.0));
        assert_eq!(left, Vec2::new(290.0, 340.0));
    }

    #[test]
    fn obstacle_stays_on_rising_lift() {
        let mut platforms = vec![moving(450.0, 400.0, 500.0, true)];
        let mut spike = Obstacle::new(Rect::new(700.0, 300.0, 30.0, 30.0), SpikeShape::default());
        for tick in 0..600 {
            spike.step(0.6, &platforms, 800.0);
            platforms[0].advance();
            let lift = platforms[0].rect;
            assert!(
                spike.body.bottom() <= lift.top() + 1.0 + 1e-3,
                "tick {tick}: spike bottom {} below lift top {}",
                spike.body.bottom(),
                lift.top()
            );
        }
        assert!(spike.body.bottom() >= 399.0 && spike.body.bottom() <= 501.0);
        assert_eq!(spike.triangle().points[0].y, spike.body.y);
    }

    #[test]
    fn unsupported_obstacle_rests_on_world_floor() {
        let mut spike = Obstacle::new(Rect::new(300.0, 100.0, 30.0, 30.0), SpikeShape::default());
        for _ in 0..200 {
            spike.step(0.6, &[], 800.0);
        }
        assert_eq!(spike.body.bottom(), 800.0);
        assert_eq!(spike.velocity_y, 0.0);
        assert_eq!(spike.triangle().points[0], Vec2::new(300.0, 770.0));
    }

    #[test]
    fn pickup_collects_only_once() {
        let mut letter = Pickup::new(
            "letter".to_string(),
            Rect::new(125.0, 245.0, 30.0, 30.0),
            None,
            Some(1),
            true,
            None,
        );
        let body = Rect::new(110.0, 200.0, 50.0, 80.0);
        assert!(letter.collect(&body));
        assert!(!letter.exists());
        assert!(!letter.collect(&body));
    }

    #[test]
    fn end_trigger_fires_once() {
        let mut metal = EndTrigger::new(
            Rect::new(1152.0, 640.0, 50.0, 100.0),
            "credits.html".to_string(),
            None,
            FadeConfig::default(),
        );
        let away = Rect::new(100.0, 680.0, 50.0, 80.0);
        assert!(!metal.fire(&away));
        let touching = Rect::new(1120.0, 680.0, 50.0, 80.0);
        assert!(metal.fire(&touching));
        assert!(!metal.fire(&touching));
    }
}
