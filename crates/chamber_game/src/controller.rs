use glam::Vec2;
use serde::Deserialize;

use crate::collision::{
    push_out_of_barrier, resolve_platform, BarrierPush, HorizontalIntent, PlatformContact, Rect,
};

/// One tick's worth of sampled input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerInput {
    pub left: bool,
    pub right: bool,
    pub jump_pressed: bool,
    pub jump_held: bool,
}

impl ControllerInput {
    pub fn intent(&self) -> HorizontalIntent {
        HorizontalIntent {
            left: self.left,
            right: self.right,
        }
    }

    pub fn any_horizontal(&self) -> bool {
        self.left || self.right
    }
}

/// Per-level tuning. All values are per tick.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub speed: f32,
    pub gravity: f32,
    /// Upward launch speed; zero disables jumping.
    pub jump_impulse: f32,
    pub bonk_velocity: f32,
    pub world_width: f32,
    pub world_height: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            gravity: 1.0,
            jump_impulse: 15.0,
            bonk_velocity: 1.0,
            world_width: 1280.0,
            world_height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// What the horizontal phase did this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HorizontalStep {
    pub moved: bool,
    pub turned: bool,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub body: Rect,
    pub velocity_y: f32,
    pub airborne: bool,
    /// Carried by a moving platform: gravity is skipped while set.
    pub riding: bool,
    pub facing: Facing,
    pub spawn: Vec2,
    pub config: ControllerConfig,
}

impl Actor {
    pub fn new(
        spawn: Vec2,
        width: f32,
        height: f32,
        facing: Facing,
        config: ControllerConfig,
    ) -> Self {
        Self {
            body: Rect::new(spawn.x, spawn.y, width, height),
            velocity_y: 0.0,
            airborne: false,
            riding: false,
            facing,
            spawn,
            config,
        }
    }

    /// Launch if grounded and jump was pressed this tick, or held while
    /// riding a moving platform.
    pub fn try_jump(&mut self, input: ControllerInput) -> bool {
        if self.config.jump_impulse <= 0.0 || self.airborne {
            return false;
        }
        if !(input.jump_pressed || (self.riding && input.jump_held)) {
            return false;
        }
        self.velocity_y = -self.config.jump_impulse;
        self.airborne = true;
        self.riding = false;
        true
    }

    /// Apply held direction at constant speed, clamped to the world.
    pub fn step_horizontal(&mut self, input: ControllerInput) -> HorizontalStep {
        let mut step = HorizontalStep::default();
        let max_x = self.config.world_width - self.body.width;

        if input.left && self.body.x > 0.0 {
            self.body.x = (self.body.x - self.config.speed).max(0.0);
            step.moved = true;
            step.turned |= self.face(Facing::Left);
        }
        if input.right && self.body.x < max_x {
            self.body.x = (self.body.x + self.config.speed).min(max_x);
            step.moved = true;
            step.turned |= self.face(Facing::Right);
        }
        step
    }

    fn face(&mut self, facing: Facing) -> bool {
        let turned = self.facing != facing;
        self.facing = facing;
        turned
    }

    pub fn integrate_gravity(&mut self) {
        if self.riding {
            return;
        }
        self.velocity_y += self.config.gravity;
        self.body.y += self.velocity_y;
    }

    /// World floor fallback for levels without a ground rectangle.
    pub fn clamp_to_floor(&mut self) -> bool {
        let floor = self.config.world_height;
        if self.body.bottom() > floor {
            self.body.y = floor - self.body.height;
            self.velocity_y = 0.0;
            return true;
        }
        false
    }

    /// Resolve against every platform in order. Returns the merged contacts.
    pub fn resolve_platforms<'a>(
        &mut self,
        platforms: impl IntoIterator<Item = &'a Rect>,
        input: ControllerInput,
    ) -> PlatformContact {
        let mut merged = PlatformContact::default();
        for platform in platforms {
            let contact = resolve_platform(
                &mut self.body,
                &mut self.velocity_y,
                platform,
                input.intent(),
                self.config.bonk_velocity,
            );
            merged.landed |= contact.landed;
            merged.bonked |= contact.bonked;
            merged.blocked_left |= contact.blocked_left;
            merged.blocked_right |= contact.blocked_right;
        }
        merged
    }

    pub fn resolve_barriers<'a>(
        &mut self,
        barriers: impl IntoIterator<Item = &'a Rect>,
    ) -> Option<BarrierPush> {
        let mut last = None;
        for barrier in barriers {
            if let Some(push) = push_out_of_barrier(&mut self.body, barrier) {
                last = Some(push);
            }
        }
        last
    }

    /// Settle the grounded flag at the end of the physics phases. Returns
    /// true when the actor touched down this tick.
    pub fn settle(&mut self, supported: bool) -> bool {
        let was_airborne = self.airborne;
        if supported {
            self.velocity_y = 0.0;
            self.airborne = false;
        } else {
            self.airborne = true;
        }
        was_airborne && supported
    }

    pub fn respawn(&mut self) {
        self.body.x = self.spawn.x;
        self.body.y = self.spawn.y;
        self.velocity_y = 0.0;
        self.airborne = false;
        self.riding = false;
    }

    pub fn is_grounded(&self) -> bool {
        !self.airborne
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_at(x: f32, y: f32) -> Actor {
        Actor::new(
            Vec2::new(x, y),
            50.0,
            80.0,
            Facing::Right,
            ControllerConfig::default(),
        )
    }

    fn held_right() -> ControllerInput {
        ControllerInput {
            right: true,
            ..Default::default()
        }
    }

    #[test]
    fn horizontal_step_is_clamped_to_world() {
        let mut actor = actor_at(2.0, 100.0);
        let step = actor.step_horizontal(ControllerInput {
            left: true,
            ..Default::default()
        });
        assert!(step.moved);
        assert!(step.turned);
        assert_eq!(actor.body.x, 0.0);
        assert_eq!(actor.facing, Facing::Left);

        let step = actor.step_horizontal(ControllerInput {
            left: true,
            ..Default::default()
        });
        assert!(!step.moved);

        let mut actor = actor_at(1228.0, 100.0);
        actor.step_horizontal(held_right());
        assert_eq!(actor.body.right(), 1280.0);
    }

    #[test]
    fn facing_only_reports_turn_on_change() {
        let mut actor = actor_at(100.0, 100.0);
        assert!(!actor.step_horizontal(held_right()).turned);
        assert!(!actor.step_horizontal(held_right()).turned);
    }

    #[test]
    fn jump_only_activates_when_grounded() {
        let mut actor = actor_at(100.0, 100.0);
        let press = ControllerInput {
            jump_pressed: true,
            jump_held: true,
            ..Default::default()
        };
        assert!(actor.try_jump(press));
        assert_eq!(actor.velocity_y, -15.0);
        assert!(actor.airborne);
        assert!(!actor.try_jump(press));
    }

    #[test]
    fn held_jump_only_launches_while_riding() {
        let mut actor = actor_at(100.0, 100.0);
        let held = ControllerInput {
            jump_held: true,
            ..Default::default()
        };
        assert!(!actor.try_jump(held));
        actor.riding = true;
        assert!(actor.try_jump(held));
        assert!(!actor.riding);
    }

    #[test]
    fn zero_impulse_disables_jumping() {
        let mut actor = actor_at(100.0, 100.0);
        actor.config.jump_impulse = 0.0;
        assert!(!actor.try_jump(ControllerInput {
            jump_pressed: true,
            ..Default::default()
        }));
    }

    #[test]
    fn gravity_is_skipped_while_riding() {
        let mut actor = actor_at(100.0, 100.0);
        actor.integrate_gravity();
        assert_eq!(actor.velocity_y, 1.0);
        assert_eq!(actor.body.y, 101.0);

        actor.riding = true;
        actor.integrate_gravity();
        assert_eq!(actor.body.y, 101.0);
    }

    #[test]
    fn floor_clamp_snaps_bottom_to_world_height() {
        let mut actor = actor_at(100.0, 730.0);
        actor.velocity_y = 12.0;
        assert!(actor.clamp_to_floor());
        assert_eq!(actor.body.bottom(), 800.0);
        assert_eq!(actor.velocity_y, 0.0);
    }

    #[test]
    fn falls_and_lands_on_platform_then_stays() {
        let platforms = [Rect::new(0.0, 500.0, 400.0, 30.0)];
        let mut actor = actor_at(100.0, 300.0);
        let mut landed_at = None;
        for tick in 0..60 {
            actor.integrate_gravity();
            let contact = actor.resolve_platforms(platforms.iter(), ControllerInput::default());
            if actor.settle(contact.landed) {
                landed_at = Some(tick);
            }
        }
        assert!(landed_at.is_some());
        assert_eq!(actor.body.bottom(), 500.0);
        assert!(actor.is_grounded());
    }

    #[test]
    fn respawn_resets_kinematics() {
        let mut actor = actor_at(100.0, 500.0);
        actor.body.x = 640.0;
        actor.body.y = 200.0;
        actor.velocity_y = 9.0;
        actor.airborne = true;
        actor.respawn();
        assert_eq!(actor.body.x, 100.0);
        assert_eq!(actor.body.y, 500.0);
        assert_eq!(actor.velocity_y, 0.0);
        assert!(!actor.airborne);
    }

    #[test]
    fn deterministic_sequence_reaches_same_final_state() {
        let platforms = [
            Rect::new(0.0, 760.0, 1280.0, 40.0),
            Rect::new(300.0, 600.0, 200.0, 30.0),
        ];
        let mut inputs = Vec::new();
        inputs.extend(std::iter::repeat(held_right()).take(40));
        inputs.push(ControllerInput {
            right: true,
            jump_pressed: true,
            jump_held: true,
            ..Default::default()
        });
        inputs.extend(std::iter::repeat(held_right()).take(80));

        let run = |mut actor: Actor| {
            for input in &inputs {
                actor.try_jump(*input);
                actor.step_horizontal(*input);
                actor.integrate_gravity();
                let contact = actor.resolve_platforms(platforms.iter(), *input);
                actor.settle(contact.landed);
            }
            actor
        };
        let a = run(actor_at(100.0, 600.0));
        let b = run(actor_at(100.0, 600.0));
        assert_eq!(a.body, b.body);
        assert_eq!(a.velocity_y, b.velocity_y);
        assert_eq!(a.airborne, b.airborne);
    }
}
