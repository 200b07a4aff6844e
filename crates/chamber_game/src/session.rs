//! One playable level: owns every entity, the animation player and the timer
//! scheduler, and runs the update loop one fixed tick at a time.
//!
//! Tick order:
//!
//! 1. fire due timers (idle debounce, door transition, fade steps)
//! 2. jump, horizontal movement, animation selection
//! 3. gravity, floor clamp, platform resolution, barriers
//! 4. obstacles fall and recompute their triangles
//! 5. moving platforms advance and carry a standing actor
//! 6. hazard check; a hit respawns the actor and skips step 7
//! 7. door, pickup and end trigger
//! 8. animation advance and stage sync
//!
//! Timers only fire at the start of a tick, so no callback interleaves with
//! the simulation. Dropping or tearing down the session cancels them all.

use chamber_core::{AnimationPlayer, FrameSet, InputState, Key, Scheduler, TimerId};

use crate::collision::Rect;
use crate::controller::{Actor, ControllerConfig, ControllerInput};
use crate::dialogue::{DialogueCursor, DialogueStep};
use crate::hooks::{LevelHost, Narrative, NodeId, Stage};
use crate::level::{AnimationSets, LevelFile, StartDirection};
use crate::world::{
    Door, EndTrigger, FadeConfig, Obstacle, Oscillation, Pickup, Platform, Retrigger,
};

const LEFT_KEYS: [Key; 2] = [Key::Left, Key::A];
const RIGHT_KEYS: [Key; 2] = [Key::Right, Key::D];
const JUMP_KEYS: [Key; 3] = [Key::Space, Key::Up, Key::W];

/// Tolerance for "standing on" a moving platform.
const STANDING_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationSet {
    Run,
    Idle,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEvent {
    IdleTimeout,
    LevelTransition,
    FadeStep,
    EndGame,
}

/// Sample the key-state map once for this tick.
pub fn sample_input(input: &InputState) -> ControllerInput {
    ControllerInput {
        left: input.any_held(&LEFT_KEYS),
        right: input.any_held(&RIGHT_KEYS),
        jump_pressed: input.any_just_pressed(&JUMP_KEYS),
        jump_held: input.any_held(&JUMP_KEYS),
    }
}

pub struct LevelSession {
    level_id: String,
    actor: Actor,
    platforms: Vec<Platform>,
    barriers: Vec<Rect>,
    obstacles: Vec<Obstacle>,
    door: Option<Door>,
    pickup: Option<Pickup>,
    end_trigger: Option<EndTrigger>,
    hazard_message: Option<String>,

    animations: AnimationSets,
    player: AnimationPlayer<AnimationSet>,
    idle_shown: bool,
    idle_timeout_ms: Option<f64>,

    dialogue: DialogueCursor,

    scheduler: Scheduler<SessionEvent>,
    idle_timer: Option<TimerId>,
    door_timer: Option<TimerId>,
    fade_timer: Option<TimerId>,
    fade_steps: u32,

    tick_ms: f64,
    now_ms: f64,
    game_ended: bool,
    finished: bool,
}

impl LevelSession {
    pub fn new(level: &LevelFile, tick_ms: f64) -> Self {
        let config = ControllerConfig {
            speed: level.physics.speed,
            gravity: level.physics.gravity,
            jump_impulse: level.physics.jump_impulse,
            bonk_velocity: level.physics.bonk_velocity,
            world_width: level.world.width,
            world_height: level.world.height,
        };
        let actor = Actor::new(
            level.actor.spawn,
            level.actor.width,
            level.actor.height,
            level.actor.facing,
            config,
        );

        let platforms = level
            .platforms
            .iter()
            .map(|def| Platform {
                id: def.id.clone(),
                rect: def.rect,
                motion: def.motion.map(|m| Oscillation {
                    y_min: m.y_min,
                    y_max: m.y_max,
                    step: m.step,
                    moving_up: m.start == StartDirection::Up,
                }),
            })
            .collect();

        let obstacles = level
            .obstacles
            .iter()
            .map(|def| Obstacle::new(def.rect, def.shape))
            .collect();

        let door = level.door.as_ref().map(|def| Door {
            rect: def.rect,
            delay_ms: def.delay_ms,
            next_level: def.next_level.clone(),
            retrigger: def.retrigger,
            message: def.message.clone(),
            in_contact: false,
        });

        let pickup = level.pickup.as_ref().map(|def| {
            Pickup::new(
                def.id.clone(),
                def.rect,
                def.asset.clone(),
                def.inventory_slot,
                def.dialogue,
                def.modal.clone(),
            )
        });

        let end_trigger = level.end_trigger.as_ref().map(|def| {
            EndTrigger::new(
                def.rect,
                def.target.clone(),
                def.sound.clone(),
                FadeConfig {
                    step: def.fade.step,
                    interval_ms: def.fade.interval_ms,
                    hold_ms: def.fade.hold_ms,
                },
            )
        });

        let mut player = AnimationPlayer::new(AnimationSet::Run, &level.animations.run);
        player.stop();

        log::info!(
            "Level '{}' ready: {} platform(s), {} barrier(s), {} obstacle(s)",
            level.level_id,
            level.platforms.len(),
            level.barriers.len(),
            level.obstacles.len()
        );

        Self {
            level_id: level.level_id.clone(),
            actor,
            platforms,
            barriers: level.barriers.clone(),
            obstacles,
            door,
            pickup,
            end_trigger,
            hazard_message: level.hazard_message.clone(),
            animations: level.animations.clone(),
            player,
            idle_shown: false,
            idle_timeout_ms: level.idle_timeout_ms,
            dialogue: DialogueCursor::new(level.dialogue.clone()),
            scheduler: Scheduler::new(),
            idle_timer: None,
            door_timer: None,
            fade_timer: None,
            fade_steps: 0,
            tick_ms,
            now_ms: 0.0,
            game_ended: false,
            finished: false,
        }
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn pickup(&self) -> Option<&Pickup> {
        self.pickup.as_ref()
    }

    pub fn animation(&self) -> &AnimationPlayer<AnimationSet> {
        &self.player
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn is_game_ended(&self) -> bool {
        self.game_ended
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Create every visual node on the stage.
    pub fn attach(&self, stage: &mut impl Stage) {
        stage.attach(NodeId::Actor, self.actor.body, None);
        stage.swap_frame_set(NodeId::Actor, frames_for(&self.animations, self.player.active()));
        stage.set_playing(NodeId::Actor, self.player.is_playing());
        stage.set_facing(NodeId::Actor, self.actor.facing);
        for (index, platform) in self.platforms.iter().enumerate() {
            stage.attach(NodeId::Platform(index), platform.rect, None);
        }
        for (index, barrier) in self.barriers.iter().enumerate() {
            stage.attach(NodeId::Barrier(index), *barrier, None);
        }
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            stage.attach(NodeId::Obstacle(index), obstacle.body, None);
        }
        if let Some(door) = &self.door {
            stage.attach(NodeId::Door, door.rect, None);
        }
        if let Some(pickup) = &self.pickup {
            stage.attach(NodeId::Pickup, pickup.rect, pickup.asset.as_deref());
        }
        if let Some(end) = &self.end_trigger {
            stage.attach(NodeId::EndTrigger, end.rect, None);
        }
    }

    /// Cancel every timer and remove the level's nodes. The session is
    /// finished afterwards and further ticks do nothing.
    pub fn teardown(&mut self, stage: &mut impl Stage) {
        self.scheduler.cancel_all();
        self.idle_timer = None;
        self.door_timer = None;
        self.fade_timer = None;
        stage.detach(NodeId::Actor);
        for index in 0..self.platforms.len() {
            stage.detach(NodeId::Platform(index));
        }
        for index in 0..self.barriers.len() {
            stage.detach(NodeId::Barrier(index));
        }
        for index in 0..self.obstacles.len() {
            stage.detach(NodeId::Obstacle(index));
        }
        if self.door.is_some() {
            stage.detach(NodeId::Door);
        }
        if self.pickup.as_ref().is_some_and(Pickup::exists) {
            stage.detach(NodeId::Pickup);
        }
        if self.end_trigger.is_some() {
            stage.detach(NodeId::EndTrigger);
        }
        self.finished = true;
        log::debug!("Level '{}' torn down", self.level_id);
    }

    /// Show the next dialogue line, or close the dialogue after the last.
    pub fn advance_dialogue(&mut self, narrative: &mut impl Narrative) {
        match self.dialogue.advance() {
            Some(DialogueStep::Show { line, has_next }) => {
                report("show_dialogue", narrative.show_dialogue(line, has_next));
            }
            Some(DialogueStep::Closed) => report("close_dialogue", narrative.close_dialogue()),
            None => {}
        }
    }

    pub fn tick<H: LevelHost>(&mut self, input: &InputState, host: &mut H) {
        if self.finished {
            return;
        }
        let controls = sample_input(input);

        self.now_ms += self.tick_ms;
        self.fire_timers(controls, host);
        if self.finished {
            return;
        }
        if self.game_ended {
            self.sync_stage(host);
            return;
        }

        if self.actor.try_jump(controls) {
            self.cancel_idle_timer();
            self.idle_shown = false;
            self.show_set(AnimationSet::Jump, host);
            log::trace!("Jump at {:.0}ms", self.now_ms);
        }

        let step = self.actor.step_horizontal(controls);
        if step.turned {
            host.set_facing(NodeId::Actor, self.actor.facing);
        }
        self.select_animation(step.moved, host);

        self.actor.integrate_gravity();
        let mut supported = self.actor.clamp_to_floor();
        let contact = self
            .actor
            .resolve_platforms(self.platforms.iter().map(|p| &p.rect), controls);
        supported |= contact.landed;
        if contact.bonked {
            log::trace!("Bonked a platform from below");
        }
        self.actor.resolve_barriers(self.barriers.iter());

        let (gravity, floor) = (self.actor.config.gravity, self.actor.config.world_height);
        for obstacle in &mut self.obstacles {
            obstacle.step(gravity, &self.platforms, floor);
        }

        supported |= self.carry_on_moving_platforms();

        if self.actor.settle(supported) {
            log::trace!("Landed at y={:.1}", self.actor.body.y);
            if !self.idle_shown {
                self.show_set(AnimationSet::Run, host);
                if !step.moved {
                    self.set_playing(false, host);
                }
            }
            if !controls.any_horizontal() {
                self.restart_idle_timer();
            }
        }

        if self.obstacles.iter().any(|o| o.hits(&self.actor.body)) {
            self.actor.respawn();
            log::debug!("Hazard hit in '{}', respawning", self.level_id);
            if let Some(message) = &self.hazard_message {
                report("show_status", host.show_status(message));
            }
        } else {
            self.check_door(host);
            self.check_pickup(host);
            self.check_end_trigger(host);
        }

        self.player.tick();
        self.sync_stage(host);
    }

    fn fire_timers<H: LevelHost>(&mut self, controls: ControllerInput, host: &mut H) {
        for (id, event) in self.scheduler.poll(self.now_ms) {
            log::trace!("Timer {id:?} fired: {event:?}");
            match event {
                SessionEvent::IdleTimeout => {
                    self.idle_timer = None;
                    if self.actor.is_grounded() && !controls.any_horizontal() {
                        self.idle_shown = true;
                        self.show_set(AnimationSet::Idle, host);
                    }
                }
                SessionEvent::LevelTransition => {
                    self.door_timer = None;
                    let target = self.door.as_ref().and_then(|d| d.next_level.clone());
                    match target {
                        Some(target) => {
                            log::info!("Level '{}' complete, leaving for {target}", self.level_id);
                            report("go_to_next_level", host.go_to_next_level(&target));
                        }
                        None => log::warn!(
                            "Level '{}' door has no next level; staying put",
                            self.level_id
                        ),
                    }
                    self.finish();
                    return;
                }
                SessionEvent::FadeStep => self.fade_step(host),
                SessionEvent::EndGame => {
                    if let Some(end) = &self.end_trigger {
                        log::info!("Game over, handing off to {}", end.target);
                        report("end_game", host.end_game(&end.target));
                    }
                    self.finish();
                    return;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.idle_timer = None;
        self.door_timer = None;
        self.fade_timer = None;
        self.finished = true;
    }

    fn select_animation(&mut self, moved: bool, stage: &mut impl Stage) {
        let grounded = self.actor.is_grounded();
        if moved {
            if grounded || self.idle_shown {
                self.idle_shown = false;
                self.show_set(AnimationSet::Run, stage);
            }
            if self.idle_timeout_ms.is_some() {
                self.restart_idle_timer();
            }
        } else if grounded && !self.idle_shown && self.player.is_playing() {
            self.set_playing(false, stage);
        }
    }

    fn show_set(&mut self, set: AnimationSet, stage: &mut impl Stage) {
        let frames = frames_for(&self.animations, set);
        if self.player.switch_to(set, frames) {
            log::debug!("Animation -> {set:?}");
            stage.swap_frame_set(NodeId::Actor, frames);
        }
        stage.set_playing(NodeId::Actor, true);
    }

    fn set_playing(&mut self, playing: bool, stage: &mut impl Stage) {
        if playing {
            self.player.play();
        } else {
            self.player.stop();
        }
        stage.set_playing(NodeId::Actor, playing);
    }

    fn cancel_idle_timer(&mut self) {
        if let Some(id) = self.idle_timer.take() {
            self.scheduler.cancel(id);
        }
    }

    /// Debounce: every call pushes the idle switch a full timeout away.
    fn restart_idle_timer(&mut self) {
        let Some(delay) = self.idle_timeout_ms else {
            return;
        };
        self.cancel_idle_timer();
        self.idle_timer = Some(
            self.scheduler
                .schedule_once(self.now_ms, delay, SessionEvent::IdleTimeout),
        );
    }

    /// Advance moving platforms and carry the actor if it stands on one.
    /// Returns whether the actor is riding.
    fn carry_on_moving_platforms(&mut self) -> bool {
        self.actor.riding = false;
        for platform in self.platforms.iter_mut().filter(|p| p.is_moving()) {
            let top_before = platform.rect.top();
            let dy = platform.advance();
            let body = &mut self.actor.body;
            let standing = (body.bottom() - top_before).abs() < STANDING_EPSILON
                && body.overlaps_horizontally(&platform.rect)
                && self.actor.velocity_y >= 0.0;
            if standing {
                body.y += dy;
            } else if body.intersects(&platform.rect) && self.actor.velocity_y >= 0.0 {
                body.y = platform.rect.top() - body.height;
            } else {
                continue;
            }
            self.actor.velocity_y = 0.0;
            self.actor.riding = true;
        }
        self.actor.riding
    }

    fn check_door(&mut self, narrative: &mut impl Narrative) {
        let Some(door) = self.door.as_mut() else {
            return;
        };
        let touching = door.rect.intersects(&self.actor.body);
        let entered = touching && !door.in_contact;
        door.in_contact = touching;
        if !entered {
            return;
        }
        if let Some(pending) = self.door_timer {
            match door.retrigger {
                Retrigger::Once => return,
                Retrigger::Rearm => {
                    self.scheduler.cancel(pending);
                }
            }
        }
        self.door_timer = Some(self.scheduler.schedule_once(
            self.now_ms,
            door.delay_ms,
            SessionEvent::LevelTransition,
        ));
        log::info!(
            "Door reached in '{}', leaving in {}ms",
            self.level_id,
            door.delay_ms
        );
        if let Some(message) = &door.message {
            report("show_status", narrative.show_status(message));
        }
    }

    fn check_pickup<H: LevelHost>(&mut self, host: &mut H) {
        let Some(pickup) = self.pickup.as_mut() else {
            return;
        };
        if !pickup.collect(&self.actor.body) {
            return;
        }
        let collected = pickup.clone();
        log::info!("Picked up '{}'", collected.id);
        host.detach(NodeId::Pickup);
        if collected.starts_dialogue {
            self.start_dialogue(host);
        }
        if let Some(message) = &collected.modal {
            report("show_modal", host.show_modal(message));
        }
        if let Some(slot) = collected.inventory_slot {
            report(
                "mark_inventory_slot",
                host.mark_inventory_slot(slot, collected.asset.as_deref()),
            );
        }
    }

    fn check_end_trigger<H: LevelHost>(&mut self, host: &mut H) {
        let Some(end) = self.end_trigger.as_mut() else {
            return;
        };
        if !end.fire(&self.actor.body) {
            return;
        }
        let (interval_ms, sound) = (end.fade.interval_ms, end.sound.clone());
        log::info!("End trigger reached in '{}'", self.level_id);
        self.game_ended = true;
        self.cancel_idle_timer();
        self.set_playing(false, host);
        self.start_dialogue(host);
        if let Some(sound) = sound {
            host.play_sound(&sound);
        }
        self.fade_timer = Some(self.scheduler.schedule_repeating(
            self.now_ms,
            interval_ms,
            SessionEvent::FadeStep,
        ));
    }

    fn fade_step(&mut self, stage: &mut impl Stage) {
        let Some(end) = &self.end_trigger else {
            return;
        };
        let fade = end.fade;
        self.fade_steps += 1;
        let opacity = self.fade_steps as f32 * fade.step;
        let complete = opacity >= 1.0 - 1e-4;
        stage.set_overlay_opacity(if complete { 1.0 } else { opacity });
        if complete {
            if let Some(id) = self.fade_timer.take() {
                self.scheduler.cancel(id);
            }
            self.scheduler
                .schedule_once(self.now_ms, fade.hold_ms, SessionEvent::EndGame);
            log::debug!("Fade complete, holding for {}ms", fade.hold_ms);
        }
    }

    fn start_dialogue(&mut self, narrative: &mut impl Narrative) {
        if let Some(DialogueStep::Show { line, has_next }) = self.dialogue.start() {
            report("show_dialogue", narrative.show_dialogue(line, has_next));
        }
    }

    fn sync_stage(&self, stage: &mut impl Stage) {
        stage.move_node(NodeId::Actor, self.actor.body);
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            stage.move_node(NodeId::Obstacle(index), obstacle.body);
        }
        for (index, platform) in self.platforms.iter().enumerate() {
            if platform.is_moving() {
                stage.move_node(NodeId::Platform(index), platform.rect);
            }
        }
    }
}

fn frames_for(sets: &AnimationSets, set: AnimationSet) -> &FrameSet {
    match set {
        AnimationSet::Run => &sets.run,
        AnimationSet::Idle => &sets.idle,
        AnimationSet::Jump => &sets.jump,
    }
}

/// Boundary failures never stop the tick.
fn report(call: &str, result: Result<(), String>) {
    if let Err(err) = result {
        log::warn!("{call} failed: {err}");
    }
}
