use chamber_core::FrameSet;
use glam::Vec2;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::collision::Rect;
use crate::controller::Facing;
use crate::dialogue::DialogueLine;
use crate::world::{Retrigger, SpikeShape};

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    #[serde(default)]
    pub world: WorldBounds,
    #[serde(default)]
    pub physics: Physics,
    pub actor: LevelActor,
    pub animations: AnimationSets,
    /// Delay before a grounded, motionless actor switches to the idle set.
    #[serde(default)]
    pub idle_timeout_ms: Option<f64>,
    #[serde(default)]
    pub platforms: Vec<LevelPlatform>,
    #[serde(default)]
    pub barriers: Vec<Rect>,
    #[serde(default)]
    pub obstacles: Vec<LevelObstacle>,
    #[serde(default)]
    pub door: Option<LevelDoor>,
    #[serde(default)]
    pub pickup: Option<LevelPickup>,
    #[serde(default)]
    pub end_trigger: Option<LevelEndTrigger>,
    #[serde(default)]
    pub hazard_message: Option<String>,
    #[serde(default = "default_inventory_slots")]
    pub inventory_slots: usize,
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Physics {
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_jump_impulse")]
    pub jump_impulse: f32,
    #[serde(default = "default_bonk_velocity")]
    pub bonk_velocity: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            speed: default_speed(),
            jump_impulse: default_jump_impulse(),
            bonk_velocity: default_bonk_velocity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelActor {
    pub spawn: Vec2,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub facing: Facing,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnimationSets {
    pub run: FrameSet,
    pub idle: FrameSet,
    pub jump: FrameSet,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StartDirection {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LevelMotion {
    pub y_min: f32,
    pub y_max: f32,
    #[serde(default = "default_motion_step")]
    pub step: f32,
    #[serde(default)]
    pub start: StartDirection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelPlatform {
    pub id: String,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub motion: Option<LevelMotion>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelObstacle {
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub shape: SpikeShape,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelDoor {
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default = "default_door_delay_ms")]
    pub delay_ms: f64,
    #[serde(default)]
    pub next_level: Option<String>,
    #[serde(default)]
    pub retrigger: Retrigger,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelPickup {
    pub id: String,
    #[serde(flatten)]
    pub rect: Rect,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub inventory_slot: Option<usize>,
    /// Start the level dialogue on pickup.
    #[serde(default)]
    pub dialogue: bool,
    #[serde(default)]
    pub modal: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LevelFade {
    #[serde(default = "default_fade_step")]
    pub step: f32,
    #[serde(default = "default_fade_interval_ms")]
    pub interval_ms: f64,
    #[serde(default = "default_fade_hold_ms")]
    pub hold_ms: f64,
}

impl Default for LevelFade {
    fn default() -> Self {
        Self {
            step: default_fade_step(),
            interval_ms: default_fade_interval_ms(),
            hold_ms: default_fade_hold_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LevelEndTrigger {
    #[serde(flatten)]
    pub rect: Rect,
    pub target: String,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub fade: LevelFade,
}

/// Polls a level file's modification time between frames.
pub struct LevelWatcher {
    level_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LevelWatcher {
    pub fn new(level_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&level_path);
        Self {
            level_path,
            last_seen_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.level_path
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.level_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

pub fn load_level_from_path(level_path: &Path) -> Result<LevelFile, String> {
    let raw = fs::read_to_string(level_path)
        .map_err(|e| format!("Failed to read level file {}: {e}", level_path.display()))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", level_path.display()))?;
    validate_level(&level)?;
    Ok(level)
}

fn validate_level(level: &LevelFile) -> Result<(), String> {
    let fail = |msg: String| Err(format!("Level validation failed: {msg}"));

    if level.world.width <= 0.0 || level.world.height <= 0.0 {
        return fail("world size must be > 0".to_string());
    }
    if level.physics.speed < 0.0 || level.physics.jump_impulse < 0.0 {
        return fail("speed and jump_impulse must be >= 0".to_string());
    }

    let actor = &level.actor;
    if actor.width <= 0.0 || actor.height <= 0.0 {
        return fail("actor size must be > 0".to_string());
    }
    if actor.spawn.x < 0.0
        || actor.spawn.y < 0.0
        || actor.spawn.x + actor.width > level.world.width
        || actor.spawn.y + actor.height > level.world.height
    {
        return fail(format!(
            "actor spawn ({}, {}) lies outside the {}x{} world",
            actor.spawn.x, actor.spawn.y, level.world.width, level.world.height
        ));
    }

    for (name, set) in [
        ("run", &level.animations.run),
        ("idle", &level.animations.idle),
        ("jump", &level.animations.jump),
    ] {
        if set.frames.is_empty() {
            return fail(format!("animation '{name}' has no frames"));
        }
    }

    if let Some(timeout) = level.idle_timeout_ms {
        if timeout <= 0.0 {
            return fail("idle_timeout_ms must be > 0".to_string());
        }
    }

    let mut platform_ids = HashSet::new();
    for platform in &level.platforms {
        if !platform_ids.insert(platform.id.clone()) {
            return fail(format!("duplicate platform id '{}'", platform.id));
        }
        check_size(&format!("platform '{}'", platform.id), &platform.rect)?;
        if let Some(motion) = &platform.motion {
            if motion.y_min >= motion.y_max {
                return fail(format!(
                    "platform '{}' motion bounds must satisfy y_min < y_max",
                    platform.id
                ));
            }
            if motion.step <= 0.0 {
                return fail(format!("platform '{}' motion step must be > 0", platform.id));
            }
            if platform.rect.y < motion.y_min || platform.rect.y > motion.y_max {
                return fail(format!(
                    "platform '{}' starts outside its motion bounds",
                    platform.id
                ));
            }
        }
    }
    if level.platforms.is_empty() {
        log::warn!(
            "Level '{}' has no platforms. The world floor is the only support.",
            level.level_id
        );
    }

    for (index, barrier) in level.barriers.iter().enumerate() {
        check_size(&format!("barrier {index}"), barrier)?;
    }
    for (index, obstacle) in level.obstacles.iter().enumerate() {
        check_size(&format!("obstacle {index}"), &obstacle.rect)?;
    }

    if let Some(door) = &level.door {
        check_size("door", &door.rect)?;
        if door.delay_ms < 0.0 {
            return fail("door delay_ms must be >= 0".to_string());
        }
    }

    if let Some(pickup) = &level.pickup {
        check_size(&format!("pickup '{}'", pickup.id), &pickup.rect)?;
        if let Some(slot) = pickup.inventory_slot {
            if slot >= level.inventory_slots {
                return fail(format!(
                    "pickup '{}' targets inventory slot {slot} but only {} slot(s) exist",
                    pickup.id, level.inventory_slots
                ));
            }
        }
        if pickup.dialogue && level.dialogue.is_empty() {
            return fail(format!(
                "pickup '{}' starts a dialogue but the level has none",
                pickup.id
            ));
        }
    }

    if let Some(end) = &level.end_trigger {
        check_size("end_trigger", &end.rect)?;
        if end.fade.step <= 0.0 || end.fade.interval_ms <= 0.0 {
            return fail("end_trigger fade step and interval must be > 0".to_string());
        }
    }

    Ok(())
}

fn check_size(what: &str, rect: &Rect) -> Result<(), String> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(format!("Level validation failed: {what} size must be > 0"));
    }
    Ok(())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

const fn default_gravity() -> f32 {
    1.0
}

const fn default_speed() -> f32 {
    5.0
}

const fn default_jump_impulse() -> f32 {
    15.0
}

const fn default_bonk_velocity() -> f32 {
    1.0
}

const fn default_motion_step() -> f32 {
    1.0
}

const fn default_door_delay_ms() -> f64 {
    2000.0
}

const fn default_fade_step() -> f32 {
    0.02
}

const fn default_fade_interval_ms() -> f64 {
    100.0
}

const fn default_fade_hold_ms() -> f64 {
    7000.0
}

const fn default_inventory_slots() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "chamber_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_level_file(path: &Path, body: &str) {
        fs::write(path, body).expect("failed to write temp level file");
    }

    fn level_json(extra: &str) -> String {
        format!(
            r#"{{
              "version": "0.1",
              "level_id": "test_level",
              "actor": {{ "spawn": [100.0, 500.0], "width": 50.0, "height": 80.0 }},
              "animations": {{
                "run": {{ "frames": ["run1.png", "run2.png"], "speed": 0.15 }},
                "idle": {{ "frames": ["idle1.png"], "speed": 0.05 }},
                "jump": {{ "frames": ["jump1.png"], "speed": 0.1 }}
              }}{extra}
            }}"#
        )
    }

    fn load_str(name_hint: &str, body: &str) -> Result<LevelFile, String> {
        let path = temp_file_path(name_hint);
        write_level_file(&path, body);
        let result = load_level_from_path(&path);
        let _ = fs::remove_file(path);
        result
    }

    #[test]
    fn load_level_applies_defaults() {
        let level = load_str(
            "defaults",
            &level_json(
                r#",
              "platforms": [ { "id": "ground", "x": 0.0, "y": 760.0, "width": 1280.0, "height": 40.0 } ],
              "door": { "x": 850.0, "y": 745.0, "width": 500.0, "height": 80.0 },
              "end_trigger": { "x": 1152.0, "y": 640.0, "width": 50.0, "height": 100.0, "target": "credits.html" }"#,
            ),
        )
        .expect("valid level should load");

        assert_eq!(level.level_id, "test_level");
        assert_eq!(level.world.width, 1280.0);
        assert_eq!(level.physics.gravity, 1.0);
        assert_eq!(level.physics.speed, 5.0);
        assert_eq!(level.physics.jump_impulse, 15.0);
        assert_eq!(level.actor.facing, Facing::Right);
        assert_eq!(level.actor.spawn, Vec2::new(100.0, 500.0));
        assert!(level.animations.run.looping);
        assert_eq!(level.platforms[0].rect, Rect::new(0.0, 760.0, 1280.0, 40.0));

        let door = level.door.expect("door");
        assert_eq!(door.delay_ms, 2000.0);
        assert_eq!(door.retrigger, Retrigger::Once);

        let fade = level.end_trigger.expect("end trigger").fade;
        assert_eq!(fade.step, 0.02);
        assert_eq!(fade.interval_ms, 100.0);
        assert_eq!(fade.hold_ms, 7000.0);
    }

    #[test]
    fn load_level_parses_moving_platform() {
        let level = load_str(
            "moving",
            &level_json(
                r#",
              "platforms": [ { "id": "lift", "x": 670.0, "y": 450.0, "width": 150.0, "height": 20.0,
                               "motion": { "y_min": 400.0, "y_max": 500.0, "start": "down" } } ]"#,
            ),
        )
        .expect("moving platform should load");
        let motion = level.platforms[0].motion.expect("motion");
        assert_eq!(motion.step, 1.0);
        assert_eq!(motion.start, StartDirection::Down);
    }

    #[test]
    fn load_level_rejects_empty_frame_set() {
        let body = level_json("").replace(r#"["idle1.png"]"#, "[]");
        let err = load_str("empty_frames", &body).expect_err("empty frames should fail");
        assert!(err.contains("animation 'idle' has no frames"));
    }

    #[test]
    fn load_level_rejects_duplicate_platform_ids() {
        let err = load_str(
            "dup_platform",
            &level_json(
                r#",
              "platforms": [
                { "id": "p1", "x": 0.0, "y": 760.0, "width": 100.0, "height": 40.0 },
                { "id": "p1", "x": 200.0, "y": 600.0, "width": 100.0, "height": 30.0 }
              ]"#,
            ),
        )
        .expect_err("duplicate platform ids should fail");
        assert!(err.contains("duplicate platform id 'p1'"));
    }

    #[test]
    fn load_level_rejects_unordered_motion_bounds() {
        let err = load_str(
            "bad_motion",
            &level_json(
                r#",
              "platforms": [ { "id": "lift", "x": 0.0, "y": 450.0, "width": 150.0, "height": 20.0,
                               "motion": { "y_min": 500.0, "y_max": 400.0 } } ]"#,
            ),
        )
        .expect_err("reversed bounds should fail");
        assert!(err.contains("y_min < y_max"));
    }

    #[test]
    fn load_level_rejects_missing_inventory_slot() {
        let err = load_str(
            "bad_slot",
            &level_json(
                r#",
              "inventory_slots": 2,
              "pickup": { "id": "letter", "x": 10.0, "y": 10.0, "width": 30.0, "height": 30.0, "inventory_slot": 2 }"#,
            ),
        )
        .expect_err("slot out of range should fail");
        assert!(err.contains("inventory slot 2"));
    }

    #[test]
    fn load_level_rejects_spawn_outside_world() {
        let body = level_json("").replace("[100.0, 500.0]", "[100.0, 750.0]");
        let err = load_str("bad_spawn", &body).expect_err("spawn below floor should fail");
        assert!(err.contains("outside"));
    }

    #[test]
    fn load_level_reports_parse_errors_with_path() {
        let err = load_str("broken", "{ not json").expect_err("garbage should fail");
        assert!(err.contains("Failed to parse level JSON"));
    }

    #[test]
    fn bundled_levels_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/levels");
        for name in [
            "prologue.json",
            "chamber_one.json",
            "chamber_two.json",
            "chamber_four.json",
        ] {
            let level = load_level_from_path(&dir.join(name))
                .unwrap_or_else(|e| panic!("{name} should load: {e}"));
            assert!(!level.level_id.is_empty());
            for line in &level.dialogue {
                assert!(!line.text.ends_with('…'), "{name}: truncated line {:?}", line.text);
            }
        }

        let two = load_level_from_path(&dir.join("chamber_two.json")).expect("chamber_two loads");
        assert_eq!(two.dialogue.len(), 4);
        assert!(two.dialogue[0]
            .text
            .ends_with("What was your connection to the inferno?"));
    }

    #[test]
    fn level_watcher_detects_newly_created_file() {
        let path = temp_file_path("watcher_create");
        let _ = fs::remove_file(&path);

        let mut watcher = LevelWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        write_level_file(&path, &level_json(""));

        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );

        let _ = fs::remove_file(path);
    }
}
