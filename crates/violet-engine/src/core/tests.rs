use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Result};

use super::*;
use crate::audio::{self, StreamingSource};
use crate::coords::Vec2;
use crate::gpu::{DetachedTextures, RecordingBackend};
use crate::graphics::{SpriteParams, Texture, TextureFilter};
use crate::input::Button;
use crate::time::ManualClock;

type Log = Rc<RefCell<Vec<String>>>;

fn no_audio(path: &Path, _looping: bool) -> Result<StreamingSource> {
    bail!("no audio in tests: {}", path.display())
}

fn engine<A: App>(app: A, config: EngineConfig) -> (Engine<A>, ManualClock) {
    let clock = ManualClock::new(1000.0);
    let (handle, _mixer) = audio::channel(no_audio);
    let engine = Engine::new(
        app,
        &config,
        Box::new(clock.clone()),
        handle,
        Box::new(DetachedTextures),
    )
    .unwrap();
    (engine, clock)
}

fn push(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

struct RecApp {
    log: Log,
    first_scene: Option<RecScene>,
}

impl App for RecApp {
    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.start");
        if let Some(scene) = self.first_scene.take() {
            ctx.set_scene(scene);
        }
        Ok(())
    }

    fn on_update_start(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.update_start");
        Ok(())
    }

    fn on_update_end(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.update_end");
        Ok(())
    }

    fn on_fixed_update_start(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.fixed_start");
        Ok(())
    }

    fn on_fixed_update_end(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.fixed_end");
        Ok(())
    }

    fn on_draw_start(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.draw_start");
        Ok(())
    }

    fn on_draw_end(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.draw_end");
        Ok(())
    }

    fn on_close(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, "app.close");
        Ok(())
    }
}

struct RecScene {
    name: String,
    log: Log,
    actors: Vec<RecActor>,
    switch_to: Option<Box<RecScene>>,
    fail_update: bool,
}

impl RecScene {
    fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            actors: Vec::new(),
            switch_to: None,
            fail_update: false,
        }
    }

    fn with_actor(mut self, actor: RecActor) -> Self {
        self.actors.push(actor);
        self
    }
}

impl Scene for RecScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.start", self.name));
        for actor in self.actors.drain(..) {
            ctx.spawn(actor)?;
        }
        Ok(())
    }

    fn on_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.update_start", self.name));
        if self.fail_update {
            bail!("scene {} failed", self.name);
        }
        if let Some(next) = self.switch_to.take() {
            ctx.set_scene_boxed(next);
        }
        Ok(())
    }

    fn on_update_end(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.update_end", self.name));
        Ok(())
    }

    fn on_exit(&mut self, _ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.exit", self.name));
        Ok(())
    }
}

struct RecActor {
    name: String,
    log: Log,
    dispose_on_update: bool,
    respawn_on_dispose: bool,
    child: Option<Box<RecActor>>,
    sprite: Option<Texture>,
}

impl RecActor {
    fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            dispose_on_update: false,
            respawn_on_dispose: false,
            child: None,
            sprite: None,
        }
    }
}

impl Actor for RecActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_spawn(&mut self, ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.spawn:{:?}", self.name, ctx.graphics().phase()));
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        push(&self.log, format!("{}.update", self.name));
        if let Some(child) = self.child.take() {
            ctx.spawn_boxed(child)?;
        }
        if self.dispose_on_update {
            return Ok(ActorControl::Dispose);
        }
        Ok(ActorControl::Keep)
    }

    fn on_draw(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        if let Some(tex) = &self.sprite {
            ctx.gfx()
                .draw_texture(tex, TextureFilter::Nearest, SpriteParams::new(0, Vec2::new(4.0, 4.0)));
        }
        Ok(ActorControl::Keep)
    }

    fn on_dispose(&mut self, ctx: &mut Context) -> Result<()> {
        push(&self.log, format!("{}.dispose", self.name));
        if self.respawn_on_dispose {
            let mut again = RecActor::new(&self.name, &self.log);
            again.respawn_on_dispose = true;
            ctx.spawn(again)?;
        }
        Ok(())
    }
}

// ── start ────────────────────────────────────────────────────────────────

#[test]
fn scene_set_in_on_start_replaces_startup_scene() {
    let log = Log::default();
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(RecScene::new("title", &log)),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    assert_eq!(engine.scene_name(), None);

    engine.frame(&mut RecordingBackend::new()).unwrap();
    assert_eq!(engine.scene_name(), Some("title"));
    let log = take(&log);
    assert_eq!(log[0], "app.start");
    assert_eq!(log[1], "title.start");
}

#[test]
fn startup_scene_runs_without_app_scene() {
    let (mut engine, _clock) = engine(
        RecApp {
            log: Log::default(),
            first_scene: None,
        },
        EngineConfig::default(),
    );
    engine.start().unwrap();
    engine.frame(&mut RecordingBackend::new()).unwrap();
    assert_eq!(engine.scene_name(), Some("startup"));
}

// ── passes ───────────────────────────────────────────────────────────────

#[test]
fn hooks_run_in_pass_order() {
    let log = Log::default();
    let scene = RecScene::new("s", &log).with_actor(RecActor::new("a", &log));
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(scene),
    };
    let (mut engine, clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    clock.advance(17.0);

    let report = engine.frame(&mut RecordingBackend::new()).unwrap();
    assert!(report.plan.fixed);
    assert!(report.plan.draw);
    assert!(report.flush.is_some());

    let expected = [
        "app.start",
        "s.start",
        "a.spawn:Actor",
        "app.update_start",
        "s.update_start",
        "a.update",
        "s.update_end",
        "app.update_end",
        "app.fixed_start",
        "app.fixed_end",
        "app.draw_start",
        "app.draw_end",
    ];
    assert_eq!(take(&log), expected);
}

#[test]
fn fixed_pass_waits_for_a_logic_period() {
    let log = Log::default();
    let app = RecApp {
        log: log.clone(),
        first_scene: None,
    };
    let (mut engine, clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    clock.advance(10.0);
    assert!(!engine.frame(&mut gpu).unwrap().plan.fixed);
    clock.advance(7.0);
    assert!(engine.frame(&mut gpu).unwrap().plan.fixed);
    clock.advance(1.0);
    assert!(!engine.frame(&mut gpu).unwrap().plan.fixed);

    let fixed = take(&log).iter().filter(|e| *e == "app.fixed_start").count();
    assert_eq!(fixed, 1);
}

#[test]
fn skipped_draw_pass_does_not_flush() {
    let log = Log::default();
    let mut actor = RecActor::new("a", &log);
    actor.sprite = Some(Texture::detached("t", 8, 8));
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(RecScene::new("s", &log).with_actor(actor)),
    };
    let config = EngineConfig {
        vsync: false,
        ..EngineConfig::default()
    };
    let (mut engine, clock) = engine(app, config);
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    let report = engine.frame(&mut gpu).unwrap();
    assert!(!report.plan.draw);
    assert_eq!(report.flush, None);
    assert_eq!(gpu.draw_calls(), 0);

    clock.advance(17.0);
    let report = engine.frame(&mut gpu).unwrap();
    let stats = report.flush.unwrap();
    assert_eq!(stats.sprites, 1);
    assert_eq!(gpu.draw_calls(), 1);
    assert_eq!(gpu.vertices()[0].pos, [4.0, 4.0]);
}

// ── actors ───────────────────────────────────────────────────────────────

#[test]
fn disposed_actor_leaves_the_pool() {
    let log = Log::default();
    let mut doomed = RecActor::new("doomed", &log);
    doomed.dispose_on_update = true;
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(
            RecScene::new("s", &log)
                .with_actor(doomed)
                .with_actor(RecActor::new("keeper", &log)),
        ),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();
    engine.frame(&mut gpu).unwrap();
    assert_eq!(engine.actors().names().collect::<Vec<_>>(), ["keeper"]);

    let log = take(&log);
    let dispose = log.iter().position(|e| e == "doomed.dispose").unwrap();
    let keeper = log.iter().position(|e| e == "keeper.update").unwrap();
    assert!(dispose < keeper);
}

#[test]
fn spawned_actor_runs_in_the_same_pass() {
    let log = Log::default();
    let mut parent = RecActor::new("parent", &log);
    parent.child = Some(Box::new(RecActor::new("child", &log)));
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(RecScene::new("s", &log).with_actor(parent)),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    engine.frame(&mut RecordingBackend::new()).unwrap();

    let log = take(&log);
    let updates: Vec<_> = log.iter().filter(|e| e.ends_with(".update")).collect();
    assert_eq!(updates, ["parent.update", "child.update"]);
    assert_eq!(engine.actors().len(), 2);
}

// ── scenes ───────────────────────────────────────────────────────────────

#[test]
fn scene_switch_exits_at_frame_end_and_starts_next_frame() {
    let log = Log::default();
    let mut first = RecScene::new("first", &log).with_actor(RecActor::new("a", &log));
    first.switch_to = Some(Box::new(RecScene::new("second", &log)));
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(first),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    engine.frame(&mut gpu).unwrap();
    assert_eq!(engine.scene_name(), None);
    assert!(engine.actors().is_empty());
    let log1 = take(&log);
    let n = log1.len();
    assert_eq!(log1[n - 2..], ["first.exit", "a.dispose"]);
    // The rest of the frame still ran with the old scene.
    assert!(log1.contains(&"first.update_end".to_string()));

    engine.frame(&mut gpu).unwrap();
    assert_eq!(engine.scene_name(), Some("second"));
    assert_eq!(take(&log)[0], "second.start");
}

// ── input ────────────────────────────────────────────────────────────────

#[test]
fn tap_is_visible_for_one_frame() {
    let (mut engine, _clock) = engine(
        RecApp {
            log: Log::default(),
            first_scene: None,
        },
        EngineConfig::default(),
    );
    engine.start().unwrap();
    let mut gpu = RecordingBackend::new();

    engine.context_mut().input_mut().set(Button::A, true);
    engine.frame(&mut gpu).unwrap();
    // Queried after the frame: the snapshot has rolled over.
    assert!(engine.context().pressed(Button::A));
    assert!(!engine.context().tapped(Button::A));
}

// ── teardown ─────────────────────────────────────────────────────────────

#[test]
fn shutdown_disposes_exits_then_closes_once() {
    let log = Log::default();
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(RecScene::new("s", &log).with_actor(RecActor::new("a", &log))),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    engine.frame(&mut RecordingBackend::new()).unwrap();
    take(&log);

    engine.shutdown();
    engine.shutdown();
    drop(engine);
    assert_eq!(take(&log), ["a.dispose", "s.exit", "app.close"]);
}

#[test]
fn actor_respawning_itself_on_dispose_does_not_stall_shutdown() {
    let log = Log::default();
    let mut phoenix = RecActor::new("p", &log);
    phoenix.respawn_on_dispose = true;
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(RecScene::new("s", &log).with_actor(phoenix)),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();
    engine.frame(&mut RecordingBackend::new()).unwrap();
    take(&log);

    engine.shutdown();
    let entries: Vec<String> = take(&log)
        .into_iter()
        .filter(|e| !e.ends_with(".spawn:Actor"))
        .collect();
    // The original and the one spawned by its disposal; the third is dropped.
    assert_eq!(entries, ["p.dispose", "p.dispose", "s.exit", "app.close"]);
}

#[test]
fn hook_error_aborts_frame_but_teardown_still_runs() {
    let log = Log::default();
    let mut scene = RecScene::new("s", &log);
    scene.fail_update = true;
    let app = RecApp {
        log: log.clone(),
        first_scene: Some(scene),
    };
    let (mut engine, _clock) = engine(app, EngineConfig::default());
    engine.start().unwrap();

    let err = engine.frame(&mut RecordingBackend::new()).unwrap_err();
    assert!(err.to_string().contains("scene s failed"));
    assert!(!take(&log).contains(&"app.update_end".to_string()));

    engine.shutdown();
    assert_eq!(take(&log), ["s.exit", "app.close"]);
}

#[test]
fn invalid_game_fps_is_rejected_at_construction() {
    let config = EngineConfig {
        game_fps: 0.0,
        ..EngineConfig::default()
    };
    let (handle, _mixer) = audio::channel(no_audio);
    let result = Engine::new(
        RecApp {
            log: Log::default(),
            first_scene: None,
        },
        &config,
        Box::new(ManualClock::new(0.0)),
        handle,
        Box::new(DetachedTextures),
    );
    assert!(result.is_err());
}
