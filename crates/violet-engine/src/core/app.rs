use anyhow::Result;

use super::Context;

/// Application contract: lifecycle hooks around every pass of every frame.
///
/// Per frame the engine calls, in order: the update pair, the fixed-update
/// pair when a fixed tick is due, the draw pair when a draw tick is due. The
/// `*_start` hooks draw into the UpdateStart phase, the `*_end` hooks into the
/// UpdateEnd phase.
pub trait App {
    /// Called once before the first frame. Set the first scene here.
    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_update_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_fixed_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_fixed_update_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_draw_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_draw_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once during teardown, after the scene has exited.
    fn on_close(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// A game state (title screen, level, ...). Exactly one is active at a time.
pub trait Scene {
    fn name(&self) -> &str;

    fn on_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_update_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_fixed_update_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_fixed_update_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_draw_start(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_draw_end(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called when the scene is replaced or the engine shuts down. Actors are
    /// disposed right after.
    fn on_exit(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Empty scene installed before `App::on_start`.
#[derive(Debug, Default, Copy, Clone)]
pub struct StartupScene;

impl Scene for StartupScene {
    fn name(&self) -> &str {
        "startup"
    }
}
