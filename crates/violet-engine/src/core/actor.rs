use anyhow::Result;

use super::Context;

/// What an actor wants after one of its update hooks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ActorControl {
    #[default]
    Keep,
    /// Dispose this actor at the end of its own call.
    Dispose,
}

/// Which of the three frame passes is running.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UpdatePass {
    Update,
    Fixed,
    Draw,
}

/// A live game object. Every actor's hooks run in the Actor draw phase.
pub trait Actor {
    fn name(&self) -> &str;

    fn on_spawn(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        let _ = ctx;
        Ok(ActorControl::Keep)
    }

    fn on_fixed_update(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        let _ = ctx;
        Ok(ActorControl::Keep)
    }

    fn on_draw(&mut self, ctx: &mut Context) -> Result<ActorControl> {
        let _ = ctx;
        Ok(ActorControl::Keep)
    }

    fn on_dispose(&mut self, ctx: &mut Context) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Actors in spawn order.
///
/// Actors spawned during a pass join the end of the pool and are visited in
/// that same pass.
#[derive(Default)]
pub struct ActorPool {
    actors: Vec<Box<dyn Actor>>,
}

impl ActorPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actors.iter().map(|a| a.name())
    }

    /// Moves actors spawned through `ctx` into the pool.
    pub fn adopt(&mut self, ctx: &mut Context) {
        self.actors.append(&mut ctx.take_spawned());
    }

    pub fn update(&mut self, pass: UpdatePass, ctx: &mut Context) -> Result<()> {
        self.adopt(ctx);

        let mut i = 0;
        while i < self.actors.len() {
            let actor = &mut self.actors[i];
            let control = match pass {
                UpdatePass::Update => actor.on_update(ctx),
                UpdatePass::Fixed => actor.on_fixed_update(ctx),
                UpdatePass::Draw => actor.on_draw(ctx),
            };
            self.adopt(ctx);

            if control? == ActorControl::Dispose {
                let mut actor = self.actors.remove(i);
                log::debug!("actor dispose: {}", actor.name());
                actor.on_dispose(ctx)?;
                self.adopt(ctx);
            } else {
                i += 1;
            }
        }
        Ok(())
    }

    /// Disposes every actor, then the actors spawned by those disposals.
    /// Anything spawned during that second round is dropped without
    /// `on_dispose`. All actors are removed even if a hook fails; the first
    /// error is returned.
    pub fn dispose_all(&mut self, ctx: &mut Context) -> Result<()> {
        let mut first_err = None;
        for _ in 0..2 {
            self.adopt(ctx);
            for mut actor in std::mem::take(&mut self.actors) {
                log::debug!("actor dispose: {}", actor.name());
                if let Err(e) = actor.on_dispose(ctx) {
                    first_err.get_or_insert(e);
                }
            }
        }
        for actor in ctx.take_spawned() {
            log::warn!("actor {} spawned during dispose was dropped", actor.name());
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for ActorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
