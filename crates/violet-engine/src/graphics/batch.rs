use crate::coords::Size;
use crate::gpu::GpuBackend;

use super::{
    BindingSet, LayerKey, LayerPhase, ShaderId, ShaderRegistry, SpriteRecord, TEXTURE_UNITS,
    TOTAL_LAYER_SLOTS,
};

/// Sprites sharing one binding set within a shader bucket.
struct TextureBucket {
    bindings: BindingSet,
    sprites: Vec<SpriteRecord>,
}

/// Texture buckets of one shader within one layer slot, in creation order.
struct ShaderBucket {
    shader: ShaderId,
    textures: Vec<TextureBucket>,
}

/// Counters returned by `SpriteBatcher::flush`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FlushStats {
    /// Texture buckets drawn (one bind/unbind sequence each).
    pub batches: usize,
    pub sprites: usize,
}

/// Per-frame sprite queue keyed by `(layer, phase)`, then shader, then binding set.
///
/// Performance characteristics:
/// - `enqueue()` is O(buckets in the slot)
/// - `flush()` walks all `TOTAL_LAYER_SLOTS` slots in ascending key order
///
/// Nothing survives a flush; the next frame starts with empty slots.
pub struct SpriteBatcher {
    slots: Vec<Vec<ShaderBucket>>,
    queued: usize,
}

impl SpriteBatcher {
    pub fn new() -> Self {
        Self {
            slots: (0..TOTAL_LAYER_SLOTS).map(|_| Vec::new()).collect(),
            queued: 0,
        }
    }

    /// Queues `sprite` in the slot for `(sprite.layer, phase)`.
    ///
    /// The first bucket whose binding set matches (see `BindingSet::matches`)
    /// receives the sprite; otherwise a new bucket is opened at the end.
    pub fn enqueue(&mut self, phase: LayerPhase, bindings: BindingSet, sprite: SpriteRecord) {
        let slot = &mut self.slots[LayerKey::new(sprite.layer, phase).index()];

        let shader_idx = match slot.iter().position(|b| b.shader == sprite.shader) {
            Some(i) => i,
            None => {
                slot.push(ShaderBucket {
                    shader: sprite.shader,
                    textures: Vec::new(),
                });
                slot.len() - 1
            }
        };
        let textures = &mut slot[shader_idx].textures;

        match textures.iter_mut().find(|t| bindings.matches(&t.bindings)) {
            Some(bucket) => bucket.sprites.push(sprite),
            None => textures.push(TextureBucket {
                bindings,
                sprites: vec![sprite],
            }),
        }

        self.queued += 1;
    }

    /// Draws and clears every queued sprite.
    ///
    /// Per texture bucket: units not named by the binding set are unbound,
    /// named units are bound (or unbound for a `None` texture), then the
    /// bucket's records stream through the shader between `begin_batch` and
    /// `end_batch`. Sprites for an unregistered shader are discarded.
    pub fn flush(
        &mut self,
        gpu: &mut dyn GpuBackend,
        shaders: &mut ShaderRegistry,
        view: Size,
    ) -> FlushStats {
        let mut stats = FlushStats::default();
        if self.queued == 0 {
            return stats;
        }

        for slot in &mut self.slots {
            for bucket in slot.drain(..) {
                let Some(shader) = shaders.get_mut(bucket.shader) else {
                    log::debug!("dropping sprites for unregistered shader {:?}", bucket.shader);
                    continue;
                };
                gpu.activate_shader(bucket.shader);

                for tex in bucket.textures {
                    for unit in 0..TEXTURE_UNITS as u8 {
                        if !tex.bindings.references_unit(unit) {
                            gpu.unbind_texture(unit);
                        }
                    }
                    for bind in tex.bindings.binds() {
                        match &bind.texture {
                            Some(t) => gpu.bind_texture(bind.unit, t, bind.filter),
                            None => gpu.unbind_texture(bind.unit),
                        }
                    }

                    shader.begin_batch(gpu, view);
                    for sprite in &tex.sprites {
                        shader.append_sprite(gpu, &tex.bindings, sprite);
                    }
                    shader.end_batch(gpu);

                    stats.batches += 1;
                    stats.sprites += tex.sprites.len();
                }
            }
        }

        self.queued = 0;
        stats
    }

    /// Sprites queued since the last flush.
    #[inline]
    pub fn len(&self) -> usize {
        self.queued
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    /// Number of texture buckets currently open in a slot.
    pub fn bucket_count(&self, key: LayerKey) -> usize {
        self.slots[key.index()].iter().map(|s| s.textures.len()).sum()
    }

    /// Drops everything queued without drawing.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
        self.queued = 0;
    }
}

impl Default for SpriteBatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::coords::{Rect, Vec2};
    use crate::gpu::{GpuCommand, RecordingBackend};
    use crate::graphics::{Shader, Texture, TextureBind, TextureFilter};

    /// Remembers `(layer, x)` of every appended sprite.
    struct AppendLog(Rc<RefCell<Vec<(u8, f32)>>>);

    impl Shader for AppendLog {
        fn name(&self) -> &str {
            "append-log"
        }

        fn begin_batch(&mut self, _gpu: &mut dyn GpuBackend, _view: Size) {}

        fn append_sprite(&mut self, _gpu: &mut dyn GpuBackend, _bindings: &BindingSet, sprite: &SpriteRecord) {
            self.0.borrow_mut().push((sprite.layer, sprite.position.x));
        }

        fn end_batch(&mut self, gpu: &mut dyn GpuBackend) {
            gpu.draw(0);
        }
    }

    fn logged(log: &Rc<RefCell<Vec<(u8, f32)>>>) -> (ShaderRegistry, ShaderId) {
        let mut shaders = ShaderRegistry::new();
        let id = shaders.register(Box::new(AppendLog(log.clone())));
        (shaders, id)
    }

    fn sprite(layer: u8, x: f32) -> SpriteRecord {
        SpriteRecord::simple(layer, Vec2::new(x, 0.0), Rect::new(0.0, 0.0, 1.0, 1.0))
    }

    fn flush(b: &mut SpriteBatcher, gpu: &mut RecordingBackend) -> FlushStats {
        let mut shaders = ShaderRegistry::new();
        b.flush(gpu, &mut shaders, Size::new(100.0, 100.0))
    }

    // ── bucketing ────────────────────────────────────────────────────────

    #[test]
    fn same_texture_shares_bucket() {
        let t = Texture::detached("t", 1, 1);
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t, TextureFilter::Nearest), sprite(0, 0.0));
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t, TextureFilter::Nearest), sprite(0, 1.0));
        assert_eq!(b.bucket_count(LayerKey::new(0, LayerPhase::Actor)), 1);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn different_texture_opens_bucket() {
        let t1 = Texture::detached("a", 1, 1);
        let t2 = Texture::detached("b", 1, 1);
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t1, TextureFilter::Nearest), sprite(0, 0.0));
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t2, TextureFilter::Nearest), sprite(0, 1.0));
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t1, TextureFilter::Nearest), sprite(0, 2.0));
        assert_eq!(b.bucket_count(LayerKey::new(0, LayerPhase::Actor)), 2);
    }

    #[test]
    fn phase_selects_slot() {
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Map, BindingSet::default(), sprite(4, 0.0));
        assert_eq!(b.bucket_count(LayerKey::new(4, LayerPhase::Map)), 1);
        assert_eq!(b.bucket_count(LayerKey::new(4, LayerPhase::Actor)), 0);
    }

    // ── flush ────────────────────────────────────────────────────────────

    #[test]
    fn flush_binds_then_draws_and_unbinds_unused_units() {
        let t = Texture::detached("t", 1, 1);
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::single(&t, TextureFilter::Linear), sprite(0, 0.0));

        let mut gpu = RecordingBackend::new();
        let stats = flush(&mut b, &mut gpu);
        assert_eq!(stats, FlushStats { batches: 1, sprites: 1 });

        let cmds = gpu.commands();
        assert_eq!(cmds[0], GpuCommand::ActivateShader(ShaderId::SPRITE));
        let unbinds: Vec<u8> = cmds
            .iter()
            .filter_map(|c| match c {
                GpuCommand::UnbindTexture { unit } => Some(*unit),
                _ => None,
            })
            .collect();
        assert_eq!(unbinds, (1..16).collect::<Vec<u8>>());
        assert!(cmds.contains(&GpuCommand::BindTexture {
            unit: 0,
            texture: t.id(),
            filter: TextureFilter::Linear,
        }));
        assert_eq!(gpu.draw_counts(), vec![6]);
    }

    #[test]
    fn none_binding_unbinds_its_unit() {
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::new(vec![TextureBind::empty(2)]), sprite(0, 0.0));

        let mut gpu = RecordingBackend::new();
        flush(&mut b, &mut gpu);
        let unbinds = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::UnbindTexture { .. }))
            .count();
        assert_eq!(unbinds, 16);
    }

    #[test]
    fn flush_empties_queue() {
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::default(), sprite(0, 0.0));
        let mut gpu = RecordingBackend::new();
        flush(&mut b, &mut gpu);
        assert!(b.is_empty());
        assert_eq!(b.bucket_count(LayerKey::new(0, LayerPhase::Actor)), 0);

        let mut gpu = RecordingBackend::new();
        assert_eq!(flush(&mut b, &mut gpu), FlushStats::default());
        assert!(gpu.commands().is_empty());
    }

    #[test]
    fn flush_walks_layers_then_phases_in_ascending_order() {
        let log = Rc::default();
        let (mut shaders, id) = logged(&log);
        let mut b = SpriteBatcher::new();
        let mut enqueue = |phase, layer, x| {
            let mut r = sprite(layer, x);
            r.shader = id;
            b.enqueue(phase, BindingSet::default(), r);
        };

        enqueue(LayerPhase::Actor, 5, 50.0);
        enqueue(LayerPhase::Actor, 1, 12.0);
        enqueue(LayerPhase::Actor, 3, 30.0);
        enqueue(LayerPhase::UpdateEnd, 1, 13.0);
        enqueue(LayerPhase::Map, 1, 11.0);
        enqueue(LayerPhase::UpdateStart, 1, 10.0);

        let mut gpu = RecordingBackend::new();
        let stats = b.flush(&mut gpu, &mut shaders, Size::new(100.0, 100.0));
        assert_eq!(stats.sprites, 6);
        assert_eq!(
            *log.borrow(),
            [(1u8, 10.0f32), (1, 11.0), (1, 12.0), (1, 13.0), (3, 30.0), (5, 50.0)]
        );
    }

    #[test]
    fn interleaved_textures_draw_bucket_by_bucket() {
        let log = Rc::default();
        let (mut shaders, id) = logged(&log);
        let a = Texture::detached("a", 1, 1);
        let tb = Texture::detached("b", 1, 1);
        let mut b = SpriteBatcher::new();
        for (tex, x) in [(&a, 1.0), (&tb, 2.0), (&a, 3.0), (&tb, 4.0)] {
            let mut r = sprite(0, x);
            r.shader = id;
            b.enqueue(LayerPhase::Actor, BindingSet::single(tex, TextureFilter::Nearest), r);
        }

        let mut gpu = RecordingBackend::new();
        let stats = b.flush(&mut gpu, &mut shaders, Size::new(100.0, 100.0));
        assert_eq!(stats, FlushStats { batches: 2, sprites: 4 });
        let xs: Vec<f32> = log.borrow().iter().map(|&(_, x)| x).collect();
        assert_eq!(xs, [1.0, 3.0, 2.0, 4.0]);

        // Between the two draws the second bucket rebinds unit 0 and clears the rest.
        let cmds = gpu.commands();
        let draws: Vec<usize> = cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, GpuCommand::Draw { .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(draws.len(), 2);
        let bind = |tex: &Texture| GpuCommand::BindTexture {
            unit: 0,
            texture: tex.id(),
            filter: TextureFilter::Nearest,
        };
        assert!(cmds[..draws[0]].contains(&bind(&a)));
        let between = &cmds[draws[0] + 1..draws[1]];
        assert!(between.contains(&bind(&tb)));
        assert!(!between.contains(&bind(&a)));
        for unit in 1..TEXTURE_UNITS as u8 {
            assert!(between.contains(&GpuCommand::UnbindTexture { unit }), "unit {unit}");
        }
    }

    #[test]
    fn unregistered_shader_is_discarded() {
        let mut r = sprite(0, 0.0);
        r.shader = ShaderId::from_index(9);
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::default(), r);

        let mut gpu = RecordingBackend::new();
        assert_eq!(flush(&mut b, &mut gpu).sprites, 0);
        assert!(b.is_empty());
        assert_eq!(gpu.draw_calls(), 0);
    }

    #[test]
    fn clear_drops_without_drawing() {
        let mut b = SpriteBatcher::new();
        b.enqueue(LayerPhase::Actor, BindingSet::default(), sprite(0, 0.0));
        b.clear();
        let mut gpu = RecordingBackend::new();
        flush(&mut b, &mut gpu);
        assert_eq!(gpu.draw_calls(), 0);
    }
}
