use std::{fmt, mem, time::Instant};

use uuid::Uuid;

use super::asset::{AssetDescriptor, AssetId};

pub type Position = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(Uuid);

impl WidgetId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mascot-{}", self.0.simple())
    }
}

/// Bookkeeping for one on-screen mascot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInstance {
    pub id: WidgetId,
    pub asset: Option<AssetId>,
    pub position: Position,
    pub topmost: bool,
}

/// The visual side of a mascot. Implemented by the desktop shell's windows and by
/// test doubles.
pub trait MascotSurface {
    /// Replaces the shown content. Any running animation is stopped and dropped
    /// before the new content starts. `None` shows blank content.
    fn load(&mut self, asset: Option<&AssetDescriptor>);
    fn move_to(&mut self, position: Position);
    /// Re-applies the stacking attribute, re-shows the window and restarts a
    /// paused animation.
    fn apply_topmost(&mut self, topmost: bool);
    fn focus(&mut self);
    fn tick(&mut self, now: Instant);
    /// Stops animation, detaches content and hides. The surface is dropped later.
    fn release(&mut self);
}

pub trait SurfaceFactory {
    type Surface: MascotSurface;

    fn create(&mut self, id: WidgetId) -> Result<Self::Surface, String>;
}

struct Slot<S> {
    instance: WidgetInstance,
    surface: S,
}

pub struct WidgetManager<S> {
    live: Vec<Slot<S>>,
    pending_finalize: Vec<S>,
    spawn_offset: Position,
    default_position: Position,
}

impl<S: MascotSurface> WidgetManager<S> {
    pub fn new(spawn_offset: Position, default_position: Position) -> Self {
        Self {
            live: Vec::new(),
            pending_finalize: Vec::new(),
            spawn_offset,
            default_position,
        }
    }

    /// Where the next mascot appears: offset from the most recent live one, or the
    /// default position when none is live.
    pub fn next_spawn_position(&self) -> Position {
        match self.live.last() {
            Some(slot) => (
                slot.instance.position.0 + self.spawn_offset.0,
                slot.instance.position.1 + self.spawn_offset.1,
            ),
            None => self.default_position,
        }
    }

    pub fn spawn<F>(&mut self, asset: Option<&AssetDescriptor>, topmost: bool, factory: &mut F) -> Result<WidgetId, String>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let position = self.next_spawn_position();
        self.spawn_at(asset, position, topmost, factory)
    }

    pub fn spawn_at<F>(
        &mut self,
        asset: Option<&AssetDescriptor>,
        position: Position,
        topmost: bool,
        factory: &mut F,
    ) -> Result<WidgetId, String>
    where
        F: SurfaceFactory<Surface = S>,
    {
        let id = WidgetId::new();
        let mut surface = factory.create(id)?;
        surface.load(asset);
        surface.move_to(position);
        surface.apply_topmost(topmost);

        self.live.push(Slot {
            instance: WidgetInstance {
                id,
                asset: asset.map(|a| a.id),
                position,
                topmost,
            },
            surface,
        });
        Ok(id)
    }

    pub fn reposition(&mut self, id: WidgetId, position: Position) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.instance.position = position;
        slot.surface.move_to(position);
        true
    }

    pub fn rebind(&mut self, id: WidgetId, asset: &AssetDescriptor) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.instance.asset = Some(asset.id);
        slot.surface.load(Some(asset));
        true
    }

    /// Unlinks and releases now; the surface itself is dropped by
    /// [`finalize_pending`](Self::finalize_pending). Unknown ids are a no-op.
    pub fn destroy(&mut self, id: WidgetId) -> bool {
        let Some(index) = self.live.iter().position(|s| s.instance.id == id) else {
            return false;
        };
        let mut slot = self.live.remove(index);
        slot.surface.release();
        self.pending_finalize.push(slot.surface);
        true
    }

    /// Clears the live set before releasing anything, so callbacks fired during
    /// release observe an empty manager.
    pub fn destroy_all(&mut self) -> usize {
        let doomed = mem::take(&mut self.live);
        let count = doomed.len();
        for mut slot in doomed {
            slot.surface.release();
            self.pending_finalize.push(slot.surface);
        }
        count
    }

    pub fn set_topmost(&mut self, topmost: bool) {
        for slot in &mut self.live {
            slot.instance.topmost = topmost;
            slot.surface.apply_topmost(topmost);
        }
    }

    pub fn focus(&mut self, id: WidgetId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.surface.focus();
        true
    }

    pub fn tick(&mut self, now: Instant) {
        for slot in &mut self.live {
            slot.surface.tick(now);
        }
    }

    /// Drops surfaces released since the last call. Run once per loop iteration,
    /// after every handler of that iteration returned.
    pub fn finalize_pending(&mut self) -> usize {
        let count = self.pending_finalize.len();
        self.pending_finalize.clear();
        count
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending_finalize.len()
    }

    pub fn list(&self) -> impl Iterator<Item = &WidgetInstance> {
        self.live.iter().map(|s| &s.instance)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn get(&self, id: WidgetId) -> Option<&WidgetInstance> {
        self.live.iter().map(|s| &s.instance).find(|i| i.id == id)
    }

    pub fn bound_to(&self, asset: AssetId) -> Vec<WidgetId> {
        self.list()
            .filter(|i| i.asset == Some(asset))
            .map(|i| i.id)
            .collect()
    }

    pub fn find_surface(&self, pred: impl Fn(&S) -> bool) -> Option<WidgetId> {
        self.live
            .iter()
            .find(|s| pred(&s.surface))
            .map(|s| s.instance.id)
    }

    fn slot_mut(&mut self, id: WidgetId) -> Option<&mut Slot<S>> {
        self.live.iter_mut().find(|s| s.instance.id == id)
    }
}
