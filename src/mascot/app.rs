use std::time::Instant;

use crate::{
    data_loaders::{
        config::MascotSettings,
        session::{ActiveWidget, SessionSnapshot, SessionStore},
    },
    error, info,
    menu::{self, MenuAction, MenuNode},
    warn,
};

use super::{
    asset::{describe_file, AssetDescriptor, AssetId, AssetRegistry},
    drag::DragTracker,
    widget::{Position, SurfaceFactory, WidgetId, WidgetInstance, WidgetManager},
};

/// What a handled action still needs from the desktop shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellRequest {
    None,
    PickAssets,
    Quit,
}

/// Registry, live mascots and the session file kept in step. Every mutating
/// operation rewrites the session.
pub struct MascotApp<F: SurfaceFactory> {
    registry: AssetRegistry,
    widgets: WidgetManager<F::Surface>,
    factory: F,
    store: SessionStore,
    topmost: bool,
    drag: DragTracker,
}

impl<F: SurfaceFactory> MascotApp<F> {
    pub fn new(factory: F, store: SessionStore, settings: &MascotSettings) -> Self {
        Self {
            registry: AssetRegistry::new(),
            widgets: WidgetManager::new(settings.spawn_offset, settings.default_position),
            factory,
            store,
            topmost: SessionSnapshot::default().topmost,
            drag: DragTracker::default(),
        }
    }

    /// Adopts a loaded snapshot: assets, topmost flag, then the mascots that were
    /// on screen. Returns how many mascots came back.
    pub fn load_snapshot(&mut self, snapshot: &SessionSnapshot) -> usize {
        self.registry = AssetRegistry::from_stored(&snapshot.assets);
        self.topmost = snapshot.topmost;
        info!(
            "[MASCOT][SESSION] Loaded {} image(s), topmost={}",
            self.registry.len(),
            self.topmost
        );
        self.restore(&snapshot.active_widgets)
    }

    /// Respawns saved mascots at their saved positions. Runs only when both the
    /// registry and `active` are non-empty; bad entries are skipped one by one.
    pub fn restore(&mut self, active: &[ActiveWidget]) -> usize {
        if active.is_empty() || self.registry.is_empty() {
            return 0;
        }

        let mut restored = 0;
        for entry in active {
            let Some(index) = entry.resolve_index(self.registry.len()) else {
                warn!(
                    "[MASCOT][SESSION] Skipping saved mascot with image_index {:?}",
                    entry.asset_index
                );
                continue;
            };
            let asset = &self.registry.list()[index];
            let position = (entry.position.x, entry.position.y);
            match self
                .widgets
                .spawn_at(Some(asset), position, self.topmost, &mut self.factory)
            {
                Ok(_) => restored += 1,
                Err(e) => error!("[MASCOT][SESSION] Failed to restore '{}': {e}", asset.name),
            }
        }
        info!("[MASCOT][SESSION] Restored {restored} of {} mascot(s)", active.len());
        restored
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn widgets(&self) -> &WidgetManager<F::Surface> {
        &self.widgets
    }

    pub fn topmost(&self) -> bool {
        self.topmost
    }

    #[cfg(test)]
    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Registers a picked file. A blank `name` falls back to the file name.
    pub fn add_asset(&mut self, path: &str, name: Option<&str>) -> AssetId {
        let (name, animated) = describe_file(path, name);
        let id = self.registry.add(path, name, animated).id;
        info!("[MASCOT][ASSETS] Added '{path}' (animated={animated})");
        self.persist();
        id
    }

    /// Removes the asset at `index` and every mascot showing it.
    pub fn remove_asset(&mut self, index: usize) -> Option<AssetDescriptor> {
        let removed = self.registry.remove(index)?;
        let bound = self.widgets.bound_to(removed.id);
        for id in &bound {
            self.widgets.destroy(*id);
            self.drag.forget(*id);
        }
        info!(
            "[MASCOT][ASSETS] Removed '{}' and {} mascot(s) showing it",
            removed.name,
            bound.len()
        );
        self.persist();
        Some(removed)
    }

    pub fn remove_asset_by_id(&mut self, id: AssetId) -> bool {
        match self.registry.index_of(id) {
            Some(index) => self.remove_asset(index).is_some(),
            None => false,
        }
    }

    pub fn spawn(&mut self, asset: AssetId) -> Option<WidgetId> {
        let descriptor = self.registry.get(asset)?;
        match self
            .widgets
            .spawn(Some(descriptor), self.topmost, &mut self.factory)
        {
            Ok(id) => {
                info!("[MASCOT][WIDGETS] Spawned {id} showing '{}'", descriptor.name);
                self.persist();
                Some(id)
            }
            Err(e) => {
                error!("[MASCOT][WIDGETS] Failed to spawn '{}': {e}", descriptor.name);
                None
            }
        }
    }

    pub fn remove_widget(&mut self, id: WidgetId) -> bool {
        if !self.widgets.destroy(id) {
            return false;
        }
        self.drag.forget(id);
        self.persist();
        true
    }

    pub fn remove_all_widgets(&mut self) -> usize {
        let count = self.widgets.destroy_all();
        self.drag.release();
        self.persist();
        count
    }

    pub fn rebind(&mut self, widget: WidgetId, asset: AssetId) -> bool {
        let Some(descriptor) = self.registry.get(asset) else {
            return false;
        };
        if !self.widgets.rebind(widget, descriptor) {
            return false;
        }
        self.persist();
        true
    }

    pub fn set_topmost(&mut self, topmost: bool) {
        self.topmost = topmost;
        self.widgets.set_topmost(topmost);
        self.persist();
    }

    pub fn toggle_topmost(&mut self) -> bool {
        self.set_topmost(!self.topmost);
        self.topmost
    }

    pub fn focus(&mut self, widget: WidgetId) -> bool {
        self.widgets.focus(widget)
    }

    pub fn begin_drag(&mut self, widget: WidgetId, cursor: Position) -> bool {
        let Some(position) = self.widgets.get(widget).map(|w| w.position) else {
            return false;
        };
        self.drag.press(widget, cursor, position);
        true
    }

    pub fn drag_motion(&mut self, cursor: Position) -> bool {
        match self.drag.motion(cursor) {
            Some((id, position)) => self.drag_to(id, position),
            None => false,
        }
    }

    /// Moves a mascot without touching the session; used while a drag is live.
    pub fn drag_to(&mut self, widget: WidgetId, position: Position) -> bool {
        self.widgets.reposition(widget, position)
    }

    /// Ends the gesture and records the final position.
    pub fn end_drag(&mut self) -> bool {
        if self.drag.release().is_none() {
            return false;
        }
        self.persist();
        true
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.drag.dragging().is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active_widgets = self
            .widgets
            .list()
            .filter_map(|w: &WidgetInstance| {
                let index = self.registry.index_of(w.asset?)?;
                Some(ActiveWidget::new(index, w.position))
            })
            .collect();

        SessionSnapshot {
            assets: self.registry.to_stored(),
            topmost: self.topmost,
            active_widgets,
        }
    }

    /// Write failures are logged and otherwise ignored.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            error!("[MASCOT][SESSION] {e}");
        }
    }

    pub fn handle(&mut self, action: MenuAction) -> ShellRequest {
        match action {
            MenuAction::AddAssets => return ShellRequest::PickAssets,
            MenuAction::Exit => return ShellRequest::Quit,
            MenuAction::Spawn(asset) => {
                self.spawn(asset);
            }
            MenuAction::FocusWidget(widget) => {
                self.focus(widget);
            }
            MenuAction::RemoveWidget(widget) => {
                self.remove_widget(widget);
            }
            MenuAction::RemoveAsset(asset) => {
                self.remove_asset_by_id(asset);
            }
            MenuAction::RemoveAllWidgets => {
                self.remove_all_widgets();
            }
            MenuAction::ToggleTopmost => {
                self.toggle_topmost();
            }
            MenuAction::Rebind(widget, asset) => {
                self.rebind(widget, asset);
            }
        }
        ShellRequest::None
    }

    pub fn tray_menu(&self) -> Vec<MenuNode> {
        menu::tray_menu(&self.registry, &self.widgets, self.topmost)
    }

    pub fn context_menu(&self, widget: WidgetId) -> Vec<MenuNode> {
        menu::context_menu(&self.registry, widget)
    }

    pub fn widget_for_surface(&self, pred: impl Fn(&F::Surface) -> bool) -> Option<WidgetId> {
        self.widgets.find_surface(pred)
    }

    pub fn tick(&mut self, now: Instant) {
        self.widgets.tick(now);
    }

    pub fn finalize_pending(&mut self) -> usize {
        self.widgets.finalize_pending()
    }

    /// Saves the live session, then tears every mascot down without saving again
    /// so the next launch brings them back.
    pub fn shutdown(&mut self) {
        self.persist();
        self.drag.release();
        let count = self.widgets.destroy_all();
        self.widgets.finalize_pending();
        info!("[MASCOT] Shut down with {count} mascot(s) saved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loaders::session::{tests::unique_tmp_dir, StoredAsset, StoredPosition};
    use crate::mascot::widget::tests::{Call, FakeFactory};
    use std::path::PathBuf;

    struct Fixture {
        dir: PathBuf,
        app: MascotApp<FakeFactory>,
    }

    impl Fixture {
        fn new(prefix: &str) -> Self {
            let dir = unique_tmp_dir(prefix);
            let store = SessionStore::new(dir.join("mascot_config.json"));
            let app = MascotApp::new(FakeFactory::default(), store, &MascotSettings::default());
            Self { dir, app }
        }

        fn reload(&self) -> SessionSnapshot {
            SessionStore::new(self.dir.join("mascot_config.json")).load()
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn stored(path: &str, name: &str) -> StoredAsset {
        StoredAsset {
            path: path.into(),
            name: name.into(),
            is_gif: false,
        }
    }

    fn saved(index: Option<i64>, x: i32, y: i32) -> ActiveWidget {
        ActiveWidget {
            asset_index: index,
            position: StoredPosition { x, y },
        }
    }

    #[test]
    fn spawning_and_removing_an_asset_end_to_end() {
        let mut fx = Fixture::new("app_scenario");
        let a = fx.app.add_asset("/x/a.png", Some("A"));

        let first = fx.app.spawn(a).expect("spawn");
        let snapshot = fx.reload();
        assert_eq!(snapshot.assets, vec![stored("/x/a.png", "A")]);
        assert_eq!(snapshot.active_widgets, vec![ActiveWidget::new(0, (0, 0))]);

        let second = fx.app.spawn(a).expect("spawn");
        assert_eq!(fx.app.widgets().get(second).map(|w| w.position), Some((20, 20)));

        assert!(fx.app.remove_asset(0).is_some());
        assert!(fx.app.widgets().get(first).is_none());
        assert!(fx.app.widgets().get(second).is_none());
        let snapshot = fx.reload();
        assert!(snapshot.assets.is_empty());
        assert!(snapshot.active_widgets.is_empty());
    }

    #[test]
    fn duplicate_assets_cascade_independently() {
        let mut fx = Fixture::new("app_duplicates");
        let first = fx.app.add_asset("/x/a.png", Some("A"));
        let second = fx.app.add_asset("/x/a.png", Some("A"));
        fx.app.spawn(first).expect("spawn");
        let keep = fx.app.spawn(second).expect("spawn");

        fx.app.remove_asset(0);
        let live: Vec<_> = fx.app.widgets().list().map(|w| w.id).collect();
        assert_eq!(live, vec![keep]);
        assert_eq!(fx.reload().active_widgets, vec![ActiveWidget::new(0, (20, 20))]);
    }

    #[test]
    fn removing_an_invalid_index_is_a_no_op() {
        let mut fx = Fixture::new("app_bad_index");
        let a = fx.app.add_asset("/x/a.png", None);
        fx.app.spawn(a).expect("spawn");
        assert!(fx.app.remove_asset(3).is_none());
        assert_eq!(fx.app.registry().len(), 1);
        assert_eq!(fx.app.widgets().len(), 1);
        assert_eq!(fx.app.registry().list()[0].name, "a.png");
    }

    #[test]
    fn restore_skips_only_invalid_entries() {
        let mut fx = Fixture::new("app_restore");
        let snapshot = SessionSnapshot {
            assets: vec![stored("/a.png", "a"), stored("/b.png", "b")],
            topmost: false,
            active_widgets: vec![
                saved(Some(1), 10, 10),
                saved(Some(2), 99, 99),
                saved(Some(-1), 5, 5),
                saved(None, 6, 6),
                saved(Some(0), 30, 40),
            ],
        };

        assert_eq!(fx.app.load_snapshot(&snapshot), 2);
        assert!(!fx.app.topmost());
        let live: Vec<_> = fx.app.widgets().list().map(|w| (w.position, w.topmost)).collect();
        assert_eq!(live, vec![((10, 10), false), ((30, 40), false)]);
        assert_eq!(
            fx.app.snapshot().active_widgets,
            vec![ActiveWidget::new(1, (10, 10)), ActiveWidget::new(0, (30, 40))]
        );
    }

    #[test]
    fn bad_saved_mascot_does_not_cost_the_image_list() {
        let mut fx = Fixture::new("app_restore_lenient");
        std::fs::write(
            fx.dir.join("mascot_config.json"),
            r#"{ "image_list": [ { "path": "/a.png", "name": "a", "is_gif": false } ],
                 "last_mascots": [ { "image_index": 0, "position": null },
                                   { "image_index": 0, "position": { "x": 5, "y": 5 } } ] }"#,
        )
        .expect("write");

        let loaded = fx.reload();
        assert_eq!(fx.app.load_snapshot(&loaded), 2);
        let live: Vec<_> = fx.app.widgets().list().map(|w| w.position).collect();
        assert_eq!(live, vec![(0, 0), (5, 5)]);

        fx.app.persist();
        assert_eq!(fx.reload().assets, vec![stored("/a.png", "a")]);
    }

    #[test]
    fn restore_needs_assets_and_saved_mascots() {
        let mut fx = Fixture::new("app_restore_empty");
        let no_assets = SessionSnapshot {
            active_widgets: vec![saved(Some(0), 1, 1)],
            ..SessionSnapshot::default()
        };
        assert_eq!(fx.app.load_snapshot(&no_assets), 0);

        let no_mascots = SessionSnapshot {
            assets: vec![stored("/a.png", "a")],
            ..SessionSnapshot::default()
        };
        assert_eq!(fx.app.load_snapshot(&no_mascots), 0);
        assert!(fx.app.widgets().is_empty());
        assert!(!fx.dir.join("mascot_config.json").exists(), "restore must not write");
    }

    #[test]
    fn saved_session_round_trips_through_restore() {
        let mut fx = Fixture::new("app_roundtrip");
        let a = fx.app.add_asset("/x/a.png", Some("A"));
        let b = fx.app.add_asset("/x/b.gif", Some("B"));
        let wa = fx.app.spawn(a).expect("spawn");
        fx.app.spawn(b).expect("spawn");
        fx.app.drag_to(wa, (400, 300));
        fx.app.set_topmost(false);
        let before = fx.app.snapshot();
        fx.app.shutdown();

        let loaded = fx.reload();
        assert_eq!(loaded, before);

        let mut next = Fixture::new("app_roundtrip_next");
        assert_eq!(next.app.load_snapshot(&loaded), 2);
        assert_eq!(next.app.snapshot(), before);
    }

    #[test]
    fn shutdown_keeps_mascots_in_the_session() {
        let mut fx = Fixture::new("app_shutdown");
        let a = fx.app.add_asset("/x/a.png", None);
        fx.app.spawn(a).expect("spawn");
        fx.app.spawn(a).expect("spawn");
        fx.app.shutdown();

        assert!(fx.app.widgets().is_empty());
        assert_eq!(fx.app.widgets().pending_count(), 0);
        assert_eq!(fx.reload().active_widgets.len(), 2);
    }

    #[test]
    fn remove_all_clears_live_set_and_session() {
        let mut fx = Fixture::new("app_remove_all");
        let a = fx.app.add_asset("/x/a.png", None);
        for _ in 0..3 {
            fx.app.spawn(a).expect("spawn");
        }
        assert_eq!(fx.app.handle(MenuAction::RemoveAllWidgets), ShellRequest::None);
        assert!(fx.app.widgets().is_empty());
        assert!(fx.reload().active_widgets.is_empty());
        assert_eq!(fx.app.finalize_pending(), 3);
    }

    #[test]
    fn dragging_moves_the_widget_and_saves_on_release() {
        let mut fx = Fixture::new("app_drag");
        let a = fx.app.add_asset("/x/a.png", None);
        let id = fx.app.spawn(a).expect("spawn");

        assert!(fx.app.begin_drag(id, (10, 10)));
        assert!(fx.app.drag_motion((60, 110)));
        assert!(fx.app.drag_motion((70, 130)));
        assert_eq!(fx.reload().active_widgets[0].position, StoredPosition { x: 0, y: 0 });

        assert!(fx.app.end_drag());
        assert!(!fx.app.drag_motion((0, 0)));
        assert_eq!(fx.reload().active_widgets[0].position, StoredPosition { x: 60, y: 120 });
    }

    #[test]
    fn removing_the_dragged_widget_ends_the_gesture() {
        let mut fx = Fixture::new("app_drag_remove");
        let a = fx.app.add_asset("/x/a.png", None);
        let id = fx.app.spawn(a).expect("spawn");
        fx.app.begin_drag(id, (0, 0));
        fx.app.handle(MenuAction::RemoveWidget(id));
        assert!(!fx.app.is_dragging());
        assert!(!fx.app.end_drag());
    }

    #[test]
    fn menu_actions_reach_the_right_operations() {
        let mut fx = Fixture::new("app_actions");
        let a = fx.app.add_asset("/x/a.png", Some("A"));
        let b = fx.app.add_asset("/x/b.gif", Some("B"));

        assert_eq!(fx.app.handle(MenuAction::AddAssets), ShellRequest::PickAssets);
        assert_eq!(fx.app.handle(MenuAction::Exit), ShellRequest::Quit);

        fx.app.handle(MenuAction::Spawn(a));
        let id = fx.app.widgets().list().next().map(|w| w.id).expect("live");
        fx.app.handle(MenuAction::Rebind(id, b));
        assert_eq!(fx.app.widgets().get(id).and_then(|w| w.asset), Some(b));
        assert_eq!(fx.reload().active_widgets, vec![ActiveWidget::new(1, (0, 0))]);

        fx.app.handle(MenuAction::FocusWidget(id));
        assert!(fx.app.factory_mut().log.borrow().contains(&Call::Focus(id)));

        fx.app.handle(MenuAction::ToggleTopmost);
        assert!(!fx.app.topmost());
        assert!(!fx.reload().topmost);

        fx.app.handle(MenuAction::RemoveAsset(b));
        assert!(fx.app.widgets().is_empty());
        assert_eq!(fx.app.registry().len(), 1);
    }

    #[test]
    fn unwritable_session_does_not_fail_operations() {
        let dir = unique_tmp_dir("app_unwritable");
        // A directory where the file should be makes every save fail.
        let blocked = dir.join("mascot_config.json");
        std::fs::create_dir_all(blocked.join("inner")).expect("mkdir");
        let mut app = MascotApp::new(
            FakeFactory::default(),
            SessionStore::new(&blocked),
            &MascotSettings::default(),
        );

        let a = app.add_asset("/x/a.png", None);
        assert!(app.spawn(a).is_some());
        assert_eq!(app.widgets().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
