use super::widget::{Position, WidgetId};

/// Left-button drag gesture. The grab offset is kept so the window follows the
/// cursor from wherever it was picked up.
#[derive(Debug, Default)]
pub struct DragTracker {
    active: Option<(WidgetId, Position)>,
}

impl DragTracker {
    pub fn press(&mut self, id: WidgetId, cursor: Position, window: Position) {
        self.active = Some((id, (cursor.0 - window.0, cursor.1 - window.1)));
    }

    pub fn motion(&self, cursor: Position) -> Option<(WidgetId, Position)> {
        let (id, offset) = self.active?;
        Some((id, (cursor.0 - offset.0, cursor.1 - offset.1)))
    }

    pub fn release(&mut self) -> Option<WidgetId> {
        self.active.take().map(|(id, _)| id)
    }

    pub fn dragging(&self) -> Option<WidgetId> {
        self.active.map(|(id, _)| id)
    }

    /// Drops the gesture if it belongs to a widget that went away.
    pub fn forget(&mut self, id: WidgetId) {
        if self.dragging() == Some(id) {
            self.active = None;
        }
    }
}
