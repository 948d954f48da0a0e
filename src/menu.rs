//! Menu trees generated from the current state. Rebuilt wholesale after every
//! change; the desktop shell turns them into native popup menus.

use crate::mascot::{
    asset::{AssetId, AssetRegistry},
    widget::{MascotSurface, WidgetId, WidgetManager},
};

pub const NO_IMAGES: &str = "No images";
pub const NO_ACTIVE_MASCOTS: &str = "No active mascots";
pub const UNNAMED_MASCOT: &str = "Unnamed mascot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddAssets,
    Spawn(AssetId),
    FocusWidget(WidgetId),
    RemoveWidget(WidgetId),
    RemoveAsset(AssetId),
    RemoveAllWidgets,
    ToggleTopmost,
    Rebind(WidgetId, AssetId),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuNode {
    Item {
        label: String,
        action: Option<MenuAction>,
        enabled: bool,
    },
    Check {
        label: String,
        action: MenuAction,
        checked: bool,
    },
    Submenu {
        label: String,
        children: Vec<MenuNode>,
    },
    Separator,
}

impl MenuNode {
    pub fn item(label: impl Into<String>, action: MenuAction) -> Self {
        Self::Item {
            label: label.into(),
            action: Some(action),
            enabled: true,
        }
    }

    pub fn disabled(label: impl Into<String>) -> Self {
        Self::Item {
            label: label.into(),
            action: None,
            enabled: false,
        }
    }

    pub fn submenu(label: impl Into<String>, children: Vec<MenuNode>) -> Self {
        Self::Submenu {
            label: label.into(),
            children,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Item { label, .. } | Self::Check { label, .. } | Self::Submenu { label, .. } => {
                Some(label)
            }
            Self::Separator => None,
        }
    }
}

/// Shows a disabled placeholder in place of an empty list.
fn or_placeholder(children: Vec<MenuNode>, placeholder: &str) -> Vec<MenuNode> {
    if children.is_empty() {
        vec![MenuNode::disabled(placeholder)]
    } else {
        children
    }
}

pub fn tray_menu<S: MascotSurface>(
    registry: &AssetRegistry,
    widgets: &WidgetManager<S>,
    topmost: bool,
) -> Vec<MenuNode> {
    let show = registry
        .list()
        .iter()
        .map(|a| MenuNode::item(a.name.clone(), MenuAction::Spawn(a.id)))
        .collect();

    let active = widgets
        .list()
        .enumerate()
        .map(|(i, w)| {
            let name = w
                .asset
                .and_then(|id| registry.get(id))
                .map(|a| a.name.as_str())
                .unwrap_or(UNNAMED_MASCOT);
            MenuNode::submenu(
                format!("{}: {}", i + 1, name),
                vec![
                    MenuNode::item("Go to", MenuAction::FocusWidget(w.id)),
                    MenuNode::item("Remove", MenuAction::RemoveWidget(w.id)),
                ],
            )
        })
        .collect();

    let manage = registry
        .list()
        .iter()
        .map(|a| {
            MenuNode::submenu(
                a.name.clone(),
                vec![MenuNode::item("Remove", MenuAction::RemoveAsset(a.id))],
            )
        })
        .collect();

    vec![
        MenuNode::item("Add images…", MenuAction::AddAssets),
        MenuNode::Separator,
        MenuNode::submenu("Show mascot", or_placeholder(show, NO_IMAGES)),
        MenuNode::submenu("Active mascots", or_placeholder(active, NO_ACTIVE_MASCOTS)),
        MenuNode::submenu("Manage images", or_placeholder(manage, NO_IMAGES)),
        MenuNode::Separator,
        MenuNode::Item {
            label: "Remove all mascots".into(),
            action: Some(MenuAction::RemoveAllWidgets),
            enabled: !widgets.is_empty(),
        },
        MenuNode::Separator,
        MenuNode::Check {
            label: "Always on top".into(),
            action: MenuAction::ToggleTopmost,
            checked: topmost,
        },
        MenuNode::Separator,
        MenuNode::item("Exit", MenuAction::Exit),
    ]
}

/// Right-click menu of a single mascot.
pub fn context_menu(registry: &AssetRegistry, widget: WidgetId) -> Vec<MenuNode> {
    let images = registry
        .list()
        .iter()
        .map(|a| MenuNode::item(a.name.clone(), MenuAction::Rebind(widget, a.id)))
        .collect();

    vec![
        MenuNode::submenu("Change image", or_placeholder(images, NO_IMAGES)),
        MenuNode::item("Remove this mascot", MenuAction::RemoveWidget(widget)),
    ]
}
