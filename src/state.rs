//! Menu state snapshot.

use crate::hardware::Device;
use crate::menu::MenuStateId;

/// A snapshot of the main menu at a point in time.
///
/// Use [`MainMenu::snapshot`](crate::MainMenu::snapshot) to obtain one.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuSnapshot {
    /// The screen currently shown.
    pub current: MenuStateId,
    /// The screen to enter on the next tick.
    pub next: MenuStateId,
    /// The connected audio device, if any.
    pub connected: Option<Device>,
    /// Whether the loading animation is running.
    pub is_loading: bool,
    /// Whether Up/Down was pressed within the quiet period.
    pub is_navigating: bool,
    /// Whether the background discovery thread is alive.
    pub discovery_running: bool,
    /// Root menu selection.
    pub root_index: usize,
    /// Bluetooth menu selection.
    pub bluetooth_index: usize,
    /// Volume menu selection.
    pub volume_index: usize,
    /// Bluetooth menu titles in display order.
    pub bluetooth_titles: Vec<String>,
    /// Whether the root menu hides its scroll arrows.
    pub root_arrows_hidden: bool,
}
