//! Button-driven OLED menus.

mod controller;

use std::ops::Range;

use embedded_graphics::prelude::Point;
use log::debug;

use crate::bitmap::Bitmap;
use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::graphics;

pub use controller::{MainMenu, MenuAction, MenuHardware};

/// Left margin of text rows.
const TEXT_LEFT: i32 = 4;

/// Glyph height of the menu font.
const TEXT_HEIGHT: i32 = 10;

/// The screens of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuStateId {
    /// Icon carousel: start, Bluetooth, volume.
    Root,
    /// Discovered Bluetooth devices.
    Bluetooth,
    /// Volume percentages.
    Volume,
}

/// What an element draws.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPayload {
    /// A bitmap centred in its row.
    Icon(Bitmap),
    /// A line of text, inverted when selected.
    Text(String),
}

/// One selectable entry.
#[derive(Debug, Clone)]
pub struct MenuElement<A> {
    payload: RenderPayload,
    title: String,
    action: A,
}

impl<A> MenuElement<A> {
    /// An icon entry.
    pub fn icon(image: Bitmap, title: impl Into<String>, action: A) -> Self {
        Self {
            payload: RenderPayload::Icon(image),
            title: title.into(),
            action,
        }
    }

    /// A text entry; the text doubles as the title.
    pub fn text(text: impl Into<String>, action: A) -> Self {
        let text = text.into();
        Self {
            payload: RenderPayload::Text(text.clone()),
            title: text,
            action,
        }
    }

    /// Identity of the entry across list refreshes.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Swap the icon image, e.g. to show a status glyph.
    pub fn set_icon(&mut self, image: Bitmap) {
        self.payload = RenderPayload::Icon(image);
    }
}

/// An ordered, navigable list of elements.
///
/// `select_index` always points at an element, or is 0 when the list is empty.
#[derive(Debug, Clone)]
pub struct Menu<A> {
    items: Vec<MenuElement<A>>,
    select_index: usize,
    row_height: u32,
    hide_arrows: bool,
}

impl<A: Clone> Menu<A> {
    /// Create a menu whose rows are `row_height` pixels tall.
    pub fn new(items: Vec<MenuElement<A>>, row_height: u32) -> Self {
        Self {
            items,
            select_index: 0,
            row_height: row_height.clamp(1, SCREEN_HEIGHT),
            hide_arrows: false,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the menu has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the selected element.
    pub fn select_index(&self) -> usize {
        self.select_index
    }

    /// Select `index`, clamped to the list.
    pub fn set_select_index(&mut self, index: usize) {
        self.select_index = index.min(self.items.len().saturating_sub(1));
    }

    /// The selected element, if any.
    pub fn selected(&self) -> Option<&MenuElement<A>> {
        self.items.get(self.select_index)
    }

    /// Mutable access to the selected element.
    pub fn selected_mut(&mut self) -> Option<&mut MenuElement<A>> {
        self.items.get_mut(self.select_index)
    }

    /// Element titles in display order.
    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|e| e.title.clone()).collect()
    }

    /// Whether scroll arrows are suppressed.
    pub fn hide_arrows(&self) -> bool {
        self.hide_arrows
    }

    /// Suppress or show the scroll arrows.
    pub fn set_hide_arrows(&mut self, hide: bool) {
        self.hide_arrows = hide;
    }

    /// Select the previous element, stopping at the first.
    pub fn move_up(&mut self) {
        self.select_index = self.select_index.saturating_sub(1);
    }

    /// Select the next element, stopping at the last.
    pub fn move_down(&mut self) {
        if self.select_index + 1 < self.items.len() {
            self.select_index += 1;
        }
    }

    /// The selected element's action, or `None` for an empty menu.
    pub fn select(&self) -> Option<A> {
        self.selected().map(|e| e.action.clone())
    }

    /// Replace the elements, keeping the selection on the same title if present.
    pub fn replace_items(&mut self, items: Vec<MenuElement<A>>) {
        let previous = self.selected().map(|e| e.title.clone());
        self.items = items;

        self.select_index = match previous {
            Some(title) => match self.items.iter().position(|e| e.title == title) {
                Some(index) => {
                    debug!("restored selection to \"{title}\" at index {index}");
                    index
                }
                None => {
                    debug!("\"{title}\" not found, reset to index 0");
                    0
                }
            },
            None => 0,
        };
    }

    /// Number of rows that fit on the screen.
    pub fn visible_rows(&self) -> usize {
        ((SCREEN_HEIGHT / self.row_height) as usize).max(1)
    }

    /// Indices of the elements currently on screen, keeping the selection in view.
    pub fn window(&self) -> Range<usize> {
        let rows = self.visible_rows();
        let len = self.items.len();
        if len <= rows {
            return 0..len;
        }
        let top = self.select_index.saturating_sub(rows / 2).min(len - rows);
        top..top + rows
    }

    /// Render the visible window.
    pub fn list_img(&self) -> Bitmap {
        let mut image = Bitmap::screen();
        let window = self.window();
        let row_height = self.row_height as i32;

        for (row, index) in window.clone().enumerate() {
            let top = row as i32 * row_height;
            match &self.items[index].payload {
                RenderPayload::Icon(icon) => {
                    let x = (SCREEN_WIDTH as i32 - icon.width() as i32) / 2;
                    let y = top + (row_height - icon.height() as i32) / 2;
                    image.blit(icon, x, y);
                }
                RenderPayload::Text(text) => {
                    let y = top + (row_height - TEXT_HEIGHT) / 2;
                    graphics::draw_text(&mut image, text, Point::new(TEXT_LEFT, y));
                    if index == self.select_index {
                        image.invert_rows(top as u32, self.row_height);
                    }
                }
            }
        }

        if !self.hide_arrows {
            if window.start > 0 {
                graphics::draw_arrow(&mut image, true);
            }
            if window.end < self.items.len() {
                graphics::draw_arrow(&mut image, false);
            }
        }
        image
    }
}
