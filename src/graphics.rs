//! Fixed glyphs used by the menu and the test.

use embedded_graphics::geometry::Angle;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Arc, Circle, Line, PrimitiveStyle, Rectangle, Triangle};
use embedded_graphics::text::{Baseline, Text};

use crate::bitmap::Bitmap;
use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Side length of the square root-menu icons.
pub const ICON_SIZE: u32 = 40;

/// Number of frames in the loading animation.
pub const LOADING_FRAME_COUNT: usize = 8;

fn stroke(width: u32) -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_stroke(BinaryColor::On, width)
}

fn fill() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::On)
}

fn paint<T>(target: &mut Bitmap, item: &T)
where
    T: Drawable<Color = BinaryColor>,
{
    let _ = item.draw(target);
}

/// Draw `text` with its top-left corner at `origin`.
pub fn draw_text(target: &mut Bitmap, text: &str, origin: Point) {
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    paint(target, &Text::with_baseline(text, origin, style, Baseline::Top));
}

/// Play triangle.
pub fn start_icon() -> Bitmap {
    let mut icon = Bitmap::new(ICON_SIZE, ICON_SIZE);
    paint(
        &mut icon,
        &Triangle::new(Point::new(10, 4), Point::new(10, 35), Point::new(34, 20))
            .into_styled(fill()),
    );
    icon
}

/// The Bluetooth rune.
pub fn bluetooth_icon() -> Bitmap {
    let mut icon = Bitmap::new(ICON_SIZE, ICON_SIZE);
    let s = stroke(2);
    let top = Point::new(20, 4);
    let bottom = Point::new(20, 35);
    paint(&mut icon, &Line::new(top, bottom).into_styled(s));
    paint(&mut icon, &Line::new(top, Point::new(29, 12)).into_styled(s));
    paint(
        &mut icon,
        &Line::new(Point::new(29, 12), Point::new(11, 27)).into_styled(s),
    );
    paint(&mut icon, &Line::new(bottom, Point::new(29, 27)).into_styled(s));
    paint(
        &mut icon,
        &Line::new(Point::new(29, 27), Point::new(11, 12)).into_styled(s),
    );
    icon
}

/// Speaker with sound waves.
pub fn volume_icon() -> Bitmap {
    let mut icon = Bitmap::new(ICON_SIZE, ICON_SIZE);
    paint(&mut icon, &Rectangle::new(Point::new(4, 14), Size::new(7, 12)).into_styled(fill()));
    paint(
        &mut icon,
        &Triangle::new(Point::new(10, 14), Point::new(20, 5), Point::new(20, 34))
            .into_styled(fill()),
    );
    paint(
        &mut icon,
        &Arc::new(
            Point::new(14, 12),
            16,
            Angle::from_degrees(-50.0),
            Angle::from_degrees(100.0),
        )
        .into_styled(stroke(2)),
    );
    paint(
        &mut icon,
        &Arc::new(
            Point::new(10, 6),
            28,
            Angle::from_degrees(-50.0),
            Angle::from_degrees(100.0),
        )
        .into_styled(stroke(2)),
    );
    icon
}

/// Overlay a check mark in the bottom-right corner.
pub fn check(mut icon: Bitmap) -> Bitmap {
    let (w, h) = (icon.width() as i32, icon.height() as i32);
    let s = stroke(2);
    paint(
        &mut icon,
        &Line::new(Point::new(w - 12, h - 6), Point::new(w - 8, h - 2)).into_styled(s),
    );
    paint(
        &mut icon,
        &Line::new(Point::new(w - 8, h - 2), Point::new(w - 1, h - 11)).into_styled(s),
    );
    icon
}

/// Overlay a cross in the bottom-right corner.
pub fn cross(mut icon: Bitmap) -> Bitmap {
    let (w, h) = (icon.width() as i32, icon.height() as i32);
    let s = stroke(2);
    paint(
        &mut icon,
        &Line::new(Point::new(w - 10, h - 10), Point::new(w - 1, h - 1)).into_styled(s),
    );
    paint(
        &mut icon,
        &Line::new(Point::new(w - 1, h - 10), Point::new(w - 10, h - 1)).into_styled(s),
    );
    icon
}

/// Small scroll arrow at the right edge, top or bottom.
pub fn draw_arrow(target: &mut Bitmap, up: bool) {
    let x = target.width() as i32 - 8;
    let arrow = if up {
        Triangle::new(Point::new(x, 6), Point::new(x + 6, 6), Point::new(x + 3, 1))
    } else {
        let b = target.height() as i32 - 2;
        Triangle::new(Point::new(x, b - 5), Point::new(x + 6, b - 5), Point::new(x + 3, b))
    };
    paint(target, &arrow.into_styled(fill()));
}

/// A ring of dots with one filled, advancing one position per frame.
pub fn loading_frames() -> Vec<Bitmap> {
    let center = Point::new(SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);
    let radius = 20.0_f32;
    let dot = 7;

    (0..LOADING_FRAME_COUNT)
        .map(|active| {
            let mut frame = Bitmap::screen();
            for k in 0..LOADING_FRAME_COUNT {
                let angle = k as f32 * std::f32::consts::TAU / LOADING_FRAME_COUNT as f32;
                let x = center.x + (radius * angle.cos()).round() as i32;
                let y = center.y + (radius * angle.sin()).round() as i32;
                let circle = Circle::with_center(Point::new(x, y), dot);
                let style = if k == active { fill() } else { stroke(1) };
                paint(&mut frame, &circle.into_styled(style));
            }
            frame
        })
        .collect()
}

/// Landolt ring, gap facing right, centred on the screen.
pub fn optotype() -> Bitmap {
    let mut frame = Bitmap::screen();
    let diameter = 50;
    let center = Point::new(SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);
    paint(&mut frame, &Circle::with_center(center, diameter).into_styled(stroke(10)));
    paint(
        &mut frame,
        &Rectangle::new(Point::new(center.x, center.y - 5), Size::new(diameter, 10))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off)),
    );
    frame
}
