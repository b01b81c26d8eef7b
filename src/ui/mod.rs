/// Dashboard widgets drawn with the iced canvas

use iced::Color;

pub mod chart;
pub mod overlay;

/// Stable color per category position, shared by the chart lines and the
/// detection overlay so a class keeps one color everywhere
pub fn category_color(index: usize) -> Color {
    match index % 6 {
        0 => Color::from_rgb(0.35, 0.65, 0.95), // blue
        1 => Color::from_rgb(0.95, 0.55, 0.25), // orange
        2 => Color::from_rgb(0.40, 0.85, 0.45), // green
        3 => Color::from_rgb(0.90, 0.35, 0.45), // red
        4 => Color::from_rgb(0.70, 0.50, 0.90), // purple
        _ => Color::from_rgb(0.85, 0.80, 0.35), // yellow
    }
}
