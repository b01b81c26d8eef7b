/// Cell counting result chart
/// One line per category, growing in lockstep with the displayed frame
use iced::widget::canvas::{self, Path, Stroke, Text};
use iced::{Color, Point, Rectangle};

use crate::state::series::SeriesRow;
use crate::ui::category_color;
use crate::Message;

/// Inner margin around the plot area, leaves room for the legend
const MARGIN: f32 = 24.0;

/// Chart of accumulated (timestamp, category, value) rows
#[derive(Debug, Clone)]
pub struct SeriesChart {
    rows: Vec<SeriesRow>,
    categories: Vec<String>,
}

impl SeriesChart {
    pub fn new(rows: Vec<SeriesRow>, categories: Vec<String>) -> Self {
        SeriesChart { rows, categories }
    }
}

impl canvas::Program<Message> for SeriesChart {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &iced::Renderer,
        _theme: &iced::Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let width = bounds.width;
        let height = bounds.height;

        // Axis baselines
        let axis_color = Color::from_rgba(1.0, 1.0, 1.0, 0.3);
        let axes = Path::new(|builder| {
            builder.move_to(Point::new(MARGIN, MARGIN));
            builder.line_to(Point::new(MARGIN, height - MARGIN));
            builder.line_to(Point::new(width - MARGIN, height - MARGIN));
        });
        frame.stroke(&axes, Stroke::default().with_color(axis_color).with_width(1.0));

        if self.rows.is_empty() {
            return vec![frame.into_geometry()];
        }

        // Time range across all rows; a single instant still needs a span
        let t_min = self.rows.iter().map(|r| r.timestamp).min().unwrap();
        let t_max = self.rows.iter().map(|r| r.timestamp).max().unwrap();
        let span_ms = (t_max - t_min).num_milliseconds().max(1) as f32;

        let v_max = self
            .rows
            .iter()
            .map(|r| r.value)
            .fold(0.0_f64, f64::max)
            .max(1.0) as f32;

        let plot_width = width - 2.0 * MARGIN;
        let plot_height = height - 2.0 * MARGIN;

        for (category_idx, category) in self.categories.iter().enumerate() {
            let points: Vec<Point> = self
                .rows
                .iter()
                .filter(|row| &row.category == category)
                .map(|row| {
                    let elapsed = (row.timestamp - t_min).num_milliseconds() as f32;
                    let x = MARGIN + (elapsed / span_ms) * plot_width;
                    let y = height - MARGIN - (row.value as f32 / v_max) * plot_height;
                    Point::new(x, y)
                })
                .collect();

            if points.is_empty() {
                continue;
            }

            let color = category_color(category_idx);

            let line = Path::new(|builder| {
                builder.move_to(points[0]);
                for point in &points[1..] {
                    builder.line_to(*point);
                }
            });
            frame.stroke(&line, Stroke::default().with_color(color).with_width(2.0));

            // Mark each sample so single-point series stay visible
            for point in &points {
                frame.fill(&Path::circle(*point, 2.5), color);
            }

            // Legend entry
            frame.fill_text(Text {
                content: category.clone(),
                position: Point::new(MARGIN + 8.0, 6.0 + category_idx as f32 * 14.0),
                color,
                size: 12.0.into(),
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}
