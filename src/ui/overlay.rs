/// Detection overlay for the frame viewer
/// Draws bounding boxes and class labels over the displayed image,
/// mapping image pixel coordinates into the widget bounds
use iced::widget::canvas::{self, Path, Stroke, Text};
use iced::{Point, Rectangle, Size};

use crate::source::BoundingBox;
use crate::ui::category_color;
use crate::Message;

#[derive(Debug, Clone)]
pub struct DetectionOverlay {
    boxes: Vec<BoundingBox>,
    /// Class labels, parallel to `boxes`
    labels: Vec<String>,
    /// Category order, so box colors match the chart lines
    categories: Vec<String>,
    image_width: f32,
    image_height: f32,
}

impl DetectionOverlay {
    pub fn new(
        boxes: Vec<BoundingBox>,
        labels: Vec<String>,
        categories: Vec<String>,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        DetectionOverlay {
            boxes,
            labels,
            categories,
            image_width: image_width as f32,
            image_height: image_height as f32,
        }
    }

    fn color_for_label(&self, label: Option<&String>) -> iced::Color {
        let index = label
            .and_then(|label| self.categories.iter().position(|c| c == label))
            .unwrap_or(0);
        category_color(index)
    }
}

impl canvas::Program<Message> for DetectionOverlay {
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

        if self.boxes.is_empty() || self.image_width < 1.0 || self.image_height < 1.0 {
            return vec![frame.into_geometry()];
        }

        // The image is displayed letterboxed (contain fit): one scale factor,
        // centered offsets
        let scale = (bounds.width / self.image_width).min(bounds.height / self.image_height);
        let offset_x = (bounds.width - self.image_width * scale) / 2.0;
        let offset_y = (bounds.height - self.image_height * scale) / 2.0;

        for (box_idx, bbox) in self.boxes.iter().enumerate() {
            let label = self.labels.get(box_idx);
            let color = self.color_for_label(label);

            let top_left = Point::new(
                offset_x + bbox.bbox_left * scale,
                offset_y + bbox.bbox_top * scale,
            );
            let size = Size::new(
                (bbox.bbox_right - bbox.bbox_left).max(0.0) * scale,
                (bbox.bbox_bottom - bbox.bbox_top).max(0.0) * scale,
            );

            let rect = Path::rectangle(top_left, size);
            frame.stroke(&rect, Stroke::default().with_color(color).with_width(1.5));

            if let Some(label) = label {
                frame.fill_text(Text {
                    content: label.clone(),
                    position: Point::new(top_left.x, (top_left.y - 14.0).max(0.0)),
                    color,
                    size: 11.0.into(),
                    ..Text::default()
                });
            }
        }

        vec![frame.into_geometry()]
    }
}
