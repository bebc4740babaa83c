use eframe::egui::{self, Color32, Pos2, Sense, Stroke, Ui, Vec2};

use crate::prefs::{Theme, effective_dial_style};
use crate::render_loop::HandAngles;

#[derive(Debug, Clone, Copy)]
pub struct DialPalette {
    pub face: Color32,
    pub rim: Color32,
    pub ticks: Color32,
    pub hour_hand: Color32,
    pub minute_hand: Color32,
    pub second_hand: Color32,
}

impl DialPalette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                face: Color32::from_rgb(250, 250, 247),
                rim: Color32::from_rgb(52, 58, 64),
                ticks: Color32::from_rgb(73, 80, 87),
                hour_hand: Color32::from_rgb(33, 37, 41),
                minute_hand: Color32::from_rgb(52, 58, 64),
                second_hand: Color32::from_rgb(214, 51, 56),
            },
            Theme::Dark => Self {
                face: Color32::from_rgb(16, 24, 38),
                rim: Color32::from_rgb(161, 180, 201),
                ticks: Color32::from_rgb(161, 180, 201),
                hour_hand: Color32::from_rgb(226, 234, 246),
                minute_hand: Color32::from_rgb(190, 204, 222),
                second_hand: Color32::from_rgb(255, 214, 117),
            },
        }
    }
}

/// Point at `length` from `center`, `degrees` clockwise from twelve.
pub fn hand_tip(center: Pos2, length: f32, degrees: f64) -> Pos2 {
    let radians = degrees.to_radians() as f32;
    Pos2::new(
        center.x + length * radians.sin(),
        center.y - length * radians.cos(),
    )
}

pub fn paint_dial(
    ui: &mut Ui,
    hands: &HandAngles,
    dial_style: &str,
    palette: &DialPalette,
    diameter: f32,
) -> egui::Response {
    let (response, painter) = ui.allocate_painter(Vec2::splat(diameter), Sense::hover());
    let center = response.rect.center();
    let radius = diameter * 0.5 - 2.0;

    painter.circle_filled(center, radius, palette.face);
    painter.circle_stroke(center, radius, Stroke::new(3.0, palette.rim));

    match effective_dial_style(dial_style) {
        "modern" => {
            for hour in 0..12 {
                let degrees = f64::from(hour) * 30.0;
                painter.line_segment(
                    [
                        hand_tip(center, radius * 0.78, degrees),
                        hand_tip(center, radius * 0.92, degrees),
                    ],
                    Stroke::new(4.0, palette.ticks),
                );
            }
        }
        "minimal" => {
            for quarter in 0..4 {
                let degrees = f64::from(quarter) * 90.0;
                painter.circle_filled(hand_tip(center, radius * 0.86, degrees), 3.5, palette.ticks);
            }
        }
        _ => {
            for minute in 0..60 {
                let degrees = f64::from(minute) * 6.0;
                let (inner, width) = if minute % 5 == 0 {
                    (0.82, 2.5)
                } else {
                    (0.9, 1.0)
                };
                painter.line_segment(
                    [
                        hand_tip(center, radius * inner, degrees),
                        hand_tip(center, radius * 0.95, degrees),
                    ],
                    Stroke::new(width, palette.ticks),
                );
            }
        }
    }

    painter.line_segment(
        [center, hand_tip(center, radius * 0.5, hands.hour_deg)],
        Stroke::new(5.0, palette.hour_hand),
    );
    painter.line_segment(
        [center, hand_tip(center, radius * 0.72, hands.minute_deg)],
        Stroke::new(3.0, palette.minute_hand),
    );
    painter.line_segment(
        [center, hand_tip(center, radius * 0.85, hands.second_deg)],
        Stroke::new(1.5, palette.second_hand),
    );
    painter.circle_filled(center, 4.0, palette.second_hand);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn hand_tip_follows_clock_face() {
        let center = Pos2::new(100.0, 100.0);
        assert!(close(hand_tip(center, 10.0, 0.0), Pos2::new(100.0, 90.0)));
        assert!(close(hand_tip(center, 10.0, 90.0), Pos2::new(110.0, 100.0)));
        assert!(close(hand_tip(center, 10.0, 180.0), Pos2::new(100.0, 110.0)));
        assert!(close(hand_tip(center, 10.0, 270.0), Pos2::new(90.0, 100.0)));
    }
}
