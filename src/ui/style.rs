use crate::common::color::Color;
use crate::common::config::CarouselSettings;
use crate::sys::host::BorderStyle;

/// Resolved drawing parameters shared by every element.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub font_size: u32,
    pub title_color: Color,
    pub header_background: Color,
    pub placeholder: Color,
    pub border_active: BorderStyle,
    pub border_inactive: BorderStyle,
    pub close_button: Color,
    pub backdrop: Color,
    pub blur: bool,
    pub dim: bool,
}

impl Style {
    pub fn from_settings(settings: &CarouselSettings) -> Self {
        let border = |gradient| BorderStyle {
            gradient,
            size: settings.border_size,
            rounding: settings.border_rounding,
            rounding_power: settings.border_rounding_power,
        };
        Self {
            font_size: settings.font_size,
            title_color: settings.title_color,
            header_background: Color::BLACK.with_alpha(0.2),
            placeholder: Color::new(0.1, 0.1, 0.1, 1.0),
            border_active: border(settings.border_active.clone()),
            border_inactive: border(settings.border_inactive.clone()),
            close_button: Color::new(0.9, 0.3, 0.3, 1.0),
            backdrop: Color::BLACK.with_alpha(settings.dim_amount as f32),
            blur: settings.blur,
            dim: settings.dim_enabled,
        }
    }

    pub fn border(&self, active: bool) -> &BorderStyle {
        if active { &self.border_active } else { &self.border_inactive }
    }
}

impl Default for Style {
    fn default() -> Self { Style::from_settings(&CarouselSettings::default()) }
}
