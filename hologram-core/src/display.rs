//! Presentation target for frames, captions and controls.

use crate::cue::Caption;
use crate::toggle::ToggleLabel;

/// Screen-edge caption region, one per pyramid face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptionRegion {
    Top,
    Bottom,
    Left,
    Right,
}

impl CaptionRegion {
    /// Every region, in broadcast order
    pub const ALL: [Self; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Renders the scene and presents captions and controls.
///
/// Scene geometry belongs to the implementation; the engine only tells it
/// when to draw and what to show.
pub trait DisplaySurface: Send {
    fn show_caption(&mut self, region: CaptionRegion, caption: &Caption<'_>);

    fn set_toggle_label(&mut self, label: ToggleLabel);

    fn set_time_readout(&mut self, readout: &str);

    fn render_frame(&mut self);
}

/// Push the same caption to every region
pub fn broadcast_caption(surface: &mut dyn DisplaySurface, caption: &Caption<'_>) {
    for region in CaptionRegion::ALL {
        surface.show_caption(region, caption);
    }
}
