//! Display surface that writes to the log instead of a screen.

use hologram_core::{Caption, CaptionRegion, DisplaySurface, ToggleLabel};
use std::collections::HashMap;
use tracing::{debug, info, trace};

const LOG_TARGET: &str = "hologram::display";

/// Logs caption, control and readout changes.
///
/// Every region receives the same caption, so only the top one is logged at
/// info level.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    captions: HashMap<CaptionRegion, String>,
    frames: u64,
}

impl ConsoleSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySurface for ConsoleSurface {
    fn show_caption(&mut self, region: CaptionRegion, caption: &Caption<'_>) {
        if self.captions.get(&region).map(String::as_str) == Some(caption.text) {
            return;
        }
        self.captions.insert(region, caption.text.to_string());

        if region != CaptionRegion::Top {
            trace!(target: LOG_TARGET, "{} caption: {:?}", region.as_str(), caption.text);
        } else if caption.is_blank() {
            info!(target: LOG_TARGET, "(caption cleared)");
        } else {
            info!(target: LOG_TARGET, "[{}] {}", caption.color, caption.text);
        }
    }

    fn set_toggle_label(&mut self, label: ToggleLabel) {
        info!(target: LOG_TARGET, "Toggle: {}", label);
    }

    fn set_time_readout(&mut self, readout: &str) {
        debug!(target: LOG_TARGET, "{}", readout);
    }

    fn render_frame(&mut self) {
        self.frames += 1;
        trace!(target: LOG_TARGET, "frame {}", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_caption_per_region() {
        let mut surface = ConsoleSurface::new();
        let caption = Caption {
            text: "Hello",
            color: "white",
        };
        hologram_core::broadcast_caption(&mut surface, &caption);

        assert_eq!(surface.captions.len(), 4);
        assert!(surface.captions.values().all(|text| text == "Hello"));

        surface.show_caption(
            CaptionRegion::Left,
            &Caption {
                text: "",
                color: "white",
            },
        );
        assert_eq!(surface.captions[&CaptionRegion::Left], "");
        assert_eq!(surface.captions[&CaptionRegion::Top], "Hello");
    }

    #[test]
    fn test_counts_frames() {
        let mut surface = ConsoleSurface::new();
        surface.render_frame();
        surface.render_frame();
        assert_eq!(surface.frames, 2);
    }
}
