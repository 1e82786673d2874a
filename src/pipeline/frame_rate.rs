/*!
 * Output frame-rate selection.
 */

use log::{debug, info};

use super::video_refs::ResolvedVideo;
use crate::errors::ToolError;
use crate::tools::FrameRateProbe;

/// Where the chosen frame rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsSource {
    /// Given by the caller
    Explicit,
    /// Probed from the first slide video
    Probed,
    /// Configured fallback
    Default,
}

/// Pick the output frame rate.
///
/// An explicit rate wins verbatim. Otherwise the first resolved video is
/// probed once and its rate rounded. Otherwise `default_fps` is used.
pub async fn resolve_fps(
    explicit: Option<u32>,
    videos: &[Option<ResolvedVideo>],
    probe: &dyn FrameRateProbe,
    default_fps: u32,
) -> Result<(u32, FpsSource), ToolError> {
    if let Some(fps) = explicit {
        debug!("Using explicit frame rate {}", fps);
        return Ok((fps, FpsSource::Explicit));
    }

    let Some(first) = videos.iter().flatten().next() else {
        debug!("No slide videos, using default frame rate {}", default_fps);
        return Ok((default_fps, FpsSource::Default));
    };

    let rate = probe.probe(&first.path).await?;
    let fps = round_rate(rate).ok_or_else(|| {
        ToolError::failed(
            "frame rate probe",
            format!("unusable frame rate {} for {:?}", rate, first.path),
        )
    })?;

    info!(
        "Detected {} fps from slide {} video ({:.3} native)",
        fps, first.slide_index, rate
    );
    Ok((fps, FpsSource::Probed))
}

fn round_rate(rate: f64) -> Option<u32> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let rounded = rate.round();
    if rounded < 1.0 || rounded > f64::from(u32::MAX) {
        return None;
    }
    Some(rounded as u32)
}
