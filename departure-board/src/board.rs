use departure_feed::{FormattedProjection, Track, TrackSummary};

/// Picks one track out of each projection and reports when it changes.
///
/// The feed re-sends the full board on every update,
/// and restarting the display rotation for identical content would make it stutter.
#[derive(Debug)]
pub struct TrackBoard {
    track: Track,
    shown: Option<TrackSummary>,
}

impl TrackBoard {
    pub fn new(track: Track) -> Self {
        Self { track, shown: None }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Returns the lines to display if our track's departures differ from what is shown.
    ///
    /// Projections without our track leave the display as it is.
    pub fn accept(&mut self, projection: &FormattedProjection) -> Option<Vec<String>> {
        let summary = projection.get(&self.track)?;
        if self.shown.as_ref() == Some(summary) {
            return None;
        }

        self.shown = Some(summary.clone());
        Some(summary.entries().to_vec())
    }
}
