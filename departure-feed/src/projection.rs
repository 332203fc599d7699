//! The display-ready view of a departure update.

use crate::departure::{Departure, Track};
use chrono_tz::Tz;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// How many departures per track make it onto the display.
const DEPARTURES_PER_TRACK: usize = 2;

/// Formatted departures for one track.
///
/// The [`Display`] form is the single summary line (entries joined with `", "`);
/// the entries are kept separately so they can be rotated as individual lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary(Vec<String>);

impl TrackSummary {
    pub fn entries(&self) -> &[String] {
        &self.0
    }
}

impl Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// Departures grouped by track, each group in feed order.
///
/// Rebuilt from scratch for every update; the feed always sends the full board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSnapshot(BTreeMap<Track, Vec<Departure>>);

impl TrackSnapshot {
    /// Groups departures by track without re-sorting them.
    pub fn from_departures(departures: Vec<Departure>) -> Self {
        Self(
            departures
                .into_iter()
                .into_group_map_by(|departure| departure.track.clone())
                .into_iter()
                .collect(),
        )
    }

    pub fn departures(&self, track: &Track) -> Option<&[Departure]> {
        self.0.get(track).map(Vec::as_slice)
    }
}

/// Track → summary, for every track present in the latest update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedProjection(BTreeMap<Track, TrackSummary>);

impl FormattedProjection {
    /// Formats the first two departures of every track in the snapshot.
    pub fn from_snapshot(snapshot: &TrackSnapshot, timezone: Tz) -> Self {
        let tracks = snapshot
            .0
            .iter()
            .map(|(track, departures)| {
                let entries = departures
                    .iter()
                    .take(DEPARTURES_PER_TRACK)
                    .map(|departure| format_departure(departure, timezone))
                    .collect();
                (track.clone(), TrackSummary(entries))
            })
            .collect();

        Self(tracks)
    }

    pub fn get(&self, track: &Track) -> Option<&TrackSummary> {
        self.0.get(track)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Formats a departure as `<destination> <HH:MM>[(!)][ (+N min)]`.
pub fn format_departure(departure: &Departure, timezone: Tz) -> String {
    let time = departure.expected.with_timezone(&timezone).format("%H:%M");
    let deviation = if departure.deviation { "(!)" } else { "" };
    let delay = departure.delay_minutes();

    if delay > 0 {
        format!("{} {time}{deviation} (+{delay} min)", departure.destination)
    } else {
        format!("{} {time}{deviation}", departure.destination)
    }
}
