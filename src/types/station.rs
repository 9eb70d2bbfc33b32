//! Survey stations as delivered by the positional solver

use serde::{Deserialize, Serialize};

use crate::error::CompareError;

/// One measured-depth sample of a directional survey.
///
/// North/East/TVD come from the external positional solver; this crate never
/// recomputes them for an original survey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Measured depth along the wellbore (m)
    pub md: f64,
    /// Inclination (deg, 0–180)
    pub inc: f64,
    /// Azimuth (deg, 0–360)
    pub azi: f64,
    /// Northing (m)
    pub north: f64,
    /// Easting (m)
    pub east: f64,
    /// True vertical depth, positive down (m)
    pub tvd: f64,
}

impl Station {
    fn is_finite(&self) -> bool {
        [self.md, self.inc, self.azi, self.north, self.east, self.tvd]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Which side of a comparison a survey was uploaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyRole {
    Primary,
    Reference,
}

impl std::fmt::Display for SurveyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyRole::Primary => write!(f, "primary"),
            SurveyRole::Reference => write!(f, "reference"),
        }
    }
}

/// An ordered, immutable sequence of stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub role: SurveyRole,
    #[serde(default)]
    pub name: Option<String>,
    pub stations: Vec<Station>,
}

impl Survey {
    pub fn new(id: impl Into<String>, role: SurveyRole, stations: Vec<Station>) -> Self {
        Self {
            id: id.into(),
            role,
            name: None,
            stations,
        }
    }

    /// Check the survey is usable for resampling.
    ///
    /// Stations must be non-empty, finite, strictly ascending in MD, with
    /// inclination in 0–180°. Azimuth is allowed to sit anywhere since it is
    /// normalised on use.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.stations.is_empty() {
            return Err(self.invalid("survey has no stations"));
        }

        for (i, station) in self.stations.iter().enumerate() {
            if !station.is_finite() {
                return Err(self.invalid(format!("station {i} contains a non-finite value")));
            }
            if !(0.0..=180.0).contains(&station.inc) {
                return Err(self.invalid(format!(
                    "station {i} inclination {:.3} outside 0-180 deg",
                    station.inc
                )));
            }
        }

        if let Some(i) = self
            .stations
            .windows(2)
            .position(|w| w[1].md <= w[0].md)
        {
            return Err(self.invalid(format!(
                "measured depth not strictly ascending at station {} ({:.3} after {:.3})",
                i + 1,
                self.stations[i + 1].md,
                self.stations[i].md
            )));
        }

        Ok(())
    }

    pub fn first_md(&self) -> Option<f64> {
        self.stations.first().map(|s| s.md)
    }

    pub fn last_md(&self) -> Option<f64> {
        self.stations.last().map(|s| s.md)
    }

    fn invalid(&self, reason: impl Into<String>) -> CompareError {
        CompareError::InvalidSurvey {
            survey_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Lightweight listing entry for a stored survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySummary {
    pub id: String,
    pub role: SurveyRole,
    pub name: Option<String>,
    pub station_count: usize,
    pub md_start: Option<f64>,
    pub md_end: Option<f64>,
}

impl From<&Survey> for SurveySummary {
    fn from(survey: &Survey) -> Self {
        Self {
            id: survey.id.clone(),
            role: survey.role,
            name: survey.name.clone(),
            station_count: survey.stations.len(),
            md_start: survey.first_md(),
            md_end: survey.last_md(),
        }
    }
}
