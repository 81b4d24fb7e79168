//! Flight records and the builder that produces them from form input.
//!
//! A [`FlightRecord`] can only be obtained through [`build_record`], so every
//! record in memory has a non-empty pilot and location and a landing time
//! strictly after its takeoff time. The duration is derived from the two
//! times and cannot be set on its own.

use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use crate::error::{RequiredField, ValidationError};

/// Aircraft models offered by the logbook form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aircraft {
    /// DJI Mavic 3 Enterprise.
    #[default]
    Mavic3E,
    /// DJI Mini 4 Pro.
    Mini4Pro,
    /// DJI Matrice 300.
    Matrice300,
    /// Anything not in the list.
    Other,
}

impl Aircraft {
    /// Every selectable model, in form order.
    pub const ALL: [Aircraft; 4] = [
        Self::Mavic3E,
        Self::Mini4Pro,
        Self::Matrice300,
        Self::Other,
    ];

    /// The label stored in the `Aeronave` column.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mavic3E => "DJI Mavic 3E",
            Self::Mini4Pro => "DJI Mini 4 Pro",
            Self::Matrice300 => "Matrice 300",
            Self::Other => "Otro",
        }
    }

    /// Look up a model by its stored label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|a| a.label() == label)
    }
}

impl fmt::Display for Aircraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Elapsed time between takeoff and landing.
///
/// Displays as `H:MM:SS`, hours unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FlightDuration(TimeDelta);

impl FlightDuration {
    /// Whole seconds in the air.
    #[must_use]
    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }
}

impl fmt::Display for FlightDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.num_seconds();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        write!(f, "{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Field values exactly as captured by the entry form.
///
/// Battery percentages are already constrained to 0..=100 by the input
/// widget; the builder trusts that range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFlightInput {
    /// Calendar date of the flight, local wall clock.
    pub date: NaiveDate,
    /// Pilot display name.
    pub pilot: String,
    /// Selected aircraft model.
    pub aircraft: Aircraft,
    /// Where the flight took place.
    pub location: String,
    /// Time of day the aircraft took off.
    pub takeoff_time: NaiveTime,
    /// Time of day the aircraft landed.
    pub landing_time: NaiveTime,
    /// Battery charge at takeoff, percent.
    pub battery_start: u8,
    /// Battery charge at landing, percent.
    pub battery_end: u8,
    /// Free-text observations.
    pub notes: String,
}

/// One validated, logged flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightRecord {
    date: NaiveDate,
    pilot: String,
    aircraft: Aircraft,
    location: String,
    takeoff_time: NaiveTime,
    landing_time: NaiveTime,
    duration: FlightDuration,
    battery_start: u8,
    battery_end: u8,
    notes: String,
}

impl FlightRecord {
    /// Flight date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Pilot name, trimmed.
    #[must_use]
    pub fn pilot(&self) -> &str {
        &self.pilot
    }

    /// Aircraft model.
    #[must_use]
    pub fn aircraft(&self) -> Aircraft {
        self.aircraft
    }

    /// Location, trimmed.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Takeoff time of day.
    #[must_use]
    pub fn takeoff_time(&self) -> NaiveTime {
        self.takeoff_time
    }

    /// Landing time of day.
    #[must_use]
    pub fn landing_time(&self) -> NaiveTime {
        self.landing_time
    }

    /// Time in the air.
    #[must_use]
    pub fn duration(&self) -> FlightDuration {
        self.duration
    }

    /// Battery percent at takeoff.
    #[must_use]
    pub fn battery_start(&self) -> u8 {
        self.battery_start
    }

    /// Battery percent at landing.
    #[must_use]
    pub fn battery_end(&self) -> u8 {
        self.battery_end
    }

    /// Observations, as entered.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// Validate raw form values and produce a normalized record.
///
/// Checks run in a fixed order and the first failing check wins:
///
/// 1. pilot and location must be non-empty after trimming; every empty one is
///    named in the error;
/// 2. landing must be strictly after takeoff on the flight date.
///
/// This function does no I/O and never returns a partially filled record.
///
/// # Errors
///
/// Returns [`ValidationError::MissingRequiredField`] or
/// [`ValidationError::InvalidTimeRange`].
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use dronelog::record::{build_record, Aircraft, RawFlightInput};
///
/// let raw = RawFlightInput {
///     date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
///     pilot: "Juan Pérez".to_string(),
///     aircraft: Aircraft::Mavic3E,
///     location: "Sector Norte".to_string(),
///     takeoff_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
///     landing_time: NaiveTime::from_hms_opt(8, 47, 0).unwrap(),
///     battery_start: 100,
///     battery_end: 25,
///     notes: String::new(),
/// };
///
/// let record = build_record(&raw).unwrap();
/// assert_eq!(record.duration().to_string(), "0:47:00");
/// ```
pub fn build_record(raw: &RawFlightInput) -> std::result::Result<FlightRecord, ValidationError> {
    let pilot = raw.pilot.trim();
    let location = raw.location.trim();

    let mut missing = Vec::new();
    if pilot.is_empty() {
        missing.push(RequiredField::Pilot);
    }
    if location.is_empty() {
        missing.push(RequiredField::Location);
    }
    if !missing.is_empty() {
        return Err(ValidationError::MissingRequiredField { fields: missing });
    }

    let takeoff = raw.date.and_time(raw.takeoff_time);
    let landing = raw.date.and_time(raw.landing_time);
    if landing <= takeoff {
        return Err(ValidationError::InvalidTimeRange { takeoff, landing });
    }

    Ok(FlightRecord {
        date: raw.date,
        pilot: pilot.to_string(),
        aircraft: raw.aircraft,
        location: location.to_string(),
        takeoff_time: raw.takeoff_time,
        landing_time: raw.landing_time,
        duration: FlightDuration(landing - takeoff),
        battery_start: raw.battery_start,
        battery_end: raw.battery_end,
        notes: raw.notes.clone(),
    })
}
