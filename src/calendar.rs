//! Fenêtres de temps du planning (jours ou heures), semaine commençant le lundi.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Day,
    Hour,
}

impl Granularity {
    /// Nombre d'unités de cette granularité dans un jour.
    pub fn units_per_day(self) -> i64 {
        match self {
            Granularity::Day => 1,
            Granularity::Hour => HOURS_PER_DAY,
        }
    }
}

/// Suite ordonnée de points adressables, tous espacés d'une unité.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    granularity: Granularity,
    points: Vec<NaiveDateTime>,
}

impl TimeRange {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
    pub fn points(&self) -> &[NaiveDateTime] {
        &self.points
    }
    pub fn first(&self) -> Option<NaiveDateTime> {
        self.points.first().copied()
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Lundi de la semaine contenant `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Génère la fenêtre de `number_of_days` jours commençant au lundi de `week_of`.
///
/// En granularité `Hour`, chaque jour produit 24 points. Une taille nulle ou
/// négative donne une fenêtre vide.
pub fn date_range(week_of: NaiveDate, number_of_days: i64, granularity: Granularity) -> TimeRange {
    let origin = week_start(week_of).and_time(NaiveTime::MIN);
    let count = number_of_days.max(0) * granularity.units_per_day();
    let points = (0..count)
        .map(|i| point_at(origin, i, granularity))
        .collect();
    TimeRange {
        granularity,
        points,
    }
}

/// Nombre signé d'unités entières entre `origin` et `point`.
pub fn offset_between(origin: NaiveDateTime, point: NaiveDateTime, granularity: Granularity) -> i64 {
    let delta = point - origin;
    match granularity {
        Granularity::Day => delta.num_days(),
        Granularity::Hour => delta.num_hours(),
    }
}

/// Inverse de [`offset_between`].
pub fn point_at(origin: NaiveDateTime, offset: i64, granularity: Granularity) -> NaiveDateTime {
    match granularity {
        Granularity::Day => origin + Duration::days(offset),
        Granularity::Hour => origin + Duration::hours(offset),
    }
}
