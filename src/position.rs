//! Projection d'une réservation sur une fenêtre de temps (barre de Gantt).

use crate::calendar::{offset_between, TimeRange};
use crate::model::Booking;
use chrono::{NaiveDate, NaiveTime};

/// Élément à placer : premier jour et durée en jours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: NaiveDate,
    pub duration_days: i64,
}

impl From<&Booking> for Span {
    fn from(b: &Booking) -> Self {
        Self {
            start: b.start,
            duration_days: i64::from(b.duration_days),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub offset: f64,
    pub length: f64,
}

/// Position de `item` dans `range`, rognée à la partie visible.
///
/// `None` si aucune unité de l'élément ne tombe dans la fenêtre. Une durée
/// inférieure à un jour compte pour un jour.
pub fn map_to_position(item: Span, range: &TimeRange, unit_width: f64) -> Option<Position> {
    let origin = range.first()?;
    let granularity = range.granularity();
    let len = range.len() as i64;

    let start_index = offset_between(origin, item.start.and_time(NaiveTime::MIN), granularity);
    let units = item.duration_days.max(1) * granularity.units_per_day();

    let visible_start = start_index.max(0);
    let visible_end = (start_index + units).min(len);
    if visible_end <= visible_start {
        return None;
    }

    Some(Position {
        offset: visible_start as f64 * unit_width,
        length: (visible_end - visible_start) as f64 * unit_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{date_range, Granularity};

    // 2025-01-06 est un lundi
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn span(offset_days: i64, duration_days: i64) -> Span {
        Span {
            start: monday() + chrono::Duration::days(offset_days),
            duration_days,
        }
    }

    #[test]
    fn item_starting_before_range_is_clipped() {
        let range = date_range(monday(), 10, Granularity::Day);
        let pos = map_to_position(span(-2, 5), &range, 20.0).unwrap();
        assert_eq!(pos.offset, 0.0);
        assert_eq!(pos.length, 60.0);
    }

    #[test]
    fn item_after_range_is_invisible() {
        let range = date_range(monday(), 10, Granularity::Day);
        assert_eq!(map_to_position(span(10, 3), &range, 20.0), None);
        assert_eq!(map_to_position(span(42, 1), &range, 20.0), None);
    }

    #[test]
    fn item_ending_before_range_is_invisible() {
        let range = date_range(monday(), 10, Granularity::Day);
        assert_eq!(map_to_position(span(-5, 5), &range, 20.0), None);
        assert_eq!(map_to_position(span(-9, 3), &range, 20.0), None);
    }

    #[test]
    fn item_touching_first_day_is_visible() {
        let range = date_range(monday(), 10, Granularity::Day);
        let pos = map_to_position(span(-5, 6), &range, 20.0).unwrap();
        assert_eq!(pos.offset, 0.0);
        assert_eq!(pos.length, 20.0);
    }

    #[test]
    fn item_spanning_range_fills_it() {
        let range = date_range(monday(), 7, Granularity::Day);
        let pos = map_to_position(span(-3, 30), &range, 10.0).unwrap();
        assert_eq!(pos.offset, 0.0);
        assert_eq!(pos.length, 70.0);
    }

    #[test]
    fn item_overflowing_end_is_clipped() {
        let range = date_range(monday(), 7, Granularity::Day);
        let pos = map_to_position(span(5, 4), &range, 10.0).unwrap();
        assert_eq!(pos.offset, 50.0);
        assert_eq!(pos.length, 20.0);
    }

    #[test]
    fn non_positive_duration_counts_as_one_day() {
        let range = date_range(monday(), 7, Granularity::Day);
        let zero = map_to_position(span(2, 0), &range, 10.0).unwrap();
        let negative = map_to_position(span(2, -4), &range, 10.0).unwrap();
        assert_eq!(zero, Position { offset: 20.0, length: 10.0 });
        assert_eq!(negative, zero);
    }

    #[test]
    fn hourly_range_scales_days_to_hours() {
        let range = date_range(monday(), 2, Granularity::Hour);
        let pos = map_to_position(span(1, 3), &range, 2.0).unwrap();
        assert_eq!(pos.offset, 48.0);
        assert_eq!(pos.length, 48.0);
    }

    #[test]
    fn empty_range_shows_nothing() {
        let range = date_range(monday(), 0, Granularity::Day);
        assert_eq!(map_to_position(span(0, 3), &range, 10.0), None);
    }
}
