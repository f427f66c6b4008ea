use chrono::NaiveDate;

/// One concert listing parsed out of a source file. Derived on demand for
/// rendering, never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcertEvent {
    pub date: NaiveDate,
    pub venue: String,
    pub city: String,
}

impl ConcertEvent {
    /// The per-event digest line, e.g.
    /// `> *Wednesday May 01, 2024* in Metropolis at Hall`.
    pub fn digest_line(&self) -> String {
        format!("> *{}* in {} at {}\n", format_event_date(self.date), self.city, self.venue)
    }
}

/// Formats a calendar date for human display: full weekday, full month,
/// zero-padded day, four-digit year.
pub fn format_event_date(date: NaiveDate) -> String {
    date.format("%A %B %d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_event_date, ConcertEvent};

    #[test]
    fn formats_full_weekday_month_day_year() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
        assert_eq!(format_event_date(date), "Wednesday May 01, 2024");
    }

    #[test]
    fn digest_line_places_date_city_and_venue() {
        let event = ConcertEvent {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date"),
            venue: "Hall".to_owned(),
            city: "Metropolis".to_owned(),
        };

        assert_eq!(event.digest_line(), "> *Wednesday May 01, 2024* in Metropolis at Hall\n");
    }
}
