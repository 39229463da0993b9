use std::fmt;

use time::OffsetDateTime;

/// An ISO-8601 week of a week-based year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u8,
}

impl IsoWeek {
    pub fn new(year: i32, week: u8) -> Self {
        Self { year, week }
    }

    pub fn current() -> Self {
        Self::of(OffsetDateTime::now_utc())
    }

    pub fn of(at: OffsetDateTime) -> Self {
        let (year, week, _) = at.to_iso_week_date();
        Self { year, week }
    }

    /// The week before this one. Week 1 wraps to week 52 of the previous year.
    pub fn previous(self) -> Self {
        if self.week <= 1 {
            Self {
                year: self.year - 1,
                week: 52,
            }
        } else {
            Self {
                year: self.year,
                week: self.week - 1,
            }
        }
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.week, self.year)
    }
}
