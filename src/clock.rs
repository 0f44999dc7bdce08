//! Time keeping and clock text formatting

use core::{
    fmt::Write,
    ops::{BitOr, BitOrAssign},
};

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use heapless::String;

/// Capacity of the time text, "HH:MM"
pub const TIME_LEN: usize = 5;
/// Capacity of the day and month texts
pub const DATE_LEN: usize = 40;

pub type TimeText = String<TIME_LEN>;
pub type DateText = String<DATE_LEN>;

/// Source of local wall-clock time and tick events
pub trait Clock {
    /// Current local time
    fn now(&self) -> NaiveDateTime;

    /// Whether the user prefers a 24 hour clock
    fn is_24h_style(&self) -> bool;

    /// Start delivering ticks whenever one of `units` changes
    fn subscribe(&mut self, units: TickUnits);

    /// Stop delivering ticks
    fn unsubscribe(&mut self);
}

/// Hour display style
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockFormat {
    #[default]
    TwentyFourHour,
    TwelveHour,
}

impl ClockFormat {
    pub fn from_24h_style(is_24h: bool) -> Self {
        if is_24h {
            Self::TwentyFourHour
        } else {
            Self::TwelveHour
        }
    }

    /// Hour of the day as shown on the dial
    pub fn display_hour(self, hour: u32) -> u32 {
        match self {
            Self::TwentyFourHour => hour,
            Self::TwelveHour => match hour % 12 {
                0 => 12,
                h => h,
            },
        }
    }
}

/// Language used for weekday and month names
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Locale {
    #[default]
    EnUs,
    FrFr,
    DeDe,
    EsEs,
}

const WEEKDAYS_EN: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const WEEKDAYS_FR: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];
const WEEKDAYS_DE: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];
const WEEKDAYS_ES: [&str; 7] = [
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
    "domingo",
];

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];
const MONTHS_DE: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];
const MONTHS_ES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

impl Locale {
    /// Pick a locale from a tag such as `fr_FR`, `de-DE` or `es`.
    ///
    /// Only the language part is looked at. Unknown languages fall back to
    /// English.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag.split(['_', '-']).next().unwrap_or_default();
        if language.eq_ignore_ascii_case("fr") {
            Self::FrFr
        } else if language.eq_ignore_ascii_case("de") {
            Self::DeDe
        } else if language.eq_ignore_ascii_case("es") {
            Self::EsEs
        } else {
            Self::EnUs
        }
    }

    pub fn weekday_name(self, weekday: Weekday) -> &'static str {
        let names = match self {
            Self::EnUs => &WEEKDAYS_EN,
            Self::FrFr => &WEEKDAYS_FR,
            Self::DeDe => &WEEKDAYS_DE,
            Self::EsEs => &WEEKDAYS_ES,
        };
        names[weekday.num_days_from_monday() as usize]
    }

    /// Name of the month, `month0` counting from zero
    pub fn month_name(self, month0: u32) -> &'static str {
        let names = match self {
            Self::EnUs => &MONTHS_EN,
            Self::FrFr => &MONTHS_FR,
            Self::DeDe => &MONTHS_DE,
            Self::EsEs => &MONTHS_ES,
        };
        names[month0 as usize % 12]
    }
}

/// Format the time as "HH:MM" in the given hour style
pub fn format_time(time: &NaiveDateTime, format: ClockFormat) -> TimeText {
    let mut text = TimeText::new();
    // Two zero padded fields and a colon always fit
    let _ = write!(
        text,
        "{:02}:{:02}",
        format.display_hour(time.hour()),
        time.minute()
    );
    text
}

/// Format the day line, e.g. "Monday 05"
pub fn format_day(time: &NaiveDateTime, locale: Locale) -> DateText {
    let mut text = DateText::new();
    let _ = write!(
        text,
        "{} {:02}",
        locale.weekday_name(time.weekday()),
        time.day()
    );
    text
}

/// Format the month line, e.g. "June 2024"
pub fn format_month(time: &NaiveDateTime, locale: Locale) -> DateText {
    let mut text = DateText::new();
    let _ = write!(
        text,
        "{} {}",
        locale.month_name(time.month0()),
        time.year()
    );
    text
}

/// Texts derived from the current time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockState {
    pub time: TimeText,
    pub day: DateText,
    pub month: DateText,
}

impl ClockState {
    pub fn new(now: &NaiveDateTime, format: ClockFormat, locale: Locale) -> Self {
        Self {
            time: format_time(now, format),
            day: format_day(now, locale),
            month: format_month(now, locale),
        }
    }
}

/// Set of time units, used both to subscribe to ticks and to report which
/// units changed since the previous tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickUnits(u8);

impl TickUnits {
    pub const NONE: Self = Self(0);
    pub const SECOND: Self = Self(1 << 0);
    pub const MINUTE: Self = Self(1 << 1);
    pub const HOUR: Self = Self(1 << 2);
    pub const DAY: Self = Self(1 << 3);
    pub const MONTH: Self = Self(1 << 4);
    pub const YEAR: Self = Self(1 << 5);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Units that differ between `prev` and `now`.
    ///
    /// A change of a coarse unit implies a change of every finer one.
    pub fn changed(prev: &NaiveDateTime, now: &NaiveDateTime) -> Self {
        let year = prev.year() != now.year();
        let month = year || prev.month() != now.month();
        let day = month || prev.day() != now.day();
        let hour = day || prev.hour() != now.hour();
        let minute = hour || prev.minute() != now.minute();
        let second = minute || prev.second() != now.second();

        let mut units = Self::NONE;
        for (flag, unit) in [
            (second, Self::SECOND),
            (minute, Self::MINUTE),
            (hour, Self::HOUR),
            (day, Self::DAY),
            (month, Self::MONTH),
            (year, Self::YEAR),
        ] {
            if flag {
                units |= unit;
            }
        }
        units
    }
}

impl BitOr for TickUnits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for TickUnits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Milliseconds until the next full minute, between 1 and 60 000
pub fn until_next_minute(now: &NaiveDateTime) -> u64 {
    let millis = now.second() as u64 * 1000 + (now.nanosecond() as u64 / 1_000_000).min(999);
    60_000 - millis
}
