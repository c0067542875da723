use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Typed content of one output cell.
///
/// Delimited files only ever see the [`Display`](fmt::Display) form of a value;
/// spreadsheets keep the type (number, boolean, date). `Empty` renders as an
/// empty field, never as a `null` marker.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Int(value) => write!(f, "{}", value),
            CellValue::Float(value) => write!(f, "{}", value),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            CellValue::DateTime(datetime) => write!(f, "{}", datetime.format(DATE_TIME_FORMAT)),
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

macro_rules! int_cell_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    CellValue::Int(i64::from(value))
                }
            }
        )*
    };
}

int_cell_value!(i8, i16, i32, i64, u8, u16, u32);

// Wider integers stay exact: values outside the i64 range become their
// decimal text.
macro_rules! wide_int_cell_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    i64::try_from(value)
                        .map_or_else(|_| CellValue::Text(value.to_string()), CellValue::Int)
                }
            }
        )*
    };
}

wide_int_cell_value!(isize, usize, u64, i128, u128);

impl From<f32> for CellValue {
    fn from(value: f32) -> Self {
        CellValue::Float(f64::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

/// Zoned timestamps are written in their own local time, offset dropped.
impl<Tz: TimeZone> From<DateTime<Tz>> for CellValue {
    fn from(value: DateTime<Tz>) -> Self {
        CellValue::DateTime(value.naive_local())
    }
}

impl<V: Into<CellValue>> From<Option<V>> for CellValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_render_as_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(CellValue::from("Alice").to_string(), "Alice");
        assert_eq!(CellValue::from(42u16).to_string(), "42");
        assert_eq!(CellValue::from(79.99).to_string(), "79.99");
        assert_eq!(CellValue::from(false).to_string(), "false");
        assert_eq!(CellValue::from(date).to_string(), "2024-02-29");
        assert_eq!(
            CellValue::from(date.and_hms_opt(8, 5, 0).unwrap()).to_string(),
            "2024-02-29 08:05:00"
        );
    }

    #[test]
    fn wide_integers_stay_exact() {
        assert_eq!(CellValue::from(3usize), CellValue::Int(3));
        assert_eq!(CellValue::from(-3isize), CellValue::Int(-3));
        assert_eq!(CellValue::from(i64::MAX as u64), CellValue::Int(i64::MAX));
        assert_eq!(
            CellValue::from(u64::MAX),
            CellValue::Text("18446744073709551615".to_string())
        );
        assert_eq!(CellValue::from(-12i128), CellValue::Int(-12));
        assert_eq!(
            CellValue::from(u128::MAX).to_string(),
            u128::MAX.to_string()
        );
    }

    #[test]
    fn zoned_timestamps_keep_their_local_time() {
        use chrono::{FixedOffset, Utc};

        let local = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let paris = FixedOffset::east_opt(3600)
            .unwrap()
            .from_local_datetime(&local)
            .unwrap();
        assert_eq!(CellValue::from(paris), CellValue::DateTime(local));
        assert_eq!(
            CellValue::from(Utc.from_utc_datetime(&local)).to_string(),
            "2024-03-01 09:30:00"
        );
    }

    #[test]
    fn missing_value_is_empty_not_null() {
        let value = CellValue::from(None::<String>);
        assert!(value.is_empty());
        assert_eq!(value.to_string(), "");
        assert_eq!(CellValue::from(Some(7)), CellValue::Int(7));
    }
}
