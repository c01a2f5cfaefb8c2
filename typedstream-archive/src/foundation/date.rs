/*!
 Decoder for `NSDate`.
*/

use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::{
    archiver::{
        models::{Class, KnownType},
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    foundation::check_version,
};

/// Seconds between the Unix epoch and `2001-01-01T00:00:00Z`
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// A point in time stored in an `NSDate`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NSDate {
    /// Seconds since `2001-01-01T00:00:00Z`
    pub offset: f64,
}

crate::known_type!(NSDate);

impl NSDate {
    /// Convert the stored offset to a UTC timestamp
    ///
    /// Returns `None` if the offset is not finite or is outside the range `chrono` can represent.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        if !self.offset.is_finite() {
            return None;
        }
        let whole = self.offset.floor();
        let nanos = (((self.offset - whole) * 1e9).round() as u32).min(999_999_999);
        let seconds = (whole as i64).checked_add(APPLE_EPOCH_OFFSET)?;
        DateTime::from_timestamp(seconds, nanos)
    }
}

pub(crate) fn decode(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    let value = unarchiver.decode_value_of_type("d")?;
    let offset = value
        .as_double()
        .ok_or_else(|| UnarchiveError::InvalidValue("NSDate", format!("{value:?}")))?;
    Ok(Box::new(NSDate { offset }))
}

#[cfg(test)]
mod date_tests {
    use chrono::{TimeZone, Utc};

    use crate::{
        archiver::tests::helpers::{decode_single, group, object},
        foundation::date::NSDate,
        typedstream::models::Token,
    };

    #[test]
    fn can_get_reference_date() {
        let date = NSDate { offset: 0.0 };
        assert_eq!(
            date.date(),
            Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn can_get_date_before_reference() {
        let date = NSDate { offset: -86400.0 };
        assert_eq!(
            date.date(),
            Utc.with_ymd_and_hms(2000, 12, 31, 0, 0, 0).single()
        );
    }

    #[test]
    fn can_get_fractional_date() {
        let date = NSDate { offset: 1.5 }.date().unwrap();
        assert_eq!(date.timestamp(), 978_307_201);
        assert_eq!(date.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn cant_get_infinite_date() {
        assert!(NSDate { offset: f64::NAN }.date().is_none());
        assert!(NSDate {
            offset: f64::INFINITY
        }
        .date()
        .is_none());
    }

    #[test]
    fn can_decode_date() {
        let tokens = group(
            &["@"],
            object(
                "NSDate",
                0,
                vec![group(&["d"], vec![Token::Double(694_224_000.0)])],
            ),
        );
        let value = decode_single(tokens).unwrap();
        let date = value.as_known::<NSDate>().unwrap();

        assert_eq!(
            date.date(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn can_decode_integer_date() {
        let tokens = group(
            &["@"],
            object("NSDate", 0, vec![group(&["d"], vec![Token::SignedInteger(60)])]),
        );
        let value = decode_single(tokens).unwrap();
        assert_eq!(value.as_known::<NSDate>(), Some(&NSDate { offset: 60.0 }));
    }
}
