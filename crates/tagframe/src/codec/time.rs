//! Date and time encodings.
//!
//! Every component is an independently tagged integer (or string), so each
//! kind uses only as many bytes as its values need.
//!
//! | Kind           | Components                               |
//! |----------------|------------------------------------------|
//! | Duration       | seconds, nanos (0..1e9)                  |
//! | Instant        | epoch seconds, nanos                     |
//! | LocalDate      | year, month, day                         |
//! | LocalTime      | hour, minute, second, nanos              |
//! | LocalDateTime  | LocalDate, LocalTime                     |
//! | OffsetDateTime | LocalDateTime, offset seconds            |
//! | ZonedDateTime  | LocalDateTime, zone id                   |
//! | Period         | years, months, days                      |
//! | ZoneId         | zone id                                  |
//! | ZoneOffset     | offset seconds                           |

use std::io::{self, Read, Write};

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike,
    Utc,
};

use crate::error::{DecodeError, Result};
use crate::model::{Period, ZoneId, ZonedDateTime};

use super::{Decoder, Encoder};

const NANOS_PER_SECOND: i32 = 1_000_000_000;

fn invalid(kind: &'static str) -> crate::error::Error {
    DecodeError::InvalidTime { kind }.into()
}

// =============================================================================
// ENCODING
// =============================================================================

impl<W: Write> Encoder<W> {
    pub fn write_duration(&mut self, value: &TimeDelta) -> io::Result<()> {
        let mut seconds = value.num_seconds();
        let mut nanos = value.subsec_nanos();
        if nanos < 0 {
            seconds -= 1;
            nanos += NANOS_PER_SECOND;
        }
        self.write_i64(seconds)?;
        self.write_i32(nanos)
    }

    pub fn write_instant(&mut self, value: &DateTime<Utc>) -> io::Result<()> {
        self.write_i64(value.timestamp())?;
        self.write_i64(value.timestamp_subsec_nanos() as i64)
    }

    pub fn write_local_date(&mut self, value: &NaiveDate) -> io::Result<()> {
        self.write_i32(value.year())?;
        self.write_i32(value.month() as i32)?;
        self.write_i32(value.day() as i32)
    }

    pub fn write_local_time(&mut self, value: &NaiveTime) -> io::Result<()> {
        self.write_i32(value.hour() as i32)?;
        self.write_i32(value.minute() as i32)?;
        self.write_i32(value.second() as i32)?;
        self.write_i64(value.nanosecond() as i64)
    }

    pub fn write_local_date_time(&mut self, value: &NaiveDateTime) -> io::Result<()> {
        self.write_local_date(&value.date())?;
        self.write_local_time(&value.time())
    }

    pub fn write_offset_date_time(&mut self, value: &DateTime<FixedOffset>) -> io::Result<()> {
        self.write_local_date_time(&value.naive_local())?;
        self.write_zone_offset(value.offset())
    }

    pub fn write_zoned_date_time(&mut self, value: &ZonedDateTime) -> io::Result<()> {
        self.write_local_date_time(&value.local)?;
        self.write_zone_id(&value.zone)
    }

    pub fn write_period(&mut self, value: &Period) -> io::Result<()> {
        self.write_i32(value.years)?;
        self.write_i32(value.months)?;
        self.write_i32(value.days)
    }

    pub fn write_zone_id(&mut self, value: &ZoneId) -> io::Result<()> {
        self.write_str(value.as_str())
    }

    pub fn write_zone_offset(&mut self, value: &FixedOffset) -> io::Result<()> {
        self.write_i32(value.local_minus_utc())
    }
}

// =============================================================================
// DECODING
// =============================================================================

impl<R: Read> Decoder<R> {
    pub fn read_duration(&mut self) -> Result<TimeDelta> {
        let seconds = self.read_i64()?;
        let nanos = self.read_i32()?;
        u32::try_from(nanos)
            .ok()
            .and_then(|nanos| TimeDelta::new(seconds, nanos))
            .ok_or_else(|| invalid("duration"))
    }

    pub fn read_instant(&mut self) -> Result<DateTime<Utc>> {
        let seconds = self.read_i64()?;
        let nanos = self.read_i64()?;
        u32::try_from(nanos)
            .ok()
            .and_then(|nanos| DateTime::from_timestamp(seconds, nanos))
            .ok_or_else(|| invalid("instant"))
    }

    pub fn read_local_date(&mut self) -> Result<NaiveDate> {
        let year = self.read_i32()?;
        let month = self.read_i32()?;
        let day = self.read_i32()?;
        NaiveDate::from_ymd_opt(year, month as u32, day as u32).ok_or_else(|| invalid("date"))
    }

    pub fn read_local_time(&mut self) -> Result<NaiveTime> {
        let hour = self.read_i32()?;
        let minute = self.read_i32()?;
        let second = self.read_i32()?;
        let nanos = self.read_i64()?;
        NaiveTime::from_hms_nano_opt(hour as u32, minute as u32, second as u32, nanos as u32)
            .ok_or_else(|| invalid("time"))
    }

    pub fn read_local_date_time(&mut self) -> Result<NaiveDateTime> {
        let date = self.read_local_date()?;
        let time = self.read_local_time()?;
        Ok(date.and_time(time))
    }

    pub fn read_offset_date_time(&mut self) -> Result<DateTime<FixedOffset>> {
        let local = self.read_local_date_time()?;
        let offset = self.read_zone_offset()?;
        local
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| invalid("offset date-time"))
    }

    pub fn read_zoned_date_time(&mut self) -> Result<ZonedDateTime> {
        let local = self.read_local_date_time()?;
        let zone = self.read_zone_id()?;
        Ok(ZonedDateTime { local, zone })
    }

    pub fn read_period(&mut self) -> Result<Period> {
        Ok(Period {
            years: self.read_i32()?,
            months: self.read_i32()?,
            days: self.read_i32()?,
        })
    }

    pub fn read_zone_id(&mut self) -> Result<ZoneId> {
        self.read_required_string().map(ZoneId)
    }

    pub fn read_zone_offset(&mut self) -> Result<FixedOffset> {
        let seconds = self.read_i32()?;
        FixedOffset::east_opt(seconds).ok_or_else(|| invalid("zone offset"))
    }
}
