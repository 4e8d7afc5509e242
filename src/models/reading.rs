use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Field;
use crate::utils::constants::{DATE_FORMAT, MISSING_TOKENS, TIMESTAMP_FORMATS};

/// One hourly observation from a monitoring station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Reading {
    #[validate(length(min = 1))]
    pub station_id: String,

    pub timestamp: NaiveDateTime,

    #[validate(range(min = 0.0))]
    pub pm25: Option<f64>,

    #[validate(range(min = 0.0))]
    pub pm10: Option<f64>,

    #[validate(range(min = 0.0))]
    pub o3: Option<f64>,

    #[validate(range(min = 0.0))]
    pub no2: Option<f64>,

    pub temperature: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: Option<f64>,
}

impl Reading {
    /// Reading with every measurement absent
    pub fn new(station_id: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            station_id: station_id.into(),
            timestamp,
            pm25: None,
            pm10: None,
            o3: None,
            no2: None,
            temperature: None,
            humidity: None,
        }
    }

    pub fn with(mut self, field: Field, value: f64) -> Self {
        *field.slot(&mut self) = Some(value);
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        field.value(self)
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| f.value(self).is_none())
            .collect()
    }

    /// Every field present and inside its physical domain
    pub fn is_clean(&self) -> bool {
        self.missing_fields().is_empty() && self.validate().is_ok()
    }
}

/// Untyped CSV row as delivered by the ingestion collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(rename = "Station ID", alias = "station_id", default)]
    pub station_id: String,

    #[serde(rename = "Timestamp", alias = "timestamp", default)]
    pub timestamp: String,

    #[serde(rename = "PM2.5", alias = "pm25", default)]
    pub pm25: String,

    #[serde(rename = "PM10", alias = "pm10", default)]
    pub pm10: String,

    #[serde(rename = "O3", alias = "o3", default)]
    pub o3: String,

    #[serde(rename = "NO2", alias = "no2", default)]
    pub no2: String,

    #[serde(rename = "Temperature", alias = "temperature", default)]
    pub temperature: String,

    #[serde(rename = "Humidity", alias = "humidity", default)]
    pub humidity: String,
}

/// Outcome of parsing one textual measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedValue {
    Present(f64),
    Missing,
    Malformed,
}

impl ParsedValue {
    pub fn value(self) -> Option<f64> {
        match self {
            ParsedValue::Present(v) => Some(v),
            ParsedValue::Missing | ParsedValue::Malformed => None,
        }
    }
}

/// Why a raw row could not become a reading at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    EmptyStationId,
    BadTimestamp(String),
}

/// A typed reading plus the fields that had to be discarded as malformed
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub reading: Reading,
    pub malformed: Vec<Field>,
}

impl RawReading {
    pub fn raw_value(&self, field: Field) -> &str {
        match field {
            Field::Pm25 => &self.pm25,
            Field::Pm10 => &self.pm10,
            Field::O3 => &self.o3,
            Field::No2 => &self.no2,
            Field::Temperature => &self.temperature,
            Field::Humidity => &self.humidity,
        }
    }

    /// Convert into a typed reading. Malformed measurements become missing
    /// and are reported; only an unusable identity rejects the row.
    pub fn parse(&self) -> std::result::Result<ParsedRow, RowRejection> {
        let station_id = self.station_id.trim();
        if station_id.is_empty() {
            return Err(RowRejection::EmptyStationId);
        }

        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| RowRejection::BadTimestamp(self.timestamp.clone()))?;

        let mut reading = Reading::new(station_id, timestamp);
        let mut malformed = Vec::new();

        for field in Field::ALL {
            let parsed = parse_measurement(self.raw_value(field));
            if parsed == ParsedValue::Malformed {
                malformed.push(field);
            }
            *field.slot(&mut reading) = parsed.value();
        }

        Ok(ParsedRow { reading, malformed })
    }
}

/// Parse a numeric measurement, distinguishing absent from unparseable text
pub fn parse_measurement(text: &str) -> ParsedValue {
    let trimmed = text.trim();
    if MISSING_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
        return ParsedValue::Missing;
    }

    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedValue::Present(v),
        _ => ParsedValue::Malformed,
    }
}

/// Parse an ISO-8601-like timestamp; a bare date maps to midnight
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement(" 12.5 "), ParsedValue::Present(12.5));
        assert_eq!(parse_measurement("-3"), ParsedValue::Present(-3.0));
        assert_eq!(parse_measurement(""), ParsedValue::Missing);
        assert_eq!(parse_measurement("NaN"), ParsedValue::Missing);
        assert_eq!(parse_measurement("null"), ParsedValue::Missing);
        assert_eq!(parse_measurement("abc"), ParsedValue::Malformed);
        assert_eq!(parse_measurement("inf"), ParsedValue::Malformed);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 7, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        assert_eq!(ts("2025-07-15 10:00:00"), expected);
        assert_eq!(ts("2025-07-15T10:00:00"), expected);
        assert_eq!(ts("2025-07-15 10:00"), expected);
        assert_eq!(ts("2025-07-15T10:00:00.000"), expected);
        assert_eq!(ts("2025-07-15").date(), expected.date());
        assert!(parse_timestamp("15/07/2025").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_raw_reading_parse_recovers_malformed_fields() {
        let raw = RawReading {
            station_id: " S001 ".to_string(),
            timestamp: "2025-07-15 10:00:00".to_string(),
            pm25: "35.2".to_string(),
            pm10: "oops".to_string(),
            o3: "".to_string(),
            no2: "20".to_string(),
            temperature: "21.5".to_string(),
            humidity: "55".to_string(),
        };

        let row = raw.parse().unwrap();
        assert_eq!(row.reading.station_id, "S001");
        assert_eq!(row.reading.pm25, Some(35.2));
        assert_eq!(row.reading.pm10, None);
        assert_eq!(row.reading.o3, None);
        assert_eq!(row.malformed, vec![Field::Pm10]);
    }

    #[test]
    fn test_raw_reading_rejections() {
        let raw = RawReading {
            station_id: "".to_string(),
            timestamp: "2025-07-15 10:00:00".to_string(),
            ..Default::default()
        };
        assert_eq!(raw.parse().unwrap_err(), RowRejection::EmptyStationId);

        let raw = RawReading {
            station_id: "S001".to_string(),
            timestamp: "yesterday".to_string(),
            ..Default::default()
        };
        assert!(matches!(raw.parse(), Err(RowRejection::BadTimestamp(_))));
    }

    #[test]
    fn test_reading_validation() {
        let t = ts("2025-07-15 10:00:00");
        let reading = Reading::new("S001", t)
            .with(Field::Pm25, 10.0)
            .with(Field::Pm10, 20.0)
            .with(Field::O3, 30.0)
            .with(Field::No2, 40.0)
            .with(Field::Temperature, -5.0)
            .with(Field::Humidity, 60.0);
        assert!(reading.is_clean());

        let negative = reading.clone().with(Field::Pm25, -1.0);
        assert!(negative.validate().is_err());
        assert!(!negative.is_clean());

        let humid = reading.clone().with(Field::Humidity, 150.0);
        assert!(humid.validate().is_err());

        let partial = Reading::new("S001", t).with(Field::Pm25, 10.0);
        assert!(partial.validate().is_ok());
        assert!(!partial.is_clean());
        assert_eq!(partial.missing_fields().len(), 5);
    }
}
