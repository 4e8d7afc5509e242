use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};
use crate::models::Reading;

/// The six numeric measurement columns of a reading
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Pm25,
    Pm10,
    O3,
    No2,
    Temperature,
    Humidity,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Pm25,
        Field::Pm10,
        Field::O3,
        Field::No2,
        Field::Temperature,
        Field::Humidity,
    ];

    pub const POLLUTANTS: [Field; 4] = [Field::Pm25, Field::Pm10, Field::O3, Field::No2];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Pm25 => "pm25",
            Field::Pm10 => "pm10",
            Field::O3 => "o3",
            Field::No2 => "no2",
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
        }
    }

    /// Column header used by the station logger exports
    pub fn header(&self) -> &'static str {
        match self {
            Field::Pm25 => "PM2.5",
            Field::Pm10 => "PM10",
            Field::O3 => "O3",
            Field::No2 => "NO2",
            Field::Temperature => "Temperature",
            Field::Humidity => "Humidity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Field::Pm25 | Field::Pm10 => "µg/m³",
            Field::O3 | Field::No2 => "ppb",
            Field::Temperature => "°C",
            Field::Humidity => "%",
        }
    }

    /// Concentrations must be non-negative; a negative value is a sensor error
    pub fn is_pollutant(&self) -> bool {
        Self::POLLUTANTS.contains(self)
    }

    pub fn value(&self, reading: &Reading) -> Option<f64> {
        match self {
            Field::Pm25 => reading.pm25,
            Field::Pm10 => reading.pm10,
            Field::O3 => reading.o3,
            Field::No2 => reading.no2,
            Field::Temperature => reading.temperature,
            Field::Humidity => reading.humidity,
        }
    }

    pub fn slot<'a>(&self, reading: &'a mut Reading) -> &'a mut Option<f64> {
        match self {
            Field::Pm25 => &mut reading.pm25,
            Field::Pm10 => &mut reading.pm10,
            Field::O3 => &mut reading.o3,
            Field::No2 => &mut reading.no2,
            Field::Temperature => &mut reading.temperature,
            Field::Humidity => &mut reading.humidity,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['.', '_', ' '], "");
        match normalized.as_str() {
            "pm25" => Ok(Field::Pm25),
            "pm10" => Ok(Field::Pm10),
            "o3" => Ok(Field::O3),
            "no2" => Ok(Field::No2),
            "temperature" | "temp" => Ok(Field::Temperature),
            "humidity" => Ok(Field::Humidity),
            _ => Err(ProcessingError::UnknownField(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parsing_accepts_headers_and_names() {
        assert_eq!("PM2.5".parse::<Field>().unwrap(), Field::Pm25);
        assert_eq!("pm25".parse::<Field>().unwrap(), Field::Pm25);
        assert_eq!("NO2".parse::<Field>().unwrap(), Field::No2);
        assert_eq!(" Humidity ".parse::<Field>().unwrap(), Field::Humidity);
        assert!("CO".parse::<Field>().is_err());

        for field in Field::ALL {
            assert_eq!(field.header().parse::<Field>().unwrap(), field);
            assert_eq!(field.name().parse::<Field>().unwrap(), field);
        }
    }

    #[test]
    fn test_pollutant_classification() {
        assert!(Field::Pm25.is_pollutant());
        assert!(Field::No2.is_pollutant());
        assert!(!Field::Temperature.is_pollutant());
        assert!(!Field::Humidity.is_pollutant());
    }

    #[test]
    fn test_field_serializes_as_name() {
        assert_eq!(serde_json::to_string(&Field::Pm25).unwrap(), "\"pm25\"");
        assert_eq!(serde_json::to_string(&Field::Temperature).unwrap(), "\"temperature\"");
    }
}
