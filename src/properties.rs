use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::errors::Error;

/// Row encoding of the data handed to the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Csv,
    Tsv,
    Scsv,
    Sohsv,
    Psv,
    Txt,
    Tsve,
    /// JSON lines: one object per line.
    #[default]
    Json,
    SingleJson,
    MultiJson,
    Avro,
    ApacheAvro,
    Parquet,
    SStream,
    Orc,
    Raw,
    W3cLogFile,
}

impl DataFormat {
    pub const ALL: [DataFormat; 17] = [
        DataFormat::Csv,
        DataFormat::Tsv,
        DataFormat::Scsv,
        DataFormat::Sohsv,
        DataFormat::Psv,
        DataFormat::Txt,
        DataFormat::Tsve,
        DataFormat::Json,
        DataFormat::SingleJson,
        DataFormat::MultiJson,
        DataFormat::Avro,
        DataFormat::ApacheAvro,
        DataFormat::Parquet,
        DataFormat::SStream,
        DataFormat::Orc,
        DataFormat::Raw,
        DataFormat::W3cLogFile,
    ];

    /// Name used in the `streamFormat` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
            DataFormat::Scsv => "scsv",
            DataFormat::Sohsv => "sohsv",
            DataFormat::Psv => "psv",
            DataFormat::Txt => "txt",
            DataFormat::Tsve => "tsve",
            DataFormat::Json => "json",
            DataFormat::SingleJson => "singlejson",
            DataFormat::MultiJson => "multijson",
            DataFormat::Avro => "avro",
            DataFormat::ApacheAvro => "apacheavro",
            DataFormat::Parquet => "parquet",
            DataFormat::SStream => "sstream",
            DataFormat::Orc => "orc",
            DataFormat::Raw => "raw",
            DataFormat::W3cLogFile => "w3clogfile",
        }
    }

    /// Formats where every line is a complete record, so a payload may be
    /// split at any newline.
    pub fn is_line_delimited(&self) -> bool {
        matches!(
            self,
            DataFormat::Csv
                | DataFormat::Tsv
                | DataFormat::Scsv
                | DataFormat::Sohsv
                | DataFormat::Psv
                | DataFormat::Txt
                | DataFormat::Tsve
                | DataFormat::Json
                | DataFormat::W3cLogFile
        )
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        DataFormat::ALL
            .iter()
            .find(|format| format.as_str() == wanted)
            .copied()
            .ok_or_else(|| Error::Config(format!("Unknown data format '{}'", s)))
    }
}

impl<'de> Deserialize<'de> for DataFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Where and how a payload lands in the database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestionProperties {
    pub database: String,
    pub table: String,
    pub format: DataFormat,
    /// Name of an ingestion mapping already declared on the table.
    pub ingestion_mapping_reference: Option<String>,
}

impl IngestionProperties {
    pub fn new(database: impl Into<String>, table: impl Into<String>, format: DataFormat) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            format,
            ingestion_mapping_reference: None,
        }
    }

    pub fn with_mapping_reference(mut self, mapping: impl Into<String>) -> Self {
        self.ingestion_mapping_reference = Some(mapping.into());
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.database.trim().is_empty() {
            return Err(Error::Config("Ingestion database must not be empty".into()));
        }
        if self.table.trim().is_empty() {
            return Err(Error::Config("Ingestion table must not be empty".into()));
        }
        if let Some(mapping) = self.ingestion_mapping_reference.as_deref()
            && mapping.trim().is_empty()
        {
            return Err(Error::Config(
                "Ingestion mapping reference must not be blank".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        for format in DataFormat::ALL {
            let upper = format.as_str().to_uppercase();
            assert_eq!(upper.parse::<DataFormat>().unwrap(), format);
        }
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "xml".parse::<DataFormat>().expect_err("xml is not a format");
        assert!(matches!(err, Error::Config(msg) if msg.contains("xml")));
    }

    #[test]
    fn only_text_formats_are_line_delimited() {
        assert!(DataFormat::Json.is_line_delimited());
        assert!(DataFormat::Csv.is_line_delimited());
        assert!(!DataFormat::MultiJson.is_line_delimited());
        assert!(!DataFormat::Parquet.is_line_delimited());
        assert!(!DataFormat::Raw.is_line_delimited());
    }

    #[test]
    fn validate_rejects_blank_names() {
        let props = IngestionProperties::new("db", " ", DataFormat::Json);
        assert!(props.validate().is_err());
        let props = IngestionProperties::new("db", "t", DataFormat::Json).with_mapping_reference("");
        assert!(props.validate().is_err());
        let props =
            IngestionProperties::new("db", "t", DataFormat::Json).with_mapping_reference("m");
        assert!(props.validate().is_ok());
    }
}
