use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const COLOR_RGBA_PACKAGE: &str = "std_msgs";
pub const COLOR_RGBA_TYPE: &str = "ColorRGBA";

/// `std_msgs/msg/ColorRGBA`. Field order is the wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl fmt::Display for ColorRgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ColorRGBA: {:.6} {:.6} {:.6} {:.6}",
            self.r, self.g, self.b, self.a
        )
    }
}

impl FromStr for ColorRgba {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid color '{s}'"))?;
        match channels[..] {
            [r, g, b, a] => Ok(Self { r, g, b, a }),
            _ => Err(anyhow!("Expected four channels r,g,b,a, got '{s}'")),
        }
    }
}

/// Metadata of a taken message, printed on the line below the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageInfo {
    /// Stamped by the writer, if the middleware carries it.
    pub source_timestamp: Option<DateTime<Utc>>,
    pub received_at: DateTime<Local>,
    pub sequence_number: Option<i64>,
}

impl MessageInfo {
    pub fn received_now(sequence_number: Option<i64>) -> Self {
        Self {
            source_timestamp: None,
            received_at: Local::now(),
            sequence_number,
        }
    }

    pub fn with_source_timestamp(mut self, source_timestamp: Option<DateTime<Utc>>) -> Self {
        self.source_timestamp = source_timestamp;
        self
    }

    /// Replaces the local receive time with the one the middleware recorded.
    pub fn with_received_at(mut self, received_at: Option<DateTime<Utc>>) -> Self {
        if let Some(received_at) = received_at {
            self.received_at = received_at.with_timezone(&Local);
        }
        self
    }
}

impl fmt::Display for MessageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source_timestamp {
            Some(source) => write!(
                f,
                "SourceTimestamp='{}' ",
                source.to_rfc3339_opts(SecondsFormat::Nanos, true)
            )?,
            None => f.write_str("SourceTimestamp='unknown' ")?,
        }
        let received = self.received_at.to_rfc3339_opts(SecondsFormat::Nanos, true);
        match self.sequence_number {
            Some(n) => write!(f, "ReceivedTimestamp='{received}' SequenceNumber='{n}'"),
            None => write!(f, "ReceivedTimestamp='{received}' SequenceNumber='unknown'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn test_zeroed_buffer_output() {
        assert_eq!(
            ColorRgba::default().to_string(),
            "ColorRGBA: 0.000000 0.000000 0.000000 0.000000"
        );
    }

    #[test]
    fn test_channel_order() {
        let color = ColorRgba {
            r: 1.0,
            g: 0.5,
            b: 0.25,
            a: 0.125,
        };
        assert_eq!(
            color.to_string(),
            "ColorRGBA: 1.000000 0.500000 0.250000 0.125000"
        );
    }

    #[test]
    fn test_parse_color() {
        let color: ColorRgba = "0.1,0.2,0.3,0.4".parse().unwrap();
        assert_eq!(color.g, 0.2);
        assert!("0.1,0.2,0.3".parse::<ColorRgba>().is_err());
        assert!("red,0,0,1".parse::<ColorRgba>().is_err());
    }

    #[test]
    fn test_message_info_output() {
        let received_at = Local.timestamp_opt(0, 0).unwrap();
        let info = MessageInfo {
            source_timestamp: None,
            received_at,
            sequence_number: Some(7),
        };
        let line = info.to_string();
        assert!(line.starts_with("SourceTimestamp='unknown' ReceivedTimestamp='"), "{line}");
        assert!(line.ends_with("SequenceNumber='7'"), "{line}");

        let info = MessageInfo {
            sequence_number: None,
            ..info
        };
        assert!(info.to_string().ends_with("SequenceNumber='unknown'"));
    }

    #[test]
    fn test_middleware_timestamps_are_kept() {
        let source = Utc.timestamp_opt(1_700_000_000, 500).unwrap();
        let received = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        let info = MessageInfo::received_now(Some(1))
            .with_source_timestamp(Some(source))
            .with_received_at(Some(received));

        assert_eq!(info.source_timestamp, Some(source));
        assert_eq!(info.received_at, received.with_timezone(&Local));
        assert!(
            info.to_string()
                .starts_with("SourceTimestamp='2023-11-14T22:13:20.000000500Z'"),
            "{info}"
        );

        let before = info.received_at;
        let info = info.with_received_at(None);
        assert_eq!(info.received_at, before);
    }
}
