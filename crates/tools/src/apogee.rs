//! Apogee detection from a stream of altitude samples
//!
//! The detector is a small state machine passed by value:
//!
//! ```text
//! Waiting --sample--> Ascending { peak } --lower sample--> Descending { apogee }
//! ```
//!
//! A strictly higher sample raises the peak, an equal one changes nothing,
//! and the first strictly lower sample latches `Descending` with that
//! sample as the reported apogee.

use anyhow::{Context, Result};
use std::io::BufRead;
use tracing::{debug, info, warn};

use crate::config::APOGEE_PLACEHOLDER;

/// Flight phase as seen by the detector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ApogeeDetector {
    /// No sample seen yet
    #[default]
    Waiting,
    Ascending { peak: f64 },
    Descending { apogee: f64 },
}

impl ApogeeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance with one altitude sample
    pub fn update(self, altitude: f64) -> Self {
        if !altitude.is_finite() {
            warn!("Ignoring non-finite altitude sample {}", altitude);
            return self;
        }

        match self {
            Self::Waiting => Self::Ascending { peak: altitude },
            Self::Ascending { peak } if altitude > peak => Self::Ascending { peak: altitude },
            Self::Ascending { peak } if altitude < peak => {
                info!("Apogee detected at {:.1} m (peak {:.1} m)", altitude, peak);
                Self::Descending { apogee: altitude }
            }
            other => other,
        }
    }

    /// Reported apogee once descending
    pub fn apogee(&self) -> Option<f64> {
        match self {
            Self::Descending { apogee } => Some(*apogee),
            _ => None,
        }
    }
}

/// Producer of altitude readings
pub trait AltitudeSource {
    /// Next reading in metres, `None` once the source is exhausted
    fn next_altitude(&mut self) -> Result<Option<f64>>;
}

/// Reads one decimal altitude per line, skipping blank lines
pub struct LineAltitudeSource<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> LineAltitudeSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl<R: BufRead> AltitudeSource for LineAltitudeSource<R> {
    fn next_altitude(&mut self) -> Result<Option<f64>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let altitude = text
                .parse::<f64>()
                .with_context(|| format!("Invalid altitude on line {}: {:?}", self.line_no, text))?;
            return Ok(Some(altitude));
        }
    }
}

/// Feed samples until apogee is latched or the source runs dry
pub fn detect_apogee<S: AltitudeSource + ?Sized>(source: &mut S) -> Result<Option<f64>> {
    let mut detector = ApogeeDetector::new();

    while let Some(altitude) = source.next_altitude()? {
        detector = detector.update(altitude);
        debug!("Altitude {:.2} m -> {:?}", altitude, detector);
        if let Some(apogee) = detector.apogee() {
            return Ok(Some(apogee));
        }
    }

    warn!("Altitude source ended before apogee: {:?}", detector);
    Ok(None)
}

/// Fill a message template with the apogee, one decimal place
pub fn format_message(template: &str, apogee: f64) -> String {
    template.replace(APOGEE_PLACEHOLDER, &format!("{:.1}", apogee))
}
