//! Test data builders for creating test objects

use chrono::{DateTime, TimeZone, Utc};
use linewatch::config::AppConfig;
use linewatch::{Quality, Reading};
use std::path::Path;

/// Builder for creating test Readings
pub struct ReadingBuilder {
    timestamp: DateTime<Utc>,
    line: String,
    machine: String,
    variable: String,
    value: String,
    quality: Quality,
}

impl ReadingBuilder {
    pub fn new(variable: &str) -> Self {
        Self {
            timestamp: Utc
                .with_ymd_and_hms(2026, 1, 1, 6, 0, 0)
                .single()
                .expect("valid timestamp"),
            line: "Serac4".to_string(),
            machine: "Palletizer".to_string(),
            variable: variable.to_string(),
            value: "0".to_string(),
            quality: Quality::Good,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn machine(mut self, machine: &str) -> Self {
        self.machine = machine.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn build(self) -> Reading {
        Reading {
            timestamp: self.timestamp,
            line: self.line,
            machine: self.machine,
            variable: self.variable,
            value: self.value,
            quality: self.quality,
        }
    }
}

/// Builder for pipeline configs pointed at a simulated server
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    pub fn new(store: &Path) -> Self {
        let mut config = AppConfig::default();
        config.server.endpoint = "sim://plant".to_string();
        config.server.fallback_endpoints.clear();
        config.store.path = store.to_path_buf();
        config.poll.interval_ms = 1;
        config.poll.max_sweeps = Some(1);
        Self { config }
    }

    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.config.server.endpoint = endpoint.to_string();
        self
    }

    pub fn fallback(mut self, endpoint: &str) -> Self {
        self.config.server.fallback_endpoints.push(endpoint.to_string());
        self
    }

    pub fn line(mut self, line: &str) -> Self {
        self.config.target.line = line.to_string();
        self
    }

    pub fn machine(mut self, machine: &str) -> Self {
        self.config.target.machine = machine.to_string();
        self
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.poll.interval_ms = interval_ms;
        self
    }

    pub fn max_sweeps(mut self, max_sweeps: Option<u64>) -> Self {
        self.config.poll.max_sweeps = max_sweeps;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_builder() {
        let reading = ReadingBuilder::new("Speed")
            .value("12.5")
            .quality(Quality::Uncertain)
            .build();

        assert_eq!(reading.variable, "Speed");
        assert_eq!(reading.value, "12.5");
        assert_eq!(reading.quality, Quality::Uncertain);
        assert_eq!(reading.machine, "Palletizer");
    }
}
