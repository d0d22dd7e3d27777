use std::fmt;

use crate::{
    error::StorageError,
    model::{Averages, MinMax},
    store::ReadingStore,
};

/// Batch-mode aggregates for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityReport {
    pub city: String,
    pub min_max: Option<MinMax>,
    pub average: Option<Averages>,
    pub comfortable_days: u64,
}

impl CityReport {
    pub fn build(store: &ReadingStore, city: &str) -> Result<Self, StorageError> {
        Ok(Self {
            city: city.to_string(),
            min_max: store.min_max(city)?,
            average: store.average(city)?,
            comfortable_days: store.comfortable_day_count(city)?,
        })
    }

    pub fn has_data(&self) -> bool {
        self.min_max.is_some()
    }
}

fn pressure(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |p| format!("{p:.1} hPa"))
}

impl fmt::Display for CityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.city)?;

        let (Some(mm), Some(avg)) = (&self.min_max, &self.average) else {
            return write!(f, "  no data");
        };

        writeln!(f, "  temperature  min {:.2} °C, max {:.2} °C", mm.min_temp, mm.max_temp)?;
        writeln!(f, "  humidity     min {:.1} %, max {:.1} %", mm.min_humidity, mm.max_humidity)?;
        writeln!(
            f,
            "  pressure     min {}, max {}",
            pressure(mm.min_pressure),
            pressure(mm.max_pressure)
        )?;
        writeln!(
            f,
            "  average      {:.2} °C, {:.1} %, {}",
            avg.avg_temp,
            avg.avg_humidity,
            pressure(avg.avg_pressure)
        )?;

        write!(f, "  comfortable days: {}", self.comfortable_days)
    }
}
