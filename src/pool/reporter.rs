use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use super::error::Result;
use super::oracle::CapacityOracle;
use super::registry::UnitRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitUsage {
    pub id: String,
    pub name: String,
    pub used_bytes: u64,
    /// Negative when external writes pushed the unit past the ceiling.
    pub available_bytes: i64,
}

pub struct UsageReporter {
    registry: Arc<UnitRegistry>,
    oracle: Arc<CapacityOracle>,
    capacity_ceiling: u64,
}

impl UsageReporter {
    pub fn new(registry: Arc<UnitRegistry>, oracle: Arc<CapacityOracle>, capacity_ceiling: u64) -> Self {
        Self {
            registry,
            oracle,
            capacity_ceiling,
        }
    }

    /// Usage of every unit, or an empty list if any single unit fails.
    pub async fn report_all(&self) -> Vec<UnitUsage> {
        match self.try_report_all().await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to collect unit disk usage: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_report_all(&self) -> Result<Vec<UnitUsage>> {
        let mut report = Vec::new();
        for unit in self.registry.list_units().await? {
            let used_bytes = self.oracle.measure_used_bytes(&unit.id).await?;
            report.push(UnitUsage {
                available_bytes: headroom(self.capacity_ceiling, used_bytes),
                id: unit.id,
                name: unit.name,
                used_bytes,
            });
        }
        Ok(report)
    }
}

/// `ceiling - used`, clamped to the `i64` range instead of wrapping.
fn headroom(ceiling: u64, used: u64) -> i64 {
    let diff = i128::from(ceiling) - i128::from(used);
    diff.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}
