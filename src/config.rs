use serde::{Deserialize, Serialize};

use crate::errors::{BillingError, Result};

pub const DEFAULT_INSTALLMENT_INTERVAL_DAYS: u32 = 7;
pub const DEFAULT_DELINQUENCY_THRESHOLD: u32 = 2;

/// billing engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// days between consecutive due dates
    pub installment_interval_days: u32,
    /// a loan is delinquent once its overdue-and-unpaid count exceeds this
    pub delinquency_threshold: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            installment_interval_days: DEFAULT_INSTALLMENT_INTERVAL_DAYS,
            delinquency_threshold: DEFAULT_DELINQUENCY_THRESHOLD,
        }
    }
}

impl BillingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.installment_interval_days == 0 {
            return Err(BillingError::InvalidConfiguration {
                message: "installment interval must be at least one day".to_string(),
            });
        }

        Ok(())
    }

    /// parse from json, missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BillingConfig =
            serde_json::from_str(json).map_err(|e| BillingError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn installment_interval(&self) -> chrono::Duration {
        chrono::Duration::days(self.installment_interval_days as i64)
    }
}
