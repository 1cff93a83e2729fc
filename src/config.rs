//! Service configuration read from the environment

use crate::dialog::FlowVariant;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Which intake form to run
    pub variant: FlowVariant,
}

impl IntakeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("INTAKE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".clinic-intake").join("intake.db")
            },
            PathBuf::from,
        );

        let port = lookup("INTAKE_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let variant = lookup("INTAKE_FLOW").map_or_else(FlowVariant::default, |raw| {
            FlowVariant::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unrecognized INTAKE_FLOW, using default");
                FlowVariant::default()
            })
        });

        Self {
            db_path,
            port,
            variant,
        }
    }
}
