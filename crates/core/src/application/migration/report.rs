// Migration report (per-entity tallies)

use super::AppointmentIdStrategy;
use crate::config::ModelingMode;
use serde::Serialize;
use tracing::{error, info, warn};

/// Outcome counters for one entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityTally {
    pub migrated: usize,
    pub errors: usize,
    /// One human-readable reason per error
    pub failures: Vec<String>,
}

impl EntityTally {
    pub fn succeeded(&mut self) {
        self.migrated += 1;
    }

    pub fn failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(reason = %reason, "Record not migrated");
        self.errors += 1;
        self.failures.push(reason);
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub modeling_mode: ModelingMode,
    pub appointment_ids: AppointmentIdStrategy,
    pub patients: EntityTally,
    pub doctors: EntityTally,
    pub clinics: EntityTally,
    pub appointments: EntityTally,
}

impl MigrationReport {
    pub fn new(modeling_mode: ModelingMode, appointment_ids: AppointmentIdStrategy) -> Self {
        Self {
            modeling_mode,
            appointment_ids,
            patients: EntityTally::default(),
            doctors: EntityTally::default(),
            clinics: EntityTally::default(),
            appointments: EntityTally::default(),
        }
    }

    /// Tallies in migration order
    pub fn entries(&self) -> [(&'static str, &EntityTally); 4] {
        [
            ("patients", &self.patients),
            ("doctors", &self.doctors),
            ("clinics", &self.clinics),
            ("appointments", &self.appointments),
        ]
    }

    pub fn total_migrated(&self) -> usize {
        self.entries().iter().map(|(_, t)| t.migrated).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.entries().iter().map(|(_, t)| t.errors).sum()
    }

    /// Zero errors across all four entity types
    pub fn is_success(&self) -> bool {
        self.total_errors() == 0
    }

    pub fn log_summary(&self) {
        for (entity, tally) in self.entries() {
            if tally.is_clean() {
                info!(entity, migrated = tally.migrated, errors = 0, "Entity migrated");
            } else {
                warn!(
                    entity,
                    migrated = tally.migrated,
                    errors = tally.errors,
                    "Entity migrated with errors"
                );
            }
        }
        info!(
            total_migrated = self.total_migrated(),
            total_errors = self.total_errors(),
            mode = %self.modeling_mode,
            success = self.is_success(),
            "Migration summary"
        );
    }
}
