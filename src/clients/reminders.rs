//! Reminder preference synchronization.
//!
//! Maps the `notificationOptions` toggles of a request to preference rows.
//! Only toggles present in the payload produce rows, so "explicitly
//! disabled" (row with is_enabled=false) stays distinct from "never set"
//! (no row at all). Pure, no I/O.

use serde::{Deserialize, Serialize};

use crate::db::ReminderType;

/// The three optional notification toggles of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReminderToggles {
    pub upcoming_appointments: Option<bool>,
    pub incomplete_documents: Option<bool>,
    pub cancellations: Option<bool>,
}

/// A preference row ready for insertion, minus ids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReminderSeed {
    pub reminder_type: ReminderType,
    pub is_enabled: bool,
}

/// Emit one row per toggle present in the input, nothing for absent ones.
pub fn reminder_rows(toggles: &ReminderToggles) -> Vec<ReminderSeed> {
    let mut rows = Vec::new();
    if let Some(enabled) = toggles.upcoming_appointments {
        rows.push(ReminderSeed {
            reminder_type: ReminderType::UpcomingAppointments,
            is_enabled: enabled,
        });
    }
    if let Some(enabled) = toggles.incomplete_documents {
        rows.push(ReminderSeed {
            reminder_type: ReminderType::IncompleteDocuments,
            is_enabled: enabled,
        });
    }
    if let Some(enabled) = toggles.cancellations {
        rows.push(ReminderSeed {
            reminder_type: ReminderType::Cancellations,
            is_enabled: enabled,
        });
    }
    rows
}
