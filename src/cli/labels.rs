//! Human-readable labels for engine states.
//!
//! The engine exposes closed enums only; wording lives here.

use dermascan_engine::{ConnectionState, ImageStatus, SampleStatus};
use dermascan_gateway::{Diagnosis, TrainingStatus};

pub fn image_status(status: ImageStatus) -> &'static str {
    match status {
        ImageStatus::Uploaded => "Waiting",
        ImageStatus::Analyzing => "Analyzing",
        ImageStatus::Analyzed => "Done",
        ImageStatus::Failed => "Failed",
    }
}

pub fn training_status(status: TrainingStatus) -> &'static str {
    match status {
        TrainingStatus::Preparing => "Preparing",
        TrainingStatus::Running => "Training",
        TrainingStatus::Completed => "Completed",
        TrainingStatus::Failed => "Failed",
    }
}

pub fn sample_status(status: SampleStatus) -> &'static str {
    match status {
        SampleStatus::Pending => "Pending upload",
        SampleStatus::Saved => "Saved",
        SampleStatus::Failed => "Upload failed",
    }
}

pub fn connection_state(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Checking => "Checking connection",
        ConnectionState::Connected => "Connected",
        ConnectionState::Disconnected => "Disconnected",
    }
}

/// `label (localized)` when a localized name exists.
pub fn class_name(label: &str, localized: Option<&str>) -> String {
    match localized {
        Some(localized) if !localized.is_empty() && localized != label => {
            format!("{label} ({localized})")
        }
        _ => label.to_string(),
    }
}

/// One-line summary of a diagnosis, e.g. `Melanoma 87.5%`.
pub fn diagnosis(diagnosis: &Diagnosis) -> String {
    format!(
        "{} {:.1}%",
        class_name(&diagnosis.label, diagnosis.localized_label.as_deref()),
        diagnosis.confidence
    )
}
