//! Folding subsystem statuses into the overall status

use super::Subsystem;
use crate::status::StatusLevel;

/// Computes the overall status from `(status, non_critical)` pairs.
///
/// The worst critical status wins if it is not `Good`. Otherwise any
/// noncritical subsystem that is not `Good` makes the result `Warn`.
pub fn fold_statuses(statuses: impl IntoIterator<Item = (StatusLevel, bool)>) -> StatusLevel {
    let mut critical = StatusLevel::Good;
    let mut non_critical = StatusLevel::Good;

    for (status, is_non_critical) in statuses {
        if is_non_critical {
            non_critical = non_critical.max(status);
        } else {
            critical = critical.max(status);
        }
    }

    if critical != StatusLevel::Good {
        critical
    } else if non_critical != StatusLevel::Good {
        StatusLevel::Warn
    } else {
        StatusLevel::Good
    }
}

pub fn overall_status(subsystems: &[Subsystem]) -> StatusLevel {
    fold_statuses(subsystems.iter().map(|s| (s.status, s.non_critical)))
}
