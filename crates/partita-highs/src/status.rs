//! Status conversions between HiGHS and partita.

use crate::ffi::HighsStatus;
use partita_solver::SolverStatus;

pub(crate) fn to_solver_status(status: HighsStatus) -> SolverStatus {
    match status {
        HighsStatus::Optimal => SolverStatus::Optimal,
        HighsStatus::Infeasible => SolverStatus::Infeasible,
        HighsStatus::Unbounded => SolverStatus::Unbounded,
        HighsStatus::UnboundedOrInfeasible => SolverStatus::Infeasible,
        HighsStatus::ReachedTimeLimit => SolverStatus::ReachedTimeLimit,
        HighsStatus::ReachedIterationLimit => SolverStatus::ReachedIterationLimit,
        HighsStatus::Unknown => SolverStatus::Unknown,
    }
}

/// Statuses whose primal values are trusted without a feasibility check.
pub(crate) fn is_proven(status: HighsStatus) -> bool {
    matches!(status, HighsStatus::Optimal)
}

/// Statuses that never carry a solution.
pub(crate) fn is_terminal_failure(status: HighsStatus) -> bool {
    matches!(
        status,
        HighsStatus::Infeasible | HighsStatus::Unbounded | HighsStatus::UnboundedOrInfeasible
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(to_solver_status(HighsStatus::Optimal), SolverStatus::Optimal);
        assert_eq!(
            to_solver_status(HighsStatus::UnboundedOrInfeasible),
            SolverStatus::Infeasible
        );
        assert_eq!(
            to_solver_status(HighsStatus::ReachedTimeLimit),
            SolverStatus::ReachedTimeLimit
        );
    }

    #[test]
    fn test_status_helpers() {
        assert!(is_proven(HighsStatus::Optimal));
        assert!(!is_proven(HighsStatus::ReachedTimeLimit));
        assert!(is_terminal_failure(HighsStatus::Infeasible));
        assert!(!is_terminal_failure(HighsStatus::Unknown));
    }
}
