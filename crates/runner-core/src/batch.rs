use crate::error::LaunchError;

/// RunTask launches at most this many tasks per call.
pub const MAX_TASKS_PER_CALL: u32 = 10;

/// Upper bound on the tasks one launch may request.
pub const MAX_DESIRED_COUNT: u32 = 1000;

/// Split `total` tasks into RunTask call sizes of at most `max`.
/// Every call is `max` except possibly the last, which carries the remainder.
pub fn batch_sizes(total: u32, max: u32) -> Result<Vec<u32>, LaunchError> {
    if total == 0 {
        return Err(LaunchError::InvalidCount(
            "desired task count must be at least 1".into(),
        ));
    }
    if total > MAX_DESIRED_COUNT {
        return Err(LaunchError::InvalidCount(format!(
            "desired task count {} exceeds the maximum of {}",
            total, MAX_DESIRED_COUNT
        )));
    }
    if max == 0 {
        return Err(LaunchError::InvalidCount(
            "tasks per call must be at least 1".into(),
        ));
    }

    let mut sizes = vec![max; (total / max) as usize];
    if total % max != 0 {
        sizes.push(total % max);
    }
    Ok(sizes)
}
