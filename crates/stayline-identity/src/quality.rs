//! Data-quality score derived from a cleaning pass.

/// Score the batch from what a cleaning pass found.
///
/// Starts at 100, loses 2 per duplicate group and 1 per
/// standardization suggestion, floored at 60. When neither check ran
/// there is nothing to score against and a neutral 85 is returned.
pub fn quality_score(duplicate_groups: Option<usize>, suggestions: Option<usize>) -> u32 {
    if duplicate_groups.is_none() && suggestions.is_none() {
        return 85;
    }
    let penalty = 2 * duplicate_groups.unwrap_or(0) as i64 + suggestions.unwrap_or(0) as i64;
    (100 - penalty).max(60) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_batch_scores_full() {
        assert_eq!(quality_score(Some(0), Some(0)), 100);
    }

    #[test]
    fn groups_cost_double_what_suggestions_do() {
        assert_eq!(quality_score(Some(3), Some(4)), 90);
        assert_eq!(quality_score(Some(5), None), 90);
        assert_eq!(quality_score(None, Some(10)), 90);
    }

    #[test]
    fn score_is_floored() {
        assert_eq!(quality_score(Some(100), Some(100)), 60);
    }

    #[test]
    fn unmeasured_batch_gets_the_neutral_default() {
        assert_eq!(quality_score(None, None), 85);
    }
}
