//! Wall-clock helpers. Tokens carry seconds, proofs carry milliseconds.

use time::OffsetDateTime;

/// Current UNIX time in whole seconds.
#[must_use]
pub fn now_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Current UNIX time in whole milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    let elapsed = OffsetDateTime::now_utc() - OffsetDateTime::UNIX_EPOCH;
    i64::try_from(elapsed.whole_milliseconds()).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn millis_and_seconds_agree() {
        let secs = now_seconds();
        let millis = now_millis();
        assert!((millis.div_euclid(1000) - secs).abs() <= 1);
    }
}
