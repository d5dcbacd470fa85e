#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub exp_unix_ts: u64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(value: String, exp_unix_ts: u64) -> Self {
        Self { value, exp_unix_ts }
    }

    /// Usable while `now < exp - safety_margin`.
    pub fn is_fresh(&self, now: u64, safety_margin_seconds: u64) -> bool {
        (now as i128) < self.exp_unix_ts as i128 - safety_margin_seconds as i128
    }

    /// Negative once expired; saturates for `exp` beyond `i64::MAX`.
    pub fn seconds_remaining(&self, now: u64) -> i64 {
        clamp_i64(self.exp_unix_ts as i128 - now as i128)
    }

    /// `exp` as a gauge value, saturating at `i64::MAX`.
    pub fn exp_i64(&self) -> i64 {
        clamp_i64(self.exp_unix_ts as i128)
    }
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
