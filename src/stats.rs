/// Sent/received counters for the whole process run. Owned by the driver,
/// reset only on restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingStats {
    pub sent: u64,
    pub received: u64,
}

impl PingStats {
    pub fn lost(&self) -> u64 {
        self.sent.saturating_sub(self.received)
    }

    /// Loss as `100 * (sent - received) / sent` in real arithmetic.
    ///
    /// Earlier builds divided first in integers and so reported 0% for any
    /// loss under half the sample; that behavior is deliberately not kept.
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        100.0 * self.lost() as f64 / self.sent as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_losses_in_ten_is_thirty_percent() {
        let stats = PingStats {
            sent: 10,
            received: 7,
        };
        assert_eq!(stats.lost(), 3);
        assert_eq!(stats.loss_percent(), 30.0);
    }

    #[test]
    fn one_loss_in_ten_is_ten_percent_not_zero() {
        // The truncating integer formula reports 0 here.
        let stats = PingStats {
            sent: 10,
            received: 9,
        };
        assert_eq!(stats.loss_percent(), 10.0);
    }

    #[test]
    fn no_attempts_is_zero_loss() {
        assert_eq!(PingStats::default().loss_percent(), 0.0);
    }

    #[test]
    fn all_lost_is_one_hundred_percent() {
        let stats = PingStats {
            sent: 4,
            received: 0,
        };
        assert_eq!(stats.loss_percent(), 100.0);
    }
}
