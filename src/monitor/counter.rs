use crate::models::ClassificationResult;

/// Ceiling of the displayed inactivity count.
pub const INACTIVITY_CAP: u8 = 5;

/// Result of feeding one classification into the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub count: u8,
    pub threshold_crossed: bool,
}

/// Consecutive-inactive counter, saturating at [`INACTIVITY_CAP`].
///
/// The count is advisory: it is shown to the student and sent to the classifier
/// each cycle, but only the classifier's `notification_triggered` flag crosses
/// the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InactivityCounter {
    count: u8,
}

impl InactivityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn observe(&mut self, result: &ClassificationResult) -> Observation {
        if result.notification_triggered {
            self.count = 0;
            return Observation {
                count: 0,
                threshold_crossed: true,
            };
        }

        if result.is_inactive() {
            if self.count < INACTIVITY_CAP {
                self.count += 1;
            }
        } else {
            self.count = 0;
        }

        Observation {
            count: self.count,
            threshold_crossed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, triggered: bool) -> ClassificationResult {
        ClassificationResult {
            label: label.to_string(),
            notification_triggered: triggered,
            notification_text: None,
        }
    }

    #[test]
    fn counts_consecutive_inactive() {
        let mut counter = InactivityCounter::new();
        for expected in 1..=3 {
            let obs = counter.observe(&result("inactive", false));
            assert_eq!(obs.count, expected);
            assert!(!obs.threshold_crossed);
        }
    }

    #[test]
    fn saturates_at_cap() {
        let mut counter = InactivityCounter::new();
        for _ in 0..12 {
            counter.observe(&result("inactive", false));
        }
        assert_eq!(counter.count(), INACTIVITY_CAP);
    }

    #[test]
    fn any_other_label_resets() {
        let mut counter = InactivityCounter::new();
        counter.observe(&result("inactive", false));
        counter.observe(&result("inactive", false));
        assert_eq!(counter.observe(&result("active", false)).count, 0);

        counter.observe(&result("inactive", false));
        assert_eq!(counter.observe(&result("sleeping", false)).count, 0);
    }

    #[test]
    fn triggered_notification_resets_and_crosses() {
        let mut counter = InactivityCounter::new();
        for _ in 0..5 {
            counter.observe(&result("inactive", false));
        }
        let obs = counter.observe(&result("inactive", true));
        assert_eq!(
            obs,
            Observation {
                count: 0,
                threshold_crossed: true
            }
        );
    }

    #[test]
    fn count_at_cap_does_not_cross_on_its_own() {
        let mut counter = InactivityCounter::new();
        let crossed = (0..20)
            .map(|_| counter.observe(&result("inactive", false)))
            .any(|obs| obs.threshold_crossed);
        assert!(!crossed);
    }

    #[test]
    fn arbitrary_sequences_stay_bounded() {
        let labels = ["inactive", "active", "inactive", "inactive", "away"];
        let mut counter = InactivityCounter::new();
        // Deterministic pseudo-random walk over labels and trigger flags.
        let mut seed: u32 = 0x9E37_79B9;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let label = labels[(seed % labels.len() as u32) as usize];
            let triggered = seed % 11 == 0;
            let before = counter.count();
            let obs = counter.observe(&result(label, triggered));

            assert!(obs.count <= INACTIVITY_CAP);
            if triggered || label != "inactive" {
                assert_eq!(obs.count, 0);
            } else {
                assert_eq!(obs.count, (before + 1).min(INACTIVITY_CAP));
            }
        }
    }
}
