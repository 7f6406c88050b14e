use common::{Error, Result};
use rand::Rng;
use tracing::warn;

/// Injects random infrastructure failures to exercise retries and flagging.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureSimulator {
    one_in: u32,
}

impl FailureSimulator {
    /// Fails about once every `one_in` calls; 0 never fails, 1 always does.
    pub fn new(one_in: u32) -> Self {
        Self { one_in }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.one_in > 0
    }

    pub fn check(&self, operation: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        if rand::rng().random_range(0..self.one_in) == 0 {
            warn!(operation, "Simulated failure");
            return Err(Error::Simulated(format!("fail simulation during {}", operation)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_fails() {
        let sim = FailureSimulator::disabled();
        assert!((0..1_000).all(|_| sim.check("put").is_ok()));
    }

    #[test]
    fn test_one_in_one_always_fails_transiently() {
        let err = FailureSimulator::new(1).check("put").unwrap_err();
        assert!(err.is_transient());
    }
}
