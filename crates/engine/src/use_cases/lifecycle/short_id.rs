//! Short identifier generation.

use std::sync::Arc;

use questline_domain::{DomainError, ShortId};

use crate::infrastructure::config::ShortIdConfig;
use crate::infrastructure::ports::RandomPort;

/// Draws short ids from the unambiguous alphabet.
///
/// Uniqueness is enforced by the store; callers retry with a fresh id on a
/// conflict, up to `attempts()` times.
pub struct ShortIdGenerator {
    random: Arc<dyn RandomPort>,
    config: ShortIdConfig,
}

impl ShortIdGenerator {
    pub fn new(random: Arc<dyn RandomPort>, config: ShortIdConfig) -> Self {
        Self { random, config }
    }

    pub fn next(&self) -> Result<ShortId, DomainError> {
        ShortId::generate(self.config.length, |alphabet| {
            let max = i32::try_from(alphabet).unwrap_or(i32::MAX) - 1;
            usize::try_from(self.random.gen_range(0, max)).unwrap_or_default()
        })
    }

    pub fn attempts(&self) -> u32 {
        self.config.attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedRandom, SystemRandom};
    use questline_domain::MIN_SHORT_ID_LENGTH;

    #[test]
    fn generates_configured_length() {
        let generator = ShortIdGenerator::new(Arc::new(SystemRandom::new()), ShortIdConfig::default());
        let id = generator.next().expect("short id");
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().len() >= MIN_SHORT_ID_LENGTH);
    }

    #[test]
    fn fixed_randomness_repeats() {
        let generator = ShortIdGenerator::new(Arc::new(FixedRandom(0)), ShortIdConfig::default());
        assert_eq!(generator.next().expect("a"), generator.next().expect("b"));
        assert_eq!(generator.next().expect("c").as_str(), "22222222");
    }

    #[test]
    fn attempts_never_drop_below_one() {
        let config = ShortIdConfig {
            length: 7,
            attempts: 0,
        };
        let generator = ShortIdGenerator::new(Arc::new(FixedRandom(0)), config);
        assert_eq!(generator.attempts(), 1);
    }
}
