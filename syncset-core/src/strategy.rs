use std::fmt;
use std::str::FromStr;

use crate::config::SetConfig;
use crate::data_structures::{
    ArcLazySet, CoarseSet, CrossbeamEbrSet, EbrSet, FineSet, LazySet, LeakySet, OrderedSet,
};
use crate::error::SetError;
use crate::sync::ParkingLock;

/// Run-time selection of a set strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Coarse,
    Fine,
    Lazy,
    LazyArc,
    LockFree,
    LockFreeEbr,
    LockFreeCrossbeam,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Coarse,
        Strategy::Fine,
        Strategy::Lazy,
        Strategy::LazyArc,
        Strategy::LockFree,
        Strategy::LockFreeEbr,
        Strategy::LockFreeCrossbeam,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Coarse => "coarse",
            Strategy::Fine => "fine",
            Strategy::Lazy => "lazy",
            Strategy::LazyArc => "lazy-arc",
            Strategy::LockFree => "lock-free",
            Strategy::LockFreeEbr => "lock-free-ebr",
            Strategy::LockFreeCrossbeam => "lock-free-crossbeam",
        }
    }

    /// Whether operations make progress without taking locks.
    pub fn is_lock_free(self) -> bool {
        matches!(
            self,
            Strategy::LockFree | Strategy::LockFreeEbr | Strategy::LockFreeCrossbeam
        )
    }

    /// Builds an empty set; lock-based strategies use the default lock.
    pub fn build(self, config: &SetConfig) -> Result<Box<dyn OrderedSet>, SetError> {
        config.validate()?;

        let set: Box<dyn OrderedSet> = match self {
            Strategy::Coarse => Box::new(CoarseSet::<ParkingLock>::with_config(config)),
            Strategy::Fine => Box::new(FineSet::<ParkingLock>::with_config(config)),
            Strategy::Lazy => Box::new(LazySet::<ParkingLock>::with_config(config)),
            Strategy::LazyArc => Box::new(ArcLazySet::<ParkingLock>::with_config(config)),
            Strategy::LockFree => Box::new(LeakySet::with_config(config)),
            Strategy::LockFreeEbr => Box::new(EbrSet::with_config(config)),
            Strategy::LockFreeCrossbeam => Box::new(CrossbeamEbrSet::with_config(config)),
        };
        Ok(set)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = SetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| SetError::UnknownStrategy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>(), Ok(strategy));
        }
        assert_eq!(
            "optimistic".parse::<Strategy>(),
            Err(SetError::UnknownStrategy("optimistic".into()))
        );
    }

    #[test]
    fn test_built_set_reports_its_strategy() {
        for strategy in Strategy::ALL {
            let set = strategy.build(&SetConfig::default()).unwrap();
            assert_eq!(set.name(), strategy.name());
        }
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = SetConfig::default().with_max_workers(0);
        assert!(matches!(
            Strategy::Lazy.build(&config),
            Err(SetError::InvalidConfig(_))
        ));
    }
}
