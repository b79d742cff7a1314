//! Name-to-constructor registry for display modules.
//!
//! Modules are linked into the binary and selected by name at startup (the
//! `Driver` config key or `-d` flag). The registry owns API-version
//! negotiation and `init`; the constructor only builds the value. A version
//! mismatch or failed `init` is fatal for that module.

use std::collections::BTreeMap;

use crate::{debug_drv::DebugDriver, term::TermDriver, Driver, DriverConfig, DriverError, API_VERSION};

pub type DriverCtor = fn(&DriverConfig) -> Result<Box<dyn Driver>, DriverError>;

pub struct DriverRegistry {
    ctors: BTreeMap<&'static str, DriverCtor>,
}

impl DriverRegistry {
    /// Registry containing the modules compiled into this binary.
    pub fn builtin() -> Self {
        let mut ctors: BTreeMap<&'static str, DriverCtor> = BTreeMap::new();
        ctors.insert("debug", DebugDriver::from_config);
        ctors.insert("term", TermDriver::from_config);
        Self { ctors }
    }

    #[cfg(test)]
    pub fn with_ctor(name: &'static str, ctor: DriverCtor) -> Self {
        let mut reg = Self::builtin();
        reg.ctors.insert(name, ctor);
        reg
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ctors.keys().copied()
    }

    /// Construct, version-check, and initialize one module.
    pub fn load(&self, name: &str, cfg: &DriverConfig) -> Result<Box<dyn Driver>, DriverError> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| DriverError::Unknown(name.to_string()))?;
        let mut driver = ctor(cfg)?;
        if driver.api_version() != API_VERSION {
            return Err(DriverError::ApiMismatch {
                driver: name.to_string(),
                found: driver.api_version().to_string(),
                expected: API_VERSION,
            });
        }
        driver.init()?;
        tracing::info!(target: "driver", driver = name, caps = ?driver.caps(), "driver loaded");
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Caps;
    use std::any::Any;

    struct StaleDriver;

    impl Driver for StaleDriver {
        fn name(&self) -> &'static str {
            "stale"
        }
        fn api_version(&self) -> &'static str {
            "0.3"
        }
        fn caps(&self) -> Caps {
            Caps::GEOMETRY
        }
        fn init(&mut self) -> Result<(), DriverError> {
            panic!("init must not run on a version mismatch");
        }
        fn close(&mut self) {}
        fn clear(&mut self) {}
        fn string(&mut self, _: u16, _: u16, _: &str) {}
        fn chr(&mut self, _: u16, _: u16, _: char) {}
        fn as_any(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn stale_ctor(_: &DriverConfig) -> Result<Box<dyn Driver>, DriverError> {
        Ok(Box::new(StaleDriver))
    }

    #[test]
    fn unknown_name_is_reported() {
        let reg = DriverRegistry::builtin();
        let err = reg.load("hd44780", &DriverConfig::new()).unwrap_err();
        assert!(matches!(err, DriverError::Unknown(name) if name == "hd44780"));
    }

    #[test]
    fn api_mismatch_is_fatal_before_init() {
        let reg = DriverRegistry::with_ctor("stale", stale_ctor);
        let err = reg.load("stale", &DriverConfig::new()).unwrap_err();
        match err {
            DriverError::ApiMismatch { found, expected, .. } => {
                assert_eq!(found, "0.3");
                assert_eq!(expected, API_VERSION);
            }
            other => panic!("expected ApiMismatch, got {other:?}"),
        }
    }

    #[test]
    fn builtin_debug_driver_loads() {
        let reg = DriverRegistry::builtin();
        let mut cfg = DriverConfig::new();
        cfg.set("Size", "20x4");
        let drv = reg.load("debug", &cfg).unwrap();
        assert_eq!(drv.name(), "debug");
        assert!(drv.caps().contains(Caps::GEOMETRY));
    }
}
