//! The loaded-driver collection and the only rendering entry point the rest
//! of the server uses.
//!
//! Each primitive is broadcast to every loaded driver; drivers that did not
//! advertise the capability get the synthesized fallback instead, so a
//! mixed set of dumb and smart modules shows the same content. Geometry is
//! taken from the first driver reporting `Caps::GEOMETRY` (the output
//! driver); loading fails without one.

use crate::{fallback, Caps, CursorKind, DisplayProps, Driver, DriverError, Icon};

#[derive(Debug)]
pub struct DriverSet {
    drivers: Vec<Box<dyn Driver>>,
    output: usize,
    props: DisplayProps,
}

impl DriverSet {
    /// Assemble a set from already-constructed drivers. Fails when none of
    /// them can act as the output display.
    pub fn assemble(drivers: Vec<Box<dyn Driver>>) -> Result<Self, DriverError> {
        let output = drivers
            .iter()
            .position(|d| d.caps().contains(Caps::GEOMETRY))
            .ok_or(DriverError::NoOutputDriver)?;
        let out = &drivers[output];
        let props = DisplayProps {
            width: out.width(),
            height: out.height(),
            cellwidth: out.cellwidth(),
            cellheight: out.cellheight(),
        };
        tracing::info!(
            target: "driver",
            output = out.name(),
            width = props.width,
            height = props.height,
            loaded = drivers.len(),
            "driver set assembled"
        );
        Ok(Self {
            drivers,
            output,
            props,
        })
    }

    pub fn props(&self) -> DisplayProps {
        self.props
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// True when any loaded module must keep the process in the foreground.
    pub fn needs_foreground(&self) -> bool {
        self.drivers.iter().any(|d| d.stay_in_foreground())
    }

    /// Direct access for tests and driver-specific tooling.
    pub fn driver_mut(&mut self, index: usize) -> Option<&mut (dyn Driver + '_)> {
        match self.drivers.get_mut(index) {
            Some(d) => Some(d.as_mut()),
            None => None,
        }
    }

    pub fn clear(&mut self) {
        for d in &mut self.drivers {
            d.clear();
        }
    }

    pub fn flush(&mut self) {
        for d in &mut self.drivers {
            d.flush();
        }
    }

    pub fn string(&mut self, x: u16, y: u16, text: &str) {
        for d in &mut self.drivers {
            d.string(x, y, text);
        }
    }

    pub fn chr(&mut self, x: u16, y: u16, c: char) {
        for d in &mut self.drivers {
            d.chr(x, y, c);
        }
    }

    pub fn hbar(&mut self, x: u16, y: u16, len: u16, promille: u16) {
        for d in &mut self.drivers {
            if d.caps().contains(Caps::HBAR) {
                d.hbar(x, y, len, promille);
            } else {
                fallback::hbar(&mut **d, x, y, len, promille);
            }
        }
    }

    pub fn vbar(&mut self, x: u16, y: u16, len: u16, promille: u16) {
        for d in &mut self.drivers {
            if d.caps().contains(Caps::VBAR) {
                d.vbar(x, y, len, promille);
            } else {
                fallback::vbar(&mut **d, x, y, len, promille);
            }
        }
    }

    pub fn pbar(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        promille: u16,
        begin: Option<&str>,
        end: Option<&str>,
    ) {
        for d in &mut self.drivers {
            if d.caps().contains(Caps::PBAR) {
                d.pbar(x, y, width, promille, begin, end);
            } else {
                fallback::pbar(&mut **d, x, y, width, promille, begin, end);
            }
        }
    }

    pub fn num(&mut self, x: u16, digit: u8) {
        let height = self.props.height;
        for d in &mut self.drivers {
            if d.caps().contains(Caps::NUM) {
                d.num(x, digit);
            } else {
                fallback::num(&mut **d, height, x, digit);
            }
        }
    }

    pub fn icon(&mut self, x: u16, y: u16, icon: Icon) {
        for d in &mut self.drivers {
            let native = d.caps().contains(Caps::ICON) && d.icon(x, y, icon);
            if !native {
                fallback::icon(&mut **d, x, y, icon);
            }
        }
    }

    pub fn heartbeat(&mut self, on: bool, frame: u64) {
        if !on {
            return;
        }
        let width = self.props.width;
        for d in &mut self.drivers {
            let caps = d.caps();
            if caps.contains(Caps::HEARTBEAT) {
                d.heartbeat(on);
            } else {
                fallback::heartbeat(&mut **d, width, frame, caps.contains(Caps::ICON));
            }
        }
    }

    pub fn cursor(&mut self, x: u16, y: u16, kind: CursorKind, frame: u64) {
        if kind == CursorKind::Off {
            return;
        }
        for d in &mut self.drivers {
            if d.caps().contains(Caps::CURSOR) {
                d.cursor(x, y, kind);
            } else {
                fallback::cursor(&mut **d, x, y, kind, frame);
            }
        }
    }

    pub fn backlight(&mut self, on: bool) {
        for d in &mut self.drivers {
            if d.caps().contains(Caps::BACKLIGHT) {
                d.backlight(on);
            }
        }
    }

    pub fn output(&mut self, state: i64) {
        for d in &mut self.drivers {
            if d.caps().contains(Caps::OUTPUT) {
                d.output(state);
            }
        }
    }

    /// Drain pending keys from every input-capable driver, in load order.
    pub fn poll_keys(&mut self) -> Vec<String> {
        let mut keys = Vec::new();
        for d in &mut self.drivers {
            if !d.caps().contains(Caps::KEYS) {
                continue;
            }
            while let Some(key) = d.get_key() {
                keys.push(key);
            }
        }
        keys
    }

    /// Info string of the output driver (other modules' info lines are
    /// appended on separate lines).
    pub fn info(&mut self) -> String {
        let mut lines = Vec::new();
        for (i, d) in self.drivers.iter_mut().enumerate() {
            if !d.caps().contains(Caps::INFO) {
                continue;
            }
            let line = d.info();
            if line.is_empty() {
                continue;
            }
            if i == self.output {
                lines.insert(0, line);
            } else {
                lines.push(line);
            }
        }
        lines.join("\n")
    }

    /// Close every driver; the set is unusable afterwards.
    pub fn unload(&mut self) {
        for d in &mut self.drivers {
            tracing::debug!(target: "driver", driver = d.name(), "closing driver");
            d.close();
        }
        self.drivers.clear();
    }
}

impl Drop for DriverSet {
    fn drop(&mut self) {
        self.unload();
    }
}
