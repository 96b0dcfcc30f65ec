//! Platform driver: binds owl UARTs described by the firmware to ports.

use crate::{
    config::DriverConfig,
    console::OwlConsole,
    error::{SerialError, SerialResult},
    port::{OwlPort, PortResources, PortState},
    regs::{MmioWindow, RegisterIo, WINDOW_SIZE},
};
use alloc::sync::Arc;
use core::ptr::NonNull;
use serial_core::{
    driver::UartDriver,
    irq::{IrqController, IrqLine},
    uart::UartOps,
};

/// Compatible strings handled by this driver.
pub const OWL_SERIAL_OF_MATCH: &[&str] = &["actions,s900-serial"];

/// Alias stem giving a UART its line number (`serial0`, `serial1`, ...).
pub const ALIAS_STEM: &str = "serial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Physical memory range of a device.
pub struct Resource {
    start: u64,
    len: usize,
}

impl Resource {
    #[must_use]
    #[inline]
    pub const fn new(start: u64, len: usize) -> Self {
        Self { start, len }
    }

    #[must_use]
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A device node as described by the firmware.
pub trait PlatformDevice {
    fn name(&self) -> &str;

    fn compatible(&self) -> &[&str];

    fn mem_resource(&self, index: usize) -> Option<Resource>;

    fn irq(&self, index: usize) -> Option<IrqLine>;

    /// Index of the alias `<stem><id>` pointing at this node.
    fn alias_id(&self, stem: &str) -> Option<usize>;
}

/// Maps device memory into the address space.
pub trait IoMapper: Send + Sync {
    fn ioremap(&self, res: &Resource) -> SerialResult<NonNull<u32>>;

    /// Releases a mapping returned by `ioremap`.
    fn iounmap(&self, base: NonNull<u32>, res: &Resource);
}

/// Register window backed by an `IoMapper` mapping.
///
/// The mapping is released when the window is dropped, that is when the
/// last reference to its port goes away.
pub struct IoMem {
    window: MmioWindow,
    res: Resource,
    mapper: Arc<dyn IoMapper>,
}

impl core::fmt::Debug for IoMem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IoMem")
            .field("base", &self.window.base())
            .field("res", &self.res)
            .finish_non_exhaustive()
    }
}

impl IoMem {
    #[must_use]
    /// Takes ownership of a mapping.
    ///
    /// # Safety
    ///
    /// `base` must have been returned by `mapper.ioremap(&res)`, `res` must
    /// be at least `WINDOW_SIZE` bytes long and the mapping must not be
    /// released by anyone else.
    pub unsafe fn new(base: NonNull<u32>, res: Resource, mapper: Arc<dyn IoMapper>) -> Self {
        Self {
            // SAFETY: The caller guarantees the mapping covers the window.
            window: unsafe { MmioWindow::new(base) },
            res,
            mapper,
        }
    }

    #[must_use]
    #[inline]
    pub const fn base(&self) -> NonNull<u32> {
        self.window.base()
    }
}

impl RegisterIo for IoMem {
    #[inline]
    fn read(&self, offset: usize) -> u32 {
        self.window.read(offset)
    }

    #[inline]
    fn write(&self, offset: usize, value: u32) {
        self.window.write(offset, value);
    }
}

impl Drop for IoMem {
    fn drop(&mut self) {
        self.mapper.iounmap(self.window.base(), &self.res);
    }
}

/// The owl serial driver, registered and ready to probe devices.
pub struct OwlSerial {
    config: DriverConfig,
    driver: Arc<UartDriver<OwlPort>>,
    console: Option<Arc<OwlConsole>>,
    irq_ctl: Arc<dyn IrqController>,
    mapper: Arc<dyn IoMapper>,
}

impl core::fmt::Debug for OwlSerial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OwlSerial")
            .field("config", &self.config)
            .field("driver", &self.driver)
            .field("console", &self.console)
            .finish_non_exhaustive()
    }
}

impl OwlSerial {
    /// Validates `config`, registers the UART driver and creates the console.
    pub fn init(
        config: DriverConfig,
        irq_ctl: Arc<dyn IrqController>,
        mapper: Arc<dyn IoMapper>,
    ) -> SerialResult<Self> {
        log::info!(target: "owl_serial", "owl_serial_init");

        config.validate().inspect_err(|err| {
            log::error!(target: "owl_serial", "{}", err);
        })?;

        let driver = Arc::new(UartDriver::with_buffer_sizes(
            config.driver_name(),
            config.dev_name(),
            config.nr(),
            config.xmit_size(),
            config.flip_size(),
        ));
        driver.register().inspect_err(|_| {
            log::error!(
                target: "owl_serial",
                "register {} uart driver failed",
                config.driver_name(),
            );
        })?;

        let console = config
            .console()
            .map(|binding| Arc::new(OwlConsole::new(binding, driver.clone())));

        Ok(Self {
            config,
            driver,
            console,
            irq_ctl,
            mapper,
        })
    }

    /// Binds `dev` to a port.
    ///
    /// The returned port is also registered in the driver on the line given
    /// by the device's `serial` alias. On error nothing stays mapped.
    pub fn probe(&self, dev: &dyn PlatformDevice) -> SerialResult<Arc<OwlPort>> {
        log::info!(target: "owl_serial", "{}: probe", dev.name());

        let matched = dev
            .compatible()
            .iter()
            .any(|compat| OWL_SERIAL_OF_MATCH.contains(compat));
        if !matched {
            log::error!(target: "owl_serial", "{}: No device match found", dev.name());
            return Err(SerialError::NoMatch);
        }

        let Some(mem) = dev.mem_resource(0).filter(|mem| mem.len() >= WINDOW_SIZE) else {
            log::error!(target: "owl_serial", "{}: No IO memory resource", dev.name());
            return Err(SerialError::NoMemResource);
        };

        let base = self.mapper.ioremap(&mem).inspect_err(|_| {
            log::error!(target: "owl_serial", "{}: Failed to map memory resource", dev.name());
        })?;
        // SAFETY: `base` was just mapped from `mem`, which covers the window.
        // From here on, dropping `regs` releases the mapping.
        let regs = unsafe { IoMem::new(base, mem, self.mapper.clone()) };

        let Some(irq) = dev.irq(0) else {
            log::error!(target: "owl_serial", "{}: Failed to get irq", dev.name());
            return Err(SerialError::NoIrq);
        };

        let Some(line) = dev.alias_id(ALIAS_STEM) else {
            log::error!(target: "owl_serial", "{}: failed to get alias id", dev.name());
            return Err(SerialError::NoAlias);
        };

        let uart = self.driver.state(line).inspect_err(|err| {
            log::error!(target: "owl_serial", "{}: {}", dev.name(), err);
        })?;

        let port = OwlPort::new(
            regs,
            PortResources { mem, irq, line },
            uart,
            self.irq_ctl.clone(),
            self.config.poll(),
        );
        self.driver.add_one_port(port.clone()).inspect_err(|err| {
            log::error!(
                target: "owl_serial",
                "{}: Failed to add uart port, err {}",
                dev.name(),
                err,
            );
        })?;

        Ok(port)
    }

    /// Unbinds the port of `line`, shutting it down if needed.
    ///
    /// A startup or shutdown in progress is waited for first. The register
    /// window is unmapped once the last reference to the port is dropped.
    pub fn remove(&self, line: usize) -> SerialResult<()> {
        let dev_name = self.config.dev_name();
        log::info!(target: "owl_serial", "{}{}: remove", dev_name, line);

        let port = self.driver.remove_one_port(line)?;
        let settled = self
            .config
            .poll()
            .spin_until(|| matches!(port.state(), PortState::Inactive | PortState::Active));
        if settled.is_err() {
            log::warn!(
                target: "owl_serial",
                "{}{}: unbound while {:?}",
                dev_name,
                line,
                port.state()
            );
        }

        // The line is unbound even if the shutdown fails.
        if port.is_active() {
            port.shutdown()?;
        }
        Ok(())
    }

    /// Removes every port and unregisters the driver.
    ///
    /// A failing line does not stop the others. The first error is returned.
    pub fn exit(self) -> SerialResult<()> {
        log::info!(target: "owl_serial", "owl_serial_exit");

        let mut res = Ok(());
        for line in self.driver.lines() {
            if let Err(err) = self.remove(line) {
                log::error!(
                    target: "owl_serial",
                    "{}{}: remove failed: {}",
                    self.config.dev_name(),
                    line,
                    err,
                );
                res = res.and(Err(err));
            }
        }
        if let Err(err) = self.driver.unregister() {
            res = res.and(Err(err.into()));
        }
        res
    }

    #[must_use]
    #[inline]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[must_use]
    #[inline]
    pub const fn driver(&self) -> &Arc<UartDriver<OwlPort>> {
        &self.driver
    }

    #[must_use]
    #[inline]
    pub const fn console(&self) -> Option<&Arc<OwlConsole>> {
        self.console.as_ref()
    }

    #[must_use]
    pub fn port(&self, line: usize) -> Option<Arc<OwlPort>> {
        self.driver.port(line)
    }
}
