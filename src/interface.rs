//! Transports which carry commands and pixel data to the controller, and the clock the driver
//! uses for reset delays and transfer timeouts.

use core::sync::atomic::{AtomicBool, Ordering};

/// The bus connection to the display controller.
///
/// Every call is one bus transaction: the implementation must assert the chip select for the
/// whole command or data burst and drive the data/command line accordingly, so that transactions
/// of different callers never interleave.
///
/// The background transfer methods are optional. Transports without a DMA-capable channel keep
/// the defaults, and the driver then streams everything through `send_data`.
pub trait DisplayInterface {
    type Error;

    /// Send one command byte with the data/command line in "command" state.
    fn send_command(&mut self, cmd: u8) -> Result<(), Self::Error>;

    /// Send a burst of data bytes with the data/command line in "data" state, blocking until the
    /// bus accepted all of them.
    fn send_data(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Drive the hardware reset line. `asserted` holds the controller in reset.
    fn set_reset(&mut self, _asserted: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Switch the backlight.
    fn set_backlight(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Claim the channel used for background transfers. Called once when the driver is
    /// constructed; returning `false` permanently routes all pixel data through `send_data`.
    fn claim_async(&mut self) -> bool {
        false
    }

    /// Start sending `buf` as one data burst in the background and return immediately. The
    /// driver does not touch `buf` again until `poll_data` reported completion or `abort_data`
    /// was called.
    fn start_data(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.send_data(buf)
    }

    /// Check whether the burst started by `start_data` finished.
    fn poll_data(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }

    /// Stop the burst started by `start_data` and release the bus.
    fn abort_data(&mut self) {}
}

/// A free-running millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch. The value may wrap around.
    fn now_ms(&mut self) -> u32;

    /// Busy-wait for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        let start = self.now_ms();
        while self.now_ms().wrapping_sub(start) < ms {
            self.idle();
        }
    }

    /// Called between polls of a background transfer. Override to yield to other work or to
    /// sleep until the next interrupt.
    fn idle(&mut self) {
        core::hint::spin_loop();
    }
}

/// A completion flag for transports whose background transfer finishes in an interrupt handler.
///
/// Each transport instance owns its own signal, so the handler needs a reference to that one
/// instance rather than a global "current display". Only plain loads and stores are used, which
/// keeps it usable on cores without atomic read-modify-write instructions.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    done: AtomicBool,
}

impl CompletionSignal {
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Clear the flag before starting a transfer.
    pub fn arm(&self) {
        self.done.store(false, Ordering::Release);
    }

    /// Mark the transfer finished. Safe to call from an interrupt handler.
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Report completion in the form `DisplayInterface::poll_data` expects.
    pub fn poll<E>(&self) -> nb::Result<(), E> {
        if self.is_signaled() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

pub mod spi {
    //! The SPI interface supports the "4-wire" serial interface of the controller, such that each
    //! word on the SPI bus is 8 bits and a separate GPIO selects between command and data. The
    //! chip select line is driven by this interface so that it brackets exactly one command or
    //! data burst.

    use core::convert::Infallible;

    use embedded_hal as hal;
    use hal::digital::v2::OutputPin;

    use super::DisplayInterface;

    /// Errors of the SPI interface. Pin errors carry no detail because the pins may all be of
    /// different types.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum SpiInterfaceError<E> {
        /// The SPI peripheral reported an error.
        Bus(E),
        /// Setting one of the GPIO lines failed.
        Pin,
    }

    /// Stand-in for a reset or backlight line that is not wired to the MCU.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct NoPin;

    impl OutputPin for NoPin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    pub struct SpiInterface<SPI, DC, CS, RST = NoPin, BL = NoPin> {
        /// The SPI master device connected to the controller.
        spi: SPI,
        /// A GPIO output pin connected to the D/C (data/command) pin of the controller.
        dc: DC,
        /// A GPIO output pin connected to the active-low chip select.
        cs: CS,
        /// A GPIO output pin connected to the active-low reset.
        rst: RST,
        /// A GPIO output pin switching the backlight, active high.
        bl: BL,
    }

    impl<SPI, DC, CS> SpiInterface<SPI, DC, CS>
    where
        SPI: hal::blocking::spi::Write<u8>,
        DC: OutputPin,
        CS: OutputPin,
    {
        /// Create a new SPI interface without reset or backlight control. `spi` is the SPI master
        /// device, `dc` the GPIO output pin connected to the D/C pin and `cs` the one connected
        /// to the chip select.
        pub fn new(spi: SPI, dc: DC, cs: CS) -> Self {
            Self::with_control(spi, dc, cs, NoPin, NoPin)
        }
    }

    impl<SPI, DC, CS, RST, BL> SpiInterface<SPI, DC, CS, RST, BL>
    where
        SPI: hal::blocking::spi::Write<u8>,
        DC: OutputPin,
        CS: OutputPin,
        RST: OutputPin,
        BL: OutputPin,
    {
        /// Create a new SPI interface which also drives the reset and backlight lines.
        pub fn with_control(spi: SPI, dc: DC, cs: CS, rst: RST, bl: BL) -> Self {
            Self { spi, dc, cs, rst, bl }
        }

        /// Give back the bus and the pins.
        pub fn release(self) -> (SPI, DC, CS, RST, BL) {
            (self.spi, self.dc, self.cs, self.rst, self.bl)
        }

        fn transaction(
            &mut self,
            command: bool,
            buf: &[u8],
        ) -> Result<(), SpiInterfaceError<SPI::Error>> {
            if command {
                self.dc.set_low().map_err(|_| SpiInterfaceError::Pin)?;
            } else {
                self.dc.set_high().map_err(|_| SpiInterfaceError::Pin)?;
            }
            self.cs.set_low().map_err(|_| SpiInterfaceError::Pin)?;
            let written = self.spi.write(buf).map_err(SpiInterfaceError::Bus);
            // Release the chip select even when the write failed.
            self.cs.set_high().map_err(|_| SpiInterfaceError::Pin)?;
            written
        }
    }

    impl<SPI, DC, CS, RST, BL> DisplayInterface for SpiInterface<SPI, DC, CS, RST, BL>
    where
        SPI: hal::blocking::spi::Write<u8>,
        DC: OutputPin,
        CS: OutputPin,
        RST: OutputPin,
        BL: OutputPin,
    {
        type Error = SpiInterfaceError<SPI::Error>;

        fn send_command(&mut self, cmd: u8) -> Result<(), Self::Error> {
            self.transaction(true, &[cmd])
        }

        fn send_data(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
            if buf.is_empty() {
                return Ok(());
            }
            self.transaction(false, buf)
        }

        fn set_reset(&mut self, asserted: bool) -> Result<(), Self::Error> {
            if asserted {
                self.rst.set_low()
            } else {
                self.rst.set_high()
            }
            .map_err(|_| SpiInterfaceError::Pin)
        }

        fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error> {
            if on {
                self.bl.set_high()
            } else {
                self.bl.set_low()
            }
            .map_err(|_| SpiInterfaceError::Pin)
        }
    }

}

#[cfg(test)]
pub mod test_spy {
    //! An interface for use in unit tests to spy on whatever was sent to it, plus a clock that
    //! advances one millisecond every time it is read.

    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::{Clock, DisplayInterface};
    use crate::command::consts::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Sent {
        Cmd(u8),
        Data(Vec<u8>),
        /// A burst handed to the background channel.
        AsyncData(Vec<u8>),
        Abort,
        Reset(bool),
        Backlight(bool),
    }

    /// How the spy answers background transfer requests.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub enum AsyncMode {
        /// The background channel can not be claimed.
        Unavailable,
        /// Each transfer reports completion after this many unsuccessful polls.
        CompleteAfter(u32),
        /// Transfers never complete.
        Stall,
    }

    struct Shared {
        sent: Vec<Sent>,
        mode: AsyncMode,
        polls_left: u32,
    }

    /// Clones share one log, so a test keeps a handle while the display owns the other.
    #[derive(Clone)]
    pub struct TestSpyInterface {
        shared: Rc<RefCell<Shared>>,
    }

    impl TestSpyInterface {
        pub fn new() -> Self {
            Self::with_async(AsyncMode::Unavailable)
        }

        pub fn with_async(mode: AsyncMode) -> Self {
            TestSpyInterface {
                shared: Rc::new(RefCell::new(Shared {
                    sent: Vec::new(),
                    mode,
                    polls_left: 0,
                })),
            }
        }

        pub fn split(&self) -> Self {
            self.clone()
        }

        pub fn set_async_mode(&self, mode: AsyncMode) {
            self.shared.borrow_mut().mode = mode;
        }

        pub fn clear(&self) {
            self.shared.borrow_mut().sent.clear()
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.shared.borrow().sent.clone()
        }

        pub fn check_multi(&self, expected: &[Sent]) {
            assert_eq!(self.shared.borrow().sent.as_slice(), expected);
        }

        /// Lengths of the bursts handed to the background channel, in order.
        pub fn async_bursts(&self) -> Vec<usize> {
            self.shared
                .borrow()
                .sent
                .iter()
                .filter_map(|s| match s {
                    Sent::AsyncData(d) => Some(d.len()),
                    _ => None,
                })
                .collect()
        }

        /// Number of bytes sent after a memory write command, synchronously or not.
        pub fn pixel_bytes(&self) -> usize {
            let mut cmd = None;
            let mut total = 0;
            for s in self.shared.borrow().sent.iter() {
                match s {
                    Sent::Cmd(c) => cmd = Some(*c),
                    Sent::Data(d) | Sent::AsyncData(d) if cmd == Some(RAMWR) => total += d.len(),
                    _ => {}
                }
            }
            total
        }

        /// Replay the log the way the controller would: decode the address window commands and
        /// place every streamed pixel. Returns `(x, y, color)` in write order.
        pub fn pixels(&self) -> Vec<(u16, u16, u16)> {
            let mut out = Vec::new();
            let mut cmd = None;
            let mut cols = (0u16, 0u16);
            let mut rows = (0u16, 0u16);
            let mut cursor = (0u16, 0u16);
            let mut high: Option<u8> = None;
            for s in self.shared.borrow().sent.iter() {
                match s {
                    Sent::Cmd(c) => {
                        cmd = Some(*c);
                        if *c == RAMWR {
                            cursor = (cols.0, rows.0);
                            high = None;
                        }
                    }
                    Sent::Data(d) | Sent::AsyncData(d) => match cmd {
                        Some(CASET) => cols = range(d),
                        Some(RASET) => rows = range(d),
                        Some(RAMWR) => {
                            for &b in d {
                                match high.take() {
                                    None => high = Some(b),
                                    Some(h) => {
                                        out.push((cursor.0, cursor.1, u16::from_be_bytes([h, b])));
                                        cursor.0 += 1;
                                        if cursor.0 > cols.1 {
                                            cursor = (cols.0, cursor.1 + 1);
                                        }
                                    }
                                }
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
            out
        }

        /// Final color of every pixel that was written at least once.
        pub fn pixel_map(&self) -> BTreeMap<(u16, u16), u16> {
            self.pixels()
                .into_iter()
                .map(|(x, y, c)| ((x, y), c))
                .collect()
        }
    }

    fn range(d: &[u8]) -> (u16, u16) {
        (
            u16::from_be_bytes([d[0], d[1]]),
            u16::from_be_bytes([d[2], d[3]]),
        )
    }

    impl DisplayInterface for TestSpyInterface {
        type Error = ();

        fn send_command(&mut self, cmd: u8) -> Result<(), ()> {
            self.shared.borrow_mut().sent.push(Sent::Cmd(cmd));
            Ok(())
        }

        fn send_data(&mut self, data: &[u8]) -> Result<(), ()> {
            self.shared
                .borrow_mut()
                .sent
                .push(Sent::Data(data.to_vec()));
            Ok(())
        }

        fn set_reset(&mut self, asserted: bool) -> Result<(), ()> {
            self.shared.borrow_mut().sent.push(Sent::Reset(asserted));
            Ok(())
        }

        fn set_backlight(&mut self, on: bool) -> Result<(), ()> {
            self.shared.borrow_mut().sent.push(Sent::Backlight(on));
            Ok(())
        }

        fn claim_async(&mut self) -> bool {
            self.shared.borrow().mode != AsyncMode::Unavailable
        }

        fn start_data(&mut self, buf: &[u8]) -> Result<(), ()> {
            let mut shared = self.shared.borrow_mut();
            shared.sent.push(Sent::AsyncData(buf.to_vec()));
            shared.polls_left = match shared.mode {
                AsyncMode::CompleteAfter(n) => n,
                _ => 0,
            };
            Ok(())
        }

        fn poll_data(&mut self) -> nb::Result<(), ()> {
            let mut shared = self.shared.borrow_mut();
            match shared.mode {
                AsyncMode::Stall => Err(nb::Error::WouldBlock),
                _ if shared.polls_left > 0 => {
                    shared.polls_left -= 1;
                    Err(nb::Error::WouldBlock)
                }
                _ => Ok(()),
            }
        }

        fn abort_data(&mut self) {
            self.shared.borrow_mut().sent.push(Sent::Abort);
        }
    }

    /// A clock which advances one millisecond per reading, so delays and timeouts finish after a
    /// deterministic number of polls.
    #[derive(Default)]
    pub struct TestClock {
        now: u32,
    }

    impl TestClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn starting_at(now: u32) -> Self {
            TestClock { now }
        }
    }

    impl Clock for TestClock {
        fn now_ms(&mut self) -> u32 {
            self.now = self.now.wrapping_add(1);
            self.now
        }
    }
}
