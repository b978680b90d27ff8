//! The main API to the display driver. `Display` owns the interface and clock, brings the
//! controller up from a `Config`, tracks rotation, and offers the address window, bulk transfer
//! and drawing operations.

pub mod font;
pub mod geometry;
pub(crate) mod raster;
pub mod transfer;

use log::{debug, info};

use crate::color::Rgb565;
use crate::command::Command;
use crate::config::{Config, Tuning};
use crate::error::Error;
use crate::interface::{Clock, DisplayInterface};

pub use self::geometry::{PixelCoord, Rotation, Window};
pub use self::transfer::TransferState;

use self::geometry::Geometry;
use self::raster::Canvas;
use self::transfer::TransferEngine;

/// Reset line held asserted.
const RESET_PULSE_MS: u32 = 20;
/// Wait after releasing the reset line.
const RESET_SETTLE_MS: u32 = 120;
const SOFTWARE_RESET_MS: u32 = 150;
/// Wait after entering or leaving sleep mode.
const SLEEP_MS: u32 = 120;
const NORMAL_MODE_MS: u32 = 10;
const DISPLAY_ON_MS: u32 = 120;

/// A driver for an ST7789 display.
pub struct Display<'buf, DI, CLK>
where
    DI: DisplayInterface,
    CLK: Clock,
{
    iface: DI,
    clock: CLK,
    geometry: Geometry,
    inverted: bool,
    tuning: Tuning<'buf>,
    transfer: TransferEngine<'buf>,
}

impl<'buf, DI, CLK> Display<'buf, DI, CLK>
where
    DI: DisplayInterface,
    CLK: Clock,
{
    /// Construct a new display driver for the display connected to `iface`, timed by `clock`.
    ///
    /// Nothing is sent to the display; call `init` for that. Fails with `Error::InvalidConfig`
    /// when the panel dimensions or a tuning argument are out of range. When `config` asks for
    /// background transfers but the interface can not provide them, the driver falls back to
    /// blocking transfers instead of failing.
    pub fn new(mut iface: DI, clock: CLK, config: Config<'buf>) -> Result<Self, Error<DI::Error>> {
        if !config.has_valid_size() || !config.tuning.is_valid() {
            return Err(Error::InvalidConfig);
        }
        let Config {
            native_width,
            native_height,
            rotation,
            inverted,
            scratch,
            async_timeout_ms,
            tuning,
        } = config;
        let claimed = scratch.is_some() && iface.claim_async();
        Ok(Display {
            iface,
            clock,
            geometry: Geometry::new(native_width, native_height, rotation),
            inverted,
            tuning,
            transfer: TransferEngine::new(scratch, async_timeout_ms, claimed),
        })
    }

    /// Reset the controller, run the power-up sequence with the configured settings, clear the
    /// panel to black and switch the backlight on.
    pub fn init(&mut self) -> Result<(), Error<DI::Error>> {
        let (width, height) = self.geometry.native_size();
        info!(
            "initializing {}x{} panel, rotation {:?}, {} pixels per background chunk",
            width,
            height,
            self.geometry.rotation(),
            self.transfer.chunk_pixels()
        );
        self.hard_reset()?;
        self.power_up()
    }

    /// Bring the controller back to a known state after a fault: abort whatever transfer may be
    /// stuck, pulse the reset line and run the power-up sequence again. The current rotation is
    /// kept.
    pub fn reset(&mut self) -> Result<(), Error<DI::Error>> {
        info!("resetting display");
        if let Err(Error::Interface(e)) = self.transfer.settle(&mut self.iface, &mut self.clock) {
            return Err(Error::Interface(e));
        }
        self.hard_reset()?;
        self.power_up()
    }

    fn hard_reset(&mut self) -> Result<(), Error<DI::Error>> {
        self.iface.set_reset(true).map_err(Error::Interface)?;
        self.clock.delay_ms(RESET_PULSE_MS);
        self.iface.set_reset(false).map_err(Error::Interface)?;
        self.clock.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), Error<DI::Error>> {
        self.command(Command::SoftwareReset)?;
        self.clock.delay_ms(SOFTWARE_RESET_MS);
        self.command(Command::SetSleepMode(false))?;
        self.clock.delay_ms(SLEEP_MS);
        self.command(Command::SetPixelFormatRgb565)?;
        self.command(Command::SetOrientation(self.geometry.rotation()))?;
        self.tuning.send(&mut self.iface)?;
        self.command(Command::SetInversion(self.inverted))?;
        self.command(Command::NormalMode)?;
        self.clock.delay_ms(NORMAL_MODE_MS);
        self.command(Command::SetDisplayOn(true))?;
        self.clock.delay_ms(DISPLAY_ON_MS);
        self.fill_screen(Rgb565::BLACK)?;
        self.set_backlight(true)
    }

    /// Send a command once the bus is free.
    fn command(&mut self, cmd: Command) -> Result<(), Error<DI::Error>> {
        self.transfer.settle(&mut self.iface, &mut self.clock)?;
        cmd.send(&mut self.iface)
    }

    /// Change the logical orientation. Any transfer still in flight is finished first. The
    /// address window is re-armed to the full panel only when width and height trade places.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), Error<DI::Error>> {
        // A timed out transfer was already aborted and logged; the panel can still be rotated.
        if let Err(Error::Interface(e)) = self.transfer.settle(&mut self.iface, &mut self.clock) {
            return Err(Error::Interface(e));
        }
        let resized = self.geometry.set_rotation(rotation);
        debug!("rotation {:?}, size {:?}", rotation, self.geometry.size());
        self.command(Command::SetOrientation(rotation))?;
        if resized {
            let w = self.geometry.full_window();
            self.send_window(w)?;
        }
        Ok(())
    }

    /// Arm the address window with inclusive corners `upper_left` and `lower_right`, clamped to
    /// the panel, and start a memory write. The corners are not reordered. Returns the window as
    /// sent to the controller.
    pub fn arm_window(
        &mut self,
        upper_left: PixelCoord,
        lower_right: PixelCoord,
    ) -> Result<Window, Error<DI::Error>> {
        let w = self.geometry.clamp_window(upper_left, lower_right);
        self.send_window(w)?;
        Ok(w)
    }

    fn send_window(&mut self, w: Window) -> Result<(), Error<DI::Error>> {
        self.command(Command::SetColumnAddress(w.x0, w.x1))?;
        self.command(Command::SetRowAddress(w.y0, w.y1))?;
        self.command(Command::WriteMemory)
    }

    /// Send raw big-endian pixel bytes into the armed window, blocking until the interface
    /// accepted them all.
    pub fn write_sync(&mut self, bytes: &[u8]) -> Result<(), Error<DI::Error>> {
        self.transfer
            .write_sync(&mut self.iface, &mut self.clock, bytes)
    }

    /// Send raw big-endian pixel bytes into the armed window through the background channel,
    /// one scratch buffer at a time. Falls back to `write_sync` when background transfers are
    /// disabled. On `Error::TransferTimeout` the transfer has been aborted and the data may be
    /// resent with `write_sync`.
    pub fn write_async(&mut self, bytes: &[u8]) -> Result<(), Error<DI::Error>> {
        self.transfer
            .write_async(&mut self.iface, &mut self.clock, bytes)
    }

    /// Stream pixels into the armed window, through the background channel when enabled.
    pub fn write_pixels<I>(&mut self, pixels: I) -> Result<(), Error<DI::Error>>
    where
        I: IntoIterator<Item = Rgb565>,
    {
        self.transfer
            .write_pixels(&mut self.iface, &mut self.clock, pixels.into_iter())
    }

    /// Send `count` pixels of `color` into the armed window.
    pub fn fill(&mut self, color: Rgb565, count: usize) -> Result<(), Error<DI::Error>> {
        self.transfer
            .fill(&mut self.iface, &mut self.clock, color, count)
    }

    /// Control color inversion.
    pub fn invert(&mut self, inverted: bool) -> Result<(), Error<DI::Error>> {
        self.command(Command::SetInversion(inverted))?;
        self.inverted = inverted;
        Ok(())
    }

    /// Control sleep mode. Waits the time the controller needs before the next sleep command.
    pub fn sleep(&mut self, enabled: bool) -> Result<(), Error<DI::Error>> {
        self.command(Command::SetSleepMode(enabled))?;
        self.clock.delay_ms(SLEEP_MS);
        Ok(())
    }

    /// Turn the panel output on or off. Frame memory is kept.
    pub fn display_on(&mut self, on: bool) -> Result<(), Error<DI::Error>> {
        self.command(Command::SetDisplayOn(on))
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), Error<DI::Error>> {
        self.iface.set_backlight(on).map_err(Error::Interface)
    }

    /// Set the backlight level. The backlight line is a plain switch, so any non-zero level
    /// turns it on.
    pub fn set_brightness(&mut self, level: u8) -> Result<(), Error<DI::Error>> {
        self.set_backlight(level > 0)
    }

    /// Effective width under the current rotation.
    pub fn width(&self) -> u16 {
        self.geometry.size().0
    }

    /// Effective height under the current rotation.
    pub fn height(&self) -> u16 {
        self.geometry.size().1
    }

    pub fn size(&self) -> (u16, u16) {
        self.geometry.size()
    }

    pub fn native_size(&self) -> (u16, u16) {
        self.geometry.native_size()
    }

    pub fn rotation(&self) -> Rotation {
        self.geometry.rotation()
    }

    pub fn is_async_enabled(&self) -> bool {
        self.transfer.is_async_enabled()
    }

    pub fn is_busy(&self) -> bool {
        self.transfer.is_busy()
    }

    pub fn transfer_state(&self) -> TransferState {
        self.transfer.state()
    }

    /// Give back the interface and the clock.
    pub fn release(self) -> (DI, CLK) {
        (self.iface, self.clock)
    }

    pub fn draw_pixel(&mut self, p: PixelCoord, color: Rgb565) -> Result<(), Error<DI::Error>> {
        raster::draw_pixel(self, p, color)
    }

    /// Draw `len` pixels to the right of `origin`.
    pub fn draw_hline(
        &mut self,
        origin: PixelCoord,
        len: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_hline(self, origin, len, color)
    }

    /// Draw `len` pixels downwards from `origin`.
    pub fn draw_vline(
        &mut self,
        origin: PixelCoord,
        len: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_vline(self, origin, len, color)
    }

    pub fn draw_line(
        &mut self,
        p0: PixelCoord,
        p1: PixelCoord,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_line(self, p0, p1, color)
    }

    /// Outline of the `w` x `h` rectangle whose upper left corner is `origin`.
    pub fn draw_rect(
        &mut self,
        origin: PixelCoord,
        w: i16,
        h: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_rect(self, origin, w, h, color)
    }

    pub fn fill_rect(
        &mut self,
        origin: PixelCoord,
        w: i16,
        h: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::fill_rect(self, origin, w, h, color)
    }

    pub fn fill_screen(&mut self, color: Rgb565) -> Result<(), Error<DI::Error>> {
        raster::fill_screen(self, color)
    }

    pub fn draw_circle(
        &mut self,
        center: PixelCoord,
        r: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_circle(self, center, r, color)
    }

    pub fn fill_circle(
        &mut self,
        center: PixelCoord,
        r: i16,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::fill_circle(self, center, r, color)
    }

    pub fn draw_triangle(
        &mut self,
        p0: PixelCoord,
        p1: PixelCoord,
        p2: PixelCoord,
        color: Rgb565,
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_triangle(self, p0, p1, p2, color)
    }

    /// Blit a row-major `w` x `h` image with its upper left corner at `origin`. Parts outside
    /// the panel are cropped. Nothing is drawn when `data` is shorter than `w * h`.
    pub fn draw_image(
        &mut self,
        origin: PixelCoord,
        w: i16,
        h: i16,
        data: &[Rgb565],
    ) -> Result<(), Error<DI::Error>> {
        raster::draw_image(self, origin, w, h, data)
    }

    /// Draw one character cell of 6 x 8 pixels times `scale`. Background pixels are skipped when
    /// `bg == fg`. Characters outside printable ASCII render as `?`.
    pub fn draw_char(
        &mut self,
        origin: PixelCoord,
        c: char,
        fg: Rgb565,
        bg: Rgb565,
        scale: u8,
    ) -> Result<(), Error<DI::Error>> {
        font::draw_char(self, origin, c, fg, bg, scale)
    }

    /// Draw a string starting at `origin`. `\n` starts a new line, `\r` returns to the origin
    /// column, and text wraps before it would run past the right edge.
    pub fn draw_string(
        &mut self,
        origin: PixelCoord,
        text: &str,
        fg: Rgb565,
        bg: Rgb565,
        scale: u8,
    ) -> Result<(), Error<DI::Error>> {
        font::draw_string(self, origin, text, fg, bg, scale)
    }
}

impl<'buf, DI, CLK> Canvas for Display<'buf, DI, CLK>
where
    DI: DisplayInterface,
    CLK: Clock,
{
    type Error = Error<DI::Error>;

    fn size(&self) -> (u16, u16) {
        self.geometry.size()
    }

    fn arm_window(
        &mut self,
        upper_left: PixelCoord,
        lower_right: PixelCoord,
    ) -> Result<(), Self::Error> {
        Display::arm_window(self, upper_left, lower_right).map(|_| ())
    }

    fn send_pixel(&mut self, color: Rgb565) -> Result<(), Self::Error> {
        self.write_sync(&color.to_be_bytes())
    }

    fn send_fill(&mut self, color: Rgb565, count: usize) -> Result<(), Self::Error> {
        self.fill(color, count)
    }

    fn send_pixels<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: Iterator<Item = Rgb565>,
    {
        self.write_pixels(pixels)
    }
}
