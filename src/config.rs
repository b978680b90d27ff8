//! Defines structs for storing the panel description and the register values of commands in the
//! ST7789 that are associated with relatively-static configuration.

use core::convert::Infallible;

use crate::command::*;
use crate::display::geometry::Rotation;
use crate::error::Error;
use crate::interface::DisplayInterface;

/// Timeout for one background chunk unless configured otherwise.
pub const DEFAULT_ASYNC_TIMEOUT_MS: u32 = 1000;

/// Largest accepted native width or height.
pub const MAX_DIMENSION: u16 = 32767;

/// Positive gamma table used by the common 240x240 and 240x320 IPS modules.
pub const STANDARD_POSITIVE_GAMMA: [u8; 14] = [
    0xD0, 0x08, 0x11, 0x08, 0x0C, 0x15, 0x39, 0x33, 0x50, 0x36, 0x13, 0x14, 0x29, 0x2D,
];

/// Negative gamma table used by the common 240x240 and 240x320 IPS modules.
pub const STANDARD_NEGATIVE_GAMMA: [u8; 14] = [
    0xD0, 0x08, 0x10, 0x08, 0x06, 0x06, 0x39, 0x44, 0x51, 0x0B, 0x16, 0x14, 0x2F, 0x31,
];

/// Panel tuning commands sent during initialization. Each entry is left at the controller's
/// power-on default unless set.
#[derive(Clone, Copy, Default)]
pub(crate) struct Tuning<'buf> {
    porch_cmd: Option<Command>,
    gate_voltages_cmd: Option<Command>,
    vcom_cmd: Option<Command>,
    lcm_control_cmd: Option<Command>,
    vdv_vrh_enable_cmd: Option<Command>,
    vrh_cmd: Option<Command>,
    vdv_cmd: Option<Command>,
    frame_rate_cmd: Option<Command>,
    power_levels_cmd: Option<Command>,
    positive_gamma: Option<&'buf [u8]>,
    negative_gamma: Option<&'buf [u8]>,
}

/// Swallows everything, for checking command arguments without a bus.
struct Discard;

impl DisplayInterface for Discard {
    type Error = Infallible;

    fn send_command(&mut self, _cmd: u8) -> Result<(), Infallible> {
        Ok(())
    }

    fn send_data(&mut self, _buf: &[u8]) -> Result<(), Infallible> {
        Ok(())
    }
}

impl<'buf> Tuning<'buf> {
    /// Transmit commands to the display at `iface` necessary to put that display into the
    /// configuration encoded in `self`.
    pub(crate) fn send<DI>(&self, iface: &mut DI) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
    {
        self.porch_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.gate_voltages_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.vcom_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.lcm_control_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.vdv_vrh_enable_cmd
            .map_or(Ok(()), |c| c.send(iface))?;
        self.vrh_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.vdv_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.frame_rate_cmd.map_or(Ok(()), |c| c.send(iface))?;
        self.power_levels_cmd
            .map_or(Ok(()), |c| c.send(iface))?;
        self.positive_gamma
            .map_or(Ok(()), |t| BufCommand::SetPositiveGamma(t).send(iface))?;
        self.negative_gamma
            .map_or(Ok(()), |t| BufCommand::SetNegativeGamma(t).send(iface))
    }

    /// Whether every configured command argument is within range.
    pub(crate) fn is_valid(&self) -> bool {
        self.send(&mut Discard).is_ok()
    }
}

/// A configuration for the display. Builder methods offer a declarative way to either send a
/// configuration command at init time, or to leave it at the chip's POR default.
///
/// The lifetime `'buf` covers the optional scratch buffer for background transfers and any
/// gamma tables; the display borrows them for as long as it exists.
pub struct Config<'buf> {
    pub(crate) native_width: u16,
    pub(crate) native_height: u16,
    pub(crate) rotation: Rotation,
    pub(crate) inverted: bool,
    pub(crate) scratch: Option<&'buf mut [u8]>,
    pub(crate) async_timeout_ms: u32,
    pub(crate) tuning: Tuning<'buf>,
}

impl<'buf> Config<'buf> {
    /// Create a new configuration for a panel of `width` x `height` pixels in its native (0
    /// degree) orientation. The dimensions are mandatory because every window computation
    /// depends on them; they must be in the range 1-32767. All other options can be optionally
    /// set by calling the provided builder methods on `Config`.
    pub fn new(width: u16, height: u16) -> Self {
        Config {
            native_width: width,
            native_height: height,
            rotation: Rotation::Deg0,
            inverted: true,
            scratch: None,
            async_timeout_ms: DEFAULT_ASYNC_TIMEOUT_MS,
            tuning: Tuning::default(),
        }
    }

    pub(crate) fn has_valid_size(&self) -> bool {
        let valid = |d: u16| d >= 1 && d <= MAX_DIMENSION;
        valid(self.native_width) && valid(self.native_height)
    }

    /// Extend this `Config` to start in a rotation other than 0 degrees.
    pub fn rotation(self, rotation: Rotation) -> Self {
        Self { rotation, ..self }
    }

    /// Extend this `Config` to control color inversion, which is on by default because most IPS
    /// panels need it. See `Command::SetInversion`.
    pub fn inverted(self, inverted: bool) -> Self {
        Self { inverted, ..self }
    }

    /// Extend this `Config` to enable background transfers staged through `scratch`. Each chunk
    /// carries `scratch.len() / 2` pixels. Ignored when the transport has no background channel.
    pub fn async_transfers(self, scratch: &'buf mut [u8]) -> Self {
        Self {
            scratch: Some(scratch),
            ..self
        }
    }

    /// Extend this `Config` to change how long one background chunk may take before it is
    /// aborted.
    pub fn async_timeout_ms(self, timeout_ms: u32) -> Self {
        Self {
            async_timeout_ms: timeout_ms,
            ..self
        }
    }

    fn tune(self, f: impl FnOnce(&mut Tuning<'buf>)) -> Self {
        let mut tuning = self.tuning;
        f(&mut tuning);
        Self { tuning, ..self }
    }

    /// Extend this `Config` to explicitly configure the porch lengths. See `Command::SetPorch`.
    pub fn porch(self, back: u8, front: u8) -> Self {
        self.tune(|t| t.porch_cmd = Some(Command::SetPorch(back, front)))
    }

    /// Extend this `Config` to explicitly configure the gate voltages. See
    /// `Command::SetGateVoltages`.
    pub fn gate_voltages(self, vgh: u8, vgl: u8) -> Self {
        self.tune(|t| t.gate_voltages_cmd = Some(Command::SetGateVoltages(vgh, vgl)))
    }

    /// Extend this `Config` to explicitly configure the VCOM voltage. See `Command::SetVcom`.
    pub fn vcom(self, vcom: u8) -> Self {
        self.tune(|t| t.vcom_cmd = Some(Command::SetVcom(vcom)))
    }

    /// Extend this `Config` to explicitly configure the LCM control flags. See
    /// `Command::SetLcmControl`.
    pub fn lcm_control(self, flags: u8) -> Self {
        self.tune(|t| t.lcm_control_cmd = Some(Command::SetLcmControl(flags)))
    }

    /// Extend this `Config` to take VDV and VRH from commands rather than NVM. See
    /// `Command::EnableVdvVrhCommands`.
    pub fn vdv_vrh_from_commands(self, enabled: bool) -> Self {
        self.tune(|t| t.vdv_vrh_enable_cmd = Some(Command::EnableVdvVrhCommands(enabled)))
    }

    /// Extend this `Config` to explicitly configure VRH. See `Command::SetVrh`.
    pub fn vrh(self, vrh: u8) -> Self {
        self.tune(|t| t.vrh_cmd = Some(Command::SetVrh(vrh)))
    }

    /// Extend this `Config` to explicitly configure VDV. See `Command::SetVdv`.
    pub fn vdv(self, vdv: u8) -> Self {
        self.tune(|t| t.vdv_cmd = Some(Command::SetVdv(vdv)))
    }

    /// Extend this `Config` to explicitly configure the frame rate. See `Command::SetFrameRate`.
    pub fn frame_rate(self, rtna: u8) -> Self {
        self.tune(|t| t.frame_rate_cmd = Some(Command::SetFrameRate(rtna)))
    }

    /// Extend this `Config` to explicitly configure the power levels. See
    /// `Command::SetPowerLevels`.
    pub fn power_levels(self, avdd: u8, avcl: u8, vds: u8) -> Self {
        self.tune(|t| t.power_levels_cmd = Some(Command::SetPowerLevels(avdd, avcl, vds)))
    }

    /// Extend this `Config` with a positive gamma table of 14 bytes. See
    /// `BufCommand::SetPositiveGamma`.
    pub fn positive_gamma(self, table: &'buf [u8]) -> Self {
        self.tune(|t| t.positive_gamma = Some(table))
    }

    /// Extend this `Config` with a negative gamma table of 14 bytes. See
    /// `BufCommand::SetNegativeGamma`.
    pub fn negative_gamma(self, table: &'buf [u8]) -> Self {
        self.tune(|t| t.negative_gamma = Some(table))
    }

    /// Extend this `Config` with the tuning values that suit most ST7789 IPS modules.
    pub fn standard_tuning(self) -> Self {
        self.porch(0x0C, 0x0C)
            .gate_voltages(3, 5)
            .vcom(0x20)
            .lcm_control(0x2C)
            .vdv_vrh_from_commands(true)
            .vrh(0x12)
            .vdv(0x20)
            .frame_rate(0x0F)
            .power_levels(2, 2, 1)
            .positive_gamma(&STANDARD_POSITIVE_GAMMA)
            .negative_gamma(&STANDARD_NEGATIVE_GAMMA)
    }
}
