//! The command set for the ST7789.
//!
//! Note 1: The controller addresses its frame memory in pixel units, each pixel being one 16 bit
//! RGB565 word sent high byte first. Column and row addresses are 16 bit values sent as a big
//! endian `hi, lo` pair.

use crate::display::geometry::Rotation;
use crate::error::Error;
use crate::interface::DisplayInterface;

pub mod consts {
    //! Opcodes and argument constants.

    pub const SWRESET: u8 = 0x01;
    pub const SLPIN: u8 = 0x10;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const INVON: u8 = 0x21;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
    pub const PORCTRL: u8 = 0xB2;
    pub const GCTRL: u8 = 0xB7;
    pub const VCOMS: u8 = 0xBB;
    pub const LCMCTRL: u8 = 0xC0;
    pub const VDVVRHEN: u8 = 0xC2;
    pub const VRHS: u8 = 0xC3;
    pub const VDVS: u8 = 0xC4;
    pub const FRCTRL2: u8 = 0xC6;
    pub const PWCTRL1: u8 = 0xD0;
    pub const PVGAMCTRL: u8 = 0xE0;
    pub const NVGAMCTRL: u8 = 0xE1;

    /// MADCTL bit: row address order, bottom to top.
    pub const MADCTL_MY: u8 = 0x80;
    /// MADCTL bit: column address order, right to left.
    pub const MADCTL_MX: u8 = 0x40;
    /// MADCTL bit: row/column exchange.
    pub const MADCTL_MV: u8 = 0x20;

    /// COLMOD argument selecting 16 bits per pixel on both the RGB and the control interface.
    pub const COLMOD_RGB565: u8 = 0x55;

    /// Number of bytes in each gamma correction table.
    pub const GAMMA_TABLE_LEN: usize = 14;
}

use self::consts::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Reset all registers to their defaults. The controller needs 120 ms (more when it was
    /// sleeping) before it accepts the next command.
    SoftwareReset,
    /// Enter (`true`) or leave (`false`) sleep mode. After either transition the controller needs
    /// 120 ms before the next sleep command.
    SetSleepMode(bool),
    /// Select normal display mode, leaving partial mode.
    NormalMode,
    /// Turn color inversion on or off. Most IPS panels need inversion on to show true colors.
    SetInversion(bool),
    /// Turn the panel output on or off. Frame memory is preserved while off.
    SetDisplayOn(bool),
    /// Set the column start and end address range of the next memory write, and reset the column
    /// pointer to the start. (Note 1)
    SetColumnAddress(u16, u16),
    /// Set the row start and end address range of the next memory write, and reset the row
    /// pointer to the start. (Note 1)
    SetRowAddress(u16, u16),
    /// Begin a memory write. All data sent afterwards fills the address window row by row until
    /// the next command.
    WriteMemory,
    /// Set the memory scan order matching a logical rotation of the panel.
    SetOrientation(Rotation),
    /// Select 16 bits per pixel.
    SetPixelFormatRgb565,
    /// Set the back and front porch lengths in normal mode. Each range is 1-127 lines.
    SetPorch(u8, u8),
    /// Set the gate drive voltages VGH and VGL, each as a register step from 0-7. The panel
    /// datasheet gives the correct steps.
    SetGateVoltages(u8, u8),
    /// Set the VCOM voltage. Range 0-63, in steps of 25 mV from 0.1 V.
    SetVcom(u8),
    /// Set the LCM control flags (XMY, XBGR, XINV, XMX, XMH, XMV, XGS). Range 0-127.
    SetLcmControl(u8),
    /// Choose whether VDV and VRH come from the command registers (`true`) or from NVM.
    EnableVdvVrhCommands(bool),
    /// Set the VRH voltage. Range 0-39.
    SetVrh(u8),
    /// Set the VDV voltage. Range 0-63.
    SetVdv(u8),
    /// Set the frame rate in normal mode. Range 0 (119 Hz) to 31 (39 Hz), 15 is 60 Hz.
    SetFrameRate(u8),
    /// Set the AVDD, AVCL and VDS power levels, each a register step from 0-3.
    SetPowerLevels(u8, u8, u8),
}

pub enum BufCommand<'buf> {
    /// Set the positive voltage gamma correction table. Must be exactly 14 bytes.
    SetPositiveGamma(&'buf [u8]),
    /// Set the negative voltage gamma correction table. Must be exactly 14 bytes.
    SetNegativeGamma(&'buf [u8]),
}

macro_rules! ok_command {
    ($buf:ident, $cmd:expr,[$($arg:expr),*]) => {{
        let args: &[u8] = &[$($arg),*];
        $buf[..args.len()].copy_from_slice(args);
        Ok(($cmd, &$buf[..args.len()]))
    }};
}

fn send_with_data<DI>(iface: &mut DI, cmd: u8, data: &[u8]) -> Result<(), Error<DI::Error>>
where
    DI: DisplayInterface,
{
    iface.send_command(cmd).map_err(Error::Interface)?;
    if data.is_empty() {
        Ok(())
    } else {
        iface.send_data(data).map_err(Error::Interface)
    }
}

impl Command {
    pub fn send<DI>(self, iface: &mut DI) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
    {
        let mut arg_buf = [0u8; 5];
        let encoded: Result<(u8, &[u8]), Error<DI::Error>> = match self {
            Command::SoftwareReset => ok_command!(arg_buf, SWRESET, []),
            Command::SetSleepMode(ena) => ok_command!(
                arg_buf,
                match ena {
                    true => SLPIN,
                    false => SLPOUT,
                },
                []
            ),
            Command::NormalMode => ok_command!(arg_buf, NORON, []),
            Command::SetInversion(ena) => ok_command!(
                arg_buf,
                match ena {
                    true => INVON,
                    false => INVOFF,
                },
                []
            ),
            Command::SetDisplayOn(ena) => ok_command!(
                arg_buf,
                match ena {
                    true => DISPON,
                    false => DISPOFF,
                },
                []
            ),
            Command::SetColumnAddress(start, end) => {
                let [s_hi, s_lo] = start.to_be_bytes();
                let [e_hi, e_lo] = end.to_be_bytes();
                ok_command!(arg_buf, CASET, [s_hi, s_lo, e_hi, e_lo])
            }
            Command::SetRowAddress(start, end) => {
                let [s_hi, s_lo] = start.to_be_bytes();
                let [e_hi, e_lo] = end.to_be_bytes();
                ok_command!(arg_buf, RASET, [s_hi, s_lo, e_hi, e_lo])
            }
            Command::WriteMemory => ok_command!(arg_buf, RAMWR, []),
            Command::SetOrientation(rotation) => {
                let madctl = match rotation {
                    Rotation::Deg0 => 0x00,
                    Rotation::Deg90 => MADCTL_MX | MADCTL_MV,
                    Rotation::Deg180 => MADCTL_MY | MADCTL_MX,
                    Rotation::Deg270 => MADCTL_MY | MADCTL_MV,
                };
                ok_command!(arg_buf, MADCTL, [madctl])
            }
            Command::SetPixelFormatRgb565 => ok_command!(arg_buf, COLMOD, [COLMOD_RGB565]),
            Command::SetPorch(back, front) => match (back, front) {
                (1..=127, 1..=127) => {
                    ok_command!(arg_buf, PORCTRL, [back, front, 0x00, 0x33, 0x33])
                }
                _ => Err(Error::InvalidConfig),
            },
            Command::SetGateVoltages(vgh, vgl) => match (vgh, vgl) {
                (0..=7, 0..=7) => ok_command!(arg_buf, GCTRL, [vgh << 4 | vgl]),
                _ => Err(Error::InvalidConfig),
            },
            Command::SetVcom(vcom) => match vcom {
                0..=63 => ok_command!(arg_buf, VCOMS, [vcom]),
                _ => Err(Error::InvalidConfig),
            },
            Command::SetLcmControl(flags) => match flags {
                0..=127 => ok_command!(arg_buf, LCMCTRL, [flags]),
                _ => Err(Error::InvalidConfig),
            },
            Command::EnableVdvVrhCommands(ena) => {
                ok_command!(arg_buf, VDVVRHEN, [ena as u8, 0xFF])
            }
            Command::SetVrh(vrh) => match vrh {
                0..=39 => ok_command!(arg_buf, VRHS, [vrh]),
                _ => Err(Error::InvalidConfig),
            },
            Command::SetVdv(vdv) => match vdv {
                0..=63 => ok_command!(arg_buf, VDVS, [vdv]),
                _ => Err(Error::InvalidConfig),
            },
            Command::SetFrameRate(rtna) => match rtna {
                0..=31 => ok_command!(arg_buf, FRCTRL2, [rtna]),
                _ => Err(Error::InvalidConfig),
            },
            Command::SetPowerLevels(avdd, avcl, vds) => match (avdd, avcl, vds) {
                (0..=3, 0..=3, 0..=3) => {
                    ok_command!(arg_buf, PWCTRL1, [0xA4, avdd << 6 | avcl << 4 | vds])
                }
                _ => Err(Error::InvalidConfig),
            },
        };
        let (cmd, data) = encoded?;
        send_with_data(iface, cmd, data)
    }
}

impl<'a> BufCommand<'a> {
    pub fn send<DI>(self, iface: &mut DI) -> Result<(), Error<DI::Error>>
    where
        DI: DisplayInterface,
    {
        let (cmd, table) = match self {
            BufCommand::SetPositiveGamma(table) => (PVGAMCTRL, table),
            BufCommand::SetNegativeGamma(table) => (NVGAMCTRL, table),
        };
        if table.len() != GAMMA_TABLE_LEN {
            return Err(Error::InvalidConfig);
        }
        send_with_data(iface, cmd, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::test_spy::{Sent, TestSpyInterface};

    #[test]
    fn address_ranges_are_big_endian() {
        let mut di = TestSpyInterface::new();
        Command::SetColumnAddress(0x0012, 0x013F)
            .send(&mut di)
            .unwrap();
        Command::SetRowAddress(0, 239).send(&mut di).unwrap();
        Command::WriteMemory.send(&mut di).unwrap();
        #[cfg_attr(rustfmt, rustfmt_skip)]
        di.check_multi(sends!(
            0x2A, [0x00, 0x12, 0x01, 0x3F],
            0x2B, [0x00, 0x00, 0x00, 0xEF],
            0x2C
        ));
    }

    #[test]
    fn orientation() {
        let mut di = TestSpyInterface::new();
        for r in [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ]
        .iter()
        {
            Command::SetOrientation(*r).send(&mut di).unwrap();
        }
        #[cfg_attr(rustfmt, rustfmt_skip)]
        di.check_multi(sends!(
            0x36, [0x00],
            0x36, [0x60],
            0x36, [0xC0],
            0x36, [0xA0]
        ));
    }

    #[test]
    fn mode_switches() {
        let mut di = TestSpyInterface::new();
        Command::SoftwareReset.send(&mut di).unwrap();
        Command::SetSleepMode(false).send(&mut di).unwrap();
        Command::SetSleepMode(true).send(&mut di).unwrap();
        Command::SetPixelFormatRgb565.send(&mut di).unwrap();
        Command::SetInversion(true).send(&mut di).unwrap();
        Command::SetInversion(false).send(&mut di).unwrap();
        Command::NormalMode.send(&mut di).unwrap();
        Command::SetDisplayOn(true).send(&mut di).unwrap();
        Command::SetDisplayOn(false).send(&mut di).unwrap();
        #[cfg_attr(rustfmt, rustfmt_skip)]
        di.check_multi(sends!(
            0x01, 0x11, 0x10,
            0x3A, [0x55],
            0x21, 0x20, 0x13, 0x29, 0x28
        ));
    }

    #[test]
    fn set_porch() {
        let mut di = TestSpyInterface::new();
        Command::SetPorch(12, 12).send(&mut di).unwrap();
        di.check_multi(sends!(0xB2, [0x0C, 0x0C, 0x00, 0x33, 0x33]));
        assert_eq!(Command::SetPorch(0, 12).send(&mut di), Err(Error::InvalidConfig));
        assert_eq!(Command::SetPorch(12, 128).send(&mut di), Err(Error::InvalidConfig));
    }

    #[test]
    fn set_gate_voltages() {
        let mut di = TestSpyInterface::new();
        Command::SetGateVoltages(3, 5).send(&mut di).unwrap();
        di.check_multi(sends!(0xB7, [0x35]));
        assert_eq!(
            Command::SetGateVoltages(8, 0).send(&mut di),
            Err(Error::InvalidConfig)
        );
        assert_eq!(
            Command::SetGateVoltages(0, 8).send(&mut di),
            Err(Error::InvalidConfig)
        );
    }

    #[test]
    fn voltage_registers() {
        let mut di = TestSpyInterface::new();
        Command::SetVcom(0x20).send(&mut di).unwrap();
        Command::SetLcmControl(0x2C).send(&mut di).unwrap();
        Command::EnableVdvVrhCommands(true).send(&mut di).unwrap();
        Command::SetVrh(0x12).send(&mut di).unwrap();
        Command::SetVdv(0x20).send(&mut di).unwrap();
        #[cfg_attr(rustfmt, rustfmt_skip)]
        di.check_multi(sends!(
            0xBB, [0x20],
            0xC0, [0x2C],
            0xC2, [0x01, 0xFF],
            0xC3, [0x12],
            0xC4, [0x20]
        ));
        // Nothing is sent for a rejected argument.
        di.clear();
        assert_eq!(Command::SetVcom(64).send(&mut di), Err(Error::InvalidConfig));
        assert_eq!(Command::SetLcmControl(128).send(&mut di), Err(Error::InvalidConfig));
        assert_eq!(Command::SetVrh(40).send(&mut di), Err(Error::InvalidConfig));
        assert_eq!(Command::SetVdv(64).send(&mut di), Err(Error::InvalidConfig));
        di.check_multi(&[]);
    }

    #[test]
    fn set_frame_rate() {
        let mut di = TestSpyInterface::new();
        Command::SetFrameRate(15).send(&mut di).unwrap();
        di.check_multi(sends!(0xC6, [0x0F]));
        assert_eq!(Command::SetFrameRate(32).send(&mut di), Err(Error::InvalidConfig));
    }

    #[test]
    fn set_power_levels() {
        let mut di = TestSpyInterface::new();
        Command::SetPowerLevels(2, 2, 1).send(&mut di).unwrap();
        di.check_multi(sends!(0xD0, [0xA4, 0xA1]));
        assert_eq!(
            Command::SetPowerLevels(4, 0, 0).send(&mut di),
            Err(Error::InvalidConfig)
        );
    }

    #[test]
    fn gamma_tables() {
        let mut di = TestSpyInterface::new();
        let table = [
            0xD0, 0x08, 0x11, 0x08, 0x0C, 0x15, 0x39, 0x33, 0x50, 0x36, 0x13, 0x14, 0x29, 0x2D,
        ];
        BufCommand::SetPositiveGamma(&table).send(&mut di).unwrap();
        BufCommand::SetNegativeGamma(&table).send(&mut di).unwrap();
        di.check_multi(&[
            Sent::Cmd(0xE0),
            Sent::Data(table.to_vec()),
            Sent::Cmd(0xE1),
            Sent::Data(table.to_vec()),
        ]);
        // Too few values
        assert_eq!(
            BufCommand::SetPositiveGamma(&table[..13]).send(&mut di),
            Err(Error::InvalidConfig)
        );
        // Too many values
        assert_eq!(
            BufCommand::SetNegativeGamma(&[0; 15]).send(&mut di),
            Err(Error::InvalidConfig)
        );
    }
}
