//! Sensor channels of a Corsair RMi/HXi power supply.
//!
//! Every readable value is one entry in a fixed channel table, addressed
//! hwmon-style by sensor type and index (`temp1`, `in0`, `power2`, ...).
//! Readings are decoded to canonical integer units:
//!
//! | Sensor  | Unit        |
//! |---------|-------------|
//! | temp    | m°C         |
//! | fan     | RPM         |
//! | in      | mV          |
//! | curr    | mA          |
//! | power   | µW          |
//! | uptime  | s           |
//! | mode    | raw value   |
//!
//! Nothing is cached; each read goes to the device.

use crate::hid::{
    opcodes, Command, Endpoints, HidError, ProtocolClient, Rail, Result, Transport,
};
use crate::linear11::scale;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SensorType {
    #[strum(serialize = "temp")]
    Temperature,
    Fan,
    #[strum(serialize = "in")]
    Voltage,
    #[strum(serialize = "curr")]
    Current,
    Power,
    Uptime,
    Mode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Attribute {
    Input,
    Label,
    /// Limit attributes. The PSU does not report these.
    Max,
    Crit,
}

/// How a channel's payload becomes a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decode {
    /// 2-byte LINEAR11 word, scaled.
    Linear11 { scale: i64 },
    /// 4-byte little-endian unsigned integer.
    Raw,
}

impl Decode {
    /// Payload bytes consumed.
    pub fn width(self) -> usize {
        match self {
            Decode::Linear11 { .. } => 2,
            Decode::Raw => 4,
        }
    }
}

/// One readable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub sensor: SensorType,
    pub index: u8,
    pub label: &'static str,
    pub opcode: u8,
    /// Rail that must be selected before the read.
    pub rail: Option<Rail>,
    pub decode: Decode,
}

impl Channel {
    const fn new(
        sensor: SensorType,
        index: u8,
        label: &'static str,
        opcode: u8,
        rail: Option<Rail>,
        decode: Decode,
    ) -> Self {
        Self {
            sensor,
            index,
            label,
            opcode,
            rail,
            decode,
        }
    }

    pub fn command(&self) -> Command {
        Command::read(self.opcode)
    }

    /// hwmon-style name, e.g. `curr2`.
    pub fn name(&self) -> String {
        format!("{}{}", self.sensor, self.index)
    }
}

const MILLI: Decode = Decode::Linear11 {
    scale: scale::MILLI,
};
const MICRO: Decode = Decode::Linear11 {
    scale: scale::MICRO,
};
const UNITS: Decode = Decode::Linear11 {
    scale: scale::UNITS,
};

use SensorType::*;

pub static CHANNELS: &[Channel] = &[
    Channel::new(Temperature, 1, "vrm temp", opcodes::READ_TEMPERATURE_1, None, MILLI),
    Channel::new(Temperature, 2, "case temp", opcodes::READ_TEMPERATURE_2, None, MILLI),
    Channel::new(Fan, 1, "psu fan", opcodes::READ_FAN_SPEED_1, None, UNITS),
    Channel::new(Voltage, 0, "v_in", opcodes::READ_VIN, None, MILLI),
    Channel::new(Voltage, 1, "v_out +12v", opcodes::READ_VOUT, Some(Rail::V12), MILLI),
    Channel::new(Voltage, 2, "v_out +5v", opcodes::READ_VOUT, Some(Rail::V5), MILLI),
    Channel::new(Voltage, 3, "v_out +3.3v", opcodes::READ_VOUT, Some(Rail::V3_3), MILLI),
    Channel::new(Current, 1, "curr +12v", opcodes::READ_IOUT, Some(Rail::V12), MILLI),
    Channel::new(Current, 2, "curr +5v", opcodes::READ_IOUT, Some(Rail::V5), MILLI),
    Channel::new(Current, 3, "curr +3.3v", opcodes::READ_IOUT, Some(Rail::V3_3), MILLI),
    Channel::new(Power, 1, "power total", opcodes::TOTAL_POWER, None, MICRO),
    Channel::new(Power, 2, "power +12v", opcodes::READ_POUT, Some(Rail::V12), MICRO),
    Channel::new(Power, 3, "power +5v", opcodes::READ_POUT, Some(Rail::V5), MICRO),
    Channel::new(Power, 4, "power +3.3v", opcodes::READ_POUT, Some(Rail::V3_3), MICRO),
    Channel::new(Uptime, 1, "total uptime", opcodes::TOTAL_UPTIME, None, Decode::Raw),
    Channel::new(Uptime, 2, "current uptime", opcodes::CURRENT_UPTIME, None, Decode::Raw),
    Channel::new(Mode, 1, "ocp mode", opcodes::OCP_MODE, None, Decode::Raw),
    Channel::new(Mode, 2, "fan control mode", opcodes::FAN_CONTROL_MODE, None, Decode::Raw),
];

/// Look up a channel by sensor type and index.
pub fn find_channel(sensor: SensorType, index: u8) -> Option<&'static Channel> {
    CHANNELS
        .iter()
        .find(|c| c.sensor == sensor && c.index == index)
}

/// A decoded value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reading {
    Numeric(i64),
    Text(String),
}

/// Over-current protection layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum OcpMode {
    #[strum(serialize = "single-rail")]
    SingleRail,
    #[strum(serialize = "multi-rail")]
    MultiRail,
}

impl TryFrom<u32> for OcpMode {
    type Error = HidError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(OcpMode::SingleRail),
            2 => Ok(OcpMode::MultiRail),
            _ => Err(HidError::UnknownMode {
                field: "OCP mode",
                value,
            }),
        }
    }
}

/// Who drives the fan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FanControlMode {
    Hardware,
    Software,
}

impl TryFrom<u32> for FanControlMode {
    type Error = HidError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(FanControlMode::Hardware),
            1 => Ok(FanControlMode::Software),
            _ => Err(HidError::UnknownMode {
                field: "fan control mode",
                value,
            }),
        }
    }
}

/// Identification strings fetched at attach time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub product: Option<String>,
}

/// An attached power supply.
pub struct PowerSupply<E: Endpoints> {
    client: ProtocolClient<E>,
    // Held across rail select + read so the selection cannot change under us
    rail_lock: Mutex<()>,
    identity: Identity,
}

impl<E: Endpoints> PowerSupply<E> {
    /// Attach to a PSU using the default transfer timeout.
    pub fn attach(endpoints: E) -> Self {
        Self::with_transport(Transport::new(endpoints))
    }

    /// Attach over a preconfigured transport.
    ///
    /// Identification is best effort: failures are logged and leave the
    /// corresponding [`Identity`] field empty.
    pub fn with_transport(transport: Transport<E>) -> Self {
        let mut psu = Self {
            client: ProtocolClient::new(transport),
            rail_lock: Mutex::new(()),
            identity: Identity::default(),
        };

        psu.identity = psu.identify();
        info!(
            "Corsair PSU attached: name={:?} vendor={:?} product={:?}",
            psu.identity.name, psu.identity.vendor, psu.identity.product
        );
        psu
    }

    /// Query the identification strings again.
    pub fn identify(&self) -> Identity {
        Identity {
            name: self.identity_field("name", Command::IDENTIFY),
            vendor: self.identity_field("vendor", Command::read(opcodes::MFR_ID)),
            product: self.identity_field("product", Command::read(opcodes::MFR_MODEL)),
        }
    }

    fn identity_field(&self, field: &str, command: Command) -> Option<String> {
        match self.client.read_string(command) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Failed to read PSU {}: {}", field, err);
                None
            }
        }
    }

    /// Identification captured at attach time.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn client(&self) -> &ProtocolClient<E> {
        &self.client
    }

    pub fn channels(&self) -> &'static [Channel] {
        CHANNELS
    }

    /// Read one attribute of one channel.
    pub fn read(&self, sensor: SensorType, index: u8, attribute: Attribute) -> Result<Reading> {
        let channel = find_channel(sensor, index)
            .ok_or_else(|| HidError::Unsupported(format!("{}{}", sensor, index)))?;

        match attribute {
            Attribute::Input => self.read_channel(channel).map(Reading::Numeric),
            Attribute::Label => Ok(Reading::Text(channel.label.to_string())),
            _ => Err(HidError::Unsupported(format!(
                "{}_{}",
                channel.name(),
                attribute
            ))),
        }
    }

    /// Read and decode a channel's input value.
    pub fn read_channel(&self, channel: &Channel) -> Result<i64> {
        match channel.rail {
            Some(rail) => {
                let _rail = self.rail_lock.try_lock().map_err(|_| HidError::Busy)?;
                self.client.send_recv(Command::select_rail(rail), &mut [])?;
                self.decode_channel(channel)
            }
            None => self.decode_channel(channel),
        }
    }

    fn decode_channel(&self, channel: &Channel) -> Result<i64> {
        let value = match channel.decode {
            Decode::Linear11 { scale } => self.client.read_linear11(channel.command(), scale)?,
            Decode::Raw => self.client.read_u32(channel.command())? as i64,
        };
        debug!("{} = {}", channel.name(), value);
        Ok(value)
    }

    fn read_input(&self, sensor: SensorType, index: u8) -> Result<i64> {
        let channel = find_channel(sensor, index)
            .ok_or_else(|| HidError::Unsupported(format!("{}{}", sensor, index)))?;
        self.read_channel(channel)
    }

    fn rail_index(rail: Rail) -> u8 {
        rail.index() + 1
    }

    /// Temperature sensor 1 or 2, in m°C.
    pub fn temperature(&self, index: u8) -> Result<i64> {
        self.read_input(Temperature, index)
    }

    pub fn fan_rpm(&self) -> Result<i64> {
        self.read_input(Fan, 1)
    }

    /// Supply (input) voltage in mV.
    pub fn input_voltage(&self) -> Result<i64> {
        self.read_input(Voltage, 0)
    }

    /// Output voltage of `rail` in mV.
    pub fn rail_voltage(&self, rail: Rail) -> Result<i64> {
        self.read_input(Voltage, Self::rail_index(rail))
    }

    /// Output current of `rail` in mA.
    pub fn rail_current(&self, rail: Rail) -> Result<i64> {
        self.read_input(Current, Self::rail_index(rail))
    }

    /// Output power of `rail` in µW.
    pub fn rail_power(&self, rail: Rail) -> Result<i64> {
        self.read_input(Power, Self::rail_index(rail) + 1)
    }

    /// Total power in µW.
    pub fn total_power(&self) -> Result<i64> {
        self.read_input(Power, 1)
    }

    /// Lifetime powered-on time.
    pub fn total_uptime(&self) -> Result<Duration> {
        let secs = self.client.read_u32(Command::read(opcodes::TOTAL_UPTIME))?;
        Ok(Duration::from_secs(secs.into()))
    }

    /// Time since the PSU was last powered on.
    pub fn current_uptime(&self) -> Result<Duration> {
        let secs = self.client.read_u32(Command::read(opcodes::CURRENT_UPTIME))?;
        Ok(Duration::from_secs(secs.into()))
    }

    pub fn ocp_mode(&self) -> Result<OcpMode> {
        OcpMode::try_from(self.client.read_u32(Command::read(opcodes::OCP_MODE))?)
    }

    pub fn fan_control_mode(&self) -> Result<FanControlMode> {
        FanControlMode::try_from(
            self.client
                .read_u32(Command::read(opcodes::FAN_CONTROL_MODE))?,
        )
    }
}

impl PowerSupply<crate::hid::NusbEndpoints> {
    /// Open an enumerated PSU and attach to it.
    pub fn open(info: &crate::hid::DeviceInfo) -> Result<Self> {
        let endpoints = crate::hid::NusbEndpoints::open(info)?;
        debug!("Opened {} at {}", info.model().unwrap_or("PSU"), info.path());
        Ok(Self::attach(endpoints))
    }
}
