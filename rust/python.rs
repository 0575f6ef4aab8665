//! Python bindings
//!
//! Blocking reads for simple scripts, `*_async` variants that run the
//! exchange on a blocking worker for asyncio callers.

use crate::hid::{self, DeviceInfo, HidError, NusbEndpoints};
use crate::psu::{Attribute, PowerSupply, Reading, SensorType};
use pyo3::exceptions::{PyNotImplementedError, PyOSError};
use pyo3::prelude::*;
use pyo3_async_runtimes::tokio::future_into_py;
use std::str::FromStr;
use std::sync::Arc;

/// A reading as handed to Python: `int` or `str`.
#[derive(IntoPyObject)]
enum PyReading {
    Numeric(i64),
    Text(String),
}

impl From<Reading> for PyReading {
    fn from(reading: Reading) -> Self {
        match reading {
            Reading::Numeric(value) => PyReading::Numeric(value),
            Reading::Text(text) => PyReading::Text(text),
        }
    }
}

fn parse<T: FromStr>(value: &str) -> PyResult<T> {
    value
        .parse()
        .map_err(|_| PyNotImplementedError::new_err(format!("Unsupported: {}", value)))
}

/// Corsair PSU handle.
#[pyclass(name = "PowerSupply")]
pub struct PyPowerSupply {
    inner: Arc<PowerSupply<NusbEndpoints>>,
    info: DeviceInfo,
}

#[pymethods]
impl PyPowerSupply {
    /// Open and attach to a PSU from DeviceInfo.
    #[new]
    fn new(info: DeviceInfo) -> PyResult<Self> {
        let inner = PowerSupply::open(&info)?;
        Ok(Self {
            inner: Arc::new(inner),
            info,
        })
    }

    /// Device info.
    #[getter]
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    #[getter]
    fn name(&self) -> Option<String> {
        self.inner.identity().name.clone()
    }

    #[getter]
    fn vendor(&self) -> Option<String> {
        self.inner.identity().vendor.clone()
    }

    #[getter]
    fn product(&self) -> Option<String> {
        self.inner.identity().product.clone()
    }

    /// List of (channel name, label) pairs, e.g. ("curr2", "curr +5v").
    fn channels(&self) -> Vec<(String, &'static str)> {
        self.inner
            .channels()
            .iter()
            .map(|c| (c.name(), c.label))
            .collect()
    }

    /// Read one attribute (blocking).
    ///
    /// Args:
    ///     sensor: "temp", "fan", "in", "curr", "power", "uptime" or "mode"
    ///     index: Channel index
    ///     attribute: "input" or "label"
    ///
    /// Returns:
    ///     int in canonical units, or str for labels
    #[pyo3(signature = (sensor, index, attribute="input"))]
    fn read(&self, sensor: &str, index: u8, attribute: &str) -> PyResult<PyReading> {
        let sensor: SensorType = parse(sensor)?;
        let attribute: Attribute = parse(attribute)?;
        Ok(self.inner.read(sensor, index, attribute)?.into())
    }

    /// Read one attribute (async).
    #[pyo3(signature = (sensor, index, attribute="input"))]
    fn read_async<'py>(
        &self,
        py: Python<'py>,
        sensor: &str,
        index: u8,
        attribute: &str,
    ) -> PyResult<Bound<'py, PyAny>> {
        let sensor: SensorType = parse(sensor)?;
        let attribute: Attribute = parse(attribute)?;
        let inner = self.inner.clone();

        future_into_py(py, async move {
            let reading = tokio::task::spawn_blocking(move || inner.read(sensor, index, attribute))
                .await
                .map_err(|e| PyOSError::new_err(e.to_string()))?
                .map_err(PyErr::from)?;
            Ok(PyReading::from(reading))
        })
    }
}

/// Enumerate attached Corsair RMi/HXi PSUs.
#[pyfunction]
fn enumerate_devices() -> Result<Vec<DeviceInfo>, HidError> {
    hid::enumerate_devices()
}

#[pymodule(name = "corsairpsu")]
pub fn corsairpsu(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DeviceInfo>()?;
    m.add_class::<PyPowerSupply>()?;
    m.add_function(wrap_pyfunction!(enumerate_devices, m)?)?;

    m.add("VENDOR_ID", hid::CORSAIR_VENDOR_ID)?;
    m.add("FRAME_SIZE", hid::FRAME_SIZE)?;

    Ok(())
}
