//! Cryostat and magnet actions.

use serde_json::Value;
use tracing::info;

use crate::actions::{
    ActionDescriptor, ActionError, ActionRegistry, ParamSpec, ParamValue, RegistryError,
};

const DEFAULT_CRYOSTAT: &str = "cryo-01";

/// Magnet supply limit in tesla. Anything beyond it is refused before the
/// device is touched.
const MAX_FIELD_T: f64 = 7.0;

fn device_param() -> ParamSpec {
    ParamSpec::string("device")
        .with_default(ParamValue::String(DEFAULT_CRYOSTAT.to_string()))
        .with_description("Cryostat device id")
}

pub(super) fn register(registry: &mut ActionRegistry) -> Result<(), RegistryError> {
    registry.register(
        ActionDescriptor::from_fn("set-field", |args, ctx| {
            let target = args.f64("target")?;
            if target.abs() > MAX_FIELD_T {
                return Err(ActionError::InvalidValue(format!(
                    "field {target} T exceeds the {MAX_FIELD_T} T limit"
                )));
            }
            let device = args.str("device")?;
            ctx.devices_mut()
                .get_mut(device)?
                .write("field_t", ParamValue::Float(target))?;
            ctx.increment("field_changes");
            info!(device, target, "magnet target field set");
            Ok(())
        })
        .with_description("Set the magnet target field in tesla")
        .with_param(ParamSpec::float("target").with_description("Target field in T"))
        .with_param(device_param()),
    )?;

    registry.register(
        ActionDescriptor::from_fn("set-temperature", |args, ctx| {
            let kelvin = args.f64("kelvin")?;
            if kelvin <= 0.0 {
                return Err(ActionError::InvalidValue(format!(
                    "temperature must be above 0 K, got {kelvin}"
                )));
            }
            let device = args.str("device")?;
            ctx.devices_mut()
                .get_mut(device)?
                .write("temperature_k", ParamValue::Float(kelvin))?;
            info!(device, kelvin, "temperature setpoint updated");
            Ok(())
        })
        .with_description("Set the platform temperature setpoint in kelvin")
        .with_param(ParamSpec::float("kelvin"))
        .with_param(device_param()),
    )?;

    registry.register(
        ActionDescriptor::from_fn("read-temperature", |args, ctx| {
            let device = args.str("device")?;
            let kelvin = ctx.devices().get(device)?.read("temperature_k")?;
            let value = serde_json::Number::from_f64(kelvin)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            ctx.set_var("last_temperature_k", value);
            Ok(())
        })
        .with_description("Read the platform temperature into the context")
        .with_param(device_param()),
    )?;

    Ok(())
}
