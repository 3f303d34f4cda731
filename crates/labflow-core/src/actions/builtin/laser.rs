//! Tunable laser actions.
//!
//! The handlers only talk to the device registry; which driver sits behind
//! `laser-01` is decided by the equipment config.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::actions::{
    ActionDescriptor, ActionError, ActionHandler, ActionRegistry, BoundArgs, HandlerResult,
    ParamSpec, ParamValue, RegistryError,
};
use crate::context::ExecutionContext;

const DEFAULT_LASER: &str = "laser-01";

fn device_param() -> ParamSpec {
    ParamSpec::string("device")
        .with_default(ParamValue::String(DEFAULT_LASER.to_string()))
        .with_description("Laser device id")
}

pub(super) fn register(registry: &mut ActionRegistry) -> Result<(), RegistryError> {
    registry.register(
        ActionDescriptor::from_fn("set-laser-power", |args, ctx| {
            let power = args.f64("power")?;
            let device = args.str("device")?;
            set_power(ctx, device, power)
        })
        .with_description("Set laser power in mW (enables power stabilization)")
        .with_param(ParamSpec::float("power").with_description("Power setpoint in mW"))
        .with_param(device_param()),
    )?;

    registry.register(
        ActionDescriptor::from_fn("enable-power-stabilization", |args, ctx| {
            let state = args.i64("state")?;
            if state != 0 && state != 1 {
                return Err(ActionError::InvalidValue(format!(
                    "state must be 0 or 1, got {state}"
                )));
            }
            let device = args.str("device")?;
            ctx.devices_mut()
                .get_mut(device)?
                .write("power_stabilization", ParamValue::Integer(state))?;
            info!(device, enabled = state == 1, "power stabilization switched");
            Ok(())
        })
        .with_description("Enable (1) or disable (0) the power stabilization loop")
        .with_param(ParamSpec::integer("state"))
        .with_param(device_param()),
    )?;

    registry.register(
        ActionDescriptor::new("sweep-laser", SweepLaser)
            .with_description("Wide-scan sweep between two wavelengths at fixed power")
            .with_param(ParamSpec::float("start_nm"))
            .with_param(ParamSpec::float("end_nm"))
            .with_param(ParamSpec::float("speed").with_description("Scan speed in nm/s"))
            .with_param(ParamSpec::float("power").with_description("Power setpoint in mW"))
            .with_param(device_param()),
    )?;

    Ok(())
}

fn set_power(ctx: &mut ExecutionContext, device: &str, power_mw: f64) -> HandlerResult {
    if power_mw < 0.0 {
        return Err(ActionError::InvalidValue(format!(
            "laser power cannot be negative ({power_mw} mW)"
        )));
    }
    let laser = ctx.devices_mut().get_mut(device)?;
    laser.write("power_stabilization", ParamValue::Integer(1))?;
    laser.write("power_mw", ParamValue::Float(power_mw))?;
    info!(device, power_mw, "laser power setpoint updated");
    Ok(())
}

/// Label for the data a sweep produces, suffixed with the active loop
/// assignments so files from one sweep can be told apart.
fn sweep_label(ctx: &ExecutionContext) -> String {
    let mut label = format!("Sweep_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    if let Some(Value::Object(assignments)) = ctx.var(crate::sweep::LOOP_CONTEXT_KEY) {
        for (name, value) in assignments {
            match value {
                Value::String(s) => label.push_str(&format!("_{name}_{s}")),
                other => label.push_str(&format!("_{name}_{other}")),
            }
        }
    }
    label
}

struct SweepLaser;

#[async_trait]
impl ActionHandler for SweepLaser {
    async fn call(&self, args: &BoundArgs, ctx: &mut ExecutionContext) -> HandlerResult {
        let start = args.f64("start_nm")?;
        let end = args.f64("end_nm")?;
        let speed = args.f64("speed")?;
        let power = args.f64("power")?;
        let device = args.str("device")?;

        if speed <= 0.0 {
            return Err(ActionError::InvalidValue(format!(
                "scan speed must be positive ({speed} nm/s)"
            )));
        }

        let duration = Duration::try_from_secs_f64((end - start).abs() / speed).map_err(|_| {
            ActionError::InvalidValue(format!(
                "sweep from {start} to {end} nm at {speed} nm/s takes too long"
            ))
        })?;

        set_power(ctx, device, power)?;
        {
            let laser = ctx.devices_mut().get_mut(device)?;
            laser.write("scan_begin_nm", ParamValue::Float(start))?;
            laser.write("scan_end_nm", ParamValue::Float(end))?;
            laser.write("scan_speed", ParamValue::Float(speed))?;
            laser.write("scan_state", ParamValue::Integer(1))?;
        }

        info!(device, start, end, speed, secs = duration.as_secs_f64(), "sweep started");
        tokio::time::sleep(duration).await;

        ctx.devices_mut()
            .get_mut(device)?
            .write("scan_state", ParamValue::Integer(0))?;
        let label = sweep_label(ctx);
        ctx.increment("sweeps");
        ctx.set_var(
            "last_sweep",
            json!({ "label": label, "start_nm": start, "end_nm": end, "speed": speed }),
        );
        Ok(())
    }
}
