//! Host types shared by the integration tests.

use std::sync::{Arc, RwLock};

use woopsa_adapter::{
    arg, AdapterError, Exposable, HostList, HostRef, Native, NativeType, NativeValue,
    TypeBuilder, Visibility,
};
use woopsa_value::ValueKind;

pub struct Sensor {
    pub temperature: RwLock<f64>,
}

impl Sensor {
    pub fn new(temperature: f64) -> Arc<Self> {
        Arc::new(Self {
            temperature: RwLock::new(temperature),
        })
    }

    pub fn set(&self, temperature: f64) {
        *self.temperature.write().unwrap() = temperature;
    }
}

impl Exposable for Sensor {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property("Temperature", |s| *s.temperature.read().unwrap());
    }
}

pub struct Thermostat {
    pub setpoint: RwLock<f64>,
    pub resets: RwLock<u32>,
}

impl Thermostat {
    pub fn new(setpoint: f64) -> Arc<Self> {
        Arc::new(Self {
            setpoint: RwLock::new(setpoint),
            resets: RwLock::new(0),
        })
    }

    pub fn setpoint(&self) -> f64 {
        *self.setpoint.read().unwrap()
    }
}

impl Exposable for Thermostat {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property_rw(
            "Setpoint",
            |s| s.setpoint(),
            |s, value: f64| {
                if !value.is_finite() {
                    return Err(AdapterError::host("setpoint must be finite"));
                }
                *s.setpoint.write().unwrap() = value;
                Ok(())
            },
        );
        t.property("Secret", |_| 42i32).visible(false);
        t.property("Percent", |s| s.setpoint() as u8).kind(ValueKind::Real);
        t.method("Offset", [arg::<f64>("delta")], |s, args| {
            Ok(s.setpoint() + args.get::<f64>(0)?)
        });
        t.method("Reset", [], |s, _| {
            *s.resets.write().unwrap() += 1;
            *s.setpoint.write().unwrap() = 20.0;
            Ok(())
        });
        t.method("op_Increment", [], |s, _| Ok(s.setpoint() + 1.0))
            .special_name();
        t.method(
            "Clash",
            [arg::<i32>("value"), arg::<i32>("value")],
            |_, _| Ok(0i32),
        );
    }
}

pub struct Machine {
    pub serial: String,
}

impl Exposable for Machine {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property("Serial", |m| m.serial.clone());
        t.method("Identify", [], |m, _| Ok(format!("machine {}", m.serial)));
    }
}

/// A machine subtype: inherits the `Machine` members.
pub struct Press {
    pub machine: Machine,
    pub force: f64,
}

impl Exposable for Press {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property("Force", |p| p.force);
        t.extends::<Machine>(|p| &p.machine);
    }
}

/// Publishes every member category, whatever the adapter default.
pub struct Open;

impl Exposable for Open {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property("Answer", |_| 42i64);
    }

    fn visibility() -> Option<Visibility> {
        Some(Visibility::ALL)
    }
}

pub struct Plant {
    pub sensors: Arc<HostList<Sensor>>,
    pub main: RwLock<Option<Arc<Sensor>>>,
    pub current: RwLock<Option<HostRef>>,
}

impl Plant {
    pub fn new(sensors: HostList<Sensor>) -> Arc<Self> {
        Arc::new(Self {
            sensors: Arc::new(sensors),
            main: RwLock::new(Some(Sensor::new(18.0))),
            current: RwLock::new(None),
        })
    }

    pub fn set_main(&self, sensor: Option<Arc<Sensor>>) {
        *self.main.write().unwrap() = sensor;
    }

    pub fn set_current(&self, target: Option<HostRef>) {
        *self.current.write().unwrap() = target;
    }
}

impl Exposable for Plant {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.item("Sensors", |p| Some(Arc::clone(&p.sensors)));
        t.item("Main", |p| p.main.read().unwrap().clone());
        t.dynamic_item("Current", |p| p.current.read().unwrap().clone());
    }
}

/// A host value type with no built-in conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Celsius(pub f64);

impl Native for Celsius {
    fn native_type() -> NativeType {
        NativeType::custom::<Celsius>()
    }

    fn into_native(self) -> NativeValue {
        NativeValue::custom(self)
    }

    fn from_native(value: NativeValue) -> Result<Self, AdapterError> {
        value
            .downcast_ref::<Celsius>()
            .copied()
            .ok_or(AdapterError::TypeMismatch { expected: "Celsius" })
    }
}

pub struct Oven {
    pub heat: RwLock<Celsius>,
}

impl Exposable for Oven {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property_rw(
            "Heat",
            |o| *o.heat.read().unwrap(),
            |o, value: Celsius| {
                *o.heat.write().unwrap() = value;
                Ok(())
            },
        );
    }
}
