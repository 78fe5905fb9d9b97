mod common;

use std::sync::Arc;

use serde_json::json;
use woopsa_adapter::{AdapterError, AdapterNode, Element, HostList, HostRef};
use woopsa_value::{ValueKind, WireValue};

use common::hosts::{Plant, Sensor, Thermostat};
use common::{method_names, property_names, root};

#[test]
fn sensor_publishes_one_real_property() {
    let sensor = Sensor::new(21.5);
    let root = root(sensor.clone());
    assert_eq!(property_names(&root), vec!["Temperature"]);
    assert!(method_names(&root).is_empty());

    let temperature = root.property("Temperature").unwrap();
    assert_eq!(temperature.kind(), ValueKind::Real);
    assert!(temperature.is_read_only());
    assert_eq!(temperature.read().unwrap().to_f64().unwrap(), 21.5);

    sensor.set(-3.25);
    assert_eq!(temperature.read().unwrap().to_f64().unwrap(), -3.25);
}

#[test]
fn read_only_write_fails_without_mutating() {
    let sensor = Sensor::new(21.5);
    let root = root(sensor.clone());
    let temperature = root.property("Temperature").unwrap();
    let err = temperature
        .write(&WireValue::new(99.0f64, ValueKind::Real).unwrap())
        .unwrap_err();
    assert_eq!(err, AdapterError::ReadOnly("Temperature".into()));
    assert_eq!(*sensor.temperature.read().unwrap(), 21.5);
}

#[test]
fn writable_property_converts_and_assigns() {
    let thermostat = Thermostat::new(21.5);
    let root = root(thermostat.clone());
    let setpoint = root.property("Setpoint").unwrap();
    assert!(!setpoint.is_read_only());

    setpoint
        .write(&WireValue::new(25.0f64, ValueKind::Real).unwrap())
        .unwrap();
    assert_eq!(thermostat.setpoint(), 25.0);

    // Text is parsed by the conversion layer.
    setpoint.write(&WireValue::text("19.5")).unwrap();
    assert_eq!(thermostat.setpoint(), 19.5);

    assert!(matches!(
        setpoint.write(&WireValue::text("warm")),
        Err(AdapterError::Value(_))
    ));
    assert!(matches!(
        setpoint.write(&WireValue::new(f64::NAN, ValueKind::Real).unwrap()),
        Err(AdapterError::Host(_))
    ));
    assert_eq!(thermostat.setpoint(), 19.5);
}

#[test]
fn kind_override_coerces_the_native_value() {
    let root = root(Thermostat::new(21.5));
    let percent = root.property("Percent").unwrap();
    assert_eq!(percent.kind(), ValueKind::Real);
    let value = percent.read().unwrap();
    assert_eq!(value.kind(), ValueKind::Real);
    assert_eq!(value.to_f64().unwrap(), 21.0);
}

#[test]
fn methods_convert_arguments_and_results() {
    let thermostat = Thermostat::new(21.5);
    let root = root(thermostat.clone());
    assert_eq!(method_names(&root), vec!["Offset", "Reset"]);

    let offset = root.method("Offset").unwrap();
    assert_eq!(offset.return_kind(), ValueKind::Real);
    assert_eq!(offset.arguments().len(), 1);
    assert_eq!(offset.arguments()[0].name, "delta");
    let result = offset
        .invoke(&[WireValue::new(1.5f64, ValueKind::Real).unwrap()])
        .unwrap()
        .unwrap();
    assert_eq!(result.to_f64().unwrap(), 23.0);

    let err = offset.invoke(&[]).unwrap_err();
    assert_eq!(
        err,
        AdapterError::ArgumentCount {
            method: "Offset".into(),
            expected: 1,
            actual: 0,
        }
    );

    let reset = root.method("Reset").unwrap();
    assert_eq!(reset.return_kind(), ValueKind::Null);
    assert!(reset.invoke(&[]).unwrap().is_none());
    assert_eq!(*thermostat.resets.read().unwrap(), 1);
    assert_eq!(thermostat.setpoint(), 20.0);
}

#[test]
fn incompatible_method_is_omitted_alone() {
    let root = AdapterNode::builder("Root")
        .target(Thermostat::new(21.5))
        .visibility(woopsa_adapter::Visibility::ALL)
        .build();
    let names = method_names(&root);
    assert!(!names.contains(&"Clash".to_string()));
    assert!(names.contains(&"Offset".to_string()));
    assert!(names.contains(&"op_Increment".to_string()));
}

#[test]
fn failing_getter_publishes_an_empty_subtree() {
    let root = AdapterNode::builder("Offline")
        .getter(|| Err(AdapterError::host("device offline")))
        .build();
    assert!(root.target().is_none());
    assert!(root.properties().is_empty());
    assert!(root.methods().is_empty());
    assert!(root.items().is_empty());
}

#[test]
fn nested_item_follows_the_member_value() {
    let plant = Plant::new(HostList::new());
    let root = root(plant.clone());
    let main = root.item("Main").unwrap();
    let temperature = main.property("Temperature").unwrap();
    assert_eq!(temperature.read().unwrap().to_f64().unwrap(), 18.0);

    // Same type: the published members are kept and read the new instance.
    plant.set_main(Some(Sensor::new(7.0)));
    assert_eq!(temperature.read().unwrap().to_f64().unwrap(), 7.0);

    plant.set_main(None);
    assert!(main.properties().is_empty());
    assert!(matches!(temperature.read(), Err(AdapterError::NoTarget(_))));

    plant.set_main(Some(Sensor::new(9.0)));
    assert_eq!(property_names(&main), vec!["Temperature"]);
}

#[test]
fn type_change_repopulates() {
    let plant = Plant::new(HostList::new());
    let root = root(plant.clone());
    let current = root.item("Current").unwrap();
    assert!(property_names(&current).is_empty());

    plant.set_current(Some(Sensor::new(1.0) as HostRef));
    assert_eq!(property_names(&current), vec!["Temperature"]);

    plant.set_current(Some(Thermostat::new(22.0) as HostRef));
    assert_eq!(property_names(&current), vec!["Setpoint", "Percent"]);
    assert_eq!(method_names(&current), vec!["Offset", "Reset"]);
}

#[test]
fn find_resolves_paths() {
    let root = root(Plant::new(HostList::new()));
    assert!(matches!(root.find(""), Some(Element::Item(node)) if node.name() == "Root"));
    assert!(matches!(root.find("/Main"), Some(Element::Item(node)) if node.name() == "Main"));
    match root.find("Main/Temperature") {
        Some(Element::Property(property)) => assert_eq!(property.name(), "Temperature"),
        other => panic!("unexpected element {other:?}"),
    }
    assert!(root.find("Main/Temperature/Unit").is_none());
    assert!(root.find("Missing").is_none());
}

#[test]
fn meta_describes_the_node() {
    let root = root(Thermostat::new(21.5));
    assert_eq!(
        root.meta(),
        json!({
            "Name": "Root",
            "Items": [],
            "Properties": [
                {"Name": "Setpoint", "Type": "Real", "ReadOnly": false},
                {"Name": "Percent", "Type": "Real", "ReadOnly": true}
            ],
            "Methods": [
                {
                    "Name": "Offset",
                    "ReturnType": "Real",
                    "ArgumentInfos": [{"Name": "delta", "Type": "Real"}]
                },
                {"Name": "Reset", "ReturnType": "Null", "ArgumentInfos": []}
            ]
        })
    );
}

#[test]
fn timestamps_follow_the_option() {
    let plain = root(Sensor::new(1.0));
    let value = plain.property("Temperature").unwrap().read().unwrap();
    assert!(value.timestamp().is_none());

    let stamped = AdapterNode::builder("Root")
        .target(Sensor::new(1.0))
        .send_timestamps(true)
        .build();
    let value = stamped.property("Temperature").unwrap().read().unwrap();
    assert!(value.timestamp().is_some());
}

#[test]
fn dispose_releases_the_subtree() {
    let root = root(Plant::new(HostList::new()));
    let main = root.item("Main").unwrap();
    let temperature = main.property("Temperature").unwrap();

    root.dispose();
    assert!(root.is_disposed());
    assert!(main.is_disposed());
    assert!(root.items().is_empty());
    assert!(temperature.read().is_err());
}

#[test]
fn dropped_owner_reports_disposed() {
    let root = root(Sensor::new(1.0));
    let temperature = root.property("Temperature").unwrap();
    drop(root);
    assert_eq!(temperature.read().unwrap_err(), AdapterError::Disposed);
}

#[test]
fn shared_descriptions_describe_each_type_once() {
    let descriptions = Arc::new(woopsa_adapter::TypeDescriptions::default());
    let a = AdapterNode::builder("A")
        .target(Sensor::new(1.0))
        .descriptions(Arc::clone(&descriptions))
        .build();
    let b = AdapterNode::builder("B")
        .target(Sensor::new(2.0))
        .descriptions(Arc::clone(&descriptions))
        .build();
    a.properties();
    b.properties();
    assert_eq!(descriptions.len(), 1);
    assert!(Arc::ptr_eq(a.descriptions(), b.descriptions()));
}
