mod common;

use std::sync::{Arc, Mutex};

use woopsa_adapter::{
    AdapterNode, DeclaringType, ExposedType, HostList, HostRef, Visibility, VisibilityCheck,
};

use common::hosts::{Machine, Open, Plant, Press, Sensor, Thermostat};
use common::{method_names, property_names, root, root_with};

fn press() -> Arc<Press> {
    Arc::new(Press {
        machine: Machine {
            serial: "P-7".into(),
        },
        force: 12.5,
    })
}

#[test]
fn explicit_hide_wins_over_every_flag() {
    let root = root_with(Thermostat::new(20.0), Visibility::ALL);
    assert!(root.property("Secret").is_none());
    assert!(!property_names(&root).contains(&"Secret".to_string()));
}

#[test]
fn inherited_members_follow_the_flag() {
    let root = root(press());
    assert_eq!(property_names(&root), vec!["Force", "Serial"]);
    assert_eq!(method_names(&root), vec!["Identify"]);
    let identify = root.method("Identify").unwrap();
    assert_eq!(
        identify.invoke(&[]).unwrap().unwrap().as_text(),
        "machine P-7"
    );

    let own_only = root_with(press(), Visibility::DEFAULT_IS_VISIBLE);
    assert_eq!(property_names(&own_only), vec!["Force"]);
    assert!(method_names(&own_only).is_empty());
}

#[test]
fn inherited_members_can_be_left_out_of_descriptions() {
    let root = AdapterNode::builder("Root")
        .target(press())
        .visibility(Visibility::ALL)
        .include_inherited(false)
        .build();
    assert_eq!(property_names(&root), vec!["Force"]);
    assert!(method_names(&root).is_empty());
}

#[test]
fn object_class_members_are_opt_in() {
    let root = root_with(
        Sensor::new(1.0),
        Visibility::default() | Visibility::OBJECT_CLASS_MEMBERS,
    );
    let to_string = root.method("ToString").unwrap();
    assert_eq!(to_string.invoke(&[]).unwrap().unwrap().as_text(), "Sensor");
    assert!(common::root(Sensor::new(1.0)).method("ToString").is_none());
}

#[test]
fn special_names_are_opt_in() {
    let plain = root(Thermostat::new(20.0));
    assert!(plain.method("op_Increment").is_none());
    let special = root_with(
        Thermostat::new(20.0),
        Visibility::default() | Visibility::METHOD_SPECIAL_NAME,
    );
    let increment = special.method("op_Increment").unwrap();
    assert_eq!(increment.invoke(&[]).unwrap().unwrap().to_f64().unwrap(), 21.0);
}

#[test]
fn type_level_visibility_replaces_the_default() {
    let root = root_with(Arc::new(Open), Visibility::empty());
    assert_eq!(root.visibility(), Visibility::ALL);
    assert_eq!(property_names(&root), vec!["Answer"]);
    assert_eq!(method_names(&root), vec!["ToString"]);
}

#[test]
fn hook_decides_last() {
    let root = AdapterNode::builder("Root")
        .target(Thermostat::new(20.0))
        .on_visibility_check(|check: &mut VisibilityCheck<'_>| {
            if check.member.name == "Setpoint" {
                check.visible = false;
            }
            if check.member.declaring == DeclaringType::ObjectClass {
                check.visible = true;
            }
        })
        .build();
    assert_eq!(property_names(&root), vec!["Percent"]);
    assert_eq!(method_names(&root), vec!["Offset", "Reset", "ToString"]);
}

#[test]
fn hook_escalates_to_the_closest_ancestor() {
    let plant = Plant::new(HostList::new());
    let root = AdapterNode::builder("Root")
        .target(plant)
        .on_visibility_check(|check: &mut VisibilityCheck<'_>| {
            if check.member.name == "Temperature" {
                assert_eq!(check.node, "Main");
                check.visible = false;
            }
        })
        .build();
    let main = root.item("Main").unwrap();
    assert!(property_names(&main).is_empty());

    main.set_visibility_hook(Some(Arc::new(|check: &mut VisibilityCheck<'_>| {
        check.visible = true;
    })));
    assert_eq!(property_names(&main), vec!["Temperature"]);

    main.set_visibility_hook(None);
    assert!(property_names(&main).is_empty());
}

#[test]
fn children_inherit_the_effective_visibility() {
    let plant = Plant::new(HostList::new());
    let root = root_with(plant, Visibility::default() | Visibility::OBJECT_CLASS_MEMBERS);
    let main = root.item("Main").unwrap();
    assert!(main.visibility().contains(Visibility::OBJECT_CLASS_MEMBERS));
    assert!(main.method("ToString").is_some());
}

#[test]
fn declared_base_type_reaches_the_target_through_extends() {
    let root = AdapterNode::builder("Root")
        .target(press())
        .declared_type::<Machine>()
        .build();
    assert_eq!(root.exposed_type().map(|t| t.name()), Some("Machine"));
    let press_type = root.descriptions().get(ExposedType::of::<Press>());
    assert!(press_type.extends(ExposedType::of::<Machine>()));
    assert_eq!(property_names(&root), vec!["Serial"]);
    assert_eq!(root.property("Serial").unwrap().read().unwrap().as_text(), "P-7");
    let identify = root.method("Identify").unwrap();
    assert_eq!(
        identify.invoke(&[]).unwrap().unwrap().as_text(),
        "machine P-7"
    );
}

#[test]
fn declared_type_the_target_does_not_extend_publishes_nothing() {
    let root = AdapterNode::builder("Root")
        .target(Sensor::new(1.0))
        .declared_type::<Machine>()
        .build();
    assert!(root.properties().is_empty());
    assert!(root.methods().is_empty());
    assert!(root.target().is_none());
    assert_eq!(root.exposed_type(), None);
}

#[test]
fn declared_type_keeps_members_across_runtime_types() {
    let first: HostRef = press();
    let current = Arc::new(Mutex::new(first));
    let source = Arc::clone(&current);
    let root = AdapterNode::builder("Root")
        .getter(move || Ok(Some(Arc::clone(&*source.lock().unwrap()))))
        .declared_type::<Machine>()
        .build();
    let serial = root.property("Serial").unwrap();
    assert_eq!(serial.read().unwrap().as_text(), "P-7");

    let machine: HostRef = Arc::new(Machine {
        serial: "M-1".into(),
    });
    *current.lock().unwrap() = machine;
    assert_eq!(serial.read().unwrap().as_text(), "M-1");
    assert!(Arc::ptr_eq(&serial, &root.property("Serial").unwrap()));
}

// Members of a declared base type are inherited ones for a subtype instance.
#[test]
fn declared_base_members_count_as_inherited() {
    let press_as_machine = AdapterNode::builder("Root")
        .target(press())
        .declared_type::<Machine>()
        .visibility(Visibility::DEFAULT_IS_VISIBLE)
        .build();
    assert!(property_names(&press_as_machine).is_empty());
    assert!(method_names(&press_as_machine).is_empty());

    let machine = AdapterNode::builder("Root")
        .target(Arc::new(Machine {
            serial: "M-1".into(),
        }))
        .declared_type::<Machine>()
        .visibility(Visibility::DEFAULT_IS_VISIBLE)
        .build();
    assert_eq!(property_names(&machine), vec!["Serial"]);
}
