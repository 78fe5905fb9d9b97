mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use woopsa_adapter::{Exposable, ExposedType, HostList, TypeBuilder, TypeDescriptions};

use common::hosts::{Plant, Sensor};
use common::{item_names, root_with, with_collections};

static GAUGE_DESCRIBED: AtomicUsize = AtomicUsize::new(0);

struct Gauge;

impl Exposable for Gauge {
    fn describe(t: &mut TypeBuilder<Self>) {
        GAUGE_DESCRIBED.fetch_add(1, Ordering::SeqCst);
        t.property("Level", |_| 0.5f64);
    }
}

#[test]
fn concurrent_lookups_describe_a_type_once() {
    let descriptions = TypeDescriptions::default();
    let found: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| descriptions.get(ExposedType::of::<Gauge>())))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    assert_eq!(GAUGE_DESCRIBED.load(Ordering::SeqCst), 1);
    assert_eq!(descriptions.len(), 1);
    assert!(found.iter().all(|d| Arc::ptr_eq(d, &found[0])));
}

#[test]
fn refresh_keeps_up_with_concurrent_list_changes() {
    let plant = Plant::new(HostList::observable());
    let root = root_with(plant.clone(), with_collections());
    let sensors = root.item("Sensors").unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    sensors.refresh();
                    sensors.items();
                }
            });
        }
        scope.spawn(|| {
            for i in 0..2000 {
                let sensor = plant.sensors.push(Sensor::new(i as f64));
                if i % 2 == 1 {
                    plant.sensors.remove(&sensor);
                }
            }
            done.store(true, Ordering::Release);
        });
    });

    sensors.refresh();
    assert_eq!(plant.sensors.len(), 1000);
    assert_eq!(item_names(&sensors).len(), plant.sensors.len());

    let published: Vec<f64> = sensors
        .items()
        .iter()
        .map(|item| {
            item.property("Temperature")
                .unwrap()
                .read()
                .unwrap()
                .to_f64()
                .unwrap()
        })
        .collect();
    let expected: Vec<f64> = (0..2000).step_by(2).map(|i| i as f64).collect();
    assert_eq!(published, expected);
}
