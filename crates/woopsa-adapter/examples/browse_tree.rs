//! Publishes a small object graph and prints the metadata of every node.

use std::sync::{Arc, RwLock};

use woopsa_adapter::{arg, AdapterNode, Exposable, HostList, TypeBuilder, Visibility};

struct Motor {
    speed: RwLock<f64>,
}

impl Exposable for Motor {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.property_rw(
            "Speed",
            |m| *m.speed.read().expect("speed lock"),
            |m, speed: f64| {
                *m.speed.write().expect("speed lock") = speed;
                Ok(())
            },
        );
        t.method("Ramp", [arg::<f64>("delta")], |m, args| {
            let mut speed = m.speed.write().expect("speed lock");
            *speed += args.get::<f64>(0)?;
            Ok(*speed)
        });
    }
}

struct Line {
    motors: Arc<HostList<Motor>>,
}

impl Exposable for Line {
    fn describe(t: &mut TypeBuilder<Self>) {
        t.item("Motors", |line| Some(Arc::clone(&line.motors)));
    }
}

fn print_tree(node: &AdapterNode, path: &str) {
    println!("{path}: {}", node.meta());
    for child in node.items() {
        print_tree(&child, &format!("{path}/{}", child.name()));
    }
}

fn main() {
    let motors = Arc::new(HostList::<Motor>::observable());
    for speed in [10.0, 20.0] {
        motors.push(Motor {
            speed: RwLock::new(speed),
        });
    }
    let root = AdapterNode::builder("Line")
        .target(Arc::new(Line {
            motors: Arc::clone(&motors),
        }))
        .visibility(Visibility::default() | Visibility::OBJECT_COLLECTION)
        .build();

    print_tree(&root, "");
    motors.remove_at(0);
    root.refresh();
    print_tree(&root, "");
}
