#![allow(dead_code)]

pub mod hosts;

use std::sync::Arc;

use woopsa_adapter::{AdapterNode, HostRef, Visibility};

pub fn root(target: HostRef) -> Arc<AdapterNode> {
    AdapterNode::builder("Root").target(target).build()
}

pub fn root_with(target: HostRef, visibility: Visibility) -> Arc<AdapterNode> {
    AdapterNode::builder("Root")
        .target(target)
        .visibility(visibility)
        .build()
}

pub fn property_names(node: &AdapterNode) -> Vec<String> {
    node.properties()
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

pub fn method_names(node: &AdapterNode) -> Vec<String> {
    node.methods().iter().map(|m| m.name().to_string()).collect()
}

pub fn item_names(node: &AdapterNode) -> Vec<String> {
    node.items().iter().map(|i| i.name().to_string()).collect()
}

pub fn with_collections() -> Visibility {
    Visibility::default() | Visibility::OBJECT_COLLECTION
}
