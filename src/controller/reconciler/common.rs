//! Builders and mutable-field copiers shared by the IDE and database stacks.
//!
//! Each copier moves the portion of a desired object that the controller owns
//! onto the live object, wholesale. Anything outside that portion (status,
//! server-assigned fields, metadata added by other controllers) is left alone.

use crate::constants::VOLUME_SIZE;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, Secret, Service, VolumeResourceRequirements,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// `app` + `developer-env` labels, also used as the pod selector
#[must_use]
pub fn app_labels(app: &str, env: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), app.to_string()),
        ("developer-env".to_string(), env.to_string()),
    ])
}

/// Single-writer claim of the fixed volume size
#[must_use]
pub fn volume_claim(
    name: String,
    namespace: &str,
    labels: BTreeMap<String, String>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(VOLUME_SIZE.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn copy_deployment_spec(live: &mut Deployment, desired: &Deployment) {
    live.spec.clone_from(&desired.spec);
}

pub fn copy_ingress_spec(live: &mut Ingress, desired: &Ingress) {
    live.spec.clone_from(&desired.spec);
}

pub fn copy_secret_data(live: &mut Secret, desired: &Secret) {
    live.data.clone_from(&desired.data);
}

/// Whole spec, except the cluster IPs the API server assigned on create
pub fn copy_service_spec(live: &mut Service, desired: &Service) {
    let (cluster_ip, cluster_ips) = live
        .spec
        .as_ref()
        .map(|spec| (spec.cluster_ip.clone(), spec.cluster_ips.clone()))
        .unwrap_or_default();
    live.spec.clone_from(&desired.spec);
    if let Some(spec) = live.spec.as_mut() {
        if cluster_ip.is_some() {
            spec.cluster_ip = cluster_ip;
        }
        if cluster_ips.is_some() {
            spec.cluster_ips = cluster_ips;
        }
    }
}

/// Size in bytes of a quantity such as `10Gi`, `500M` or `1.5Ti`
fn storage_bytes(quantity: &Quantity) -> Option<f64> {
    let text = quantity.0.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, suffix) = text.split_at(split);
    let scale = match suffix {
        "" => 1.0,
        "Ki" => 1024_f64,
        "Mi" => 1024_f64.powi(2),
        "Gi" => 1024_f64.powi(3),
        "Ti" => 1024_f64.powi(4),
        "Pi" => 1024_f64.powi(5),
        "Ei" => 1024_f64.powi(6),
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => return None,
    };
    number.parse::<f64>().ok().map(|n| n * scale)
}

/// Storage requests are the only mutable part of a bound claim
///
/// A claim expanded out-of-band keeps its larger request; the API server
/// refuses to shrink a claim, so copying the smaller size would fail every pass.
pub fn copy_claim_requests(live: &mut PersistentVolumeClaim, desired: &PersistentVolumeClaim) {
    let mut requests = desired
        .spec
        .as_ref()
        .and_then(|spec| spec.resources.as_ref())
        .and_then(|resources| resources.requests.clone());
    let live_storage = live
        .spec
        .as_ref()
        .and_then(|spec| spec.resources.as_ref())
        .and_then(|resources| resources.requests.as_ref())
        .and_then(|requests| requests.get("storage"))
        .cloned();

    if let (Some(requests), Some(live_storage)) = (requests.as_mut(), live_storage) {
        let wanted = requests.get("storage").and_then(storage_bytes);
        if let (Some(current), Some(wanted)) = (storage_bytes(&live_storage), wanted) {
            if current > wanted {
                requests.insert("storage".to_string(), live_storage);
            }
        }
    }

    match live.spec.as_mut() {
        Some(spec) => {
            spec.resources.get_or_insert_with(Default::default).requests = requests;
        }
        None => live.spec.clone_from(&desired.spec),
    }
}
