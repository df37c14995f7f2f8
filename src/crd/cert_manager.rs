//! # cert-manager Resources
//!
//! Minimal typed views of the cert-manager `Issuer` and `Certificate` kinds.
//! The schemas are owned by cert-manager, so schema generation is disabled and
//! only the fields the controller writes are modelled.

use serde::{Deserialize, Serialize};

/// Namespaced cert-manager Issuer
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    kind = "Issuer",
    group = "cert-manager.io",
    version = "v1",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_signed: Option<SelfSignedIssuer>,
}

/// Marker for a self-signed issuer (`selfSigned: {}`)
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SelfSignedIssuer {}

/// cert-manager Certificate
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    kind = "Certificate",
    group = "cert-manager.io",
    version = "v1",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    #[serde(default, rename = "isCA")]
    pub is_ca: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    pub secret_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<CertificatePrivateKey>,
    pub issuer_ref: IssuerRef,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePrivateKey {
    pub algorithm: String,
    pub size: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}
