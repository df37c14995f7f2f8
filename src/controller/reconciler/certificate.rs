//! # Certificate Provisioner
//!
//! Ensures the shared self-signed [`Issuer`] for the environment's namespace and
//! the per-environment leaf [`Certificate`] named `<name>.<suffix>`. The
//! certificate's secret backs TLS on the IDE ingress. Both objects are
//! create-only; issuance itself is cert-manager's job.

use super::apply::{ensure, ObjectSpec};
use super::types::EnvironmentScope;
use crate::constants::{CERTIFICATE_KEY_ALGORITHM, CERTIFICATE_KEY_SIZE, ISSUER_NAME};
use crate::crd::{
    Certificate, CertificatePrivateKey, CertificateSpec, Issuer, IssuerRef, IssuerSpec,
    SelfSignedIssuer,
};
use crate::store::ClusterStore;

#[must_use]
pub fn desired_issuer(scope: &EnvironmentScope) -> Issuer {
    let mut issuer = Issuer::new(
        ISSUER_NAME,
        IssuerSpec {
            self_signed: Some(SelfSignedIssuer {}),
        },
    );
    issuer.metadata.namespace = Some(scope.namespace.clone());
    issuer
}

#[must_use]
pub fn desired_certificate(scope: &EnvironmentScope) -> Certificate {
    let host = scope.host();
    let mut certificate = Certificate::new(
        &host,
        CertificateSpec {
            is_ca: true,
            common_name: Some(host.clone()),
            secret_name: host.clone(),
            private_key: Some(CertificatePrivateKey {
                algorithm: CERTIFICATE_KEY_ALGORITHM.to_string(),
                size: CERTIFICATE_KEY_SIZE,
            }),
            issuer_ref: IssuerRef {
                name: ISSUER_NAME.to_string(),
                kind: Some("Issuer".to_string()),
                group: Some("cert-manager.io".to_string()),
            },
        },
    );
    certificate.metadata.namespace = Some(scope.namespace.clone());
    certificate
}

pub async fn ensure_certificate(
    store: &dyn ClusterStore,
    scope: &EnvironmentScope,
) -> anyhow::Result<()> {
    ensure(store, ObjectSpec::create_only(desired_issuer(scope))).await?;
    ensure(store, ObjectSpec::create_only(desired_certificate(scope))).await?;
    Ok(())
}
