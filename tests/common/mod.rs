//! Shared fixtures for reconciliation tests
//!
//! Every test drives [`run_pass`] against a [`MemoryStore`], the same way the
//! controller runtime would after a watch event.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use devenv_operator::controller::reconciler::teardown::managed_objects;
use devenv_operator::prelude::*;
use devenv_operator::store::{from_dynamic, get_typed, to_dynamic};
use kube::discovery::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub const NAMESPACE: &str = "team";
pub const DOMAIN_SUFFIX: &str = "example.test";

pub fn spec(language: &str) -> DeveloperEnvironmentSpec {
    DeveloperEnvironmentSpec {
        language: language.to_string(),
        version: String::new(),
        ide: IdeConfig {
            ide_type: "vscode".to_string(),
            extensions: Vec::new(),
            settings: Default::default(),
            password_secret: "changeme".to_string(),
        },
        database: DatabaseSpec {
            db_type: "postgres".to_string(),
            version: "16".to_string(),
        },
        dependencies: Vec::new(),
    }
}

fn environments() -> ApiResource {
    ApiResource::erase::<DeveloperEnvironment>(&())
}

/// Reconciler wired to an in-memory cluster
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn ClusterStore> = store.clone();
        let config = ControllerConfig {
            domain_suffix: DOMAIN_SUFFIX.to_string(),
            ..Default::default()
        };
        Self {
            store,
            reconciler: Reconciler::new(shared, config),
        }
    }

    /// Submit a new environment, as a developer would with kubectl
    pub async fn submit(&self, name: &str, spec: DeveloperEnvironmentSpec) -> DeveloperEnvironment {
        let mut env = DeveloperEnvironment::new(name, spec);
        env.metadata.namespace = Some(NAMESPACE.to_string());
        let created = self
            .store
            .create(&environments(), &to_dynamic(&env).unwrap())
            .await
            .unwrap();
        from_dynamic(&created).unwrap()
    }

    /// Replace the spec of an existing environment
    pub async fn edit(&self, name: &str, edit: impl FnOnce(&mut DeveloperEnvironmentSpec)) {
        let mut env = self.environment(name).await.unwrap();
        edit(&mut env.spec);
        self.store
            .replace(&environments(), &to_dynamic(&env).unwrap())
            .await
            .unwrap();
    }

    /// Request deletion, as `kubectl delete` would
    pub async fn delete(&self, name: &str) {
        self.store
            .delete(&environments(), Some(NAMESPACE), name)
            .await
            .unwrap();
    }

    pub async fn pass(&self, name: &str) -> Result<PassOutcome, ReconcilerError> {
        run_pass(&self.reconciler, NAMESPACE, name).await
    }

    pub async fn environment(&self, name: &str) -> Option<DeveloperEnvironment> {
        get_typed(self.store.as_ref(), Some(NAMESPACE), name).await.ok()
    }

    /// Fetch one managed object from the environment's namespace
    pub async fn object<K>(&self, name: &str) -> K
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        get_typed(self.store.as_ref(), Some(NAMESPACE), name)
            .await
            .unwrap_or_else(|e| panic!("{} {name}: {e}", K::kind(&())))
    }

    /// Write a managed object behind the controller's back
    pub async fn tamper<K>(&self, object: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        self.store
            .replace(&ApiResource::erase::<K>(&()), &to_dynamic(object).unwrap())
            .await
            .unwrap();
    }

    pub fn managed(&self, name: &str) -> Vec<ObjectRef> {
        managed_objects(&EnvironmentScope {
            name: name.to_string(),
            namespace: NAMESPACE.to_string(),
            uid: String::new(),
            domain_suffix: DOMAIN_SUFFIX.to_string(),
        })
    }

    /// Managed objects of `name` currently present in the store
    pub fn present(&self, name: &str) -> Vec<ObjectRef> {
        self.managed(name)
            .into_iter()
            .filter(|object| self.store.contains(object))
            .collect()
    }
}
