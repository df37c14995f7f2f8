//! # Deterministic Naming
//!
//! Every sub-object name is a pure function of the environment name, so objects
//! can be found again for update or delete without any persisted index.

/// Dedicated namespace: `devenv-<name>`
#[must_use]
pub fn namespace_name(env: &str) -> String {
    format!("devenv-{env}")
}

/// Tooling script config map: `<name>-dev-tools-scripts`
#[must_use]
pub fn tools_config_map_name(env: &str) -> String {
    format!("{env}-dev-tools-scripts")
}

/// VS Code server deployment and service: `<name>-vscode-server`
#[must_use]
pub fn ide_server_name(env: &str) -> String {
    format!("{env}-vscode-server")
}

/// Workspace volume claim: `<name>-vscode-workspace`
#[must_use]
pub fn ide_workspace_name(env: &str) -> String {
    format!("{env}-vscode-workspace")
}

/// Password secret: `<name>-vscode-password`
#[must_use]
pub fn ide_password_name(env: &str) -> String {
    format!("{env}-vscode-password")
}

/// Ingress: `<name>-vscode-ingress`
#[must_use]
pub fn ide_ingress_name(env: &str) -> String {
    format!("{env}-vscode-ingress")
}

/// Database deployment and service: `<name>-database`
#[must_use]
pub fn database_name(env: &str) -> String {
    format!("{env}-database")
}

/// Database volume claim: `<name>-db-pvc`
#[must_use]
pub fn database_claim_name(env: &str) -> String {
    format!("{env}-db-pvc")
}

/// Certificate, its TLS secret and the ingress host: `<name>.<suffix>`
#[must_use]
pub fn host_name(env: &str, domain_suffix: &str) -> String {
    format!("{env}.{domain_suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_bit_exact() {
        assert_eq!(namespace_name("alice"), "devenv-alice");
        assert_eq!(tools_config_map_name("alice"), "alice-dev-tools-scripts");
        assert_eq!(ide_server_name("alice"), "alice-vscode-server");
        assert_eq!(ide_workspace_name("alice"), "alice-vscode-workspace");
        assert_eq!(ide_password_name("alice"), "alice-vscode-password");
        assert_eq!(ide_ingress_name("alice"), "alice-vscode-ingress");
        assert_eq!(database_name("alice"), "alice-database");
        assert_eq!(database_claim_name("alice"), "alice-db-pvc");
        assert_eq!(
            host_name("alice", "developerenv.adityajoshi.online"),
            "alice.developerenv.adityajoshi.online"
        );
    }
}
