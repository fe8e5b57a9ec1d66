use clap::Args;
use serde::Serialize;

/// Where statements are sent. Opaque to bundle runs; executors stamp it onto
/// every request they issue.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    /// Database name
    #[arg(long, env = "DATABASE")]
    pub database: Option<String>,

    /// Reference to the secret holding the store credentials
    #[arg(long, env = "SECRET_ARN")]
    pub secret_arn: Option<String>,

    /// Reference to the database cluster
    #[arg(long, env = "CLUSTER_ARN")]
    pub resource_arn: Option<String>,
}
