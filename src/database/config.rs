use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_user")]
    pub user: String,
    #[serde(default = "default_database_password")]
    pub password: String,
    #[serde(default = "default_database_host")]
    pub host: String,
    #[serde(default = "default_database_port")]
    pub port: u16,
    #[serde(default = "default_database_name")]
    pub name: String,
    #[serde(default = "default_database_sslmode")]
    pub sslmode: String,
    /// Full connection string; overrides the individual fields above when set
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_database_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_database_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_database_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_database_migration_on_startup")]
    pub migration_on_startup: bool,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                self.user, self.password, self.host, self.port, self.name, self.sslmode
            ),
        }
    }
}

fn default_database_user() -> String {
    "app".to_string()
}

fn default_database_password() -> String {
    "secret".to_string()
}

fn default_database_host() -> String {
    "localhost".to_string()
}

fn default_database_port() -> u16 {
    5432
}

fn default_database_name() -> String {
    "subscriptions".to_string()
}

fn default_database_sslmode() -> String {
    "disable".to_string()
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_database_min_connections() -> u32 {
    1
}

fn default_database_max_lifetime_secs() -> u64 {
    3600
}

fn default_database_migration_on_startup() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: default_database_user(),
            password: default_database_password(),
            host: default_database_host(),
            port: default_database_port(),
            name: default_database_name(),
            sslmode: default_database_sslmode(),
            url: None,
            max_connections: default_database_max_connections(),
            min_connections: default_database_min_connections(),
            max_lifetime_secs: default_database_max_lifetime_secs(),
            migration_on_startup: default_database_migration_on_startup(),
        }
    }
}
