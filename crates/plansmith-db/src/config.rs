/// Database configuration.
///
/// The URL is resolved by the CLI config chain; [`DbConfig::ENV_VAR`] and
/// [`DbConfig::DEFAULT_URL`] are the environment and fallback layers.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/plansmith";

    pub const ENV_VAR: &str = "PLANSMITH_DATABASE_URL";

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split('?')
            .next()
            .unwrap_or(&self.database_url);
        let (_, name) = without_query.rsplit_once('/')?;
        if name.is_empty() || name.contains(':') || name.contains('@') {
            return None;
        }
        Some(name)
    }

    /// URL of the `postgres` maintenance database on the same server, used
    /// to issue `CREATE DATABASE`. Connection parameters in the query string
    /// (e.g. `sslmode`) are kept.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let Some(pos) = base.rfind('/') else {
            return self.database_url.clone();
        };
        let mut url = format!("{}/postgres", &base[..pos]);
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}
