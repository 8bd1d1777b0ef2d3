use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    /// Frontend page the reset link points at; the token is appended as a query param.
    pub reset_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    pub allowed_genders: Vec<String>,
    pub age_min: i32,
    pub age_max: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub profile: ProfileConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        // No fallback secret: a missing JWT_SECRET must abort startup.
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "storefront-users".into()),
            access_ttl_minutes: std::env::var("ACCESS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            reset_ttl_minutes: std::env::var("RESET_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(10),
        };
        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST")?,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(25),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "no-reply@storefront.local".into()),
            reset_url: std::env::var("FRONTEND_RESET_URL")?,
        };
        let profile = ProfileConfig {
            allowed_genders: std::env::var("PROFILE_ALLOWED_GENDERS")
                .unwrap_or_else(|_| "male,female,other".into())
                .split(',')
                .map(|g| g.trim().to_lowercase())
                .filter(|g| !g.is_empty())
                .collect(),
            age_min: std::env::var("PROFILE_AGE_MIN")
                .ok()
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(13),
            age_max: std::env::var("PROFILE_AGE_MAX")
                .ok()
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(100),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
            profile,
        })
    }
}
