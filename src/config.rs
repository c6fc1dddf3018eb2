#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub frontend_url: String,
    pub upload_dir: String,
    /// Registering with this email grants admin directly.
    pub admin_email: Option<String>,
    /// Plaintext membership codes; clients submit a digest of these.
    pub admin_code: Option<String>,
    pub elite_member_code: Option<String>,
    pub member_code: Option<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let frontend_url = std::env::var("FRONTEND_URL").expect("FRONTEND_URL must be set");
        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string());

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port: 8000,
            frontend_url,
            upload_dir,
            admin_email: std::env::var("ADMIN_EMAIL").ok(),
            admin_code: std::env::var("ADMIN_CODE").ok(),
            elite_member_code: std::env::var("ELITE_MEMBER_CODE").ok(),
            member_code: std::env::var("MEMBER_CODE").ok(),
        }
    }
}
