use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_uri: String,
    pub db_name: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub keys_dir: String,
    pub files_dir: String,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            db_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| String::from("mongodb://localhost:27017")),
            db_name: env::var("DATABASE_NAME").unwrap_or_else(|_| String::from("fixit")),
            host: env::var("HOST").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8000),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|secret| !secret.is_empty()),
            keys_dir: env::var("KEYS_DIR").unwrap_or_else(|_| String::from("./keys")),
            files_dir: env::var("FILES_DIR").unwrap_or_else(|_| String::from("./files")),
            cors_origin: env::var("CORS_ORIGIN").ok(),
        }
    }
}
