use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Runtime configuration, read once from the environment at startup.
///
/// `STOCKROOM_DATA_DIR` roots the backing document and the uploads directory
/// unless `STOCKROOM_DB_FILE` / `STOCKROOM_UPLOADS_DIR` override them
/// individually. `HOST`/`PORT` control the listener, `RUST_LOG` the filter,
/// and `STOCKROOM_LOG_DIR` enables file logging when set.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub db_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let data_dir =
            PathBuf::from(std::env::var("STOCKROOM_DATA_DIR").unwrap_or_else(|_| ".".to_string()));
        let db_file = std::env::var("STOCKROOM_DB_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("database.json"));
        let uploads_dir = std::env::var("STOCKROOM_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("uploads"));
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let max_upload_bytes = std::env::var("STOCKROOM_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let log_dir = std::env::var("STOCKROOM_LOG_DIR").ok().map(PathBuf::from);

        Self {
            data_dir,
            db_file,
            uploads_dir,
            host,
            port,
            max_upload_bytes,
            log_dir,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
