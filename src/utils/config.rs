use std::env;
use std::path::PathBuf;

use crate::permission::AuthorizationStatus;

#[derive(Clone, Debug)]
pub struct Config {
    pub root: PathBuf,
    pub data: PathBuf,
    pub scan_on_start: bool,
    pub access: AuthorizationStatus,
    pub pool_size: u32,
    pub page_size: i64,
    pub collection_mode: String,
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "/photos".to_string());
        let data = env::var("MEDIA_DATA").unwrap_or_else(|_| "/media-data".to_string());
        let scan_on_start = env::var("MEDIA_SCAN_ON_START").ok().and_then(|v| parse_bool(&v)).unwrap_or(true);
        let access = env::var("MEDIA_ACCESS")
            .ok()
            .and_then(|v| AuthorizationStatus::from_access(&v))
            .unwrap_or(AuthorizationStatus::Granted);
        let pool_size = env::var("MEDIA_POOL_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(4);
        let page_size = env::var("MEDIA_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(100);
        let collection_mode = env::var("MEDIA_COLLECTION_MODE").unwrap_or_else(|_| "ALBUMS".to_string());
        Self {
            root: PathBuf::from(root),
            data: PathBuf::from(data),
            scan_on_start,
            access,
            pool_size,
            page_size,
            collection_mode,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data.join("db").join("media.db")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data.join("exports")
    }

    pub fn derived_dir(&self) -> PathBuf {
        self.data.join("derived")
    }
}
