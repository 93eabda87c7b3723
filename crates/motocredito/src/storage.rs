//! File storage for uploaded documents and product images.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::Engine;
use mime::Mime;

use crate::config::StorageConfig;

/// Decoded `data:<mime>;base64,<payload>` URL as produced by browser uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: Mime,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let rest = raw
            .trim()
            .strip_prefix("data:")
            .ok_or(StorageError::MalformedDataUrl("missing data: prefix"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or(StorageError::MalformedDataUrl("missing payload separator"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(StorageError::MalformedDataUrl("only base64 payloads are accepted"))?;

        let mime: Mime = media_type
            .parse()
            .map_err(|_| StorageError::MalformedDataUrl("invalid media type"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| StorageError::MalformedDataUrl("payload is not valid base64"))?;

        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        Ok(Self { mime, bytes })
    }

    pub fn is_image(&self) -> bool {
        self.mime.type_() == mime::IMAGE
    }

    /// File extension conventionally used for the media subtype.
    pub fn extension(&self) -> &str {
        match self.mime.subtype().as_str() {
            "jpeg" => "jpg",
            "svg" => "svg",
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(&'static str),
    #[error("upload payload is empty")]
    EmptyPayload,
    #[error("unsupported media type {0}, expected an image")]
    UnsupportedMediaType(String),
    #[error("storage service unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::MalformedDataUrl(_) | StorageError::EmptyPayload => {
                "El archivo no pudo ser leído."
            }
            StorageError::UnsupportedMediaType(_) => "Solo se permiten imágenes.",
            StorageError::Unavailable(_) => {
                "El servicio de archivos no está disponible. Intente más tarde."
            }
        }
    }
}

/// Upload seam for the hosted file storage service.
pub trait FileStorage: Send + Sync {
    /// Store `file` under `path` and return its public download URL.
    fn upload(&self, path: &str, file: DataUrl) -> Result<String, StorageError>;
}

/// Keeps uploads in memory and hands out URLs under the configured bucket.
#[derive(Debug)]
pub struct MemoryFileStorage {
    bucket: String,
    public_base_url: String,
    objects: Mutex<HashMap<String, DataUrl>>,
}

impl MemoryFileStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn object(&self, path: &str) -> Option<DataUrl> {
        self.objects
            .lock()
            .map(|objects| objects.get(path).cloned())
            .unwrap_or(None)
    }
}

impl FileStorage for MemoryFileStorage {
    fn upload(&self, path: &str, file: DataUrl) -> Result<String, StorageError> {
        if !file.is_image() {
            return Err(StorageError::UnsupportedMediaType(file.mime.to_string()));
        }

        let path = path.trim_matches('/');
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("storage mutex poisoned".to_string()))?;
        objects.insert(path.to_string(), file);

        Ok(format!("{}/{}/{}", self.public_base_url, self.bucket, path))
    }
}
