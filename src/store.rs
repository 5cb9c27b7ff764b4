//! Serialization of trained models to persisted artifacts.
//!
//! The byte-level surface (`to_bytes` / `from_bytes`) is the core contract;
//! the file helpers are thin glue that write atomically via a temp file.

use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::constants::store as consts;
use crate::errors::CodingError;
use crate::model::TrainedModel;

/// Serialize a trained model to its artifact bytes (pretty JSON).
pub fn to_bytes(model: &TrainedModel) -> Result<Vec<u8>, CodingError> {
    serde_json::to_vec_pretty(model)
        .map_err(|err| CodingError::Persistence(format!("serialize model: {err}")))
}

/// Deserialize a trained model from artifact bytes, rejecting unknown
/// format versions.
pub fn from_bytes(bytes: &[u8]) -> Result<TrainedModel, CodingError> {
    let model: TrainedModel = serde_json::from_slice(bytes)
        .map_err(|err| CodingError::Persistence(format!("deserialize model: {err}")))?;
    if model.format_version != consts::MODEL_FORMAT_VERSION {
        return Err(CodingError::Persistence(format!(
            "unsupported model format version {} (expected {})",
            model.format_version,
            consts::MODEL_FORMAT_VERSION
        )));
    }
    Ok(model)
}

/// Save a model artifact to `path`, atomically (write to a temp file in the
/// same directory, then persist over the target).
pub fn save(model: &TrainedModel, path: &Path) -> Result<(), CodingError> {
    let bytes = to_bytes(model)?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    };
    fs::write(tmp.path(), &bytes)?;
    tmp.persist(path)
        .map_err(|err| CodingError::Persistence(format!("persist model artifact: {err}")))?;
    info!(path = %path.display(), bytes = bytes.len(), "model saved");
    Ok(())
}

/// Load a model artifact from `path`.
pub fn load(path: &Path) -> Result<TrainedModel, CodingError> {
    let bytes = fs::read(path)?;
    let model = from_bytes(&bytes)?;
    info!(path = %path.display(), "model loaded");
    Ok(model)
}
