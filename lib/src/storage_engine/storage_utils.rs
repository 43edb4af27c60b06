// lib/src/storage_engine/storage_utils.rs

use bincode::{
    config,
    serde::{decode_from_slice, encode_to_vec},
};
use models::errors::{ClinicalError, ClinicalResult};
use models::medical::EntityId;
use serde::{de::DeserializeOwned, Serialize};
use sled::IVec;

/// Helper to serialize a row to bytes using bincode.
pub fn encode_row<R: Serialize>(row: &R) -> ClinicalResult<Vec<u8>> {
    Ok(encode_to_vec(row, config::standard())?)
}

/// Helper to deserialize bytes to a row using bincode.
pub fn decode_row<R: DeserializeOwned>(bytes: &[u8]) -> ClinicalResult<R> {
    decode_from_slice(bytes, config::standard())
        .map(|(row, _)| row) // decode_from_slice returns (value, bytes_read)
        .map_err(ClinicalError::from)
}

/// Big-endian so that tree order equals id order.
pub fn id_key(id: EntityId) -> IVec {
    IVec::from(&id.to_be_bytes()[..])
}

pub fn decode_id(bytes: &[u8]) -> ClinicalResult<EntityId> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ClinicalError::Storage(format!("Corrupt id of {} bytes", bytes.len())))?;
    Ok(EntityId::from_be_bytes(raw))
}

/// Key of the `(organization, employee id)` uniqueness index.
pub fn staff_index_key(organization_id: EntityId, employee_id: &str) -> IVec {
    let mut key = organization_id.to_be_bytes().to_vec();
    key.extend_from_slice(employee_id.as_bytes());
    IVec::from(key)
}

/// Structured sub-fields are kept as JSON documents inside bincode rows.
pub fn to_document<T: Serialize>(value: &Option<T>) -> ClinicalResult<Option<String>> {
    value.as_ref().map(serde_json::to_string).transpose().map_err(ClinicalError::from)
}

pub fn from_document<T: DeserializeOwned>(document: &Option<String>) -> ClinicalResult<Option<T>> {
    document
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(ClinicalError::from)
}
