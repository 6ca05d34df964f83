//! Client-side work behind a `PUT`
//!
//! Snowflake answers a `PUT` with the stage location, temporary cloud
//! credentials and the stage master key. The client encrypts each file and
//! uploads it itself:
//!
//! - content: AES-CBC with a random per-file key and IV
//! - file key: AES-ECB with the stage master key, stored in `x-amz-key`
//! - IV and key size: `x-amz-iv` and `x-amz-matdesc`
//! - `sfc-digest`: SHA-256 of the plaintext

use crate::client::s3::S3Client;
use crate::error::PlatformError;
use crate::settings::{DEFAULT_AWS_REGION, S3Config};

use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockEncryptMut, KeyInit, KeyIvInit};
use eyre::{Context, Result, eyre};
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

const IV_LEN: usize = 16;

/// Upload instructions returned for a `PUT`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct StageUpload {
    pub src_locations: Vec<String>,
    #[serde(rename = "stageInfo")]
    pub stage_info: Option<StageInfo>,
    #[serde(rename = "encryptionMaterial")]
    pub encryption_material: Option<EncryptionMaterials>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct StageInfo {
    pub location_type: String,
    /// `bucket/prefix/`
    pub location: String,
    pub region: Option<String>,
    pub creds: StageCredentials,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct StageCredentials {
    #[serde(rename = "AWS_KEY_ID")]
    pub key_id: String,
    #[serde(rename = "AWS_SECRET_KEY")]
    pub secret_key: String,
    #[serde(rename = "AWS_TOKEN")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EncryptionMaterial {
    /// Base64 encoded master key
    pub query_stage_master_key: String,
    pub query_id: String,
    pub smk_id: i64,
}

/// A single material for uploads, a list for downloads
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum EncryptionMaterials {
    One(EncryptionMaterial),
    Many(Vec<EncryptionMaterial>),
}

impl EncryptionMaterials {
    pub fn first(&self) -> Option<&EncryptionMaterial> {
        match self {
            Self::One(material) => Some(material),
            Self::Many(materials) => materials.first(),
        }
    }
}

/// A file ready for upload with its encryption metadata
#[derive(Debug)]
pub(super) struct EncryptedFile {
    pub ciphertext: Vec<u8>,
    pub metadata: Vec<(&'static str, String)>,
}

/// Encrypt and upload every source file named in `upload`
pub(super) async fn upload(upload: &StageUpload) -> Result<()> {
    let stage = upload
        .stage_info
        .as_ref()
        .ok_or_else(|| PlatformError::warehouse("stage", "response has no stage information"))?;
    if !stage.location_type.eq_ignore_ascii_case("S3") {
        return Err(PlatformError::warehouse(
            "stage",
            format!("unsupported stage location type '{}'", stage.location_type),
        )
        .into());
    }
    let material = upload
        .encryption_material
        .as_ref()
        .and_then(EncryptionMaterials::first);

    let (bucket, prefix) = split_location(&stage.location);
    let client = S3Client::new(&S3Config {
        bucket: bucket.to_string(),
        access_key_id: stage.creds.key_id.clone(),
        secret_access_key: stage.creds.secret_key.clone(),
        session_token: stage.creds.token.clone(),
        region: stage
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
        endpoint_url: None,
    });

    for source in &upload.src_locations {
        let source = Path::new(source);
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| eyre!("Staged path {} has no file name", source.display()))?;
        let plaintext = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;

        let (body, metadata) = match material {
            Some(material) => {
                let encrypted = encrypt_file(material, &plaintext)?;
                (encrypted.ciphertext, encrypted.metadata)
            }
            None => {
                let digest = digest(&plaintext);
                (plaintext, vec![("sfc-digest", digest)])
            }
        };

        let key = format!("{}{}", prefix, file_name);
        log::debug!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);
        client
            .upload(&key, body, &metadata)
            .await
            .map_err(|e| PlatformError::warehouse("stage", format!("{:#}", e)))?;
    }

    Ok(())
}

/// Split `bucket/prefix/` into the bucket and a prefix ending in `/`
pub(super) fn split_location(location: &str) -> (&str, String) {
    match location.split_once('/') {
        Some((bucket, path)) if !path.is_empty() => {
            let prefix = if path.ends_with('/') {
                path.to_string()
            } else {
                format!("{}/", path)
            };
            (bucket, prefix)
        }
        Some((bucket, _)) => (bucket, String::new()),
        None => (location, String::new()),
    }
}

/// Base64 SHA-256 of `data`
pub(super) fn digest(data: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(data))
}

pub(super) fn encrypt_file(material: &EncryptionMaterial, plaintext: &[u8]) -> Result<EncryptedFile> {
    let master_key = STANDARD
        .decode(&material.query_stage_master_key)
        .context("Stage master key is not valid base64")?;

    let mut rng = rand::thread_rng();
    let mut file_key = vec![0u8; master_key.len()];
    rng.fill_bytes(&mut file_key);
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let ciphertext = encrypt_cbc(&file_key, &iv, plaintext)?;
    let encrypted_key = encrypt_ecb(&master_key, &file_key)?;

    let matdesc = serde_json::json!({
        "queryId": material.query_id,
        "smkId": material.smk_id.to_string(),
        "keySize": (master_key.len() * 8).to_string(),
    });

    Ok(EncryptedFile {
        ciphertext,
        metadata: vec![
            ("x-amz-key", STANDARD.encode(encrypted_key)),
            ("x-amz-iv", STANDARD.encode(iv)),
            ("x-amz-matdesc", matdesc.to_string()),
            ("sfc-digest", digest(plaintext)),
        ],
    })
}

fn invalid_key(len: usize) -> eyre::Report {
    eyre!("Unsupported AES key length: {} bytes", len)
}

fn encrypt_cbc(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let invalid = |_| invalid_key(key.len());
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        len => return Err(invalid_key(len)),
    };
    Ok(ciphertext)
}

fn encrypt_ecb(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let invalid = |_| invalid_key(key.len());
    let ciphertext = match key.len() {
        16 => ecb::Encryptor::<Aes128>::new_from_slice(key)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => ecb::Encryptor::<Aes192>::new_from_slice(key)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => ecb::Encryptor::<Aes256>::new_from_slice(key)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        len => return Err(invalid_key(len)),
    };
    Ok(ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::BlockDecryptMut;

    fn material(key: &[u8]) -> EncryptionMaterial {
        EncryptionMaterial {
            query_stage_master_key: STANDARD.encode(key),
            query_id: "01b2-0000".to_string(),
            smk_id: 42,
        }
    }

    fn metadata<'a>(file: &'a EncryptedFile, name: &str) -> &'a str {
        file.metadata
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .unwrap()
    }

    #[test]
    fn test_encrypted_file_decrypts_with_master_key() {
        let master_key = [7u8; 16];
        let plaintext = b"PAR1 not really parquet but close enough";

        let file = encrypt_file(&material(&master_key), plaintext).unwrap();

        let encrypted_key = STANDARD.decode(metadata(&file, "x-amz-key")).unwrap();
        let file_key = ecb::Decryptor::<Aes128>::new_from_slice(&master_key)
            .unwrap()
            .decrypt_padded_vec_mut::<Pkcs7>(&encrypted_key)
            .unwrap();
        assert_eq!(file_key.len(), 16);

        let iv = STANDARD.decode(metadata(&file, "x-amz-iv")).unwrap();
        let decrypted = cbc::Decryptor::<Aes128>::new_from_slices(&file_key, &iv)
            .unwrap()
            .decrypt_padded_vec_mut::<Pkcs7>(&file.ciphertext)
            .unwrap();
        assert_eq!(decrypted, plaintext);
        assert_ne!(file.ciphertext, plaintext);
    }

    #[test]
    fn test_metadata_describes_key() {
        let file = encrypt_file(&material(&[1u8; 32]), b"data").unwrap();

        let matdesc: serde_json::Value =
            serde_json::from_str(metadata(&file, "x-amz-matdesc")).unwrap();
        assert_eq!(matdesc["queryId"], "01b2-0000");
        assert_eq!(matdesc["smkId"], "42");
        assert_eq!(matdesc["keySize"], "256");
        assert_eq!(metadata(&file, "sfc-digest"), digest(b"data"));
    }

    #[test]
    fn test_rejects_bad_master_key() {
        assert!(encrypt_file(&material(&[1u8; 10]), b"data").is_err());

        let not_base64 = EncryptionMaterial {
            query_stage_master_key: "***".to_string(),
            ..material(&[0u8; 16])
        };
        assert!(encrypt_file(&not_base64, b"data").is_err());
    }

    #[test]
    fn test_split_location() {
        assert_eq!(
            split_location("sfc-stage/tables/42/"),
            ("sfc-stage", "tables/42/".to_string())
        );
        assert_eq!(
            split_location("sfc-stage/tables/42"),
            ("sfc-stage", "tables/42/".to_string())
        );
        assert_eq!(split_location("sfc-stage"), ("sfc-stage", String::new()));
    }

    #[test]
    fn test_material_list_or_single() {
        let one: EncryptionMaterials = serde_json::from_str(
            r#"{"queryStageMasterKey":"AAAA","queryId":"q1","smkId":1}"#,
        )
        .unwrap();
        let many: EncryptionMaterials = serde_json::from_str(
            r#"[{"queryStageMasterKey":"AAAA","queryId":"q2","smkId":2}]"#,
        )
        .unwrap();

        assert_eq!(one.first().unwrap().query_id, "q1");
        assert_eq!(many.first().unwrap().smk_id, 2);
    }
}
