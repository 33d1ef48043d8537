//! S3-compatible object store client
//!
//! Talks to any SigV4 bucket endpoint (AWS S3, MinIO, ...) over plain HTTP
//! using path-style addressing. Requests are header-signed; draft-upload
//! grants are SigV4 query-presigned PUT URLs scoped to a single key.
//!
//! The client holds its configuration (endpoint, bucket, region, credentials)
//! explicitly; nothing is read from the process environment at call time.

use crate::store::{ObjectMeta, ObjectStore};
use crate::types::{ImprintError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Credentials for SigV4 signing
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// S3-compatible object store over reqwest
pub struct S3Store {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    bucket: String,
    region: String,
    credentials: Credentials,
}

impl S3Store {
    /// Build a store for one bucket at an S3-compatible endpoint.
    /// `endpoint` must carry scheme and host, without a trailing slash.
    pub fn new(
        endpoint: &str,
        bucket: &str,
        region: &str,
        credentials: Credentials,
    ) -> Result<Self> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ImprintError::Config(format!("invalid store endpoint: {e}")))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(ImprintError::Config(
                    "store endpoint has no host".to_string(),
                ))
            }
        };

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
            bucket: bucket.to_string(),
            region: region.to_string(),
            credentials,
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!("/{}/{}", self.bucket, key)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}{}", self.endpoint, self.object_path(key))
    }

    /// Sign a request with SigV4 header auth and return the headers to attach.
    fn sign_headers(
        &self,
        method: &str,
        key: &str,
        extra_headers: &BTreeMap<String, String>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);

        let mut headers: BTreeMap<String, String> = extra_headers.clone();
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.to_string());
        headers.insert("x-amz-date".to_string(), amz_date.clone());

        let signed_header_names = headers
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{}\n", v.trim()))
            .collect();

        let canonical_request = format!(
            "{method}\n{}\n\n{canonical_headers}\n{signed_header_names}\n{payload_hash}",
            canonical_uri(&self.object_path(key)),
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = hex::encode(hmac_sha256(
            &signing_key(
                &self.credentials.secret_access_key,
                &date,
                &self.region,
                SERVICE,
            ),
            string_to_sign.as_bytes(),
        ));

        headers.insert(
            "authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
                self.credentials.access_key_id
            ),
        );
        headers
    }

    /// Presigned PUT URL for one key, valid for `expires_in` from `now`.
    /// Only the host header is signed, so the uploader is free to attach
    /// content-type and cache-control as instructed by the grant issuer.
    fn presigned_put_url_at(&self, key: &str, expires_in: Duration, now: DateTime<Utc>) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);
        let credential = format!("{}/{scope}", self.credentials.access_key_id);

        let mut query: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
            ("X-Amz-Credential".to_string(), credential),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            ("X-Amz-Expires".to_string(), expires_in.as_secs().to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        query.sort();
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "PUT\n{}\n{canonical_query}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            canonical_uri(&self.object_path(key)),
            self.host,
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = hex::encode(hmac_sha256(
            &signing_key(
                &self.credentials.secret_access_key,
                &date,
                &self.region,
                SERVICE,
            ),
            string_to_sign.as_bytes(),
        ));

        format!(
            "{}?{canonical_query}&X-Amz-Signature={signature}",
            self.object_url(key)
        )
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let headers = self.sign_headers(
            "GET",
            key,
            &BTreeMap::new(),
            EMPTY_PAYLOAD_SHA256,
            Utc::now(),
        );

        let mut req = self.http.get(self.object_url(key));
        for (k, v) in &headers {
            req = req.header(k, v);
        }
        let resp = req.send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(ImprintError::Store(format!(
                "GET {key} returned {}",
                resp.status()
            )));
        }
        Ok(Some(resp.bytes().await?))
    }

    async fn put(&self, key: &str, body: Bytes, meta: &ObjectMeta) -> Result<()> {
        let payload_hash = sha256_hex(&body);
        let mut extra = BTreeMap::new();
        extra.insert("cache-control".to_string(), meta.cache_control.clone());
        extra.insert("content-type".to_string(), meta.content_type.clone());
        let headers = self.sign_headers("PUT", key, &extra, &payload_hash, Utc::now());

        let mut req = self.http.put(self.object_url(key)).body(body);
        for (k, v) in &headers {
            req = req.header(k, v);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            return Err(ImprintError::Store(format!(
                "PUT {key} returned {}",
                resp.status()
            )));
        }
        debug!(key = %key, "object stored");
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str, meta: &ObjectMeta) -> Result<()> {
        let mut extra = BTreeMap::new();
        extra.insert("cache-control".to_string(), meta.cache_control.clone());
        extra.insert("content-type".to_string(), meta.content_type.clone());
        extra.insert(
            "x-amz-copy-source".to_string(),
            uri_encode(&self.object_path(src), false),
        );
        extra.insert(
            "x-amz-metadata-directive".to_string(),
            "REPLACE".to_string(),
        );
        let headers = self.sign_headers("PUT", dst, &extra, EMPTY_PAYLOAD_SHA256, Utc::now());

        let mut req = self.http.put(self.object_url(dst));
        for (k, v) in &headers {
            req = req.header(k, v);
        }
        let resp = req.send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ImprintError::NotFound(format!("copy source {src}")));
        }
        if !resp.status().is_success() {
            return Err(ImprintError::Store(format!(
                "COPY {src} -> {dst} returned {}",
                resp.status()
            )));
        }
        // S3 can report copy failures inside a 200 body
        let body = resp.text().await?;
        if body.contains("<Error>") {
            return Err(ImprintError::Store(format!(
                "COPY {src} -> {dst} failed: {body}"
            )));
        }
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        _meta: &ObjectMeta,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(self.presigned_put_url_at(key, expires_in, Utc::now()))
    }

    fn public_url(&self, key: &str) -> String {
        self.object_url(key)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// SigV4 canonical URI: each path segment percent-encoded, slashes kept
fn canonical_uri(path: &str) -> String {
    uri_encode(path, false)
}

/// AWS-flavored percent encoding. Unreserved characters pass through;
/// everything else becomes uppercase %XX. Slashes survive in URI mode.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
