//! Shared fixtures for kiln-runtime integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex, OnceLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use zip::write::SimpleFileOptions;

use kiln_isolation::{HostScope, IsolatedLoader, ParentScope, UnitRef};
use kiln_runtime::{digest_bytes, Fetch, ProviderFactories, RuntimeError};
use kiln_types::{Artifact, KilnError, Manifest, Provider, ProviderConfig, Service};

pub const MANIFEST_URL: &str = "https://x/manifest.json";

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// In-memory `Fetch` that counts requests per URL and answers 404 for
/// unknown URLs.
#[derive(Default)]
pub struct FakeFetcher {
    routes: Mutex<HashMap<String, Vec<u8>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .expect("routes")
            .insert(url.to_string(), body.into());
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().expect("hits").get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().expect("hits").values().sum()
    }
}

impl Fetch for FakeFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, RuntimeError> {
        *self
            .hits
            .lock()
            .expect("hits")
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.routes
            .lock()
            .expect("routes")
            .get(url)
            .cloned()
            .ok_or_else(|| RuntimeError::http_status(url, 404))
    }
}

// ---------------------------------------------------------------------------
// Artifacts and manifests
// ---------------------------------------------------------------------------

/// Builds zip bytes holding the given `(entry, content)` pairs.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zw = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        zw.start_file(*name, options).expect("start entry");
        zw.write_all(content.as_bytes()).expect("write entry");
    }
    zw.finish().expect("finish").into_inner()
}

/// Artifact registering one provider implementation `<module>::Impl` whose
/// unit declares `id = <id>`.
pub fn provider_artifact(module: &str, id: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let registration = format!("{module}::Impl\n");
    let unit_path = format!("{module}/Impl");
    let unit = format!("id = {id}\n");
    let mut entries = vec![
        ("kiln-providers/kiln_types::Provider", registration.as_str()),
        (unit_path.as_str(), unit.as_str()),
    ];
    entries.extend_from_slice(extra);
    zip_bytes(&entries)
}

pub fn artifact(file_name: &str, bytes: &[u8]) -> Artifact {
    Artifact {
        file_name: file_name.into(),
        url: format!("https://x/{file_name}"),
        sha256: digest_bytes(bytes),
        size: Some(bytes.len() as u64),
    }
}

pub fn manifest(id: &str, version: &str, artifacts: Vec<Artifact>) -> Manifest {
    Manifest {
        id: id.into(),
        version: version.into(),
        artifacts,
        signature_base64: None,
        fingerprint: None,
    }
}

/// Serves `manifest` at `url` and each `(artifact, bytes)` at its URL.
pub fn publish(fetcher: &FakeFetcher, url: &str, manifest: &Manifest, files: &[(&Artifact, &[u8])]) {
    fetcher.serve(url, serde_json::to_vec(manifest).expect("serialize manifest"));
    for (artifact, bytes) in files {
        fetcher.serve(&artifact.url, bytes.to_vec());
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

fn keys() -> &'static (RsaPrivateKey, RsaPrivateKey) {
    static KEYS: OnceLock<(RsaPrivateKey, RsaPrivateKey)> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (
            RsaPrivateKey::new(&mut rng, 1024).expect("keygen"),
            RsaPrivateKey::new(&mut rng, 1024).expect("keygen"),
        )
    })
}

fn public_b64(key: &RsaPrivateKey) -> String {
    let der = key
        .to_public_key()
        .to_public_key_der()
        .expect("encode public key");
    STANDARD.encode(der.as_bytes())
}

/// Base64 SPKI of the publisher key.
pub fn public_key_b64() -> String {
    public_b64(&keys().0)
}

/// Base64 SPKI of an unrelated key.
pub fn other_public_key_b64() -> String {
    public_b64(&keys().1)
}

/// Signs `payload` with the publisher key and returns the base64 signature.
pub fn sign(payload: &str) -> String {
    let signing = SigningKey::<Sha256>::new(keys().0.clone());
    STANDARD.encode(signing.sign(payload.as_bytes()).to_bytes())
}

/// Signs the manifest's recomputed fingerprint.
pub fn signed(mut manifest: Manifest) -> Manifest {
    let fp = kiln_runtime::fingerprint::compute(&manifest);
    manifest.signature_base64 = Some(sign(&fp));
    manifest
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub struct DemoProvider {
    id: String,
}

impl Provider for DemoProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn Service>, KilnError> {
        if config.setting("fail").is_some() {
            return Err(KilnError::invalid_input("refused by configuration"));
        }
        Ok(Box::new(DemoService {
            provider_id: self.id.clone(),
            closed: false,
        }))
    }
}

pub struct DemoService {
    provider_id: String,
    closed: bool,
}

impl Service for DemoService {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn close(&mut self) -> Result<(), KilnError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Builds a provider whose id is read from its unit (`id = ...`).
pub fn unit_provider(
    unit: &UnitRef,
    _loader: &Arc<IsolatedLoader>,
) -> Result<Arc<dyn Provider>, KilnError> {
    let text = unit
        .text()
        .map_err(|e| KilnError::invalid_input(e.to_string()))?;
    let id = text
        .lines()
        .find_map(|l| l.trim().strip_prefix("id = "))
        .ok_or_else(|| KilnError::invalid_input(format!("no id in {}", unit.name())))?;
    Ok(Arc::new(DemoProvider { id: id.to_string() }))
}

/// Factories for every `<module>::Impl` given.
pub fn factories(modules: &[&str]) -> ProviderFactories {
    let mut table = ProviderFactories::new();
    for module in modules {
        table.register(format!("{module}::Impl"), unit_provider);
    }
    table
}

pub fn host() -> Arc<dyn ParentScope> {
    Arc::new(
        HostScope::new()
            .with_unit("kiln_types::Provider", b"host contract".to_vec())
            .with_unit("acme::json::Value", b"host json 0.9".to_vec()),
    )
}
