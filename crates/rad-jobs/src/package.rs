//! Zip result packages returned by compute hosts.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::hash::digest_hex;
use rad_core::serde::{from_json_slice, to_canonical_json_bytes};

use crate::request::JobId;

/// Archive member describing the package.
pub const MANIFEST_MEMBER: &str = "manifest.json";

fn package_error(code: &str, err: impl ToString) -> RadError {
    RadError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Manifest stored alongside the members of every package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Component that produced the package.
    pub component: String,
    /// Job the package answers.
    pub job_id: JobId,
    /// SHA256 digest of every member, keyed by member name.
    pub members: BTreeMap<String, String>,
}

/// Named binary members plus the declared component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPackage {
    /// Declared component name.
    pub component: String,
    /// Job the package answers.
    pub job_id: JobId,
    members: BTreeMap<String, Vec<u8>>,
}

impl ResultPackage {
    /// Creates an empty package.
    pub fn new(component: impl Into<String>, job_id: JobId) -> Self {
        Self {
            component: component.into(),
            job_id,
            members: BTreeMap::new(),
        }
    }

    /// Adds or replaces a member.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.members.insert(name.into(), bytes);
    }

    /// Builder form of [`ResultPackage::insert`].
    pub fn with_member(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Returns a member when present.
    pub fn member(&self, name: &str) -> Option<&[u8]> {
        self.members.get(name).map(Vec::as_slice)
    }

    /// Returns a member or a [`codes::PACKAGE_MEMBER_MISSING`] error.
    pub fn require(&self, name: &str) -> Result<&[u8], RadError> {
        self.member(name).ok_or_else(|| {
            RadError::Io(
                ErrorInfo::new(codes::PACKAGE_MEMBER_MISSING, "result package lacks a member")
                    .with_context("member", name)
                    .with_context("component", self.component.as_str()),
            )
        })
    }

    /// Member names in sorted order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Manifest describing the current members.
    pub fn manifest(&self) -> PackageManifest {
        PackageManifest {
            component: self.component.clone(),
            job_id: self.job_id,
            members: self
                .members
                .iter()
                .map(|(name, bytes)| (name.clone(), digest_hex(bytes)))
                .collect(),
        }
    }

    /// Encodes the package as a deflated zip archive.
    pub fn to_zip_bytes(&self) -> Result<Vec<u8>, RadError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let manifest = to_canonical_json_bytes(&self.manifest())?;
        let entries = std::iter::once((MANIFEST_MEMBER, manifest.as_slice()))
            .chain(self.members.iter().map(|(name, bytes)| (name.as_str(), bytes.as_slice())));
        for (name, bytes) in entries {
            zip.start_file(name, options)
                .map_err(|err| package_error(codes::PACKAGE_WRITE, err))?;
            zip.write_all(bytes)
                .map_err(|err| package_error(codes::PACKAGE_WRITE, err))?;
        }
        let cursor = zip
            .finish()
            .map_err(|err| package_error(codes::PACKAGE_WRITE, err))?;
        Ok(cursor.into_inner())
    }

    /// Decodes a zip archive and checks every member against the manifest.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self, RadError> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|err| package_error(codes::PACKAGE_READ, err))?;
        let mut members = BTreeMap::new();
        for idx in 0..archive.len() {
            let mut file = archive
                .by_index(idx)
                .map_err(|err| package_error(codes::PACKAGE_READ, err))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)
                .map_err(|err| package_error(codes::PACKAGE_READ, err))?;
            members.insert(name, content);
        }

        let manifest_bytes = members.remove(MANIFEST_MEMBER).ok_or_else(|| {
            RadError::Io(
                ErrorInfo::new(codes::PACKAGE_MEMBER_MISSING, "result package lacks a manifest")
                    .with_context("member", MANIFEST_MEMBER),
            )
        })?;
        let manifest: PackageManifest = from_json_slice(&manifest_bytes)?;
        for (name, expected) in &manifest.members {
            let actual = members.get(name).map(|bytes| digest_hex(bytes));
            if actual.as_deref() != Some(expected.as_str()) {
                return Err(RadError::Io(
                    ErrorInfo::new(codes::PACKAGE_DIGEST_MISMATCH, "member does not match the manifest")
                        .with_context("member", name.as_str())
                        .with_context("expected", expected.as_str())
                        .with_context("actual", actual.unwrap_or_else(|| "missing".to_string())),
                ));
            }
        }
        debug!(component = manifest.component.as_str(), job_id = manifest.job_id, members = members.len(); "read result package");
        Ok(Self {
            component: manifest.component,
            job_id: manifest.job_id,
            members,
        })
    }

    /// Writes the archive to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), RadError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| package_error(codes::PACKAGE_WRITE, err))?;
            }
        }
        let bytes = self.to_zip_bytes()?;
        fs::write(path, bytes).map_err(|err| {
            RadError::Io(
                ErrorInfo::new(codes::PACKAGE_WRITE, err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Reads an archive from `path`.
    pub fn read(path: &Path) -> Result<Self, RadError> {
        let bytes = fs::read(path).map_err(|err| {
            RadError::Io(
                ErrorInfo::new(codes::PACKAGE_READ, err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_zip_bytes(&bytes)
    }
}
