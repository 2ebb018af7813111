//! Job request payload sent from the coordinator to a compute host.
//!
//! A request carries references to its inputs, never the data itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};
use rad_core::serde::{from_json_slice, read_json_file, to_canonical_json_bytes, write_json_file};
use rad_core::stable_hash_string;
use rad_grid::GridSpec;
use rad_intersect::IntersectParams;

use crate::status::JobStage;

/// Identifier of a scheduled job.
pub type JobId = u64;

/// One layer to intersect, stored at `path`, landing in matrix column `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRef {
    /// Matrix column.
    pub index: usize,
    /// Layer document.
    pub path: PathBuf,
    /// How the layer is intersected.
    pub params: IntersectParams,
}

/// Locations of the inputs a stage reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobInputs {
    /// Shapegrid document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapegrid: Option<PathBuf>,
    /// Layers to intersect.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerRef>,
    /// Matrix file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<PathBuf>,
    /// Sites kept by compression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites_present: Option<PathBuf>,
    /// Layers kept by compression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers_present: Option<PathBuf>,
    /// Phylogenetic tree document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<PathBuf>,
}

/// Stage specific parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobParameters {
    /// Accepted swaps requested from the swap randomizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_swaps: Option<usize>,
    /// Master seed for randomization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Compute Schluter variance ratios.
    #[serde(default)]
    pub do_schluter: bool,
    /// Keep covariance matrices.
    #[serde(default)]
    pub do_covariance: bool,
    /// Grid to build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_grid: Option<GridSpec>,
}

/// Where the result package goes once built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Delivery {
    /// Hand the package back to the caller.
    #[default]
    Return,
    /// Write the package to a file.
    File {
        /// Destination of the zip archive.
        path: PathBuf,
    },
}

/// Post-processing directives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostProcessing {
    /// Package destination.
    #[serde(default)]
    pub deliver: Delivery,
}

/// A complete job request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Job the request belongs to.
    pub job_id: JobId,
    /// Stage to run.
    pub stage: JobStage,
    /// Input references.
    #[serde(default)]
    pub inputs: JobInputs,
    /// Stage parameters.
    #[serde(default)]
    pub parameters: JobParameters,
    /// What to do with the result.
    #[serde(default)]
    pub post_processing: PostProcessing,
}

impl JobRequest {
    /// Creates a request with empty inputs and default parameters.
    pub fn new(job_id: JobId, stage: JobStage) -> Self {
        Self {
            job_id,
            stage,
            inputs: JobInputs::default(),
            parameters: JobParameters::default(),
            post_processing: PostProcessing::default(),
        }
    }

    /// Checks that the inputs the stage reads are named.
    pub fn validate(&self) -> Result<(), RadError> {
        let missing = |field: &str| {
            Err(RadError::Configuration(
                ErrorInfo::new(codes::REQUEST_INVALID, "request lacks a required input")
                    .with_context("stage", self.stage.component())
                    .with_context("field", field)
                    .with_context("job_id", self.job_id.to_string()),
            ))
        };
        let inputs = &self.inputs;
        match self.stage {
            JobStage::BuildGrid => {
                if self.parameters.build_grid.is_none() {
                    return missing("parameters.build_grid");
                }
            }
            JobStage::Intersect => {
                if inputs.shapegrid.is_none() {
                    return missing("inputs.shapegrid");
                }
                if inputs.layers.is_empty() {
                    return Err(RadError::Intersection(
                        ErrorInfo::new(codes::INTERSECT_ZERO_LAYERS, "intersect request names no layers")
                            .with_context("job_id", self.job_id.to_string()),
                    ));
                }
            }
            JobStage::Compress | JobStage::Swap | JobStage::Grady => {
                if inputs.matrix.is_none() {
                    return missing("inputs.matrix");
                }
            }
            JobStage::Splotch => {
                if inputs.matrix.is_none() {
                    return missing("inputs.matrix");
                }
                if inputs.shapegrid.is_none() {
                    return missing("inputs.shapegrid");
                }
                if inputs.sites_present.is_some() != inputs.layers_present.is_some() {
                    return missing("inputs.sites_present and inputs.layers_present");
                }
            }
            JobStage::Calculate => {
                if inputs.matrix.is_none() {
                    return missing("inputs.matrix");
                }
                if inputs.sites_present.is_some() != inputs.layers_present.is_some() {
                    return missing("inputs.sites_present and inputs.layers_present");
                }
            }
        }
        Ok(())
    }

    /// Canonical JSON encoding with sorted keys.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RadError> {
        to_canonical_json_bytes(self)
    }

    /// Decodes a request from JSON.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, RadError> {
        from_json_slice(bytes)
    }

    /// Content hash of the canonical encoding.
    pub fn digest(&self) -> Result<String, RadError> {
        stable_hash_string(self)
    }

    /// Writes the request as JSON.
    pub fn write(&self, path: &Path) -> Result<(), RadError> {
        write_json_file(path, self)
    }

    /// Reads a request from a JSON file.
    pub fn read(path: &Path) -> Result<Self, RadError> {
        read_json_file(path)
    }
}
