//! Statistics calculator.

use std::collections::BTreeMap;

use log::debug;
use ndarray::{Array1, Array2, ArrayD, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use rad_core::errors::{codes, ErrorInfo, RadError};

use crate::keys;
use crate::tree::PhyloTree;

/// Optional statistics to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsOptions {
    /// Keep the site and species covariance matrices.
    #[serde(default)]
    pub covariance: bool,
    /// Compute the Schluter variance ratios.
    #[serde(default)]
    pub schluter: bool,
}

/// Per-site phylogenetic summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    /// Mean nearest taxon distance.
    pub mntd: Array1<f64>,
    /// Mean pairwise taxon distance.
    pub mpd: Array1<f64>,
    /// Correlation of pairwise taxon distance with the number of shared sites.
    pub pearson: Array1<f64>,
}

/// Scalar results written to the statistics summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    /// Whittaker's beta diversity.
    pub whittaker_beta: f64,
    /// Lande's additive beta diversity.
    pub lande_beta: f64,
    /// Legendre's beta diversity.
    pub legendre_beta: f64,
    /// Schluter variance ratio over site composition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schluter_sites: Option<f64>,
    /// Schluter variance ratio over species ranges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schluter_species: Option<f64>,
}

/// Everything computed for one matrix.
///
/// Undefined quantities (a zero denominator) are NaN rather than errors.
#[derive(Debug, Clone, PartialEq)]
pub struct PamStats {
    /// Sites with at least one species.
    pub num_sites: usize,
    /// Species present at one site or more.
    pub num_species: usize,
    /// Species richness per site.
    pub alpha: Array1<f64>,
    /// Richness over the number of species.
    pub alpha_prop: Array1<f64>,
    /// Summed range size of the species at each site.
    pub phi: Array1<f64>,
    /// `phi` over `num_sites * alpha`.
    pub phi_avg_prop: Array1<f64>,
    /// Range size per species.
    pub omega: Array1<f64>,
    /// Range size over the number of sites.
    pub omega_prop: Array1<f64>,
    /// Summed richness over each species' range.
    pub psi: Array1<f64>,
    /// `psi` over `num_species * omega`.
    pub psi_avg_prop: Array1<f64>,
    /// Scalar diversity summary.
    pub summary: StatisticsSummary,
    /// Site by site covariance, when requested.
    pub sigma_sites: Option<Array2<f64>>,
    /// Species by species covariance, when requested.
    pub sigma_species: Option<Array2<f64>>,
    /// Phylogenetic summaries, when a tree was supplied.
    pub tree: Option<TreeStats>,
}

impl PamStats {
    /// Named arrays in the order they are packaged.
    pub fn arrays(&self) -> BTreeMap<&'static str, ArrayD<f64>> {
        let mut out = BTreeMap::new();
        let vectors = [
            (keys::SPECIES_RICHNESS_PER_SITE, &self.alpha),
            (keys::PROPORTIONAL_SPECIES_DIVERSITY, &self.alpha_prop),
            (keys::PER_SITE_RANGE_SIZE, &self.phi),
            (keys::MEAN_PROPORTIONAL_RANGE_SIZE, &self.phi_avg_prop),
            (keys::RANGE_SIZE_PER_SPECIES, &self.omega),
            (keys::PROPORTIONAL_RANGE_SIZE, &self.omega_prop),
            (keys::RANGE_RICHNESS_OF_SPECIES, &self.psi),
            (keys::MEAN_PROPORTIONAL_SPECIES_DIVERSITY, &self.psi_avg_prop),
        ];
        for (name, values) in vectors {
            out.insert(name, values.clone().into_dyn());
        }
        if let Some(sigma) = &self.sigma_sites {
            out.insert(keys::SIGMA_SITES, sigma.clone().into_dyn());
        }
        if let Some(sigma) = &self.sigma_species {
            out.insert(keys::SIGMA_SPECIES, sigma.clone().into_dyn());
        }
        if let Some(tree) = &self.tree {
            out.insert(keys::MNTD, tree.mntd.clone().into_dyn());
            out.insert(keys::AVERAGE_TAXON_DISTANCE, tree.mpd.clone().into_dyn());
            out.insert(keys::PEARSON_TD_SITES_SHARED, tree.pearson.clone().into_dyn());
        }
        out
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Computes diversity statistics for a sites by species matrix.
pub fn calculate(
    pam: &Array2<bool>,
    tree: Option<&PhyloTree>,
    options: &StatsOptions,
) -> Result<PamStats, RadError> {
    let (sites, species) = pam.dim();
    if sites == 0 || species == 0 {
        return Err(RadError::Configuration(
            ErrorInfo::new(codes::CALCULATE_INPUT, "statistics need a non-empty matrix")
                .with_context("shape", format!("{sites}x{species}")),
        ));
    }
    let p: Array2<f64> = pam.mapv(|present| if present { 1.0 } else { 0.0 });

    let alpha = p.sum_axis(Axis(1));
    let omega = p.sum_axis(Axis(0));
    let num_sites = alpha.iter().filter(|v| **v > 0.0).count();
    let num_species = omega.iter().filter(|v| **v > 0.0).count();
    let n_sites = num_sites as f64;
    let n_species = num_species as f64;

    let alpha_prop = alpha.mapv(|a| ratio(a, n_species));
    let omega_prop = omega.mapv(|w| ratio(w, n_sites));
    let phi = p.dot(&omega);
    let psi = alpha.dot(&p);
    let phi_avg_prop = Array1::from_iter(
        phi.iter()
            .zip(alpha.iter())
            .map(|(phi, alpha)| ratio(*phi, n_sites * alpha)),
    );
    let psi_avg_prop = Array1::from_iter(
        psi.iter()
            .zip(omega.iter())
            .map(|(psi, omega)| ratio(*psi, n_species * omega)),
    );

    let omega_prop_sum = omega_prop.iter().filter(|v| v.is_finite()).sum::<f64>();
    let omega_sum = omega.sum();
    let omega_sq_sum = omega.mapv(|w| w * w).sum();
    let mut summary = StatisticsSummary {
        whittaker_beta: ratio(n_species, omega_prop_sum),
        lande_beta: n_species - omega_prop_sum,
        legendre_beta: omega_sum - ratio(omega_sq_sum, n_sites),
        schluter_sites: None,
        schluter_species: None,
    };

    let (mut sigma_sites, mut sigma_species) = (None, None);
    if options.covariance || options.schluter {
        let site_cov = p.dot(&p.t()).mapv(|v| ratio(v, n_species)) - outer(&alpha_prop);
        let species_cov = p.t().dot(&p).mapv(|v| ratio(v, n_sites)) - outer(&omega_prop);
        if options.schluter {
            summary.schluter_sites = Some(ratio(site_cov.sum(), site_cov.diag().sum()));
            summary.schluter_species = Some(ratio(species_cov.sum(), species_cov.diag().sum()));
        }
        if options.covariance {
            sigma_sites = Some(site_cov);
            sigma_species = Some(species_cov);
        }
    }

    let tree = tree.map(|tree| tree_stats(&p, &tree.distance_matrix(species)));
    debug!(sites = num_sites, species = num_species, tree = tree.is_some(); "calculated statistics");

    Ok(PamStats {
        num_sites,
        num_species,
        alpha,
        alpha_prop,
        phi,
        phi_avg_prop,
        omega,
        omega_prop,
        psi,
        psi_avg_prop,
        summary,
        sigma_sites,
        sigma_species,
        tree,
    })
}

fn outer(v: &Array1<f64>) -> Array2<f64> {
    let n = v.len();
    Array2::from_shape_fn((n, n), |(i, j)| v[i] * v[j])
}

fn tree_stats(p: &Array2<f64>, distances: &Array2<f64>) -> TreeStats {
    let shared = p.t().dot(p);
    let per_site: Vec<(f64, f64, f64)> = (0..p.nrows())
        .into_par_iter()
        .map(|site| {
            let present: Vec<usize> = p
                .row(site)
                .iter()
                .enumerate()
                .filter_map(|(idx, v)| (*v > 0.0).then_some(idx))
                .collect();
            site_tree_stats(&present, distances, &shared)
        })
        .collect();

    TreeStats {
        mntd: per_site.iter().map(|s| s.0).collect(),
        mpd: per_site.iter().map(|s| s.1).collect(),
        pearson: per_site.iter().map(|s| s.2).collect(),
    }
}

fn site_tree_stats(present: &[usize], distances: &Array2<f64>, shared: &Array2<f64>) -> (f64, f64, f64) {
    let mut nearest = Vec::with_capacity(present.len());
    for &a in present {
        let closest = present
            .iter()
            .filter(|b| **b != a)
            .map(|b| distances[[a, *b]])
            .filter(|d| d.is_finite())
            .fold(f64::INFINITY, f64::min);
        if closest.is_finite() {
            nearest.push(closest);
        }
    }
    let mntd = if nearest.len() < 2 {
        f64::NAN
    } else {
        nearest.iter().sum::<f64>() / nearest.len() as f64
    };

    let mut pair_distances = Vec::new();
    let mut pair_shared = Vec::new();
    for (i, &a) in present.iter().enumerate() {
        for &b in &present[i + 1..] {
            let d = distances[[a, b]];
            if d.is_finite() {
                pair_distances.push(d);
                pair_shared.push(shared[[a, b]]);
            }
        }
    }
    let mpd = ratio(pair_distances.iter().sum(), pair_distances.len() as f64);
    let pearson = if pair_distances.len() < 2 {
        f64::NAN
    } else {
        pearson(&pair_distances, &pair_shared)
    };
    (mntd, mpd, pearson)
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }
    ratio(cov, (var_x * var_y).sqrt())
}
