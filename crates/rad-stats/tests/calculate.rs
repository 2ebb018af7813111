use ndarray::array;
use proptest::prelude::*;
use rad_stats::{calculate, keys, PhyloTree, StatsOptions, TreeNode};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

fn tip(name: &str, length: f64, column: usize) -> TreeNode {
    TreeNode {
        name: Some(name.into()),
        length,
        matrix_index: Some(column),
        children: Vec::new(),
    }
}

/// ((A:1,B:1):1,C:2); A-B = 2, A-C = B-C = 4.
fn tree() -> PhyloTree {
    PhyloTree {
        root: TreeNode {
            children: vec![
                TreeNode {
                    length: 1.0,
                    children: vec![tip("A", 1.0, 0), tip("B", 1.0, 1)],
                    ..TreeNode::default()
                },
                tip("C", 2.0, 2),
            ],
            ..TreeNode::default()
        },
    }
}

#[test]
fn range_and_richness_statistics() {
    let pam = array![
        [true, true, false],
        [true, false, false],
        [false, true, true],
        [false, false, false],
    ];
    let stats = calculate(&pam, None, &StatsOptions::default()).unwrap();
    assert_eq!(stats.num_sites, 3);
    assert_eq!(stats.num_species, 3);
    assert_eq!(stats.alpha.to_vec(), vec![2.0, 1.0, 2.0, 0.0]);
    assert_eq!(stats.omega.to_vec(), vec![2.0, 2.0, 1.0]);
    assert_eq!(stats.phi.to_vec(), vec![4.0, 2.0, 3.0, 0.0]);
    assert_eq!(stats.psi.to_vec(), vec![3.0, 4.0, 2.0]);
    assert!(close(stats.phi_avg_prop[0], 4.0 / 6.0));
    assert!(stats.phi_avg_prop[3].is_nan(), "empty site has no defined average");
    assert!(close(stats.psi_avg_prop[1], 4.0 / 6.0));
    assert!(close(stats.summary.whittaker_beta, 1.8));
    assert!(close(stats.summary.lande_beta, 4.0 / 3.0));
    assert!(close(stats.summary.legendre_beta, 2.0));
    assert!(stats.summary.schluter_species.is_none());
    assert!(stats.sigma_sites.is_none());
    assert!(stats.tree.is_none());
}

#[test]
fn schluter_ratio_and_covariance() {
    let pam = array![
        [true, true, false],
        [true, false, false],
        [false, true, true],
        [false, false, false],
    ];
    let options = StatsOptions {
        covariance: true,
        schluter: true,
    };
    let stats = calculate(&pam, None, &options).unwrap();
    assert!(close(stats.summary.schluter_species.unwrap(), 1.0 / 3.0));
    let sigma_species = stats.sigma_species.as_ref().unwrap();
    assert!(close(sigma_species[[0, 1]], -1.0 / 9.0));
    assert_eq!(stats.sigma_sites.as_ref().unwrap().dim(), (4, 4));

    let arrays = stats.arrays();
    assert!(arrays.contains_key(keys::SIGMA_SITES));
    assert_eq!(arrays[keys::SPECIES_RICHNESS_PER_SITE].shape(), &[4]);
    assert_eq!(arrays[keys::SIGMA_SPECIES].shape(), &[3, 3]);
}

#[test]
fn phylogenetic_distances_per_site() {
    let pam = array![[true, true, true], [true, true, false], [false, true, true], [true, false, false]];
    let stats = calculate(&pam, Some(&tree()), &StatsOptions::default()).unwrap();
    let tree_stats = stats.tree.unwrap();

    assert!(close(tree_stats.mntd[0], 8.0 / 3.0));
    assert!(close(tree_stats.mpd[0], 10.0 / 3.0));
    // Shared sites: A-B 2, A-C 1, B-C 2.
    assert!(close(tree_stats.pearson[0], -0.5));

    assert!(close(tree_stats.mntd[1], 2.0));
    assert!(tree_stats.pearson[1].is_nan(), "a single pair has no correlation");
    assert!(close(tree_stats.mpd[2], 4.0));
    assert!(tree_stats.mntd[3].is_nan());
    assert!(tree_stats.mpd[3].is_nan());
}

#[test]
fn tree_distance_matrix_marks_missing_species() {
    let distances = tree().distance_matrix(4);
    assert_eq!(distances[[0, 1]], 2.0);
    assert_eq!(distances[[2, 0]], 4.0);
    assert_eq!(distances[[1, 1]], 0.0);
    assert!(distances[[3, 0]].is_nan());
}

#[test]
fn tree_reads_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.json");
    std::fs::write(&path, serde_json::to_vec(&tree()).unwrap()).unwrap();
    let loaded = PhyloTree::read(&path).unwrap();
    assert_eq!(loaded, tree());
}

#[test]
fn empty_matrix_is_rejected() {
    let pam = ndarray::Array2::from_elem((0, 3), false);
    let err = calculate(&pam, None, &StatsOptions::default()).unwrap_err();
    assert_eq!(err.code(), rad_core::errors::codes::CALCULATE_INPUT);
}

proptest! {
    #[test]
    fn marginal_sums_agree(cells in prop::collection::vec(any::<bool>(), 12)) {
        let pam = ndarray::Array2::from_shape_vec((4, 3), cells).unwrap();
        let stats = calculate(&pam, None, &StatsOptions::default()).unwrap();
        prop_assert_eq!(stats.alpha.sum(), stats.omega.sum());
        prop_assert_eq!(stats.phi.sum(), stats.omega.mapv(|w| w * w).sum());
        prop_assert_eq!(stats.psi.sum(), stats.alpha.mapv(|a| a * a).sum());
    }
}
