#![deny(missing_docs)]
#![doc = "Diversity statistics for presence-absence matrices: richness and range size per site and species, beta diversity, Schluter covariance ratios and phylogenetic distance summaries."]

pub mod keys;
pub mod stats;
pub mod tree;

pub use stats::{calculate, PamStats, StatisticsSummary, StatsOptions, TreeStats};
pub use tree::{PhyloTree, TreeNode};
