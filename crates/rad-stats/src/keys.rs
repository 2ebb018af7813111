//! Names under which statistics are stored in result packages.

/// Species richness per site.
pub const SPECIES_RICHNESS_PER_SITE: &str = "species-richness-per-site";
/// Richness as a share of all species, per site.
pub const PROPORTIONAL_SPECIES_DIVERSITY: &str = "proportional-species-diversity";
/// Summed range size of the species at a site.
pub const PER_SITE_RANGE_SIZE: &str = "per-site-range-size";
/// Mean range size at a site as a share of occupied sites.
pub const MEAN_PROPORTIONAL_RANGE_SIZE: &str = "mean-proportional-range-size";
/// Number of sites occupied by each species.
pub const RANGE_SIZE_PER_SPECIES: &str = "range-size-per-species";
/// Range size as a share of occupied sites, per species.
pub const PROPORTIONAL_RANGE_SIZE: &str = "proportional-range-size";
/// Summed richness of the sites a species occupies.
pub const RANGE_RICHNESS_OF_SPECIES: &str = "range-richness-of-species";
/// Mean richness over a species' range as a share of all species.
pub const MEAN_PROPORTIONAL_SPECIES_DIVERSITY: &str = "mean-proportional-species-diversity";
/// Site composition covariance matrix.
pub const SIGMA_SITES: &str = "sigma-sites";
/// Species range covariance matrix.
pub const SIGMA_SPECIES: &str = "sigma-species";
/// Mean nearest taxon distance per site.
pub const MNTD: &str = "mntd";
/// Mean pairwise taxon distance per site.
pub const AVERAGE_TAXON_DISTANCE: &str = "average-taxon-distance";
/// Correlation of taxon distance and sites shared, per site.
pub const PEARSON_TD_SITES_SHARED: &str = "pearson-td-sites-shared";
