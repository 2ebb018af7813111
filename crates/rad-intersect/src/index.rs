//! Bounding box index over grid cells.

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use rad_grid::geometry::Envelope;
use rad_grid::ShapeGrid;

type IndexedCell = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree of cell envelopes keyed by site position.
#[derive(Debug)]
pub struct SiteIndex {
    tree: RTree<IndexedCell>,
}

impl SiteIndex {
    /// Bulk loads the envelopes of every site in `grid`.
    pub fn new(grid: &ShapeGrid) -> Self {
        let cells = grid
            .sites
            .iter()
            .enumerate()
            .map(|(position, site)| {
                let env = site.envelope();
                GeomWithData::new(
                    Rectangle::from_corners([env.min_x, env.min_y], [env.max_x, env.max_y]),
                    position,
                )
            })
            .collect();
        Self {
            tree: RTree::bulk_load(cells),
        }
    }

    /// Site positions whose envelopes touch `env`, ascending.
    pub fn candidates(&self, env: &Envelope) -> Vec<usize> {
        let query = AABB::from_corners([env.min_x, env.min_y], [env.max_x, env.max_y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|cell| cell.data)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Number of indexed sites.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True when no site is indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
