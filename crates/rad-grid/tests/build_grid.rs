use rad_core::errors::codes;
use rad_grid::{build_shapegrid, AdjacencyGraph, BBox, CellShape, GridSpec};
use proptest::prelude::*;

fn square_spec(max: f64, cell: f64) -> GridSpec {
    GridSpec::new(BBox::new(0.0, 0.0, max, max), cell, 4)
}

#[test]
fn two_by_two_square_grid_scans_from_the_top_left() {
    let grid = build_shapegrid(&square_spec(10.0, 5.0)).unwrap();
    assert_eq!(grid.shape, CellShape::Square);
    let centroids: Vec<_> = grid.sites.iter().map(|s| s.centroid).collect();
    assert_eq!(
        centroids,
        vec![[2.5, 7.5], [7.5, 7.5], [2.5, 2.5], [7.5, 2.5]]
    );
    let ids: Vec<_> = grid.sites.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    for site in &grid.sites {
        assert!((site.area() - 25.0).abs() < 1e-12);
    }
}

#[test]
fn unsupported_side_count_is_rejected() {
    let mut spec = square_spec(10.0, 5.0);
    spec.cell_sides = 5;
    let err = build_shapegrid(&spec).unwrap_err();
    assert_eq!(err.code(), codes::SHAPEGRID_INVALID_PARAMETERS);
}

#[test]
fn extent_smaller_than_a_cell_is_rejected() {
    let err = build_shapegrid(&square_spec(4.0, 5.0)).unwrap_err();
    assert_eq!(err.code(), codes::SHAPEGRID_INVALID_PARAMETERS);
    assert!(err.info().hint.is_some());
}

#[test]
fn cutout_keeps_overlapping_cells_without_renumbering() {
    let mut spec = square_spec(10.0, 5.0);
    spec.cutout = Some(vec![[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
    let grid = build_shapegrid(&spec).unwrap();
    assert_eq!(grid.site_count(), 1);
    assert_eq!(grid.sites[0].id, 2);
    assert_eq!(grid.sites[0].centroid, [2.5, 2.5]);
}

#[test]
fn cutout_outside_the_grid_yields_no_cells() {
    let mut spec = square_spec(10.0, 5.0);
    spec.cutout = Some(vec![[20.0, 20.0], [30.0, 20.0], [20.0, 30.0]]);
    let err = build_shapegrid(&spec).unwrap_err();
    assert_eq!(err.code(), codes::SHAPEGRID_NO_CELLS);
}

#[test]
fn square_adjacency_is_rook() {
    let grid = build_shapegrid(&square_spec(3.0, 1.0)).unwrap();
    let adjacency = AdjacencyGraph::from_grid(&grid);
    assert_eq!(adjacency.site_count(), 9);
    assert_eq!(adjacency.neighbors(4), &[1, 3, 5, 7]);
    assert_eq!(adjacency.neighbors(0), &[1, 3]);
    assert_eq!(adjacency.boundary_edges(0), 2);
    assert_eq!(adjacency.boundary_edges(4), 0);
}

#[test]
fn hexagon_interior_cells_have_six_neighbors() {
    let spec = GridSpec::new(BBox::new(0.0, 0.0, 10.0, 10.0), 1.0, 6);
    let grid = build_shapegrid(&spec).unwrap();
    assert_eq!(grid.shape, CellShape::Hexagon);
    let adjacency = AdjacencyGraph::from_grid(&grid);

    let degrees: Vec<_> = (0..grid.site_count())
        .map(|site| adjacency.neighbors(site).len())
        .collect();
    assert_eq!(degrees.iter().copied().max(), Some(6));
    assert!(degrees.iter().all(|&d| d >= 2));
    for site in 0..grid.site_count() {
        for &other in adjacency.neighbors(site) {
            assert!(adjacency.neighbors(other).contains(&site));
        }
    }
}

proptest! {
    #[test]
    fn centroids_stay_near_the_bounding_box(
        min_x in -50.0f64..50.0,
        min_y in -50.0f64..50.0,
        width in 1.0f64..20.0,
        height in 1.0f64..20.0,
        cell in 0.5f64..1.0,
        hexagons in any::<bool>(),
    ) {
        let bbox = BBox::new(min_x, min_y, min_x + width, min_y + height);
        let spec = GridSpec::new(bbox, cell, if hexagons { 6 } else { 4 });
        let grid = build_shapegrid(&spec).unwrap();
        prop_assert!(grid.site_count() > 0);
        for (position, site) in grid.sites.iter().enumerate() {
            prop_assert_eq!(site.id, position);
            prop_assert!(site.centroid[0] >= bbox.min_x - cell && site.centroid[0] <= bbox.max_x + cell);
            prop_assert!(site.centroid[1] >= bbox.min_y - cell && site.centroid[1] <= bbox.max_y + cell);
        }
    }
}
