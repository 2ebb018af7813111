use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use rad_grid::{build_shapegrid, write_shapegrid, BBox, GridSpec};

#[derive(Args, Debug)]
pub struct BuildGridArgs {
    /// Bounding box as min_x,min_y,max_x,max_y.
    #[arg(long, value_delimiter = ',', num_args = 4, allow_hyphen_values = true)]
    pub bbox: Vec<f64>,
    /// Cell width in map units.
    #[arg(long)]
    pub cell_size: f64,
    /// 4 for squares, 6 for hexagons.
    #[arg(long, default_value_t = 4)]
    pub cell_sides: u32,
    /// Destination of the shapegrid document.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &BuildGridArgs) -> Result<(), Box<dyn Error>> {
    let &[min_x, min_y, max_x, max_y] = args.bbox.as_slice() else {
        return Err("--bbox needs exactly four values".into());
    };
    let spec = GridSpec::new(BBox::new(min_x, min_y, max_x, max_y), args.cell_size, args.cell_sides);
    let grid = build_shapegrid(&spec)?;
    write_shapegrid(&args.out, &grid)?;
    println!("wrote {} sites to {}", grid.site_count(), args.out.display());
    Ok(())
}
