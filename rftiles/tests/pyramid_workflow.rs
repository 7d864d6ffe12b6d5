//! End-to-end tests: raster files → split → merge → downsample.
//!
//! Each test builds coverage rasters and their `.geo` sidecars in a temporary
//! directory and runs the public library API against them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage, Rgba};
use rftiles::composite::{PriorityCompositor, TileCompositor};
use rftiles::coord::{tile_to_lat_lon, TileAddress};
use rftiles::downsample::{DownsampleOptions, PyramidDownsampler};
use rftiles::merge::{MergeOptions, PyramidMerger};
use rftiles::priority::PriorityTable;
use rftiles::split::{SplitOptions, TileSplitter};
use rftiles::tile::{is_blank, is_transparent, load_tile, TILE_EXTENSION};
use rftiles::zoom::ZoomLevels;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const WHITE: [u8; 3] = [255, 255, 255];

/// Writes `<dir>/<name>.ppm` plus a `.geo` covering `columns` tiles east of
/// `first` at its zoom, 512 pixels per tile.
fn write_site_raster(
    dir: &Path,
    name: &str,
    first: TileAddress,
    columns: u32,
    color: [u8; 3],
) -> PathBuf {
    let width = 512 * columns;
    let height = 512;
    let raster_path = dir.join(format!("{}.ppm", name));
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
        .save(&raster_path)
        .unwrap();

    let (north, west) = tile_to_lat_lon(first.x as f64, first.y as f64, first.zoom);
    let (south, east) = tile_to_lat_lon(
        (first.x + columns) as f64,
        first.y as f64 + 1.0,
        first.zoom,
    );
    let geo = format!(
        "FILENAME\t{name}.ppm\n\
         #\t\tX\tY\tLong\t\tLat\n\
         TIEPOINT\t0\t0\t{west:.12}\t\t{north:.12}\n\
         TIEPOINT\t{x1}\t{y1}\t{east:.12}\t\t{south:.12}\n\
         IMAGESIZE\t{width}\t{height}\n",
        x1 = width - 1,
        y1 = height - 1,
    );
    std::fs::write(dir.join(format!("{}.geo", name)), geo).unwrap();
    raster_path
}

/// Every tile address present under `root`.
fn tiles_under(root: &Path) -> BTreeSet<TileAddress> {
    let mut tiles = BTreeSet::new();
    let Ok(zoom_dirs) = std::fs::read_dir(root) else {
        return tiles;
    };
    for zoom_dir in zoom_dirs.flatten() {
        let Ok(zoom) = zoom_dir.file_name().to_string_lossy().parse::<u8>() else {
            continue;
        };
        for x_dir in std::fs::read_dir(zoom_dir.path()).unwrap().flatten() {
            let x: u32 = x_dir.file_name().to_string_lossy().parse().unwrap();
            for file in std::fs::read_dir(x_dir.path()).unwrap().flatten() {
                let path = file.path();
                if path.extension().is_some_and(|e| e == TILE_EXTENSION) {
                    let y: u32 = path.file_stem().unwrap().to_string_lossy().parse().unwrap();
                    tiles.insert(TileAddress::new(zoom, x, y));
                }
            }
        }
    }
    tiles
}

fn splitter(blank_tiles: bool) -> TileSplitter {
    TileSplitter::new(
        SplitOptions::default()
            .with_workers(2)
            .with_blank_tiles(blank_tiles),
    )
    .unwrap()
}

fn split_site(raster: &Path, out: &Path, zoom: &str) {
    let zooms = ZoomLevels::parse(&[zoom]).unwrap();
    splitter(false)
        .split_file(raster, out, &zooms, &CancellationToken::new())
        .unwrap();
}

fn rgba(color: [u8; 3]) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

const TILE: TileAddress = TileAddress::new(10, 545, 361);

#[test]
fn red_raster_spanning_one_tile_yields_one_tile() {
    let temp = TempDir::new().unwrap();
    let raster = write_site_raster(temp.path(), "red", TILE, 1, RED);
    let out = temp.path().join("pyramid");
    let zooms = ZoomLevels::parse(&["10"]).unwrap();

    let summary = splitter(false)
        .split_file(&raster, &out, &zooms, &CancellationToken::new())
        .unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(tiles_under(&out), BTreeSet::from([TILE]));
    let tile = load_tile(&TILE.path(&out, TILE_EXTENSION)).unwrap();
    assert!(tile.pixels().all(|p| *p == rgba(RED)));
}

#[test]
fn white_raster_yields_no_tiles_unless_requested() {
    let temp = TempDir::new().unwrap();
    let raster = write_site_raster(temp.path(), "white", TILE, 1, WHITE);
    let zooms = ZoomLevels::parse(&["10"]).unwrap();

    let skipped = temp.path().join("skipped");
    let summary = splitter(false)
        .split_file(&raster, &skipped, &zooms, &CancellationToken::new())
        .unwrap();
    assert_eq!(summary.written, 0);
    assert!(tiles_under(&skipped).is_empty());

    let kept = temp.path().join("kept");
    let summary = splitter(true)
        .split_file(&raster, &kept, &zooms, &CancellationToken::new())
        .unwrap();
    assert_eq!(summary.written, 1);
    let tile = load_tile(&TILE.path(&kept, TILE_EXTENSION)).unwrap();
    assert!(is_blank(&tile));
    assert!(tile.pixels().all(is_transparent));
}

#[test]
fn split_merge_downsample_workflow() {
    let temp = TempDir::new().unwrap();
    let rasters = temp.path().join("rasters");
    std::fs::create_dir_all(&rasters).unwrap();

    // Site A: strong signal on one tile. Site B: weaker signal on that tile
    // and its eastern neighbour.
    let east = TileAddress::new(10, 546, 361);
    let site_a = write_site_raster(&rasters, "site-a", TILE, 1, RED);
    let site_b = write_site_raster(&rasters, "site-b", TILE, 2, GREEN);

    let pyramid_a = temp.path().join("a");
    let pyramid_b = temp.path().join("b");
    split_site(&site_a, &pyramid_a, "10");
    split_site(&site_b, &pyramid_b, "10");
    assert_eq!(tiles_under(&pyramid_b), BTreeSet::from([TILE, east]));

    // Merge
    let merged = temp.path().join("merged");
    let compositor: Arc<dyn TileCompositor> =
        Arc::new(PriorityCompositor::new(Arc::new(PriorityTable::default())));
    let merger = PyramidMerger::new(compositor, MergeOptions::default().with_workers(2));
    let summary = merger
        .merge(&[pyramid_a, pyramid_b], &merged, &CancellationToken::new())
        .unwrap();

    assert_eq!(summary.scheduled, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(tiles_under(&merged), BTreeSet::from([TILE, east]));

    let overlap = load_tile(&TILE.path(&merged, TILE_EXTENSION)).unwrap();
    assert!(
        overlap.pixels().all(|p| *p == rgba(RED)),
        "stronger signal wins where sites overlap"
    );
    let only_b = load_tile(&east.path(&merged, TILE_EXTENSION)).unwrap();
    assert!(only_b.pixels().all(|p| *p == rgba(GREEN)));

    // Downsample
    let downsampler =
        PyramidDownsampler::new(DownsampleOptions::default().with_workers(2)).unwrap();
    let zooms = ZoomLevels::parse(&["8-9"]).unwrap();
    let summary = downsampler
        .downsample(&merged, 10, &zooms, &CancellationToken::new())
        .unwrap();

    assert_eq!(summary.base_tiles, 2);
    assert_eq!(summary.unreadable, 0);
    assert_eq!(summary.written, 3);

    let z9_west = TileAddress::new(9, 272, 180);
    let z9_east = TileAddress::new(9, 273, 180);
    let z8 = TileAddress::new(8, 136, 90);
    assert_eq!(
        tiles_under(&merged),
        BTreeSet::from([TILE, east, z9_west, z9_east, z8]),
        "only ancestors of populated tiles are written"
    );

    // TILE is the bottom-right child of z9_west, east the bottom-left of z9_east
    let west_tile = load_tile(&z9_west.path(&merged, TILE_EXTENSION)).unwrap();
    assert_eq!(*west_tile.get_pixel(192, 192), rgba(RED));
    assert!(is_transparent(west_tile.get_pixel(64, 64)));
    assert!(is_transparent(west_tile.get_pixel(192, 64)));

    let east_tile = load_tile(&z9_east.path(&merged, TILE_EXTENSION)).unwrap();
    assert_eq!(*east_tile.get_pixel(64, 192), rgba(GREEN));
    assert!(is_transparent(east_tile.get_pixel(192, 192)));

    // At z8 the two z9 tiles fill the top-left and top-right quadrants
    let top = load_tile(&z8.path(&merged, TILE_EXTENSION)).unwrap();
    assert_eq!(*top.get_pixel(96, 96), rgba(RED));
    assert_eq!(*top.get_pixel(160, 96), rgba(GREEN));
    assert!(is_transparent(top.get_pixel(200, 200)));
}

#[test]
fn failed_site_does_not_stop_merge() {
    let temp = TempDir::new().unwrap();
    let raster = write_site_raster(temp.path(), "site", TILE, 1, RED);
    let good = temp.path().join("good");
    split_site(&raster, &good, "10");

    // Second pyramid holds a corrupt copy of the same tile
    let bad = temp.path().join("bad");
    let corrupt = TILE.path(&bad, TILE_EXTENSION);
    std::fs::create_dir_all(corrupt.parent().unwrap()).unwrap();
    std::fs::write(&corrupt, b"not a png").unwrap();
    let extra = TileAddress::new(10, 0, 0).path(&bad, TILE_EXTENSION);
    std::fs::create_dir_all(extra.parent().unwrap()).unwrap();
    std::fs::copy(TILE.path(&good, TILE_EXTENSION), &extra).unwrap();

    let compositor: Arc<dyn TileCompositor> =
        Arc::new(PriorityCompositor::new(Arc::new(PriorityTable::default())));
    let merged = temp.path().join("merged");
    let summary = PyramidMerger::new(compositor, MergeOptions::default().with_workers(2))
        .merge(&[good, bad], &merged, &CancellationToken::new())
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(
        tiles_under(&merged),
        BTreeSet::from([TileAddress::new(10, 0, 0)])
    );
}
