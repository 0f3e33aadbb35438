use image::{Rgba, RgbaImage};
use tile_fill_core::TileFillError;
use tile_fill_core::prelude::*;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn solid(w: u32, h: u32, px: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(w, h, px)
}

fn small_atlas() -> SpriteAtlas {
    let cfg = AtlasConfig::builder()
        .with_dimensions(64, 64)
        .with_max_dimensions(128, 128)
        .padding(1)
        .build();
    SpriteAtlas::new(cfg).expect("valid config")
}

#[test]
fn positions_are_normalized_and_exclude_padding() {
    let mut atlas = small_atlas();
    let a = atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    assert_eq!(a.tl, [1.0 / 64.0, 1.0 / 64.0]);
    assert_eq!(a.br, [11.0 / 64.0, 11.0 / 64.0]);
    assert_eq!(a.size, [10.0, 10.0]);

    let b = atlas.add_image("b", &solid(20, 8, BLUE), Some(2.0)).expect("b");
    assert_eq!(atlas.slot("b"), Some(Rect::new(12, 0, 22, 10)));
    assert_eq!(b.tl, [13.0 / 64.0, 1.0 / 64.0]);
    assert_eq!(b.size, [10.0, 4.0]);
    assert_eq!(atlas.ids(), vec!["a", "b"]);
}

#[test]
fn adding_an_existing_id_returns_its_position() {
    let mut atlas = small_atlas();
    let first = atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    let again = atlas.add_image("a", &solid(30, 30, BLUE), None).expect("a again");
    assert_eq!(first, again);
    assert_eq!(atlas.len(), 1);
    assert_eq!(atlas.stats().num_allocations, 1);
    assert_eq!(*atlas.image().get_pixel(1, 1), RED);
}

#[test]
fn returned_position_matches_lookup_after_growth() {
    let mut atlas = small_atlas();
    let a = atlas.add_image("a", &solid(10, 10, RED), Some(2.0)).expect("a");
    assert_eq!(atlas.get_position("a"), Some(a));

    let big = atlas.add_image("big", &solid(60, 60, BLUE), None).expect("big");
    assert_eq!(atlas.width(), 128);
    assert_eq!(atlas.get_position("big"), Some(big));
    assert_eq!(big.br, [61.0 / 128.0, 73.0 / 128.0]);
}

#[test]
fn pixels_are_copied_inside_a_transparent_border() {
    let mut atlas = small_atlas();
    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    let img = atlas.image();
    assert_eq!(*img.get_pixel(1, 1), RED);
    assert_eq!(*img.get_pixel(10, 10), RED);
    assert_eq!(*img.get_pixel(0, 0), CLEAR);
    assert_eq!(*img.get_pixel(11, 5), CLEAR);
    assert_eq!(*img.get_pixel(5, 11), CLEAR);
}

#[test]
fn dirty_regions_track_writes_until_taken() {
    let mut atlas = small_atlas();
    assert!(!atlas.is_dirty());
    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    atlas.add_image("b", &solid(20, 8, BLUE), None).expect("b");
    assert_eq!(
        atlas.take_dirty(),
        vec![
            UpdateRegion { x: 0, y: 0, width: 12, height: 12 },
            UpdateRegion { x: 12, y: 0, width: 22, height: 10 },
        ]
    );
    assert!(!atlas.is_dirty());
    // re-adding is not a write
    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    assert!(atlas.take_dirty().is_empty());
}

#[test]
fn growing_keeps_placements_and_marks_everything_dirty() {
    let mut atlas = small_atlas();
    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    atlas.take_dirty();

    let big = atlas.add_image("big", &solid(60, 60, BLUE), None).expect("big");
    assert_eq!((atlas.width(), atlas.height()), (128, 128));
    assert_eq!(atlas.image().dimensions(), (128, 128));
    assert_eq!(atlas.slot("a"), Some(Rect::new(0, 0, 12, 12)));
    assert_eq!(atlas.slot("big"), Some(Rect::new(0, 12, 62, 62)));
    assert_eq!(big.tl, [1.0 / 128.0, 13.0 / 128.0]);

    let a = atlas.get_position("a").expect("a still present");
    assert_eq!(a.tl, [1.0 / 128.0, 1.0 / 128.0]);
    assert_eq!(a.size, [10.0, 10.0]);
    assert_eq!(*atlas.image().get_pixel(1, 1), RED);

    let dirty = atlas.take_dirty();
    assert_eq!(dirty[0], UpdateRegion { x: 0, y: 0, width: 128, height: 128 });
    assert_eq!(dirty.len(), 2);
    assert_eq!(dirty[1].area(), 62 * 62);
    assert!(dirty.iter().all(|r| !r.is_empty()));
}

#[test]
fn out_of_space_at_maximum_size() {
    let mut atlas = small_atlas();
    let err = atlas
        .add_image("huge", &solid(200, 10, RED), None)
        .expect_err("wider than the maximum");
    assert!(matches!(err, TileFillError::OutOfSpace));
    assert_eq!((atlas.width(), atlas.height()), (64, 64));

    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    atlas.add_image("big", &solid(60, 60, BLUE), None).expect("big");
    let err = atlas
        .add_image("c", &solid(120, 60, RED), None)
        .expect_err("no room left at 128x128");
    assert!(matches!(err, TileFillError::OutOfSpace));
    assert_eq!(atlas.len(), 2);
    assert!(!atlas.contains("c"));
}

#[test]
fn removed_images_do_not_free_their_slot() {
    let mut atlas = small_atlas();
    atlas.add_image("a", &solid(10, 10, RED), None).expect("a");
    atlas.add_image("b", &solid(20, 8, BLUE), None).expect("b");
    assert!(atlas.remove_image("a"));
    assert!(!atlas.remove_image("a"));
    assert!(atlas.get_position("a").is_none());
    assert!(atlas.position("a").is_none());

    atlas.add_image("a", &solid(10, 10, RED), None).expect("a again");
    assert_eq!(atlas.slot("a"), Some(Rect::new(34, 0, 12, 12)));
}

#[test]
fn rejects_bad_images_and_configs() {
    let mut atlas = small_atlas();
    let err = atlas.add_image("empty", &RgbaImage::new(0, 4), None).expect_err("empty");
    assert!(matches!(err, TileFillError::InvalidInput(_)));
    let err = atlas
        .add_image("ratio", &solid(4, 4, RED), Some(0.0))
        .expect_err("zero ratio");
    assert!(matches!(err, TileFillError::InvalidInput(_)));
    assert!(atlas.is_empty());

    let zero = AtlasConfig::builder().with_dimensions(0, 64).build();
    assert!(matches!(
        SpriteAtlas::new(zero),
        Err(TileFillError::InvalidDimensions { width: 0, height: 64 })
    ));
    let small_max = AtlasConfig::builder()
        .with_dimensions(256, 256)
        .with_max_dimensions(128, 1024)
        .build();
    assert!(matches!(SpriteAtlas::new(small_max), Err(TileFillError::InvalidConfig(_))));
    let fat_padding = AtlasConfig::builder().with_dimensions(8, 8).padding(4).build();
    assert!(matches!(SpriteAtlas::new(fat_padding), Err(TileFillError::InvalidConfig(_))));
}

#[test]
fn atlas_feeds_pattern_uniforms() {
    let mut atlas = small_atlas();
    atlas.add_image("dots", &solid(8, 8, RED), Some(2.0)).expect("dots");
    let atlas: &dyn PatternAtlas = &atlas;
    let pos = atlas.position("dots").expect("dots");
    assert_eq!(pos.size, [4.0, 4.0]);
    assert!(atlas.position("missing").is_none());
}
