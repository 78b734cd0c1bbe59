use image::{Rgb, RgbImage};
use stereogram_engine::rng::RngService;
use stereogram_engine::{
    build_tile_pool, DisplayMode, EngineError, Palette, StereogramConfig, TileImage, TilePool,
};

#[test]
fn defaults() {
    let config = StereogramConfig::default();
    assert_eq!(config.tile_size_px, 32);
    assert_eq!(config.tile_count, 20);
    assert!(config.palette.is_none());
    assert!(config.seed.is_none());
    assert!(config.tiles.is_none());
    assert_eq!(config.parameters.display_mode, DisplayMode::Stereo);
}

#[test]
fn partial_json_keeps_remaining_defaults() {
    let config = StereogramConfig::from_json_str(
        r#"{
            "tile_count": 4,
            "seed": 77,
            "parameters": { "repeat_size": 120.0 }
        }"#,
    )
    .unwrap();
    assert_eq!(config.tile_count, 4);
    assert_eq!(config.seed, Some(77));
    assert_eq!(config.tile_size_px, 32);
    assert_eq!(config.parameters.repeat_size, 120.0);
    assert_eq!(config.parameters.max_step_fraction, 0.3);
}

#[test]
fn palette_is_a_list_of_rgb_triples() {
    let config =
        StereogramConfig::from_json_str(r#"{ "palette": [[255, 0, 0], [0, 255, 0]] }"#).unwrap();
    assert_eq!(
        config.palette,
        Some(Palette::new(vec![[255, 0, 0], [0, 255, 0]]))
    );
}

#[test]
fn malformed_json_is_a_config_error() {
    let err = StereogramConfig::from_json_str("{ tile_count: ").unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = StereogramConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[test]
fn pool_follows_count_size_and_palette() {
    let palette = Palette::new(vec![[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
    let config = StereogramConfig {
        tile_count: 6,
        tile_size_px: 16,
        ..StereogramConfig::default()
    }
    .with_palette(palette.clone());

    let pool = build_tile_pool(&config, &RngService::with_seed(1)).unwrap();
    assert_eq!(pool.len(), 6);
    for tile in pool.iter() {
        assert_eq!((tile.width(), tile.height()), (16, 16));
        assert!(tile.image().pixels().all(|p| palette.contains(*p)));
    }
}

#[test]
fn default_palette_includes_black_and_white() {
    let config = StereogramConfig::default();
    let pool = build_tile_pool(&config, &RngService::with_seed(4)).unwrap();
    let black = Rgb([0, 0, 0]);
    let white = Rgb([255, 255, 255]);
    let texels = || pool.iter().flat_map(|t| t.image().pixels().copied());
    assert!(texels().any(|p| p == black));
    assert!(texels().any(|p| p == white));
}

#[test]
fn empty_palette_is_rejected() {
    let config = StereogramConfig::default().with_palette(Palette::new(Vec::new()));
    let err = build_tile_pool(&config, &RngService::with_seed(1)).unwrap_err();
    assert!(matches!(err, EngineError::EmptyPalette));
}

#[test]
fn caller_tiles_are_used_unchanged() {
    let image = RgbImage::from_pixel(3, 5, Rgb([9, 9, 9]));
    let pool = TilePool::new(vec![TileImage::new(image.clone()).unwrap()]).unwrap();
    let config = StereogramConfig::default().with_tiles(pool);

    let built = build_tile_pool(&config, &RngService::with_seed(1)).unwrap();
    assert_eq!(built.len(), 1);
    assert_eq!(built.get(0).unwrap().image(), &image);
}

#[test]
fn same_seed_same_tiles() {
    let config = StereogramConfig::default().with_seed(31);
    let a = build_tile_pool(&config, &RngService::with_seed(31)).unwrap();
    let b = build_tile_pool(&config, &RngService::with_seed(31)).unwrap();
    let c = build_tile_pool(&config, &RngService::with_seed(32)).unwrap();
    assert!(a.iter().zip(b.iter()).all(|(x, y)| x.image() == y.image()));
    assert!(a.iter().zip(c.iter()).any(|(x, y)| x.image() != y.image()));
}
