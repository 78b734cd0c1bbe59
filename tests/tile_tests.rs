use image::{Rgb, RgbImage};
use stereogram_engine::rng::{RandomSource, RngService};
use stereogram_engine::tiles::{synthesize_palette, synthesize_pool, synthesize_tile};
use stereogram_engine::{EngineError, Palette, TileImage, TilePool};

/// Hands out a fixed cycle of words.
struct Sequence {
    values: Vec<u64>,
    next: usize,
}

impl RandomSource for Sequence {
    fn next_u64(&mut self) -> u64 {
        let v = self.values[self.next % self.values.len()];
        self.next += 1;
        v
    }
}

#[test]
fn every_texel_is_a_palette_color() {
    let svc = RngService::with_seed(2024);
    for (seed, size) in [(1u64, 1u32), (2, 8), (3, 32), (4, 33)] {
        let mut rng = svc.derive_stream(seed);
        let palette = synthesize_palette(1 + seed as usize, &mut rng);
        let tile = synthesize_tile(size, &palette, &mut rng);
        assert_eq!((tile.width(), tile.height()), (size, size));
        assert!(tile.image().pixels().all(|p| palette.contains(*p)));
    }
}

#[test]
fn palette_draws_are_roughly_uniform() {
    let palette = Palette::new(vec![[255, 0, 0], [0, 0, 255]]);
    let mut rng = RngService::with_seed(5).derive_stream(0);
    let tile = synthesize_tile(64, &palette, &mut rng);
    let red = tile
        .image()
        .pixels()
        .filter(|p| **p == Rgb([255, 0, 0]))
        .count();
    // 4096 texels, expect about half
    assert!((1748..=2348).contains(&red), "red count {red}");
}

#[test]
fn default_palette_has_three_randoms_plus_black_and_white() {
    let mut rng = RngService::with_seed(1).derive_stream(0);
    let palette = Palette::default_with(&mut rng);
    assert_eq!(palette.len(), 5);
    assert_eq!(palette.colors()[3], [0, 0, 0]);
    assert_eq!(palette.colors()[4], [255, 255, 255]);
}

#[test]
fn synthesized_palette_has_requested_size() {
    let mut rng = RngService::with_seed(8).derive_stream(0);
    assert_eq!(synthesize_palette(0, &mut rng).len(), 0);
    assert_eq!(synthesize_palette(7, &mut rng).len(), 7);
}

#[test]
fn sampling_wraps_on_both_axes() {
    let image = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 0]));
    let tile = TileImage::new(image).unwrap();
    assert_eq!(tile.texel_wrapped(-1, -1), Rgb([3, 3, 0]));
    assert_eq!(tile.texel_wrapped(5, 9), Rgb([1, 1, 0]));
    assert_eq!(tile.sample(0.25, 0.5), tile.sample(1.25, -0.5));
    assert_eq!(tile.sample(0.0, 0.0), Rgb([0, 0, 0]));
    assert_eq!(tile.sample(0.99, 0.99), Rgb([3, 3, 0]));
}

#[test]
fn zero_sized_tile_is_rejected() {
    assert!(TileImage::new(RgbImage::new(0, 4)).is_none());
}

#[test]
fn pool_has_requested_count_of_independent_tiles() {
    let svc = RngService::with_seed(11);
    let palette = Palette::default_with(&mut svc.derive_stream(0));
    let pool = synthesize_pool(20, 32, &palette, &mut svc.derive_stream(1));
    assert_eq!(pool.len(), 20);
    let first = pool.get(0).unwrap().image();
    assert!(pool.iter().skip(1).any(|t| t.image() != first));
}

#[test]
fn empty_pool_is_an_error() {
    assert!(matches!(TilePool::new(Vec::new()), Err(EngineError::EmptyTilePool)));
}

#[test]
fn chosen_tile_always_belongs_to_the_pool() {
    let svc = RngService::with_seed(3);
    let palette = Palette::new(vec![[10, 20, 30], [200, 100, 0]]);
    let pool = synthesize_pool(5, 4, &palette, &mut svc.derive_stream(0));

    let mut rng = Sequence {
        values: vec![0, u64::MAX, 1 << 63, 3 << 62, 12345678901234567],
        next: 0,
    };
    let mut seen = [false; 5];
    for _ in 0..50 {
        let (index, tile) = pool.choose(&mut rng);
        assert!(index < pool.len());
        assert_eq!(tile.image(), pool.get(index).unwrap().image());
        seen[index] = true;
    }
    assert!(seen[0] && seen[4]);
}
