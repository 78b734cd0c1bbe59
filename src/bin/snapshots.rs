use image::{ImageReader, Rgb, RgbImage};
use std::fs;
use std::path::Path;
use stereogram_engine::rng::RngService;
use stereogram_engine::stereogram::reconstruct_frame;
use stereogram_engine::tiles::{synthesize_pool, Palette};
use stereogram_engine::{DepthMap, DisplayMode, ReconstructionParameters};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

fn compare_with_tolerance(a_path: &Path, b_path: &Path, tolerance: u8) -> anyhow::Result<bool> {
    let a = ImageReader::open(a_path)?.decode()?.to_rgb8();
    let b = ImageReader::open(b_path)?.decode()?.to_rgb8();

    if a.dimensions() != b.dimensions() {
        return Ok(false);
    }
    Ok(a.pixels().zip(b.pixels()).all(|(pa, pb)| {
        let da = pa.0;
        let db = pb.0;
        (0..3).all(|i| da[i].abs_diff(db[i]) <= tolerance)
    }))
}

/// A sphere floating in front of a tilted back plane.
fn synthetic_depth() -> DepthMap {
    let (cx, cy) = (WIDTH as f32 * 0.5, HEIGHT as f32 * 0.5);
    let radius = HEIGHT as f32 * 0.35;
    DepthMap::from_fn(WIDTH, HEIGHT, |x, y| {
        let background = 0.15 * (1.0 - y as f32 / HEIGHT as f32);
        let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
        let r2 = (dx * dx + dy * dy) / (radius * radius);
        if r2 < 1.0 {
            background.max(0.5 + 0.5 * (1.0 - r2).sqrt())
        } else {
            background
        }
    })
}

fn synthetic_color(depth: &DepthMap) -> RgbImage {
    RgbImage::from_fn(depth.width(), depth.height(), |x, y| {
        let shade = (depth.get(x, y) * 200.0) as u8 + 40;
        Rgb([shade, shade / 2, 255 - shade])
    })
}

fn snapshot_mode(name: &str, mode: DisplayMode) -> anyhow::Result<()> {
    let rng = RngService::with_seed(0x5173_2e0d);
    let palette = Palette::default_with(&mut rng.derive_stream_by_name("palette"));
    let pool = synthesize_pool(1, 32, &palette, &mut rng.derive_stream_by_name("tiles"));
    let tile = pool
        .get(0)
        .ok_or_else(|| anyhow::anyhow!("pool has no tiles"))?;

    let depth = synthetic_depth();
    let color = synthetic_color(&depth);
    let params = ReconstructionParameters {
        display_mode: mode,
        ..ReconstructionParameters::default()
    };
    let frame = reconstruct_frame(&depth, &color, tile, &params);

    fs::create_dir_all("snapshots/actual")?;
    fs::create_dir_all("snapshots/golden")?;
    let out_actual = Path::new("snapshots/actual").join(name);
    let out_golden = Path::new("snapshots/golden").join(name);
    frame.save(&out_actual)?;

    if !out_golden.exists() {
        fs::copy(&out_actual, &out_golden)?;
        println!("golden created at {}", out_golden.display());
        return Ok(());
    }

    if compare_with_tolerance(&out_actual, &out_golden, 3)? {
        println!("snapshot OK for {name}");
    } else {
        println!("snapshot mismatch for {name}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    snapshot_mode("stereo_sphere.png", DisplayMode::Stereo)?;
    snapshot_mode("depth_sphere.png", DisplayMode::Depth)?;
    snapshot_mode("original_sphere.png", DisplayMode::Original)?;
    Ok(())
}
