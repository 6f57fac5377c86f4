// Compression tier selection through the public API

use rstest::rstest;
use watermill::image_optimizer::{
    calculate_dimensions, select_optimization, CompressionTier, OutputFormat,
};

#[rstest]
#[case(4000, 3000, 1000, 800, 0.60, CompressionTier::UltraHigh)]
#[case(6000, 3000, 1200, 800, 0.60, CompressionTier::UltraHigh)]
#[case(3000, 2000, 900, 700, 0.65, CompressionTier::High)]
#[case(1500, 3000, 900, 1000, 0.65, CompressionTier::High)]
#[case(2000, 1500, 800, 650, 0.70, CompressionTier::High)]
#[case(3000, 1000, 900, 650, 0.70, CompressionTier::High)]
#[case(1600, 1200, 600, 500, 0.75, CompressionTier::Medium)]
#[case(600, 1000, 600, 800, 0.75, CompressionTier::Medium)]
fn test_tier_table(
    #[case] width: u32,
    #[case] height: u32,
    #[case] max_width: u32,
    #[case] max_height: u32,
    #[case] quality: f32,
    #[case] tier: CompressionTier,
) {
    let settings = select_optimization(width, height);
    assert_eq!((settings.max_width, settings.max_height), (max_width, max_height));
    assert_eq!(settings.quality, quality);
    assert_eq!(settings.tier, tier);
    assert_eq!(settings.format, OutputFormat::Jpeg);
}

#[test]
fn test_quality_never_increases_with_pixels() {
    let sizes = [
        (640, 480),
        (1600, 1200),
        (2000, 1500),
        (2400, 1800),
        (3000, 2000),
        (3500, 2500),
        (4000, 3000),
        (8000, 6000),
    ];
    let qualities: Vec<f32> = sizes
        .iter()
        .map(|&(w, h)| select_optimization(w, h).quality)
        .collect();
    assert!(qualities.windows(2).all(|pair| pair[1] <= pair[0]));
}

#[rstest]
#[case(4000, 3000, 1000, 800, (1000, 750))]
#[case(3000, 2000, 900, 700, (900, 600))]
#[case(1000, 3000, 900, 1000, (333, 1000))]
#[case(300, 200, 600, 500, (300, 200))]
fn test_target_dimensions(
    #[case] width: u32,
    #[case] height: u32,
    #[case] max_width: u32,
    #[case] max_height: u32,
    #[case] expected: (u32, u32),
) {
    assert_eq!(calculate_dimensions(width, height, max_width, max_height), expected);
}
