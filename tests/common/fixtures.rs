use coincount::{Amount, AnalysisConfig, DenominationRule, DenominationTable};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use tempfile::NamedTempFile;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const COIN: Rgb<u8> = Rgb([0, 0, 0]);

/// A coin to render: center and radius in pixels.
#[derive(Debug, Clone, Copy)]
pub struct Coin {
    pub x: i32,
    pub y: i32,
    pub r: i32,
}

pub const fn coin(x: i32, y: i32, r: i32) -> Coin {
    Coin { x, y, r }
}

/// Renders dark filled disks on a white background.
pub fn coin_image(width: u32, height: u32, coins: &[Coin]) -> DynamicImage {
    shaded_coin_image(width, height, BACKGROUND, COIN, coins)
}

/// Renders disks of one gray level on a background of another.
pub fn shaded_coin_image(
    width: u32,
    height: u32,
    background: Rgb<u8>,
    fill: Rgb<u8>,
    coins: &[Coin],
) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, background);
    for c in coins {
        draw_filled_circle_mut(&mut img, (c.x, c.y), c.r, fill);
    }
    DynamicImage::ImageRgb8(img)
}

/// Radii 22, 33 and 45, laid out by [`three_coin_image`].
pub const THREE_COINS: [Coin; 3] = [coin(60, 80, 22), coin(150, 80, 33), coin(250, 80, 45)];

/// Three separated coins with radii 22, 33 and 45.
pub fn three_coin_image() -> DynamicImage {
    coin_image(320, 180, &THREE_COINS)
}

/// Writes `img` as a PNG temp file that is removed when dropped.
pub fn save_temp_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

fn cents(c: i64) -> Amount {
    Amount::from_minor_units(c)
}

/// `[20-28] 0.05, [29-34] 0.10, [35-40] 0.25, [41-47] 1.00`
pub fn four_rule_table() -> DenominationTable {
    DenominationTable::new(vec![
        DenominationRule::new(20, 28, cents(5)),
        DenominationRule::new(29, 34, cents(10)),
        DenominationRule::new(35, 40, cents(25)),
        DenominationRule::new(41, 47, cents(100)),
    ])
}

/// Default detector and style with the four-rule table.
pub fn four_rule_config() -> AnalysisConfig {
    AnalysisConfig {
        denominations: four_rule_table(),
        ..AnalysisConfig::default()
    }
}
