use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::new(480, 300);

    // Soft vertical gradient as a table surface
    for (_, y, pixel) in img.enumerate_pixels_mut() {
        let shade = 235 - (y * 25 / 300) as u8;
        *pixel = Rgb([shade, shade, shade - 10]);
    }

    // One coin of each size in the reference table
    let coins = [
        (60, 70, 24),
        (160, 70, 31),
        (270, 75, 38),
        (390, 80, 44),
        (80, 210, 52),
        (230, 215, 58),
        (390, 220, 66),
    ];
    for (x, y, r) in coins {
        draw_filled_circle_mut(&mut img, (x, y), r, Rgb([40, 35, 20]));
    }

    img.save("coins.png")?;
    println!("Created coins.png (480x300, {} coins)", coins.len());
    println!("Analyze with: coincount coins.png --max-radius 70 --output annotated.png");
    Ok(())
}
