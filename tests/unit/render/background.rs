use super::*;

fn small() -> Canvas {
    Canvas {
        width: 8,
        height: 16,
    }
}

#[test]
fn gradient_runs_from_navy_to_purple() {
    let img = gradient_background(small());
    assert_eq!(img.dimensions(), (8, 16));
    assert_eq!(img.get_pixel(0, 0).0, [25, 25, 50]);
    let bottom = img.get_pixel(7, 15).0;
    assert!(bottom[2] > 180 && bottom[0] > 55);
    // Rows are uniform.
    assert_eq!(img.get_pixel(0, 9), img.get_pixel(7, 9));
}

#[test]
fn missing_image_degrades_to_gradient() {
    let src = BackgroundSource::Image(PathBuf::from("target/definitely/missing.png"));
    assert_eq!(src.load(small()), gradient_background(small()));
}

#[test]
fn staged_photo_is_sized_and_darkened() {
    let dir = PathBuf::from("target").join("unit_background");
    std::fs::create_dir_all(&dir).unwrap();
    let photo = dir.join("white.png");
    RgbImage::from_pixel(32, 20, image::Rgb([255, 255, 255]))
        .save(&photo)
        .unwrap();

    let staged = stage_background(Some(&photo), small(), &dir).unwrap();
    let BackgroundSource::Image(path) = &staged else {
        panic!("expected staged image");
    };
    assert!(path.ends_with("background.png"));

    let img = staged.load(small());
    assert_eq!(img.dimensions(), (8, 16));
    let center = img.get_pixel(4, 8).0;
    assert!(center.iter().all(|&c| (200..=205).contains(&c)), "{center:?}");
}

#[test]
fn staging_without_photo_writes_gradient() {
    let dir = PathBuf::from("target").join("unit_background_gradient");
    let staged = stage_background(None, small(), &dir).unwrap();
    assert_eq!(staged.load(small()), gradient_background(small()));
}
