use image::{GrayImage, ImageFormat, Luma};
use robot36_core::{decode_wav, encode_image, wav, Config, VisCode, IMAGE_HEIGHT, IMAGE_WIDTH};
use std::io::Cursor;

const BANDS: [u8; 5] = [0, 62, 128, 191, 255];

fn banded_png() -> (Vec<u8>, Vec<u8>) {
    let image = GrayImage::from_fn(IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32, |_, y| {
        Luma([BANDS[(y as usize / 8) % BANDS.len()]])
    });
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).unwrap();
    (png.into_inner(), image.into_raw())
}

#[test]
fn png_survives_wav_roundtrip() {
    let config = Config::default();
    let (png, luma) = banded_png();

    let wav_bytes = encode_image(&png, &config).unwrap();
    let decoded = decode_wav(&wav_bytes, &config).unwrap();

    assert!(!decoded.report.fallback);
    assert_eq!(decoded.report.vis_code, Some(VisCode::ROBOT36));
    assert_eq!(decoded.report.lines_decoded, IMAGE_HEIGHT);

    let close = decoded
        .frame
        .pixels
        .iter()
        .zip(&luma)
        .filter(|&(&got, &want)| got.abs_diff(want) <= 10)
        .count();
    assert!(close * 100 >= luma.len() * 95, "{} of {} pixels close", close, luma.len());

    let png_out = decoded.to_png().unwrap();
    let reloaded = image::load_from_memory(&png_out).unwrap().to_luma8();
    assert_eq!(reloaded.dimensions(), (IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32));
}

#[test]
fn stereo_capture_decodes_first_channel() {
    let config = Config::default();
    let (png, _) = banded_png();

    let mono = wav::parse(&encode_image(&png, &config).unwrap()).unwrap();
    let interleaved: Vec<i16> = mono.samples.iter().flat_map(|&s| [s, 0]).collect();
    let stereo = wav::serialize(&interleaved, mono.sample_rate, 2);

    let decoded = decode_wav(&stereo, &config).unwrap();
    assert!(!decoded.report.fallback);
    assert_eq!(decoded.report.lines_decoded, IMAGE_HEIGHT);
}

#[test]
fn garbage_bytes_are_rejected() {
    assert!(decode_wav(b"not a wav file at all", &Config::default()).is_err());
    assert!(encode_image(b"not an image", &Config::default()).is_err());
}
